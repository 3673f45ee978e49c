//! Worker Launcher
//!
//! Builds the worker environment from `worker-launcher.toml` (or `.yaml`),
//! `WORKER_LAUNCHER__*` variables and the host name, then starts the worker
//! and exits with its exit code.
//!
//! ```text
//! worker-launcher                      # start the configured worker
//! worker-launcher env                  # show what the worker would receive
//! worker-launcher run -- python3 -m app.worker_main
//! ```

worker_launcher::create_launcher_main!();
