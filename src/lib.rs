//! # Worker Launcher
//!
//! Environment bootstrapper for the DA3 GPU job worker. It turns a typed
//! configuration into the flat set of variables the worker reads, derives the
//! worker's identity from the host name, and starts the worker process with
//! that environment.
//!
//! ## Features
//!
//! - **Typed configuration** from defaults, TOML/YAML files and environment variables
//! - **Host-derived identity** (`WORKER_KEY`, `WORKER_DISPLAY_NAME`)
//! - **Verbatim pass-through** of every value; nothing is validated on the launch path
//! - **Exit code propagation** from the worker, `127`/`126` when it cannot be started
//! - **Worker-side settings parser** for the same variables
//! - **Structured launch logging** with secrets redacted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use worker_launcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LaunchConfig::load(None)?;
//!     let launcher = Launcher::from_config(&config)?;
//!
//!     let outcome = launcher.run().await?;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```
//!
//! ### Building an environment without launching
//!
//! ```rust
//! use worker_launcher::prelude::*;
//!
//! let config = LaunchConfigBuilder::new()
//!     .buckets("videos", "models")
//!     .tags_json(r#"{"gpu":"a100"}"#)
//!     .build();
//! let identity = WorkerIdentity::resolve(&config.worker, "gpu-node-3");
//! let env = Environment::build(&config, &identity);
//!
//! assert_eq!(env.get("WORKER_KEY"), Some("gpu-node-3"));
//! assert_eq!(env.get("WORKER_DISPLAY_NAME"), Some("DA3 Worker - gpu-node-3"));
//! assert_eq!(env.get("WORKER_TAGS_JSON"), Some(r#"{"gpu":"a100"}"#));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod environment;
pub mod error;
pub mod identity;
pub mod launcher;
pub mod settings;

#[cfg(feature = "tracing")]
pub mod tracing_utils;

#[cfg(feature = "cli")]
#[cfg_attr(docsrs, doc(cfg(feature = "cli")))]
pub mod cli;

pub use self::config::*;
pub use environment::{EnvFormat, Environment};
pub use error::*;
pub use identity::*;
pub use launcher::*;
pub use settings::*;

pub mod prelude;
