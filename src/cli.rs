//! Command line surface of the `worker-launcher` binary
//!
//! ```text
//! worker-launcher [--config FILE] [--hostname NAME] [--log-format pretty|json] [COMMAND]
//!
//!   run [-- PROGRAM [ARGS]...]        build the environment and start the worker (default)
//!   env [--format shell|json] [--show-secrets]
//!                                     print the environment the worker would receive
//!   check                             parse the environment the way the worker does
//! ```

use crate::prelude::*;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "worker-launcher",
    version,
    about = "Build the DA3 worker environment and start the worker"
)]
pub struct Cli {
    /// Config file (TOML or YAML); defaults to worker-launcher.{toml,yaml,yml}
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use this host name instead of looking it up
    #[arg(long, global = true)]
    pub hostname: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum CliCommand {
    /// Build the environment and start the worker
    Run {
        /// Worker program and arguments, overriding `launch.program` / `launch.args`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        worker: Vec<String>,
    },
    /// Print the environment the worker would receive
    Env {
        #[arg(long, value_enum, default_value_t = EnvFormat::Shell)]
        format: EnvFormat,

        /// Print secrets in clear text
        #[arg(long)]
        show_secrets: bool,
    },
    /// Parse the environment the way the worker does and report problems
    Check,
}

/// Execute a parsed command line and return the process exit code.
pub async fn run_cli(cli: Cli) -> Result<i32, LauncherError> {
    init_tracing(cli.log_format);

    let mut config = LaunchConfig::load(cli.config.as_deref())?;
    let hostname = match cli.hostname {
        Some(hostname) => hostname,
        None => current_hostname()?,
    };
    let identity = WorkerIdentity::resolve(&config.worker, &hostname);

    let command = cli.command.unwrap_or(CliCommand::Run { worker: Vec::new() });
    match command {
        CliCommand::Run { worker } => {
            if let Some((program, args)) = worker.split_first() {
                config.launch.program = program.clone();
                config.launch.args = args.to_vec();
            }

            tracing::info!(
                program = %config.launch.program,
                worker_key = %identity.key,
                "Starting worker"
            );

            let launcher = Launcher::with_identity(&config, &identity);
            tracing::debug!(environment = ?launcher.environment().redacted(), "Worker environment");

            let outcome = launcher.run().await?;
            Ok(outcome.exit_code())
        }
        CliCommand::Env {
            format,
            show_secrets,
        } => {
            let env = Environment::build(&config, &identity);
            let env = if show_secrets { env } else { env.redacted() };
            print!("{}", env.render(format)?);
            Ok(0)
        }
        CliCommand::Check => {
            let env = Environment::build(&config, &identity);
            match WorkerSettings::from_environment(&env, &hostname) {
                Ok(settings) => {
                    println!(
                        "ok: worker_key={} display_name={:?} idle_sleep={:?}",
                        settings.worker_key, settings.worker_display_name, settings.idle_sleep
                    );
                    Ok(0)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Worker environment check failed");
                    eprintln!("check failed: {}", e);
                    Ok(1)
                }
            }
        }
    }
}

/// Parse arguments, run, and map errors to exit codes.
pub async fn start_launcher() -> i32 {
    match run_cli(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            trace_launch_error(&e, "worker-launcher");
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}

/// Macro to create the launcher binary's `main`
///
/// # Example
///
/// ```rust,ignore
/// worker_launcher::create_launcher_main!();
/// ```
#[macro_export]
macro_rules! create_launcher_main {
    () => {
        #[tokio::main]
        async fn main() {
            let code = $crate::cli::start_launcher().await;
            std::process::exit(code);
        }
    };
}
