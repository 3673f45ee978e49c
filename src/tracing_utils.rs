//! Tracing utilities for the worker launcher
//!
//! Subscriber setup plus structured events for each step of a launch, so a
//! launch can be followed in JSON logs next to the worker's own output.

use serde::{Deserialize, Serialize};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber.
///
/// The filter comes from `LOG_LEVEL` (default `info`). Calling this twice is
/// harmless; the second call is ignored.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let builder = fmt()
        .with_env_filter(EnvFilter::new(&log_level))
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Launch lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LaunchEvent {
    /// Worker environment assembled
    EnvironmentBuilt {
        worker_key: String,
        display_name: String,
        variable_count: usize,
    },
    /// Worker process started
    Spawned {
        program: String,
        args: Vec<String>,
        pid: Option<u32>,
    },
    /// Worker could not be started
    SpawnFailed { program: String, error: String },
    /// Worker process finished
    Exited {
        exit_code: i32,
        success: bool,
        duration_ms: u64,
    },
    /// SIGINT or SIGTERM received while the worker was running
    Interrupted {
        signal: String,
        grace_period_seconds: u64,
    },
    /// Worker did not exit within the grace period and was killed
    Killed { pid: Option<u32> },
}

/// Trace a launch event with structured logging
pub fn trace_launch_event(event: LaunchEvent) {
    match event {
        LaunchEvent::EnvironmentBuilt {
            worker_key,
            display_name,
            variable_count,
        } => {
            tracing::info!(
                worker_key = worker_key,
                display_name = display_name,
                variable_count = variable_count,
                event = "environment_built",
                "Worker environment built"
            );
        }
        LaunchEvent::Spawned { program, args, pid } => {
            tracing::info!(
                program = program,
                args = ?args,
                pid = pid,
                event = "spawned",
                "Worker process started"
            );
        }
        LaunchEvent::SpawnFailed { program, error } => {
            tracing::error!(
                program = program,
                error = error,
                event = "spawn_failed",
                "Worker process could not be started"
            );
        }
        LaunchEvent::Exited {
            exit_code,
            success,
            duration_ms,
        } => {
            if success {
                tracing::info!(
                    exit_code = exit_code,
                    success = true,
                    duration_ms = duration_ms,
                    event = "exited",
                    "Worker process exited"
                );
            } else {
                tracing::warn!(
                    exit_code = exit_code,
                    success = false,
                    duration_ms = duration_ms,
                    event = "exited",
                    "Worker process exited with failure"
                );
            }
        }
        LaunchEvent::Interrupted {
            signal,
            grace_period_seconds,
        } => {
            tracing::info!(
                signal = signal,
                grace_period_seconds = grace_period_seconds,
                event = "interrupted",
                "Shutdown signal received, waiting for worker to stop"
            );
        }
        LaunchEvent::Killed { pid } => {
            tracing::warn!(
                pid = pid,
                event = "killed",
                "Worker did not stop within grace period, killed"
            );
        }
    }
}

/// Trace a launcher error with its source chain
pub fn trace_launch_error(error: &dyn std::error::Error, context: &str) {
    tracing::error!(
        error = %error,
        error_source = error.source().map(|e| e.to_string()).as_deref(),
        context = context,
        "Launcher error occurred"
    );

    let mut source = error.source();
    let mut depth = 1;
    while let Some(err) = source {
        tracing::debug!(error_depth = depth, error = %err, "Error chain");
        source = err.source();
        depth += 1;
    }
}
