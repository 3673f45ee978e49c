//! Convenience re-exports for common types
//!
//! Users can import everything they need with `use worker_launcher::prelude::*;`

// Configuration types
pub use crate::{
    HfConfig, JobsConfig, LaunchConfig, LaunchConfigBuilder, LaunchSection, MinioConfig,
    PostgresConfig, WorkerSection,
};

// Environment and identity
pub use crate::environment::keys;
pub use crate::{current_hostname, EnvFormat, Environment, WorkerIdentity};

// Launching
pub use crate::{LaunchOutcome, LaunchSpec, Launcher, ShutdownSignal};

// Worker-side settings
pub use crate::WorkerSettings;

// Errors
pub use crate::{LauncherError, SettingsError};

#[cfg(feature = "tracing")]
pub use crate::tracing_utils::{
    init_tracing, trace_launch_error, trace_launch_event, LaunchEvent, LogFormat,
};
