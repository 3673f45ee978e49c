use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Hostname lookup failed: {0}")]
    Hostname(#[source] std::io::Error),

    #[error("Failed to start worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for worker: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Signal handling error: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Worker settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LauncherError {
    /// Process exit code the binary reports for this error.
    ///
    /// Spawn failures follow the shell convention: 127 when the program
    /// cannot be found, 126 when it was found but could not be executed.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherError::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                127
            }
            LauncherError::Spawn { .. } => 126,
            LauncherError::Configuration(_) => 2,
            _ => 1,
        }
    }
}

/// Errors raised while parsing the worker environment into [`crate::WorkerSettings`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("environment variable is required: {0}")]
    MissingVariable(String),

    #[error("invalid bool environment variable: {name}={value}")]
    InvalidBool { name: String, value: String },

    #[error("invalid float environment variable: {name}={value}")]
    InvalidFloat { name: String, value: String },

    #[error("invalid JSON in environment variable {name}: {reason}")]
    InvalidJson { name: String, reason: String },
}
