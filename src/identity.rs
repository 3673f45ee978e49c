//! Worker identity derived from the host name.

use crate::{LauncherError, WorkerSection};
use serde::{Deserialize, Serialize};

/// Placeholder substituted in the display name template.
pub const HOSTNAME_PLACEHOLDER: &str = "{hostname}";

/// Look up the current machine's host name.
///
/// Non UTF-8 host names are converted lossily.
pub fn current_hostname() -> Result<String, LauncherError> {
    let name = hostname::get().map_err(LauncherError::Hostname)?;
    Ok(name.to_string_lossy().into_owned())
}

/// Resolved `WORKER_KEY` / `WORKER_DISPLAY_NAME` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub key: String,
    pub display_name: String,
}

impl WorkerIdentity {
    /// Resolve identity against a known host name.
    ///
    /// A blank configured key falls back to the host name. An explicit
    /// display name wins over the template.
    pub fn resolve(worker: &WorkerSection, hostname: &str) -> Self {
        let key = match worker.key.as_deref() {
            Some(key) if !key.trim().is_empty() => key.to_string(),
            _ => hostname.to_string(),
        };

        let display_name = match worker.display_name.as_deref() {
            Some(name) => name.to_string(),
            None => render_display_name(&worker.display_name_template, hostname),
        };

        Self { key, display_name }
    }

    /// Resolve identity against the current machine's host name.
    pub fn detect(worker: &WorkerSection) -> Result<Self, LauncherError> {
        let hostname = current_hostname()?;
        Ok(Self::resolve(worker, &hostname))
    }
}

/// Substitute every `{hostname}` in `template`.
pub fn render_display_name(template: &str, hostname: &str) -> String {
    template.replace(HOSTNAME_PLACEHOLDER, hostname)
}
