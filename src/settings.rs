//! Typed worker settings parsed from the worker environment.
//!
//! This is the consumer side of [`Environment`]: the worker reads the
//! variables once into a [`WorkerSettings`] and passes that value into its
//! initialization instead of consulting the process environment ad hoc.

use crate::environment::keys;
use crate::{Environment, SettingsError};
use serde::Serialize;
use std::time::Duration;

/// Idle sleep used when `IDLE_SLEEP_SEC` is absent or blank.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_secs(2);

/// Heartbeat cadence of the worker; not configurable.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSettings {
    pub postgres_dsn: String,
    pub minio_endpoint: String,
    pub minio_access_key: String,
    #[serde(skip_serializing)]
    pub minio_secret_key: String,
    pub minio_secure: bool,
    pub input_bucket: String,
    pub output_bucket: String,
    pub worker_key: String,
    pub worker_display_name: String,
    pub worker_ip_address: Option<String>,
    /// Raw tag JSON as reported to the database
    pub tags_json_text: String,
    pub tags: serde_json::Value,
    pub capacity_json_text: String,
    pub capacity: serde_json::Value,
    pub idle_sleep: Duration,
    pub heartbeat_interval: Duration,
    pub keep_frames_for_debug: bool,
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,
}

impl WorkerSettings {
    /// Parse settings from any variable lookup.
    ///
    /// `hostname` is used only when `WORKER_KEY` is absent or blank.
    pub fn from_lookup<F>(lookup: F, hostname: &str) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let postgres_dsn = required(&lookup, keys::POSTGRES_DSN)?;
        let minio_endpoint = required(&lookup, keys::MINIO_ENDPOINT)?;
        let minio_access_key = required(&lookup, keys::MINIO_ACCESS_KEY)?;
        let minio_secret_key = required(&lookup, keys::MINIO_SECRET_KEY)?;
        let minio_secure = parse_bool(&lookup, keys::MINIO_SECURE, false)?;

        let input_bucket = required(&lookup, keys::JOB_INPUT_BUCKET)?;
        let output_bucket = required(&lookup, keys::JOB_OUTPUT_BUCKET)?;

        let worker_key = match lookup(keys::WORKER_KEY) {
            Some(key) if !key.trim().is_empty() => key,
            _ => hostname.to_string(),
        };
        let worker_display_name =
            lookup(keys::WORKER_DISPLAY_NAME).unwrap_or_else(|| worker_key.clone());
        let worker_ip_address = lookup(keys::WORKER_IP_ADDRESS);

        let tags_json_text = lookup(keys::WORKER_TAGS_JSON).unwrap_or_else(|| "{}".to_string());
        let tags = parse_json(keys::WORKER_TAGS_JSON, &tags_json_text)?;
        let capacity_json_text =
            lookup(keys::WORKER_CAPACITY_JSON).unwrap_or_else(|| "{}".to_string());
        let capacity = parse_json(keys::WORKER_CAPACITY_JSON, &capacity_json_text)?;

        let idle_sleep = parse_seconds(&lookup, keys::IDLE_SLEEP_SEC, DEFAULT_IDLE_SLEEP)?;
        let keep_frames_for_debug = parse_bool(&lookup, keys::KEEP_FRAMES_FOR_DEBUG, false)?;

        let hf_token = lookup(keys::HF_TOKEN).filter(|t| !t.trim().is_empty());

        Ok(Self {
            postgres_dsn,
            minio_endpoint,
            minio_access_key,
            minio_secret_key,
            minio_secure,
            input_bucket,
            output_bucket,
            worker_key,
            worker_display_name,
            worker_ip_address,
            tags_json_text,
            tags,
            capacity_json_text,
            capacity,
            idle_sleep,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            keep_frames_for_debug,
            hf_token,
        })
    }

    /// Parse settings from a built [`Environment`].
    pub fn from_environment(env: &Environment, hostname: &str) -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env.get(key).map(str::to_string), hostname)
    }

    /// Parse settings from the current process environment, the way the
    /// worker sees them after launch.
    pub fn from_process_env() -> Result<Self, crate::LauncherError> {
        let hostname = crate::current_hostname()?;
        Ok(Self::from_lookup(|key| std::env::var(key).ok(), &hostname)?)
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SettingsError::MissingVariable(name.to_string())),
    }
}

/// Case-insensitive, whitespace-tolerant boolean.
fn parse_bool<F>(lookup: &F, name: &str, default: bool) -> Result<bool, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };

    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidBool {
            name: name.to_string(),
            value,
        }),
    }
}

fn parse_seconds<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(name) {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Ok(default),
    };

    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or(SettingsError::InvalidFloat {
            name: name.to_string(),
            value,
        })
}

fn parse_json(name: &str, text: &str) -> Result<serde_json::Value, SettingsError> {
    serde_json::from_str(text).map_err(|e| SettingsError::InvalidJson {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
