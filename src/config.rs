//! Relay configuration
//!
//! Loaded from the environment or a JSON file; every field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::client::{ClientOptions, DEFAULT_COUNTDOWN_SECS};
use crate::dispatch::DispatchOptions;
use crate::error::RelayError;
use crate::event_log::DEFAULT_LOG_CAPACITY;
use crate::sse::DEFAULT_MAX_FRAME_BYTES;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SECONDARY_API_BASE: &str = "http://127.0.0.1:8001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Orchestration backend
    pub api_base: String,
    /// Second backend; carried for callers, unused by the client
    pub secondary_api_base: String,
    pub log_capacity: usize,
    pub log_heartbeat: bool,
    pub log_progress: bool,
    /// Raw `Cookie` header for PR submission
    pub cookie: Option<String>,
    pub max_frame_bytes: usize,
}

impl RelayConfig {
    pub fn new() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            secondary_api_base: DEFAULT_SECONDARY_API_BASE.to_string(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            log_heartbeat: false,
            log_progress: false,
            cookie: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Defaults overridden by process environment variables
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let mut config = Self::new();

        if let Some(base) = lookup("VITE_API_BASE") {
            config.api_base = base;
        }
        if let Some(base) = lookup("VITE_SECONDARY_API_BASE") {
            config.secondary_api_base = base;
        }
        if let Some(raw) = lookup("AGENT_RELAY_LOG_CAPACITY") {
            config.log_capacity = raw.trim().parse().map_err(|_| {
                RelayError::Config(format!("AGENT_RELAY_LOG_CAPACITY is not a number: {raw}"))
            })?;
        }
        if let Some(flag) = lookup("AGENT_RELAY_LOG_HEARTBEAT").and_then(|v| parse_bool_flag(&v)) {
            config.log_heartbeat = flag;
        }
        if let Some(flag) = lookup("AGENT_RELAY_LOG_PROGRESS").and_then(|v| parse_bool_flag(&v)) {
            config.log_progress = flag;
        }
        if let Some(cookie) = lookup("AGENT_RELAY_COOKIE").filter(|c| !c.trim().is_empty()) {
            config.cookie = Some(cookie);
        }

        config.validate()
    }

    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let content = fs::read_to_string(path)?;
        let config: RelayConfig = serde_json::from_str(&content)?;
        config.validate()
    }

    /// Check base URLs and limits, normalizing trailing slashes
    pub fn validate(mut self) -> Result<Self, RelayError> {
        self.api_base = normalize_base(&self.api_base)?;
        self.secondary_api_base = normalize_base(&self.secondary_api_base)?;

        if self.log_capacity == 0 {
            return Err(RelayError::Config("log capacity must be at least 1".into()));
        }
        if self.max_frame_bytes == 0 {
            return Err(RelayError::Config("max frame size must be at least 1".into()));
        }
        Ok(self)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            log_heartbeat: self.log_heartbeat,
            log_progress: self.log_progress,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            dispatch: self.dispatch_options(),
            log_capacity: self.log_capacity,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_base(base: &str) -> Result<String, RelayError> {
    let trimmed = base.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| RelayError::Config(format!("invalid base url {base:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(RelayError::Config(format!(
            "unsupported scheme {other:?} in {base:?}"
        ))),
    }
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
