//! Live connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tourney_core::{Error, Result};

const DEFAULT_POLLING_INTERVAL_MS: u64 = 30_000;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 30_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Options for one live connection manager
///
/// Field names follow the camelCase keys used by page configuration blobs,
/// e.g. `{"enablePush": false, "pollingIntervalMs": 15000}`. Missing keys
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveConfig {
    /// Try the server-sent events channel before polling
    pub enable_push: bool,
    /// Poll the stats endpoint when push is unavailable or abandoned
    pub fallback_polling: bool,
    pub polling_interval_ms: u64,
    /// Delay before the first reconnect; doubles per attempt
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
    pub max_reconnect_delay_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enable_push: true,
            fallback_polling: true,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl LiveConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: LiveConfig = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid live config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling_interval_ms == 0 {
            return Err(Error::Config("pollingIntervalMs must be positive".to_string()));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(Error::Config("reconnectDelayMs must be positive".to_string()));
        }
        if self.max_reconnect_delay_ms < self.reconnect_delay_ms {
            return Err(Error::Config(
                "maxReconnectDelayMs must not be below reconnectDelayMs".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("requestTimeoutMs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
