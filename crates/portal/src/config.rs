//! Server configuration, read from `PORTAL_*` environment variables.

use std::time::Duration;

use portal_room::RoomConfig;
use serde::{Deserialize, Serialize};

use crate::PortalError;

/// Settings for the `portal-server` binary.
///
/// Every field has a default, so an empty environment yields a server on
/// `0.0.0.0:5000` that sweeps once a minute and drops rooms idle for an
/// hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `PORTAL_HOST`
    #[serde(default = "default_host")]
    pub host: String,

    /// `PORTAL_PORT`
    #[serde(default = "default_port")]
    pub port: u16,

    /// `PORTAL_ROOM_IDLE_SECS`: how long an empty room survives.
    #[serde(default = "default_room_idle_secs")]
    pub room_idle_secs: u64,

    /// `PORTAL_SWEEP_INTERVAL_SECS`: how often idle rooms are looked for.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Loads an optional `.env` file, then reads `PORTAL_*` variables.
    pub fn load() -> Result<Self, PortalError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Reads `PORTAL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, PortalError> {
        match envy::prefixed("PORTAL_").from_env::<Self>() {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!(error = %e, "failed to load configuration");
                Err(PortalError::Config(e))
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            idle_grace: Duration::from_secs(self.room_idle_secs),
            ..RoomConfig::default()
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            room_idle_secs: default_room_idle_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_room_idle_secs() -> u64 {
    60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}
