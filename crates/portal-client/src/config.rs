//! Client configuration.

use portal_protocol::RoomCode;
use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Where the Portal server lives.
///
/// The HTTP endpoints and the real-time channel may be served from
/// different origins, so they are configured separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for `/create` and `/exists`, e.g. `http://localhost:5000`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for `/ws`, e.g. `ws://localhost:5000`.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ws_url: ws_url.into(),
        }
    }

    /// Reads `PORTAL_API_URL` and `PORTAL_WS_URL`, falling back to a local
    /// server for whichever is unset.
    pub fn from_env() -> Result<Self, ClientError> {
        let config = envy::prefixed("PORTAL_").from_env::<Self>()?;
        tracing::debug!(api = %config.api_url, ws = %config.ws_url, "client config loaded");
        Ok(config)
    }

    pub(crate) fn create_url(&self) -> String {
        format!("{}/create", self.api_url.trim_end_matches('/'))
    }

    pub(crate) fn exists_url(&self, code: RoomCode) -> String {
        format!("{}/exists?room={code}", self.api_url.trim_end_matches('/'))
    }

    pub(crate) fn room_url(&self, code: RoomCode) -> String {
        format!("{}/ws?room={code}", self.ws_url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:5000".to_string()
}
