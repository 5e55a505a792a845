use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubgateConfig {
    pub hub: HubConfig,
    pub server: ServerConfig,
}

/// The upstream hub and the outbound call transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the hub's XML-RPC API.
    pub api_url: String,
    /// TCP connect timeout for outbound calls, in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for outbound calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8001/rpc/api".into(),
            connect_timeout_secs: 10,
            request_timeout_secs: 10,
        }
    }
}

impl HubConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// The gateway's own listening socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 2830,
        }
    }
}
