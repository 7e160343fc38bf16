//! Server instance configuration.

use serde::{Deserialize, Serialize};

/// Directory server instance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Instance name used in log output.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_instance_name() -> String {
    "dirsrv".to_string()
}

fn default_shutdown_grace() -> u64 {
    30
}
