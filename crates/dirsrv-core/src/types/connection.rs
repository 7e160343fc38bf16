//! Client connection descriptors for connection-level hooks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What connection-level hooks know about a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConnectionInfo {
    /// Server-assigned connection identifier.
    pub connection_id: i64,
    /// Client address, as reported by the transport.
    pub client_address: String,
    /// Server address the client connected to.
    pub server_address: String,
    /// Protocol name, e.g. `"LDAP"` or `"LDAPS"`.
    pub protocol: String,
}

/// Why a client connection was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    Unbind,
    ClientDisconnect,
    IdleTimeLimitExceeded,
    ProtocolError,
    ServerShutdown,
    AdminDisconnect,
    ServerError,
    Other,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unbind => "unbind",
            Self::ClientDisconnect => "client disconnect",
            Self::IdleTimeLimitExceeded => "idle time limit exceeded",
            Self::ProtocolError => "protocol error",
            Self::ServerShutdown => "server shutdown",
            Self::AdminDisconnect => "administrative disconnect",
            Self::ServerError => "server error",
            Self::Other => "other",
        };
        write!(f, "{name}")
    }
}
