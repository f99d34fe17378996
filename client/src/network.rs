//! Device network state as seen by the orchestrator.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Reports the current connection.
pub trait NetworkObserver: Send + Sync {
    /// Whether the current connection is unmetered (Wi-Fi, ethernet).
    fn current_connection_is_unmetered(&self) -> bool;

    /// Whether any connection is available at all.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Kind of network the device is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Ethernet,
    Cellular,
    Offline,
}

impl ConnectionType {
    pub fn is_unmetered(&self) -> bool {
        matches!(self, ConnectionType::Wifi | ConnectionType::Ethernet)
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionType::Wifi => 0,
            ConnectionType::Ethernet => 1,
            ConnectionType::Cellular => 2,
            ConnectionType::Offline => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionType::Wifi,
            1 => ConnectionType::Ethernet,
            2 => ConnectionType::Cellular,
            _ => ConnectionType::Offline,
        }
    }
}

/// Network state updated by the host platform's connectivity callbacks.
#[derive(Debug)]
pub struct SharedNetworkState {
    connection: AtomicU8,
}

impl SharedNetworkState {
    pub fn new(connection: ConnectionType) -> Self {
        Self {
            connection: AtomicU8::new(connection.to_u8()),
        }
    }

    pub fn connection(&self) -> ConnectionType {
        ConnectionType::from_u8(self.connection.load(Ordering::Acquire))
    }

    /// Record a connectivity change. Returns the previous connection.
    pub fn set_connection(&self, connection: ConnectionType) -> ConnectionType {
        ConnectionType::from_u8(self.connection.swap(connection.to_u8(), Ordering::AcqRel))
    }
}

impl Default for SharedNetworkState {
    fn default() -> Self {
        Self::new(ConnectionType::Wifi)
    }
}

impl NetworkObserver for SharedNetworkState {
    fn current_connection_is_unmetered(&self) -> bool {
        self.connection().is_unmetered()
    }

    fn is_connected(&self) -> bool {
        self.connection() != ConnectionType::Offline
    }
}
