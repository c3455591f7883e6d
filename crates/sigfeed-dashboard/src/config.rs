//! Dashboard settings.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// HTTP/WebSocket surface settings. Missing keys take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub bind: IpAddr,
    pub port: u16,
    /// Period of the snapshot pushed to `/ws` clients.
    pub update_interval_ms: u64,
    /// Concurrent `/ws` clients allowed.
    pub max_connections: usize,
    /// Basic auth applies only when both are non-empty.
    pub username: String,
    pub password: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            update_interval_ms: 1000,
            max_connections: 10,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl DashboardConfig {
    pub fn auth_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
