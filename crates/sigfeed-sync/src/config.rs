//! Refresh and expiry timing configuration.

use serde::{Deserialize, Serialize};
use sigfeed_core::SignalFilters;
use std::time::Duration;

fn default_debounce_ms() -> u64 {
    300
}

fn default_expiry_tick_secs() -> u64 {
    60
}

fn default_fetch_timeout_ms() -> u64 {
    15_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period after a store bump or push message before refetching.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How often the shared `now` for expiry is republished.
    #[serde(default = "default_expiry_tick_secs")]
    pub expiry_tick_secs: u64,
    /// List fetch timeout (0 = wait forever).
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Filters used for the first fetch.
    #[serde(default)]
    pub filters: SignalFilters,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            expiry_tick_secs: default_expiry_tick_secs(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            filters: SignalFilters::default(),
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn expiry_tick(&self) -> Duration {
        Duration::from_secs(self.expiry_tick_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_ms > 0).then(|| Duration::from_millis(self.fetch_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_table() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = SyncConfig {
            fetch_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.fetch_timeout(), None);
    }
}
