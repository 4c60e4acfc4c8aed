//! Configuration Module
//!
//! Handles loading cache and session configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of aggregates the cache can hold
    pub cache_capacity: usize,
    /// Rows per page in the list view
    pub page_size: usize,
    /// Quiescence window for search-as-you-type, in milliseconds
    pub debounce_ms: u64,
    /// Upper bound on a single store round trip, in milliseconds
    pub store_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cached aggregates (default: 100)
    /// - `PAGE_SIZE` - Rows per page (default: 20)
    /// - `DEBOUNCE_MS` - Search debounce window (default: 300)
    /// - `STORE_TIMEOUT_MS` - Store call timeout (default: 5000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: env_or("CACHE_CAPACITY", defaults.cache_capacity),
            page_size: env_or("PAGE_SIZE", defaults.page_size),
            debounce_ms: env_or("DEBOUNCE_MS", defaults.debounce_ms),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Debounce window as a Duration.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Store timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            page_size: 20,
            debounce_ms: 300,
            store_timeout_ms: 5000,
            server_port: 3000,
        }
    }
}
