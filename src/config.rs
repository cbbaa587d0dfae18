//! Client configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```
//! use stationwire::ClientConfig;
//!
//! let config = ClientConfig::from_json_str(r#"{"station_name":"orders-web","call_timeout_ms":2500}"#).unwrap();
//! assert_eq!(config.station_name, "orders-web");
//! assert_eq!(config.call_timeout().as_millis(), 2500);
//! assert_eq!(config.max_sockets_per_station, stationwire::config::DEFAULT_MAX_SOCKETS_PER_STATION);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StationError, Result};
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Default bound for each transport receive.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Default socket cap per station (leased + idle).
pub const DEFAULT_MAX_SOCKETS_PER_STATION: usize = 64;

/// Default requester name when none is configured.
pub const DEFAULT_STATION_NAME: &str = "stationwire";

/// Configuration shared by the pool, the engine and the plan client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name of this node, sent as the requester and used as the local origin point.
    pub station_name: String,
    /// Service key sent with every call.
    pub service_key: String,
    /// Route name sent with general calls.
    pub route_name: String,
    /// Bound for each transport receive, in milliseconds.
    pub call_timeout_ms: u64,
    /// Maximum sockets per station, leased and idle together.
    pub max_sockets_per_station: usize,
    /// Maximum size of a single received frame.
    pub max_frame_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            station_name: DEFAULT_STATION_NAME.to_string(),
            service_key: String::new(),
            route_name: String::new(),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            max_sockets_per_station: DEFAULT_MAX_SOCKETS_PER_STATION,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON string and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Set the local station name.
    pub fn with_station_name(mut self, name: impl Into<String>) -> Self {
        self.station_name = name.into();
        self
    }

    /// Set the service key.
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = key.into();
        self
    }

    /// Set the route name.
    pub fn with_route_name(mut self, route: impl Into<String>) -> Self {
        self.route_name = route.into();
        self
    }

    /// Set the receive timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the per-station socket cap.
    pub fn with_max_sockets_per_station(mut self, max: usize) -> Self {
        self.max_sockets_per_station = max;
        self
    }

    /// Set the maximum received frame size.
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Receive timeout as a `Duration`.
    #[inline]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Reject values that would make every call fail.
    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_ms == 0 {
            return Err(StationError::Config(
                "call_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_sockets_per_station == 0 {
            return Err(StationError::Config(
                "max_sockets_per_station must be greater than 0".to_string(),
            ));
        }
        if self.max_frame_size == 0 {
            return Err(StationError::Config(
                "max_frame_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
