//! Station name resolution.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Resolves a station name to the endpoints currently serving it.
///
/// Discovery and membership changes live outside this crate; the pool only
/// asks for the current set on every lease.
pub trait StationDirectory: Send + Sync + 'static {
    /// Endpoints for `station`, or `None` when the station is unknown.
    fn resolve(&self, station: &str) -> Option<Vec<String>>;
}

/// In-memory directory.
///
/// ```
/// use stationwire::pool::{StaticDirectory, StationDirectory};
///
/// let directory = StaticDirectory::new();
/// directory.insert("orders", vec!["tcp://10.0.0.5:7001".to_string()]);
/// assert_eq!(directory.resolve("orders").unwrap().len(), 1);
/// assert!(directory.resolve("billing").is_none());
/// ```
#[derive(Debug, Default)]
pub struct StaticDirectory {
    stations: RwLock<HashMap<String, Vec<String>>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the endpoints of a station.
    pub fn insert(&self, station: impl Into<String>, endpoints: Vec<String>) {
        self.stations.write().insert(station.into(), endpoints);
    }

    /// Forget a station. Returns its endpoints if it was known.
    pub fn remove(&self, station: &str) -> Option<Vec<String>> {
        self.stations.write().remove(station)
    }
}

impl StationDirectory for StaticDirectory {
    fn resolve(&self, station: &str) -> Option<Vec<String>> {
        self.stations
            .read()
            .get(station)
            .filter(|endpoints| !endpoints.is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_list_resolves_to_none() {
        let directory = StaticDirectory::new();
        directory.insert("orders", Vec::new());
        assert!(directory.resolve("orders").is_none());
    }

    #[test]
    fn test_insert_replaces_and_remove_forgets() {
        let directory = StaticDirectory::new();
        directory.insert("orders", vec!["tcp://a:1".to_string()]);
        directory.insert("orders", vec!["tcp://b:1".to_string(), "tcp://c:1".to_string()]);
        assert_eq!(directory.resolve("orders").unwrap()[0], "tcp://b:1");

        assert_eq!(directory.remove("orders").map(|e| e.len()), Some(2));
        assert!(directory.resolve("orders").is_none());
        assert!(directory.remove("orders").is_none());
    }
}
