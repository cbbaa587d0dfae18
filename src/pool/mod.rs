//! Connection pool - per-station socket sets with lease/release.
//!
//! Each station owns an independent set of sockets behind its own lock, so
//! leases for unrelated stations never contend. The station map itself sits
//! behind a read/write lock and is only written when a station is seen for
//! the first time.
//!
//! # Example
//!
//! ```ignore
//! let pool = ConnectionPool::new(directory, Arc::new(StreamConnector::new()), 16);
//! if let Some(socket) = pool.lease("orders", &request_id).await {
//!     // exclusive use for one attempt; dropped => returned or discarded
//! }
//! ```

mod directory;
mod lease;

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::ClientConfig;
use crate::transport::Connector;
use lease::{SlotReservation, StationSockets};

pub use directory::{StaticDirectory, StationDirectory};
pub use lease::PooledSocket;

/// Leases sockets per station, growing on demand up to a cap.
pub struct ConnectionPool {
    directory: Arc<dyn StationDirectory>,
    connector: Arc<dyn Connector>,
    max_sockets_per_station: usize,
    stations: RwLock<HashMap<String, Arc<StationSockets>>>,
    next_id: AtomicU64,
}

impl ConnectionPool {
    /// Create a pool.
    pub fn new(
        directory: Arc<dyn StationDirectory>,
        connector: Arc<dyn Connector>,
        max_sockets_per_station: usize,
    ) -> Self {
        Self {
            directory,
            connector,
            max_sockets_per_station,
            stations: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a pool using the socket cap from `config`.
    pub fn from_config(
        directory: Arc<dyn StationDirectory>,
        connector: Arc<dyn Connector>,
        config: &ClientConfig,
    ) -> Self {
        Self::new(directory, connector, config.max_sockets_per_station)
    }

    /// Lease a socket for `station`.
    ///
    /// `affinity` selects which of the station's endpoints new sockets go
    /// to, so the same key lands on the same endpoint while the directory is
    /// unchanged.
    ///
    /// Returns `None` when no endpoint is known, the station is at its
    /// socket cap, or connecting fails. No I/O is attempted in the first
    /// two cases.
    pub async fn lease(&self, station: &str, affinity: &str) -> Option<PooledSocket> {
        let endpoints = match self.directory.resolve(station) {
            Some(endpoints) if !endpoints.is_empty() => endpoints,
            _ => {
                tracing::debug!(station, "no endpoint known");
                return None;
            }
        };
        let preferred = endpoints[affinity_index(affinity, endpoints.len())].clone();
        let sockets = self.station_sockets(station);

        let reservation = {
            let mut set = sockets.set.lock();

            // Sockets to endpoints that left the directory are closed.
            let before = set.idle.len();
            set.idle.retain(|idle| endpoints.contains(&idle.endpoint));
            let stale = before - set.idle.len();
            set.live -= stale;

            if let Some(i) = set.idle.iter().rposition(|idle| idle.endpoint == preferred) {
                let idle = set.idle.swap_remove(i);
                tracing::trace!(station, id = idle.id, "reusing socket");
                return Some(PooledSocket::new(
                    sockets.clone(),
                    idle.id,
                    idle.endpoint,
                    idle.socket,
                ));
            }

            if set.live < self.max_sockets_per_station {
                set.live += 1;
                SlotReservation::new(sockets.clone())
            } else if let Some(idle) = set.idle.pop() {
                tracing::trace!(station, id = idle.id, "reusing socket on another endpoint");
                return Some(PooledSocket::new(
                    sockets.clone(),
                    idle.id,
                    idle.endpoint,
                    idle.socket,
                ));
            } else {
                tracing::warn!(
                    station,
                    cap = self.max_sockets_per_station,
                    "socket cap reached"
                );
                return None;
            }
        };

        match self.connector.connect(&preferred).await {
            Ok(socket) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(station, endpoint = %preferred, id, "socket opened");
                Some(reservation.into_lease(id, preferred, socket))
            }
            Err(e) => {
                tracing::warn!(station, endpoint = %preferred, "connect failed: {}", e);
                None
            }
        }
    }

    /// Idle sockets currently held for `station`.
    pub fn idle_count(&self, station: &str) -> usize {
        self.stations
            .read()
            .get(station)
            .map(|s| s.set.lock().idle.len())
            .unwrap_or(0)
    }

    /// Open sockets for `station`, idle and leased.
    pub fn live_count(&self, station: &str) -> usize {
        self.stations
            .read()
            .get(station)
            .map(|s| s.set.lock().live)
            .unwrap_or(0)
    }

    /// Per-station socket cap.
    #[inline]
    pub fn max_sockets_per_station(&self) -> usize {
        self.max_sockets_per_station
    }

    fn station_sockets(&self, station: &str) -> Arc<StationSockets> {
        if let Some(sockets) = self.stations.read().get(station) {
            return sockets.clone();
        }
        self.stations
            .write()
            .entry(station.to_string())
            .or_insert_with(|| Arc::new(StationSockets::new(station)))
            .clone()
    }
}

fn affinity_index(affinity: &str, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    affinity.hash(&mut hasher);
    (hasher.finish() % len as u64) as usize
}
