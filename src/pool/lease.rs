//! Leased socket guard.
//!
//! A [`PooledSocket`] is exclusively owned by one call attempt. Dropping it
//! returns the socket to its station's idle set, or closes it when it was
//! flagged unhealthy or dropped in the middle of a send or receive.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{StationError, Result};
use crate::protocol::Message;
use crate::transport::Socket;

/// An idle socket waiting in a station's set.
pub(super) struct IdleSocket {
    pub(super) id: u64,
    pub(super) endpoint: String,
    pub(super) socket: Box<dyn Socket>,
}

#[derive(Default)]
pub(super) struct SocketSet {
    pub(super) idle: Vec<IdleSocket>,
    /// Idle plus leased plus connecting.
    pub(super) live: usize,
}

/// Sockets of one station, guarded by their own lock.
pub(super) struct StationSockets {
    station: String,
    pub(super) set: Mutex<SocketSet>,
}

impl StationSockets {
    pub(super) fn new(station: &str) -> Self {
        Self {
            station: station.to_string(),
            set: Mutex::new(SocketSet::default()),
        }
    }

    #[inline]
    pub(super) fn station(&self) -> &str {
        &self.station
    }

    fn give_back(&self, idle: IdleSocket) {
        self.set.lock().idle.push(idle);
    }

    pub(super) fn release_slot(&self) {
        let mut set = self.set.lock();
        set.live = set.live.saturating_sub(1);
    }
}

/// A live-count slot taken before connecting; released unless handed to a lease.
pub(super) struct SlotReservation {
    home: Arc<StationSockets>,
    armed: bool,
}

impl SlotReservation {
    pub(super) fn new(home: Arc<StationSockets>) -> Self {
        Self { home, armed: true }
    }

    pub(super) fn into_lease(mut self, id: u64, endpoint: String, socket: Box<dyn Socket>) -> PooledSocket {
        self.armed = false;
        PooledSocket::new(self.home.clone(), id, endpoint, socket)
    }
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        if self.armed {
            self.home.release_slot();
        }
    }
}

/// A socket leased from the [`ConnectionPool`](super::ConnectionPool).
pub struct PooledSocket {
    home: Arc<StationSockets>,
    id: u64,
    endpoint: String,
    socket: Option<Box<dyn Socket>>,
    unhealthy: bool,
    in_flight: bool,
}

impl PooledSocket {
    pub(super) fn new(home: Arc<StationSockets>, id: u64, endpoint: String, socket: Box<dyn Socket>) -> Self {
        Self {
            home,
            id,
            endpoint,
            socket: Some(socket),
            unhealthy: false,
            in_flight: false,
        }
    }

    /// Station this socket serves.
    #[inline]
    pub fn station(&self) -> &str {
        self.home.station()
    }

    /// Endpoint the socket is connected to.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Pool-unique socket id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the socket will be discarded on release.
    #[inline]
    pub fn is_unhealthy(&self) -> bool {
        self.unhealthy || self.in_flight
    }

    /// Flag the socket so release closes it instead of returning it.
    pub(crate) fn mark_unhealthy(&mut self) {
        self.unhealthy = true;
    }

    /// Send one message.
    ///
    /// If this future is dropped before completing, the socket is discarded
    /// on release.
    pub(crate) async fn send(&mut self, message: Message) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(StationError::ConnectionClosed)?;
        self.in_flight = true;
        socket.send(message).await?;
        self.in_flight = false;
        Ok(())
    }

    /// Receive one message. Same drop rule as [`send`](Self::send).
    pub(crate) async fn recv(&mut self) -> Result<Message> {
        let socket = self.socket.as_mut().ok_or(StationError::ConnectionClosed)?;
        self.in_flight = true;
        let message = socket.recv().await?;
        self.in_flight = false;
        Ok(message)
    }
}

impl Drop for PooledSocket {
    fn drop(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        if self.unhealthy || self.in_flight {
            tracing::debug!(
                station = self.home.station(),
                endpoint = %self.endpoint,
                id = self.id,
                in_flight = self.in_flight,
                "discarding socket"
            );
            drop(socket);
            self.home.release_slot();
        } else {
            tracing::trace!(station = self.home.station(), id = self.id, "socket returned");
            self.home.give_back(IdleSocket {
                id: self.id,
                endpoint: std::mem::take(&mut self.endpoint),
                socket,
            });
        }
    }
}

impl std::fmt::Debug for PooledSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSocket")
            .field("station", &self.home.station())
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .field("unhealthy", &self.unhealthy)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
