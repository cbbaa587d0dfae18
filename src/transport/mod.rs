//! Transport module - message-oriented sockets.
//!
//! The call engine only sees [`Socket`] (send one multi-frame message,
//! receive one multi-frame message) and [`Connector`] (dial an endpoint).
//!
//! Provided implementations:
//! - [`FramedSocket`] - multipart messages over any `AsyncRead + AsyncWrite`
//! - [`StreamConnector`] - dials `tcp://host:port` and, on Unix, `ipc://path`

mod connector;
mod framed;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::protocol::Message;

pub use connector::StreamConnector;
pub use framed::FramedSocket;

/// Boxed future used by the transport traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A connected request/reply socket.
pub trait Socket: Send + 'static {
    /// Send one message.
    fn send(&mut self, message: Message) -> BoxFuture<'_, Result<()>>;

    /// Receive one message.
    fn recv(&mut self) -> BoxFuture<'_, Result<Message>>;

    /// Endpoint this socket is connected to.
    fn endpoint(&self) -> &str;
}

/// Opens sockets to endpoints.
pub trait Connector: Send + Sync + 'static {
    /// Connect to `endpoint`.
    fn connect<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<Box<dyn Socket>>>;
}
