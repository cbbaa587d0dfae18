//! Stream connector for `tcp://` and `ipc://` endpoints.

use tokio::net::TcpStream;

use super::{BoxFuture, Connector, FramedSocket, Socket};
use crate::config::ClientConfig;
use crate::error::{StationError, Result};
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Dials stream endpoints and wraps them in a [`FramedSocket`].
///
/// Endpoint forms:
/// - `tcp://host:port`
/// - `ipc:///path/to/socket` (Unix only)
#[derive(Debug, Clone)]
pub struct StreamConnector {
    max_frame_size: u32,
}

impl StreamConnector {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Connector using the frame limit from `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new().with_max_frame_size(config.max_frame_size)
    }

    /// Limit the size of any single received frame.
    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    async fn dial(&self, endpoint: &str) -> Result<Box<dyn Socket>> {
        if let Some(addr) = endpoint.strip_prefix("tcp://") {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            tracing::debug!(endpoint, "tcp connected");
            return Ok(Box::new(FramedSocket::with_max_frame_size(
                stream,
                endpoint,
                self.max_frame_size,
            )));
        }

        if let Some(path) = endpoint.strip_prefix("ipc://") {
            return self.dial_ipc(endpoint, path).await;
        }

        Err(StationError::InvalidEndpoint(endpoint.to_string()))
    }

    #[cfg(unix)]
    async fn dial_ipc(&self, endpoint: &str, path: &str) -> Result<Box<dyn Socket>> {
        let stream = tokio::net::UnixStream::connect(path).await?;
        tracing::debug!(endpoint, "ipc connected");
        Ok(Box::new(FramedSocket::with_max_frame_size(
            stream,
            endpoint,
            self.max_frame_size,
        )))
    }

    #[cfg(not(unix))]
    async fn dial_ipc(&self, endpoint: &str, _path: &str) -> Result<Box<dyn Socket>> {
        Err(StationError::InvalidEndpoint(endpoint.to_string()))
    }
}

impl Default for StreamConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for StreamConnector {
    fn connect<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<Box<dyn Socket>>> {
        Box::pin(self.dial(endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_unknown_scheme_rejected() {
        let connector = StreamConnector::new();
        let err = connector.connect("udp://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, StationError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_tcp_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = FramedSocket::new(stream, "peer");
            let message = socket.recv_message().await.unwrap();
            socket.send_message(&message).await.unwrap();
        });

        let endpoint = format!("tcp://{}", addr);
        let connector = StreamConnector::new();
        let mut socket = connector.connect(&endpoint).await.unwrap();
        assert_eq!(socket.endpoint(), endpoint);

        let message = vec![Bytes::from_static(b"ping"), Bytes::new()];
        socket.send(message.clone()).await.unwrap();
        assert_eq!(socket.recv().await.unwrap(), message);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_is_io_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = StreamConnector::new();
        let result = connector.connect(&format!("tcp://{}", addr)).await;
        assert!(matches!(result, Err(StationError::Io(_))));
    }

    #[tokio::test]
    async fn test_configured_frame_limit_applies() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = FramedSocket::new(stream, "peer");
            socket
                .send_message(&[Bytes::from(vec![b'x'; 64])])
                .await
                .unwrap();
            socket
        });

        let config = ClientConfig::new().with_max_frame_size(16);
        let connector = StreamConnector::from_config(&config);
        let mut socket = connector.connect(&format!("tcp://{}", addr)).await.unwrap();
        let result = socket.recv().await;
        assert!(matches!(result, Err(StationError::FrameInvalid(_))));
        drop(server.await.unwrap());
    }
}
