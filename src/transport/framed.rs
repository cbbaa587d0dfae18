//! Multipart framing over a byte stream.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{BoxFuture, Socket};
use crate::error::{StationError, Result};
use crate::protocol::{encode_multipart, Message, MultipartBuffer, DEFAULT_MAX_FRAME_SIZE};

const READ_CHUNK: usize = 64 * 1024;

/// A [`Socket`] carrying multipart messages over a stream.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use stationwire::transport::{FramedSocket, Socket};
///
/// # tokio_test_block(async {
/// let (a, b) = tokio::io::duplex(1024);
/// let mut left = FramedSocket::new(a, "duplex://left");
/// let mut right = FramedSocket::new(b, "duplex://right");
///
/// left.send(vec![Bytes::from_static(b"head"), Bytes::new()]).await.unwrap();
/// let message = right.recv().await.unwrap();
/// assert_eq!(message.len(), 2);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub struct FramedSocket<S> {
    stream: S,
    endpoint: String,
    buffer: MultipartBuffer,
    ready: VecDeque<Message>,
    read_buf: Vec<u8>,
}

impl<S> FramedSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a connected stream.
    pub fn new(stream: S, endpoint: impl Into<String>) -> Self {
        Self::with_max_frame_size(stream, endpoint, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Wrap a connected stream with a custom frame size limit.
    pub fn with_max_frame_size(stream: S, endpoint: impl Into<String>, max_frame_size: u32) -> Self {
        Self {
            stream,
            endpoint: endpoint.into(),
            buffer: MultipartBuffer::with_max_frame_size(max_frame_size),
            ready: VecDeque::new(),
            read_buf: vec![0u8; READ_CHUNK],
        }
    }

    /// Write one message and flush.
    pub async fn send_message(&mut self, message: &[bytes::Bytes]) -> Result<()> {
        let wire = encode_multipart(message);
        self.stream.write_all(&wire).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read until one complete message is available.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` on EOF, `FrameInvalid` on malformed framing.
    pub async fn recv_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.ready.pop_front() {
                return Ok(message);
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(StationError::ConnectionClosed);
            }
            let messages = self.buffer.push(&self.read_buf[..n])?;
            self.ready.extend(messages);
        }
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream, dropping buffered input.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Socket for FramedSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn send(&mut self, message: Message) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.send_message(&message).await })
    }

    fn recv(&mut self) -> BoxFuture<'_, Result<Message>> {
        Box::pin(self.recv_message())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
