//! Multipart buffer for accumulating partial stream reads.
//!
//! Stream transports carry each frame as:
//! ```text
//! ┌────────┬──────────┬─────────────┐
//! │ More   │ Length   │ Frame bytes │
//! │ 1 byte │ uint32 BE│ Length bytes│
//! └────────┴──────────┴─────────────┘
//! ```
//! A frame with `More = 0` closes the current message.
//!
//! Implements a state machine for fragmented input:
//! - `WaitingForHeader`: need at least 5 bytes
//! - `WaitingForBody`: header parsed, need N more bytes

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::Message;
use crate::error::{StationError, Result};

/// Per-frame stream header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Default maximum single-frame size (16 MB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Flag byte: more frames follow in this message.
pub const MORE: u8 = 0x01;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete frame header.
    WaitingForHeader,
    /// Header parsed, waiting for frame bytes.
    WaitingForBody { more: bool, remaining: u32 },
}

/// Buffer for accumulating incoming bytes and extracting complete messages.
pub struct MultipartBuffer {
    buffer: BytesMut,
    state: State,
    current: Message,
    max_frame_size: u32,
}

impl MultipartBuffer {
    /// Create a buffer with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a buffer with a custom frame size limit.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            state: State::WaitingForHeader,
            current: Vec::new(),
            max_frame_size,
        }
    }

    /// Push data into the buffer and extract all complete messages.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns `FrameInvalid` if a frame exceeds the size limit or the
    /// flag byte is not 0 or 1.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }
        Ok(messages)
    }

    fn try_extract_one(&mut self) -> Result<Option<Message>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    if self.buffer.len() < FRAME_HEADER_SIZE {
                        return Ok(None);
                    }

                    let flag = self.buffer[0];
                    if flag & !MORE != 0 {
                        return Err(StationError::FrameInvalid(format!(
                            "invalid frame flag {:#04x}",
                            flag
                        )));
                    }
                    let length = u32::from_be_bytes([
                        self.buffer[1],
                        self.buffer[2],
                        self.buffer[3],
                        self.buffer[4],
                    ]);
                    if length > self.max_frame_size {
                        return Err(StationError::FrameInvalid(format!(
                            "frame size {} exceeds maximum {}",
                            length, self.max_frame_size
                        )));
                    }

                    let _ = self.buffer.split_to(FRAME_HEADER_SIZE);
                    self.state = State::WaitingForBody {
                        more: flag & MORE != 0,
                        remaining: length,
                    };
                }

                State::WaitingForBody { more, remaining } => {
                    let remaining = remaining as usize;
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }

                    let frame = self.buffer.split_to(remaining).freeze();
                    self.current.push(frame);
                    self.state = State::WaitingForHeader;

                    if !more {
                        return Ok(Some(std::mem::take(&mut self.current)));
                    }
                }
            }
        }
    }

    /// Number of buffered, not yet parsed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered, including partial messages.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.current.is_empty()
    }

    /// Drop buffered data and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.current.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for MultipartBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a message into the stream layout.
pub fn encode_multipart(message: &[Bytes]) -> Bytes {
    let total: usize = message.iter().map(|f| FRAME_HEADER_SIZE + f.len()).sum();
    let mut buf = BytesMut::with_capacity(total);
    for (i, frame) in message.iter().enumerate() {
        let more = if i + 1 < message.len() { MORE } else { 0 };
        buf.put_u8(more);
        buf.put_u32(frame.len() as u32);
        buf.extend_from_slice(frame);
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(parts: &[&'static [u8]]) -> Message {
        parts.iter().map(|p| Bytes::from_static(p)).collect()
    }

    #[test]
    fn test_single_message() {
        let mut buffer = MultipartBuffer::new();
        let wire = encode_multipart(&msg(&[b"head", b"", b"tail"]));

        let messages = buffer.push(&wire).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], msg(&[b"head", b"", b"tail"]));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_two_messages_in_one_push() {
        let mut buffer = MultipartBuffer::new();
        let mut wire = encode_multipart(&msg(&[b"a", b"b"])).to_vec();
        wire.extend_from_slice(&encode_multipart(&msg(&[b"c"])));

        let messages = buffer.push(&wire).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], msg(&[b"c"]));
    }

    #[test]
    fn test_fragmented_byte_by_byte() {
        let mut buffer = MultipartBuffer::new();
        let wire = encode_multipart(&msg(&[b"first", b"second"]));

        let mut out = Vec::new();
        for byte in wire.iter() {
            out.extend(buffer.push(&[*byte]).unwrap());
        }
        assert_eq!(out, vec![msg(&[b"first", b"second"])]);
    }

    #[test]
    fn test_partial_message_is_held() {
        let mut buffer = MultipartBuffer::new();
        let wire = encode_multipart(&msg(&[b"one", b"two"]));
        let split = FRAME_HEADER_SIZE + 3;

        assert!(buffer.push(&wire[..split]).unwrap().is_empty());
        assert!(!buffer.is_empty());
        assert_eq!(buffer.push(&wire[split..]).unwrap().len(), 1);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buffer = MultipartBuffer::with_max_frame_size(4);
        let wire = encode_multipart(&msg(&[b"too long"]));
        let err = buffer.push(&wire).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_bad_flag_rejected() {
        let mut buffer = MultipartBuffer::new();
        assert!(buffer.push(&[0x80, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_clear_resets() {
        let mut buffer = MultipartBuffer::new();
        buffer.push(&[MORE, 0, 0, 0, 1, b'x']).unwrap();
        assert!(!buffer.is_empty());
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }
}
