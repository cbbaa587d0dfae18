//! Protocol module - frame tags, descriptors and multi-frame codec.
//!
//! This module implements the message layout shared by every call kind:
//! - Frame tags and command group bytes
//! - Static descriptors per command group
//! - Encoding/decoding of descriptor-governed messages
//! - Stream framing for multipart messages

mod descriptor;
mod frame;
mod frame_buffer;
mod wire_format;

pub use descriptor::{FrameDescriptor, GENERAL_CALL, PLAN_CALL, PLAN_COMMAND, PLAN_PUBLISH};
pub use frame::{
    decode, decode_reply, decode_request, encode, encode_tagged, DecodedMessage, Message,
};
pub use frame_buffer::{
    encode_multipart, MultipartBuffer, DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, MORE,
};
pub use wire_format::{CommandGroup, FrameTag, END_TAG, MAX_SLOTS};
