//! Multi-frame message encoding and decoding.
//!
//! Uses `bytes::Bytes` so value frames are shared, not copied.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use stationwire::protocol::{decode_request, encode, FrameTag, PLAN_COMMAND};
//!
//! let frames = encode(
//!     &PLAN_COMMAND,
//!     &[None, Some(Bytes::from_static(b"pause")), None, Some(Bytes::from_static(b"key"))],
//! )
//! .unwrap();
//! assert_eq!(frames.len(), 5);
//!
//! let decoded = decode_request(&frames).unwrap();
//! assert_eq!(decoded.text(FrameTag::Command).as_deref(), Some("pause"));
//! assert_eq!(decoded.get(FrameTag::Plan).map(|b| b.len()), Some(0));
//! ```

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::descriptor::FrameDescriptor;
use super::wire_format::{CommandGroup, FrameTag, END_TAG, MAX_SLOTS};
use crate::error::{StationError, Result};

/// An ordered multi-frame message as it travels on a socket.
pub type Message = Vec<Bytes>;

/// Encode values against a descriptor.
///
/// `values` must hold exactly one entry per descriptor slot; `None` becomes
/// an empty frame so later slots keep their position.
pub fn encode(descriptor: &FrameDescriptor, values: &[Option<Bytes>]) -> Result<Message> {
    if values.len() != descriptor.slots().len() {
        return Err(StationError::FrameInvalid(format!(
            "descriptor {:?} declares {} slots, got {} values",
            descriptor.group(),
            descriptor.slots().len(),
            values.len()
        )));
    }

    let mut message = Vec::with_capacity(values.len() + 1);
    message.push(descriptor.preamble());
    message.extend(values.iter().map(|v| v.clone().unwrap_or_default()));
    Ok(message)
}

/// Encode a self-describing message whose preamble carries `marker` as the
/// second byte (the state code for replies) and the given raw tags.
///
/// Remote peers use this shape for replies.
pub fn encode_tagged(marker: u8, values: &[(u8, Bytes)]) -> Result<Message> {
    if values.len() > MAX_SLOTS {
        return Err(StationError::FrameInvalid(format!(
            "{} slots exceeds maximum {}",
            values.len(),
            MAX_SLOTS
        )));
    }

    let mut preamble = BytesMut::with_capacity(values.len() + 3);
    preamble.put_u8(values.len() as u8);
    preamble.put_u8(marker);
    for (tag, _) in values {
        preamble.put_u8(*tag);
    }
    preamble.put_u8(END_TAG);

    let mut message = Vec::with_capacity(values.len() + 1);
    message.push(preamble.freeze());
    message.extend(values.iter().map(|(_, v)| v.clone()));
    Ok(message)
}

/// A decoded message: tag → value, plus unknown extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    marker: u8,
    values: Vec<(FrameTag, Bytes)>,
    originals: BTreeMap<u8, Bytes>,
}

impl DecodedMessage {
    /// Second preamble byte: the command group of a request, the state of a reply.
    #[inline]
    pub fn marker(&self) -> u8 {
        self.marker
    }

    /// Command group, when the marker names one.
    pub fn group(&self) -> Option<CommandGroup> {
        CommandGroup::from_byte(self.marker)
    }

    /// Value of a known tag. Empty frames decode to `Some(empty)`.
    pub fn get(&self, tag: FrameTag) -> Option<&Bytes> {
        self.values
            .iter()
            .rev()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v)
    }

    /// Value of a text tag, decoded as UTF-8. Empty frames read as `None`.
    pub fn text(&self, tag: FrameTag) -> Option<String> {
        self.get(tag)
            .filter(|b| !b.is_empty())
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Display form of the binary title/caller frame, trailing NUL fill trimmed.
    pub fn display_title(&self) -> String {
        match self.get(FrameTag::PubTitle) {
            Some(raw) => {
                let end = raw
                    .iter()
                    .rposition(|b| *b != 0)
                    .map(|i| i + 1)
                    .unwrap_or(0);
                String::from_utf8_lossy(&raw[..end]).into_owned()
            }
            None => String::new(),
        }
    }

    /// Known tags in wire order.
    pub fn values(&self) -> &[(FrameTag, Bytes)] {
        &self.values
    }

    /// Frames this decoder did not recognise, keyed by raw tag byte.
    pub fn originals(&self) -> &BTreeMap<u8, Bytes> {
        &self.originals
    }

    /// Values in a descriptor's slot order (missing slots read as empty).
    pub fn values_for(&self, descriptor: &FrameDescriptor) -> Vec<Bytes> {
        descriptor
            .slots()
            .iter()
            .map(|tag| self.get(*tag).cloned().unwrap_or_default())
            .collect()
    }
}

/// Split the preamble into `(marker, raw tags)` and check it against the frame count.
fn read_preamble(message: &[Bytes]) -> Result<(u8, &[u8])> {
    let preamble = message
        .first()
        .ok_or_else(|| StationError::FrameInvalid("empty message".to_string()))?;

    if preamble.len() < 3 {
        return Err(StationError::FrameInvalid(format!(
            "preamble too short: {} bytes",
            preamble.len()
        )));
    }

    let count = preamble[0] as usize;
    if count > MAX_SLOTS {
        return Err(StationError::FrameInvalid(format!(
            "frame count {} exceeds maximum {}",
            count, MAX_SLOTS
        )));
    }

    let end = 2 + count;
    if preamble.len() <= end || preamble[end] != END_TAG {
        return Err(StationError::FrameInvalid(format!(
            "preamble declares {} tags but has no end marker at position {}",
            count, end
        )));
    }

    if message.len() - 1 != count {
        return Err(StationError::FrameInvalid(format!(
            "preamble declares {} frames, message carries {}",
            count,
            message.len() - 1
        )));
    }

    Ok((preamble[1], &preamble[2..end]))
}

/// Decode a message, optionally validating it against a governing descriptor.
///
/// With a descriptor, the wire tags must start with the descriptor's slots in
/// order; tags past them land in [`DecodedMessage::originals`]. Without one,
/// every recognised tag is kept and unrecognised tags go to `originals`.
pub fn decode(message: &[Bytes], governing: Option<&FrameDescriptor>) -> Result<DecodedMessage> {
    let (marker, tags) = read_preamble(message)?;
    let frames = &message[1..];

    let known = match governing {
        Some(descriptor) => {
            if marker != descriptor.group().as_byte() {
                return Err(StationError::FrameInvalid(format!(
                    "command group {:#04x} does not match descriptor {:?}",
                    marker,
                    descriptor.group()
                )));
            }
            let slots = descriptor.slots();
            if tags.len() < slots.len()
                || tags
                    .iter()
                    .zip(slots)
                    .any(|(raw, slot)| *raw != slot.as_byte())
            {
                return Err(StationError::FrameInvalid(format!(
                    "slot order does not match descriptor {:?}",
                    descriptor.group()
                )));
            }
            slots.len()
        }
        None => tags.len(),
    };

    let mut decoded = DecodedMessage {
        marker,
        values: Vec::with_capacity(known),
        originals: BTreeMap::new(),
    };

    for (i, (raw, frame)) in tags.iter().zip(frames).enumerate() {
        match FrameTag::from_byte(*raw) {
            Some(tag) if i < known && tag != FrameTag::End => {
                decoded.values.push((tag, frame.clone()));
            }
            _ => {
                decoded.originals.insert(*raw, frame.clone());
            }
        }
    }

    Ok(decoded)
}

/// Decode a request, selecting the descriptor from its command group byte.
pub fn decode_request(message: &[Bytes]) -> Result<DecodedMessage> {
    let (marker, _) = read_preamble(message)?;
    let group = CommandGroup::from_byte(marker).ok_or_else(|| {
        StationError::FrameInvalid(format!("unknown command group {:#04x}", marker))
    })?;
    decode(message, Some(FrameDescriptor::for_group(group)))
}

/// Decode a self-describing reply.
#[inline]
pub fn decode_reply(message: &[Bytes]) -> Result<DecodedMessage> {
    decode(message, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::descriptor::{GENERAL_CALL, PLAN_CALL, PLAN_COMMAND, PLAN_PUBLISH};

    fn b(s: &'static str) -> Option<Bytes> {
        Some(Bytes::from_static(s.as_bytes()))
    }

    #[test]
    fn test_encode_places_preamble_first() {
        let frames = encode(&PLAN_COMMAND, &[b("p"), b("pause"), None, b("k")]).unwrap();
        assert_eq!(frames[0], PLAN_COMMAND.preamble());
        assert_eq!(frames.len(), 5);
        assert!(frames[3].is_empty());
    }

    #[test]
    fn test_encode_rejects_wrong_value_count() {
        let err = encode(&PLAN_COMMAND, &[b("p")]).unwrap_err();
        assert!(err.to_string().contains("declares 4 slots"));
    }

    #[test]
    fn test_roundtrip_every_descriptor_with_absent_slots() {
        for d in [&GENERAL_CALL, &PLAN_CALL, &PLAN_PUBLISH, &PLAN_COMMAND] {
            // Alternate present and absent values so positions are exercised.
            let values: Vec<Option<Bytes>> = (0..d.slots().len())
                .map(|i| {
                    if i % 2 == 0 {
                        Some(Bytes::from(format!("v{}", i)))
                    } else {
                        None
                    }
                })
                .collect();
            let frames = encode(d, &values).unwrap();
            let decoded = decode_request(&frames).unwrap();

            let expected: Vec<Bytes> = values.into_iter().map(|v| v.unwrap_or_default()).collect();
            assert_eq!(decoded.values_for(d), expected);
            assert_eq!(decoded.group(), Some(d.group()));
            assert!(decoded.originals().is_empty());
        }
    }

    #[test]
    fn test_count_mismatch_is_invalid() {
        let mut frames = encode(&PLAN_COMMAND, &[b("p"), b("c"), b("a"), b("k")]).unwrap();
        frames.pop();
        let err = decode_request(&frames).unwrap_err();
        assert!(matches!(err, StationError::FrameInvalid(_)));

        let mut frames = encode(&PLAN_COMMAND, &[b("p"), b("c"), b("a"), b("k")]).unwrap();
        frames.push(Bytes::from_static(b"extra"));
        assert!(matches!(
            decode_request(&frames),
            Err(StationError::FrameInvalid(_))
        ));
    }

    #[test]
    fn test_missing_end_marker_is_invalid() {
        let frames = vec![
            Bytes::from_static(&[1, 0x01, b'$', b'X']),
            Bytes::from_static(b"cmd"),
        ];
        assert!(matches!(
            decode_reply(&frames),
            Err(StationError::FrameInvalid(_))
        ));
    }

    #[test]
    fn test_empty_and_short_messages_are_invalid() {
        assert!(decode_reply(&[]).is_err());
        assert!(decode_reply(&[Bytes::from_static(&[0, 1])]).is_err());
    }

    #[test]
    fn test_unknown_group_is_invalid() {
        let frames = encode_tagged(0x7A, &[]).unwrap();
        assert!(decode_request(&frames).is_err());
    }

    #[test]
    fn test_trailing_tags_kept_as_originals() {
        let mut values: Vec<(u8, Bytes)> = PLAN_COMMAND
            .slots()
            .iter()
            .map(|t| (t.as_byte(), Bytes::from_static(b"x")))
            .collect();
        values.push((b'z', Bytes::from_static(b"future")));
        values.push((FrameTag::JsonValue.as_byte(), Bytes::from_static(b"{}")));
        let frames = encode_tagged(CommandGroup::PlanCommand.as_byte(), &values).unwrap();

        let decoded = decode_request(&frames).unwrap();
        assert_eq!(decoded.values().len(), 4);
        assert_eq!(decoded.originals().get(&b'z').map(|b| &b[..]), Some(&b"future"[..]));
        assert_eq!(
            decoded.originals().get(&FrameTag::JsonValue.as_byte()).map(|b| &b[..]),
            Some(&b"{}"[..])
        );
    }

    #[test]
    fn test_slot_order_mismatch_is_invalid() {
        let values = vec![
            (FrameTag::Command.as_byte(), Bytes::new()),
            (FrameTag::Plan.as_byte(), Bytes::new()),
            (FrameTag::Argument.as_byte(), Bytes::new()),
            (FrameTag::ServiceKey.as_byte(), Bytes::new()),
        ];
        let frames = encode_tagged(CommandGroup::PlanCommand.as_byte(), &values).unwrap();
        assert!(decode_request(&frames).is_err());
    }

    #[test]
    fn test_reply_decode_unknown_tag_goes_to_originals() {
        let frames = encode_tagged(
            0x01,
            &[
                (FrameTag::JsonValue.as_byte(), Bytes::from_static(b"{\"id\":42}")),
                (b'~', Bytes::from_static(b"new")),
            ],
        )
        .unwrap();
        let decoded = decode_reply(&frames).unwrap();
        assert_eq!(decoded.marker(), 0x01);
        assert_eq!(decoded.text(FrameTag::JsonValue).as_deref(), Some("{\"id\":42}"));
        assert!(decoded.originals().contains_key(&b'~'));
    }

    #[test]
    fn test_display_title_trims_fill_bytes() {
        let frames = encode_tagged(
            0x01,
            &[(FrameTag::PubTitle.as_byte(), Bytes::from_static(b"caller\0\0\0"))],
        )
        .unwrap();
        let decoded = decode_reply(&frames).unwrap();
        assert_eq!(decoded.display_title(), "caller");
        assert_eq!(decoded.get(FrameTag::PubTitle).map(|b| b.len()), Some(9));
    }

    #[test]
    fn test_empty_text_frame_reads_as_none() {
        let frames = encode(&PLAN_COMMAND, &[None, None, None, None]).unwrap();
        let decoded = decode_request(&frames).unwrap();
        assert_eq!(decoded.text(FrameTag::Command), None);
        assert!(decoded.get(FrameTag::Command).is_some());
    }
}
