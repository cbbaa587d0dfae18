//! Wire format constants: frame tags and command groups.
//!
//! A message is a sequence of byte frames. The first frame is the descriptor
//! preamble:
//! ```text
//! ┌────────────┬──────────────┬─────────┬─────┬─────────┬─────┐
//! │ frameCount │ commandGroup │ tag_1   │ ... │ tag_n   │ End │
//! │ 1 byte     │ 1 byte       │ 1 byte  │     │ 1 byte  │ 'E' │
//! └────────────┴──────────────┴─────────┴─────┴─────────┴─────┘
//! ```
//! followed by exactly `frameCount` value frames, one per tag, in tag order.
//! Absent values travel as empty frames so positions never shift.
//!
//! In replies the second byte carries the state code instead of a command
//! group (see [`Outcome::from_wire`](crate::Outcome::from_wire)).

/// Maximum number of value frames a descriptor may declare.
pub const MAX_SLOTS: usize = 250;

/// Byte that terminates the tag list inside the preamble.
pub const END_TAG: u8 = b'E';

/// Semantic slot names carried in the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FrameTag {
    /// Preamble terminator.
    End = END_TAG,
    /// Global id assigned to this hop by the callee.
    GlobalId = b'G',
    /// Caller's global id (chain of causation).
    CallId = b'C',
    /// Station name.
    Station = b'S',
    /// Serialized plan record (scheduling).
    Plan = b'P',
    /// Argument payload.
    Argument = b'%',
    /// Extended argument / text content payload.
    TextContent = b'T',
    /// Propagated caller context.
    Context = b'#',
    /// Command (api) name.
    Command = b'$',
    /// Per-attempt correlation id.
    RequestId = b'R',
    /// Publish title or raw caller identity (binary).
    PubTitle = b'*',
    /// Requesting station.
    Requester = b'>',
    /// Responding node (origin point) or route name on requests.
    Responser = b'<',
    /// Service key.
    ServiceKey = b'&',
    /// Result payload as JSON text.
    JsonValue = b'J',
    /// Status text.
    Status = b'!',
    /// Raw binary value.
    BinaryValue = b'B',
}

impl FrameTag {
    /// Every known tag, in byte order of declaration.
    pub const ALL: [FrameTag; 17] = [
        FrameTag::End,
        FrameTag::GlobalId,
        FrameTag::CallId,
        FrameTag::Station,
        FrameTag::Plan,
        FrameTag::Argument,
        FrameTag::TextContent,
        FrameTag::Context,
        FrameTag::Command,
        FrameTag::RequestId,
        FrameTag::PubTitle,
        FrameTag::Requester,
        FrameTag::Responser,
        FrameTag::ServiceKey,
        FrameTag::JsonValue,
        FrameTag::Status,
        FrameTag::BinaryValue,
    ];

    /// Raw tag byte.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parse a raw tag byte. Returns `None` for tags this build does not know.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_byte() == byte)
    }
}

/// Command group byte: selects which descriptor governs the value frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandGroup {
    /// General api call.
    General = 0x01,
    /// Scheduled api call.
    PlanCall = 0x02,
    /// Scheduled publish.
    PlanPublish = 0x03,
    /// Scheduled plain station command.
    PlanCommand = 0x04,
}

impl CommandGroup {
    /// Raw group byte.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parse a raw group byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandGroup::General),
            0x02 => Some(CommandGroup::PlanCall),
            0x03 => Some(CommandGroup::PlanPublish),
            0x04 => Some(CommandGroup::PlanCommand),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_bytes_are_distinct() {
        for (i, a) in FrameTag::ALL.iter().enumerate() {
            for b in &FrameTag::ALL[i + 1..] {
                assert_ne!(a.as_byte(), b.as_byte(), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_tag_from_byte() {
        assert_eq!(FrameTag::from_byte(b'$'), Some(FrameTag::Command));
        assert_eq!(FrameTag::from_byte(END_TAG), Some(FrameTag::End));
        assert_eq!(FrameTag::from_byte(0x7F), None);
    }

    #[test]
    fn test_command_group_roundtrip_bytes() {
        for group in [
            CommandGroup::General,
            CommandGroup::PlanCall,
            CommandGroup::PlanPublish,
            CommandGroup::PlanCommand,
        ] {
            assert_eq!(CommandGroup::from_byte(group.as_byte()), Some(group));
        }
        assert_eq!(CommandGroup::from_byte(0), None);
    }
}
