//! Static frame descriptors, one per command group.
//!
//! A descriptor is the ordered slot table for a call kind. Encoder and
//! decoder share the same table, so slot order cannot drift between them.
//!
//! # Example
//!
//! ```
//! use stationwire::protocol::{FrameDescriptor, FrameTag, CommandGroup};
//!
//! let d = FrameDescriptor::for_group(CommandGroup::PlanCommand);
//! assert_eq!(d.frame_count(), 4);
//! assert_eq!(d.slots()[0], FrameTag::Plan);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{CommandGroup, FrameTag, END_TAG};

/// Ordered slot table for one command group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    group: CommandGroup,
    slots: &'static [FrameTag],
}

/// General call: caller identity through service key.
pub const GENERAL_CALL: FrameDescriptor = FrameDescriptor::new(
    CommandGroup::General,
    &[
        FrameTag::PubTitle,
        FrameTag::Command,
        FrameTag::RequestId,
        FrameTag::Context,
        FrameTag::Argument,
        FrameTag::TextContent,
        FrameTag::Requester,
        FrameTag::Responser,
        FrameTag::CallId,
        FrameTag::ServiceKey,
    ],
);

/// Scheduled call against an api/vote station.
pub const PLAN_CALL: FrameDescriptor = FrameDescriptor::new(
    CommandGroup::PlanCall,
    &[
        FrameTag::Plan,
        FrameTag::Context,
        FrameTag::Command,
        FrameTag::Argument,
        FrameTag::ServiceKey,
    ],
);

/// Scheduled publish against a notify station.
pub const PLAN_PUBLISH: FrameDescriptor = FrameDescriptor::new(
    CommandGroup::PlanPublish,
    &[
        FrameTag::Plan,
        FrameTag::Context,
        FrameTag::PubTitle,
        FrameTag::TextContent,
        FrameTag::ServiceKey,
    ],
);

/// Scheduled plain station command (pause/close/resume).
pub const PLAN_COMMAND: FrameDescriptor = FrameDescriptor::new(
    CommandGroup::PlanCommand,
    &[
        FrameTag::Plan,
        FrameTag::Command,
        FrameTag::Argument,
        FrameTag::ServiceKey,
    ],
);

impl FrameDescriptor {
    /// Build a descriptor. Used only for the static tables above and tests.
    pub const fn new(group: CommandGroup, slots: &'static [FrameTag]) -> Self {
        Self { group, slots }
    }

    /// Descriptor governing a command group.
    pub fn for_group(group: CommandGroup) -> &'static FrameDescriptor {
        match group {
            CommandGroup::General => &GENERAL_CALL,
            CommandGroup::PlanCall => &PLAN_CALL,
            CommandGroup::PlanPublish => &PLAN_PUBLISH,
            CommandGroup::PlanCommand => &PLAN_COMMAND,
        }
    }

    /// Command group.
    #[inline]
    pub fn group(&self) -> CommandGroup {
        self.group
    }

    /// Slot tags in wire order.
    #[inline]
    pub fn slots(&self) -> &'static [FrameTag] {
        self.slots
    }

    /// Number of value frames following the preamble.
    #[inline]
    pub fn frame_count(&self) -> u8 {
        self.slots.len() as u8
    }

    /// Position of a tag in this descriptor.
    pub fn position(&self, tag: FrameTag) -> Option<usize> {
        self.slots.iter().position(|t| *t == tag)
    }

    /// Encode the preamble frame: `[count, group, tags..., End]`.
    pub fn preamble(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.slots.len() + 3);
        buf.put_u8(self.frame_count());
        buf.put_u8(self.group.as_byte());
        for tag in self.slots {
            buf.put_u8(tag.as_byte());
        }
        buf.put_u8(END_TAG);
        buf.freeze()
    }
}
