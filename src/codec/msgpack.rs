//! MsgPack codec using `rmp-serde`.
//!
//! Plan records are encoded with `to_vec_named`, so structs travel as maps
//! keyed by field name. Schedulers read fields by name, not position.
//!
//! # Example
//!
//! ```
//! use stationwire::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Slot {
//!     value: i32,
//!     repeat: i32,
//! }
//!
//! let slot = Slot { value: 3, repeat: 1 };
//! let encoded = MsgPackCodec::encode(&slot).unwrap();
//! let decoded: Slot = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, slot);
//! ```

use crate::error::Result;

/// MessagePack codec for plan records.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes in struct-as-map form.
    ///
    /// # Errors
    ///
    /// Fails with `MsgPackEncode` when the value cannot be represented.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Fails with `MsgPackDecode` when the bytes are not a `T`.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Schedule {
        plan_type: u8,
        value: i32,
        description: Option<String>,
    }

    #[test]
    fn test_schedule_survives_encoding() {
        let original = Schedule {
            plan_type: 4,
            value: 1,
            description: Some("nightly".to_string()),
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: Schedule = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_structs_encode_as_maps() {
        let encoded = MsgPackCodec::encode(&Schedule {
            plan_type: 0,
            value: 0,
            description: None,
        })
        .unwrap();

        // 0x83 = fixmap with 3 entries; array form would be 0x93.
        assert_eq!(encoded[0], 0x83, "Expected fixmap, got {:02X}", encoded[0]);
    }

    #[test]
    fn test_none_encodes_as_nil() {
        let val: Option<i32> = None;
        assert_eq!(MsgPackCodec::encode(&val).unwrap(), vec![0xc0]);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let result: Result<Schedule> = MsgPackCodec::decode(b"not valid msgpack");
        assert!(result.is_err());
    }
}
