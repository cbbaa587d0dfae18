//! Codec module - serialization for structured frame values.
//!
//! Argument and result frames are opaque to the call engine. These codecs
//! are used only where this crate produces or consumes a structured value
//! itself:
//!
//! - [`JsonCodec`] - argument/result text for `call_json` and `call_typed`
//! - [`MsgPackCodec`] - the plan record carried in the plan frame
//!
//! # Example
//!
//! ```
//! use stationwire::codec::{JsonCodec, MsgPackCodec};
//!
//! let text = JsonCodec::encode(&serde_json::json!({"sku": "A1"})).unwrap();
//! assert_eq!(text, r#"{"sku":"A1"}"#);
//!
//! let packed = MsgPackCodec::encode(&"hello").unwrap();
//! let back: String = MsgPackCodec::decode(&packed).unwrap();
//! assert_eq!(back, "hello");
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
