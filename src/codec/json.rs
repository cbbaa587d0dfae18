//! JSON codec for argument and result frames.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// JSON text codec.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to compact JSON text.
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    /// Decode JSON text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid JSON for `T`.
    #[inline]
    pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Order {
        sku: String,
        qty: u32,
    }

    #[test]
    fn test_encode_is_compact() {
        let text = JsonCodec::encode(&Order {
            sku: "A1".to_string(),
            qty: 2,
        })
        .unwrap();
        assert_eq!(text, r#"{"sku":"A1","qty":2}"#);
    }

    #[test]
    fn test_decode_error_on_invalid_text() {
        let result: Result<Order> = JsonCodec::decode("{\"sku\":1}");
        assert!(result.is_err());
    }
}
