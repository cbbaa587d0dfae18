//! Caller-facing result envelope and the outcome translator.
//!
//! Every call resolves to exactly one [`ResultEnvelope`]. The translator is a
//! pure function over [`Outcome`] and the last decoded reply, so it can be
//! exercised against every outcome without any I/O.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::outcome::{LocalFailure, Outcome, RemoteStatus};
use crate::protocol::{DecodedMessage, FrameTag};

/// Origin reported when a reply was decoded but named no responder.
pub const REMOTE_ORIGIN: &str = "zero_center";

/// Numeric result code carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    NotReady,
    NetworkError,
    LocalException,
    RemoteError,
    Unavailable,
    NotFound,
    ArgumentError,
    TimedOut,
    LogicalError,
    Paused,
    Denied,
    EmptyRemoteResult,
}

impl ErrorCode {
    /// Every code, for exhaustive checks.
    pub const ALL: [ErrorCode; 13] = [
        ErrorCode::Success,
        ErrorCode::NotReady,
        ErrorCode::NetworkError,
        ErrorCode::LocalException,
        ErrorCode::RemoteError,
        ErrorCode::Unavailable,
        ErrorCode::NotFound,
        ErrorCode::ArgumentError,
        ErrorCode::TimedOut,
        ErrorCode::LogicalError,
        ErrorCode::Paused,
        ErrorCode::Denied,
        ErrorCode::EmptyRemoteResult,
    ];

    /// Numeric value as serialized.
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::NotReady => -1,
            ErrorCode::NetworkError => -2,
            ErrorCode::LocalException => -3,
            ErrorCode::RemoteError => -4,
            ErrorCode::Unavailable => -5,
            ErrorCode::NotFound => -6,
            ErrorCode::ArgumentError => -7,
            ErrorCode::TimedOut => -8,
            ErrorCode::LogicalError => -9,
            ErrorCode::Paused => -10,
            ErrorCode::Denied => -11,
            ErrorCode::EmptyRemoteResult => -12,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<ErrorCode> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Default human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::NotReady => "station not ready",
            ErrorCode::NetworkError => "network error",
            ErrorCode::LocalException => "local exception",
            ErrorCode::RemoteError => "remote internal error",
            ErrorCode::Unavailable => "station unavailable",
            ErrorCode::NotFound => "station or command not found",
            ErrorCode::ArgumentError => "invalid argument",
            ErrorCode::TimedOut => "timed out",
            ErrorCode::LogicalError => "logical error",
            ErrorCode::Paused => "station paused",
            ErrorCode::Denied => "access denied",
            ErrorCode::EmptyRemoteResult => "empty remote result",
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        ErrorCode::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown result code {}", code)))
    }
}

/// Normalized result of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub code: ErrorCode,
    pub message: String,
    pub origin_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ResultEnvelope {
    /// Successful envelope carrying a payload.
    pub fn success(payload: Option<String>, origin_point: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success,
            message: ErrorCode::Success.message().to_string(),
            origin_point: origin_point.into(),
            payload,
        }
    }

    /// Failure envelope without payload.
    pub fn error(
        code: ErrorCode,
        message: impl Into<String>,
        origin_point: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            origin_point: origin_point.into(),
            payload: None,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success
    }

    /// Serialize for an HTTP response body.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Maps outcomes to envelopes.
#[derive(Debug, Clone)]
pub struct ResultTranslator {
    local_origin: String,
}

impl ResultTranslator {
    /// `local_origin` names this node for results that never reached a peer.
    pub fn new(local_origin: impl Into<String>) -> Self {
        Self {
            local_origin: local_origin.into(),
        }
    }

    #[inline]
    pub fn local_origin(&self) -> &str {
        &self.local_origin
    }

    /// Map an outcome and the last decoded reply to an envelope.
    ///
    /// Total over [`Outcome`]: unknown and unset values become
    /// [`ErrorCode::EmptyRemoteResult`].
    pub fn translate(&self, outcome: Outcome, last: Option<&DecodedMessage>) -> ResultEnvelope {
        let origin = match last {
            Some(reply) => reply
                .text(FrameTag::Responser)
                .unwrap_or_else(|| REMOTE_ORIGIN.to_string()),
            None => self.local_origin.clone(),
        };

        let code = match outcome {
            Outcome::Remote(RemoteStatus::Ok) => {
                let payload = last.and_then(|reply| reply.text(FrameTag::JsonValue));
                return ResultEnvelope::success(payload, origin);
            }
            Outcome::Protocol(_) => {
                // The exchange itself worked; the state name is the message.
                return ResultEnvelope::error(ErrorCode::Success, outcome.text(), origin);
            }
            Outcome::Local(failure) => match failure {
                LocalFailure::NotReady => ErrorCode::NotReady,
                LocalFailure::SendError | LocalFailure::RecvError => ErrorCode::NetworkError,
                LocalFailure::LocalException => ErrorCode::LocalException,
                LocalFailure::FrameInvalid => ErrorCode::NetworkError,
            },
            Outcome::Remote(status) => match status {
                RemoteStatus::Ok => ErrorCode::Success,
                RemoteStatus::Error => ErrorCode::RemoteError,
                RemoteStatus::Unavailable => ErrorCode::Unavailable,
                RemoteStatus::NotFound
                | RemoteStatus::NotSupported
                | RemoteStatus::NoWorkerAvailable => ErrorCode::NotFound,
                RemoteStatus::ArgumentInvalid => ErrorCode::ArgumentError,
                RemoteStatus::TimedOut => ErrorCode::TimedOut,
                RemoteStatus::NetError => ErrorCode::NetworkError,
                RemoteStatus::Failed | RemoteStatus::Bug => ErrorCode::LogicalError,
                RemoteStatus::Paused => ErrorCode::Paused,
                RemoteStatus::Denied => ErrorCode::Denied,
                RemoteStatus::Unknown(_) => ErrorCode::EmptyRemoteResult,
            },
            Outcome::Unset => ErrorCode::EmptyRemoteResult,
        };

        let message = last
            .and_then(|reply| reply.text(FrameTag::Status))
            .unwrap_or_else(|| code.message().to_string());
        ResultEnvelope::error(code, message, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ProtocolState;
    use crate::protocol::{decode_reply, encode_tagged};
    use bytes::Bytes;

    fn reply(state: u8, tags: &[(FrameTag, &'static str)]) -> DecodedMessage {
        let values: Vec<(u8, Bytes)> = tags
            .iter()
            .map(|(t, v)| (t.as_byte(), Bytes::from_static(v.as_bytes())))
            .collect();
        decode_reply(&encode_tagged(state, &values).unwrap()).unwrap()
    }

    #[test]
    fn test_every_wire_code_maps_to_one_envelope() {
        let translator = ResultTranslator::new("local");
        for code in 0..=u8::MAX {
            let outcome = Outcome::from_wire(code);
            let envelope = translator.translate(outcome, None);
            assert!(ErrorCode::ALL.contains(&envelope.code));
            assert_eq!(envelope.origin_point, "local");
            // Only Ok carries a payload-bearing success.
            if envelope.payload.is_some() {
                assert!(outcome.is_success());
            }
        }
    }

    #[test]
    fn test_local_band_mapping() {
        let t = ResultTranslator::new("web");
        let cases = [
            (LocalFailure::NotReady, ErrorCode::NotReady),
            (LocalFailure::SendError, ErrorCode::NetworkError),
            (LocalFailure::RecvError, ErrorCode::NetworkError),
            (LocalFailure::LocalException, ErrorCode::LocalException),
            (LocalFailure::FrameInvalid, ErrorCode::NetworkError),
        ];
        for (failure, expected) in cases {
            let envelope = t.translate(Outcome::Local(failure), None);
            assert_eq!(envelope.code, expected, "{:?}", failure);
            assert_eq!(envelope.message, expected.message());
        }
    }

    #[test]
    fn test_remote_band_mapping() {
        let t = ResultTranslator::new("web");
        let cases = [
            (RemoteStatus::Error, ErrorCode::RemoteError),
            (RemoteStatus::Unavailable, ErrorCode::Unavailable),
            (RemoteStatus::NotFound, ErrorCode::NotFound),
            (RemoteStatus::NotSupported, ErrorCode::NotFound),
            (RemoteStatus::NoWorkerAvailable, ErrorCode::NotFound),
            (RemoteStatus::ArgumentInvalid, ErrorCode::ArgumentError),
            (RemoteStatus::TimedOut, ErrorCode::TimedOut),
            (RemoteStatus::NetError, ErrorCode::NetworkError),
            (RemoteStatus::Failed, ErrorCode::LogicalError),
            (RemoteStatus::Bug, ErrorCode::LogicalError),
            (RemoteStatus::Paused, ErrorCode::Paused),
            (RemoteStatus::Denied, ErrorCode::Denied),
            (RemoteStatus::Unknown(0xEE), ErrorCode::EmptyRemoteResult),
        ];
        for (status, expected) in cases {
            assert_eq!(t.translate(Outcome::Remote(status), None).code, expected);
        }
        assert_eq!(
            t.translate(Outcome::Unset, None).code,
            ErrorCode::EmptyRemoteResult
        );
    }

    #[test]
    fn test_protocol_states_are_success_with_state_message() {
        let t = ResultTranslator::new("web");
        let envelope = t.translate(Outcome::Protocol(ProtocolState::Queued), None);
        assert_eq!(envelope.code, ErrorCode::Success);
        assert_eq!(envelope.message, "Queued");
        assert_eq!(envelope.payload, None);
    }

    #[test]
    fn test_success_carries_payload_and_remote_origin() {
        let t = ResultTranslator::new("web");
        let last = reply(0x01, &[(FrameTag::JsonValue, r#"{"id":42}"#)]);
        let envelope = t.translate(Outcome::OK, Some(&last));
        assert!(envelope.is_success());
        assert_eq!(envelope.payload.as_deref(), Some(r#"{"id":42}"#));
        assert_eq!(envelope.origin_point, REMOTE_ORIGIN);
    }

    #[test]
    fn test_responser_tag_overrides_origin() {
        let t = ResultTranslator::new("web");
        let last = reply(0x8B, &[(FrameTag::Responser, "orders-7")]);
        let envelope = t.translate(Outcome::from_wire(0x8B), Some(&last));
        assert_eq!(envelope.code, ErrorCode::Paused);
        assert_eq!(envelope.origin_point, "orders-7");
    }

    #[test]
    fn test_status_frame_overrides_message() {
        let t = ResultTranslator::new("web");
        let last = reply(0x86, &[(FrameTag::Status, "sku is required")]);
        let envelope = t.translate(Outcome::from_wire(0x86), Some(&last));
        assert_eq!(envelope.code, ErrorCode::ArgumentError);
        assert_eq!(envelope.message, "sku is required");
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = ResultEnvelope::error(ErrorCode::NotFound, "missing", "web api gateway");
        let json = envelope.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"code":-6,"message":"missing","originPoint":"web api gateway"}"#
        );
        let back: ResultEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_error_code_values_are_unique() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(99), None);
    }
}
