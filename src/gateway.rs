//! HTTP gateway adaptation.
//!
//! The HTTP listener parses an inbound request into a [`GatewayRequest`],
//! hands it to [`Gateway::dispatch`] and writes the returned JSON as the
//! response body. When the gateway forwards over HTTP instead, failures of
//! that hop are described by [`NetworkFailure`] and rendered with
//! [`Gateway::render_forwarded`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::call::{CallContext, CallEngine};
use crate::result::{ErrorCode, ResultEnvelope};

/// Origin reported for failures that never reached a remote node.
pub const GATEWAY_ORIGIN: &str = "web api gateway";

/// Body returned if an envelope itself cannot be serialized.
const FALLBACK_BODY: &str =
    r#"{"code":-3,"message":"local exception","originPoint":"web api gateway"}"#;

/// A parsed inbound request.
#[derive(Debug, Clone, Default)]
pub struct GatewayRequest {
    pub station: String,
    pub command: String,
    pub argument: Option<String>,
    /// Propagated caller context, already serialized.
    pub context: Option<String>,
    /// Bearer token from the `Authorization` header.
    pub token: Option<String>,
}

/// Transport failures of a forwarded HTTP hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFailure {
    ConnectRefused,
    ConnectionClosed,
    NameResolution,
    Timeout,
    /// The peer answered with a non-success HTTP status.
    Protocol { status: u16 },
    SendFailure,
    ReceiveFailure,
    Cancelled,
    Other(String),
}

impl NetworkFailure {
    /// Stable envelope for this failure, attributed to the gateway.
    pub fn to_envelope(&self) -> ResultEnvelope {
        let code = match self {
            NetworkFailure::Protocol { status: 404 } => ErrorCode::NotFound,
            NetworkFailure::Protocol { status: 503 } => ErrorCode::Unavailable,
            NetworkFailure::NameResolution => ErrorCode::NotFound,
            NetworkFailure::Cancelled => ErrorCode::Unavailable,
            _ => ErrorCode::NetworkError,
        };
        ResultEnvelope::error(code, self.to_string(), GATEWAY_ORIGIN)
    }
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailure::ConnectRefused => f.write_str("remote endpoint refused the connection"),
            NetworkFailure::ConnectionClosed => f.write_str("connection closed before a response"),
            NetworkFailure::NameResolution => f.write_str("host name could not be resolved"),
            NetworkFailure::Timeout => f.write_str("no response within the timeout"),
            NetworkFailure::Protocol { status } => write!(f, "remote answered HTTP {}", status),
            NetworkFailure::SendFailure => f.write_str("request could not be sent completely"),
            NetworkFailure::ReceiveFailure => f.write_str("response was not received completely"),
            NetworkFailure::Cancelled => f.write_str("request was cancelled"),
            NetworkFailure::Other(message) => write!(f, "network error: {}", message),
        }
    }
}

/// Context propagated when the inbound request did not carry one.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultContext<'a> {
    request_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bearer: Option<&'a str>,
}

/// Turns inbound HTTP requests into calls.
pub struct Gateway {
    engine: Arc<CallEngine>,
}

impl Gateway {
    pub fn new(engine: Arc<CallEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn engine(&self) -> &Arc<CallEngine> {
        &self.engine
    }

    /// Call and return the envelope as a JSON body.
    pub async fn dispatch(&self, request: GatewayRequest) -> String {
        render(&self.dispatch_envelope(request).await)
    }

    /// Call and return the envelope.
    ///
    /// Failures where no node replied are attributed to the gateway.
    pub async fn dispatch_envelope(&self, request: GatewayRequest) -> ResultEnvelope {
        if request.station.trim().is_empty() || request.command.trim().is_empty() {
            return ResultEnvelope::error(
                ErrorCode::ArgumentError,
                "station and command are required",
                GATEWAY_ORIGIN,
            );
        }

        let mut ctx = CallContext::new(request.station, request.command);
        let context = match request.context {
            Some(context) => context,
            None => match default_context(ctx.request_id(), request.token.as_deref()) {
                Ok(context) => context,
                Err(e) => {
                    tracing::error!("context serialization failed: {}", e);
                    return ResultEnvelope::error(
                        ErrorCode::LocalException,
                        e.to_string(),
                        GATEWAY_ORIGIN,
                    );
                }
            },
        };
        ctx.set_context(Some(context));
        ctx.set_argument(request.argument);

        let mut envelope = self.engine.call(&mut ctx).await;
        if ctx.last_reply().is_none() {
            // No node answered; the failure is the gateway's own.
            envelope.origin_point = GATEWAY_ORIGIN.to_string();
        }
        envelope
    }

    /// Render the outcome of a forwarded HTTP hop.
    ///
    /// A body is passed through unchanged; an empty body becomes the
    /// empty-remote-result envelope.
    pub fn render_forwarded(result: std::result::Result<Option<String>, NetworkFailure>) -> String {
        match result {
            Ok(Some(body)) if !body.trim().is_empty() => body,
            Ok(_) => render(&ResultEnvelope::error(
                ErrorCode::EmptyRemoteResult,
                ErrorCode::EmptyRemoteResult.message(),
                GATEWAY_ORIGIN,
            )),
            Err(failure) => {
                tracing::warn!("forwarded request failed: {}", failure);
                render(&failure.to_envelope())
            }
        }
    }
}

fn default_context(request_id: &str, token: Option<&str>) -> crate::error::Result<String> {
    Ok(serde_json::to_string(&DefaultContext {
        request_id,
        bearer: token,
    })?)
}

fn render(envelope: &ResultEnvelope) -> String {
    envelope.to_json().unwrap_or_else(|e| {
        tracing::error!("envelope serialization failed: {}", e);
        FALLBACK_BODY.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_mapping() {
        let cases = [
            (NetworkFailure::Protocol { status: 404 }, ErrorCode::NotFound),
            (NetworkFailure::Protocol { status: 503 }, ErrorCode::Unavailable),
            (NetworkFailure::Protocol { status: 500 }, ErrorCode::NetworkError),
            (NetworkFailure::NameResolution, ErrorCode::NotFound),
            (NetworkFailure::Cancelled, ErrorCode::Unavailable),
            (NetworkFailure::ConnectRefused, ErrorCode::NetworkError),
            (NetworkFailure::Timeout, ErrorCode::NetworkError),
            (NetworkFailure::Other("tls".to_string()), ErrorCode::NetworkError),
        ];
        for (failure, expected) in cases {
            let envelope = failure.to_envelope();
            assert_eq!(envelope.code, expected, "{:?}", failure);
            assert_eq!(envelope.origin_point, GATEWAY_ORIGIN);
        }
    }

    #[test]
    fn test_forwarded_body_passes_through() {
        let body = r#"{"code":0,"message":"success","originPoint":"orders-1"}"#;
        assert_eq!(Gateway::render_forwarded(Ok(Some(body.to_string()))), body);
    }

    #[test]
    fn test_empty_forwarded_body_is_empty_remote_result() {
        for result in [Ok(None), Ok(Some("  ".to_string()))] {
            let envelope: ResultEnvelope =
                serde_json::from_str(&Gateway::render_forwarded(result)).unwrap();
            assert_eq!(envelope.code, ErrorCode::EmptyRemoteResult);
            assert_eq!(envelope.origin_point, GATEWAY_ORIGIN);
        }
    }

    #[test]
    fn test_forwarded_failure_renders_envelope() {
        let body = Gateway::render_forwarded(Err(NetworkFailure::Protocol { status: 404 }));
        let envelope: ResultEnvelope = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope.code, ErrorCode::NotFound);
        assert_eq!(envelope.message, "remote answered HTTP 404");
    }

    #[test]
    fn test_default_context_shape() {
        let json = default_context("abc", Some("tok")).unwrap();
        assert_eq!(json, r#"{"requestId":"abc","bearer":"tok"}"#);
        let json = default_context("abc", None).unwrap();
        assert_eq!(json, r#"{"requestId":"abc"}"#);
    }

    #[test]
    fn test_fallback_body_is_valid_envelope() {
        let envelope: ResultEnvelope = serde_json::from_str(FALLBACK_BODY).unwrap();
        assert_eq!(envelope.code, ErrorCode::LocalException);
    }
}
