//! The call engine: lease, send, acknowledge, result.
//!
//! ```text
//! Idle -> Prepared -> Sent -> AwaitingAck -> Running -> Completed
//!   \________\__________\_________\____________\_____-> Failed
//! ```
//!
//! Local failures (send, receive, decode, timeout) flag the leased socket
//! unhealthy. A non-running acknowledgement ends the attempt with that state
//! and leaves the socket healthy.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::context::{CallContext, CallPhase};
use crate::codec::JsonCodec;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::handler::{self, HandlerChain, HandlerRegistry};
use crate::outcome::{LocalFailure, Outcome, RemoteStatus};
use crate::pool::{ConnectionPool, PooledSocket};
use crate::protocol::{decode_reply, encode, DecodedMessage, Message, GENERAL_CALL};
use crate::result::{ErrorCode, ResultEnvelope, ResultTranslator};

/// Drives call attempts over a shared [`ConnectionPool`].
///
/// # Example
///
/// ```ignore
/// let engine = CallEngine::new(pool, ClientConfig::default());
/// let mut ctx = CallContext::new("orders", "create").with_argument(r#"{"sku":"A1"}"#);
/// let envelope = engine.call(&mut ctx).await;
/// if envelope.is_success() {
///     println!("{:?}", envelope.payload);
/// }
/// ```
pub struct CallEngine {
    pool: Arc<ConnectionPool>,
    handlers: Option<Arc<HandlerRegistry>>,
    translator: ResultTranslator,
    config: Arc<ClientConfig>,
}

impl CallEngine {
    /// Create an engine that consults the process-wide handler registry.
    pub fn new(pool: Arc<ConnectionPool>, config: ClientConfig) -> Self {
        Self {
            pool,
            handlers: None,
            translator: ResultTranslator::new(config.station_name.clone()),
            config: Arc::new(config),
        }
    }

    /// Use `registry` instead of the process-wide one.
    pub fn with_handlers(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.handlers = Some(registry);
        self
    }

    #[inline]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub fn translator(&self) -> &ResultTranslator {
        &self.translator
    }

    /// Run one attempt. Always yields an envelope.
    pub async fn call(&self, ctx: &mut CallContext) -> ResultEnvelope {
        tracing::debug!(
            station = ctx.station(),
            command = ctx.command(),
            request_id = ctx.request_id(),
            "call start"
        );

        let mut chain = self.chain_for(ctx);
        if let Some(chain) = chain.as_mut() {
            chain.run_before(ctx);
        }
        ctx.set_phase(CallPhase::Prepared);

        self.exchange(ctx).await;

        let envelope = self.translator.translate(ctx.outcome(), ctx.last_reply());
        if envelope.is_success() {
            ctx.set_result_payload(envelope.payload.clone());
            tracing::debug!(
                station = ctx.station(),
                command = ctx.command(),
                request_id = ctx.request_id(),
                outcome = %ctx.outcome(),
                "call completed"
            );
        } else {
            tracing::warn!(
                station = ctx.station(),
                command = ctx.command(),
                request_id = ctx.request_id(),
                outcome = %ctx.outcome(),
                code = envelope.code.code(),
                "call did not succeed"
            );
        }

        if let Some(chain) = chain.as_mut() {
            chain.run_after(ctx);
        }
        envelope
    }

    /// Serialize `argument` as JSON and call.
    ///
    /// An argument that cannot be serialized yields an `ArgumentError`
    /// envelope without any I/O.
    pub async fn call_json<A: Serialize + ?Sized>(
        &self,
        station: &str,
        command: &str,
        argument: &A,
    ) -> ResultEnvelope {
        let argument = match JsonCodec::encode(argument) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(station, command, "argument not serializable: {}", e);
                return ResultEnvelope::error(
                    ErrorCode::ArgumentError,
                    e.to_string(),
                    self.translator.local_origin(),
                );
            }
        };
        let mut ctx = CallContext::new(station, command).with_argument(argument);
        self.call(&mut ctx).await
    }

    /// Call with a JSON argument and deserialize the success payload.
    ///
    /// Non-success envelopes come back as `Err`. A payload that does not
    /// decode as `T` becomes a `LocalException` envelope.
    pub async fn call_typed<T, A>(
        &self,
        station: &str,
        command: &str,
        argument: &A,
    ) -> std::result::Result<T, ResultEnvelope>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let envelope = self.call_json(station, command, argument).await;
        if !envelope.is_success() {
            return Err(envelope);
        }
        let payload = envelope.payload.as_deref().unwrap_or("null");
        JsonCodec::decode(payload).map_err(|e| {
            ResultEnvelope::error(
                ErrorCode::LocalException,
                format!("result payload did not decode: {}", e),
                envelope.origin_point.clone(),
            )
        })
    }

    fn chain_for(&self, ctx: &CallContext) -> Option<HandlerChain> {
        if ctx.is_simple() {
            return None;
        }
        match &self.handlers {
            Some(registry) => Some(registry.instantiate()),
            None => handler::installed().map(HandlerRegistry::instantiate),
        }
    }

    /// Send, then up to two receives. Writes the outcome on `ctx`.
    ///
    /// The leased socket is released when this returns, or when the caller
    /// drops the call future.
    async fn exchange(&self, ctx: &mut CallContext) {
        let leased = tokio::time::timeout(
            self.config.call_timeout(),
            self.pool.lease(ctx.station(), ctx.request_id()),
        )
        .await;
        let mut socket = match leased {
            Ok(Some(socket)) => socket,
            Ok(None) => {
                ctx.fail(Outcome::Local(LocalFailure::NotReady));
                return;
            }
            Err(_) => {
                tracing::warn!(
                    station = ctx.station(),
                    timeout_ms = self.config.call_timeout_ms,
                    "connect timed out"
                );
                ctx.fail(Outcome::Remote(RemoteStatus::TimedOut));
                return;
            }
        };

        let request = match self.encode_request(ctx) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(request_id = ctx.request_id(), "request encoding failed: {}", e);
                ctx.fail(Outcome::Local(LocalFailure::LocalException));
                return;
            }
        };

        if let Err(e) = socket.send(request).await {
            tracing::warn!(
                station = ctx.station(),
                endpoint = socket.endpoint(),
                "send failed: {}",
                e
            );
            socket.mark_unhealthy();
            ctx.fail(Outcome::Local(LocalFailure::SendError));
            return;
        }
        ctx.set_phase(CallPhase::Sent);

        ctx.set_phase(CallPhase::AwaitingAck);
        let Some(ack) = self.receive(&mut socket, ctx).await else {
            return;
        };
        let state = Outcome::from_wire(ack.marker());
        ctx.absorb_reply(ack);
        if state != Outcome::RUNNING {
            ctx.complete(state);
            return;
        }

        ctx.set_phase(CallPhase::Running);
        let Some(result) = self.receive(&mut socket, ctx).await else {
            return;
        };
        let state = Outcome::from_wire(result.marker());
        ctx.absorb_reply(result);
        ctx.complete(state);
    }

    /// One bounded receive and decode. On failure the socket is flagged and
    /// the outcome written.
    async fn receive(&self, socket: &mut PooledSocket, ctx: &mut CallContext) -> Option<DecodedMessage> {
        let received = tokio::time::timeout(self.config.call_timeout(), socket.recv()).await;
        let message = match received {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                tracing::warn!(
                    station = ctx.station(),
                    endpoint = socket.endpoint(),
                    "receive failed: {}",
                    e
                );
                socket.mark_unhealthy();
                ctx.fail(Outcome::Local(LocalFailure::RecvError));
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    station = ctx.station(),
                    endpoint = socket.endpoint(),
                    timeout_ms = self.config.call_timeout_ms,
                    "receive timed out"
                );
                socket.mark_unhealthy();
                ctx.fail(Outcome::Remote(RemoteStatus::TimedOut));
                return None;
            }
        };

        match decode_reply(&message) {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(
                    station = ctx.station(),
                    endpoint = socket.endpoint(),
                    "reply decode failed: {}",
                    e
                );
                socket.mark_unhealthy();
                ctx.fail(Outcome::Local(LocalFailure::LocalException));
                None
            }
        }
    }

    fn encode_request(&self, ctx: &CallContext) -> Result<Message> {
        let text = |value: Option<&str>| value.map(|v| Bytes::copy_from_slice(v.as_bytes()));
        let config = &self.config;
        encode(
            &GENERAL_CALL,
            &[
                ctx.title().cloned(),
                text(Some(ctx.command())),
                text(Some(ctx.request_id())),
                text(ctx.context_blob()),
                text(ctx.argument()),
                text(ctx.extended_argument()),
                text(Some(config.station_name.as_str())),
                text(Some(config.route_name.as_str())),
                text(ctx.caller_global_id()),
                text(Some(config.service_key.as_str())),
            ],
        )
    }
}
