//! Scheduling client.
//!
//! Submits a plan to a station's scheduler using one of the three plan
//! descriptors. Unlike general calls this is a single send and a single
//! receive; the scheduler answers `Queued` when it accepted the plan.
//!
//! # Example
//!
//! ```ignore
//! let plans = PlanClient::new(pool, ClientConfig::default());
//! let request = PlanRequest::new("orders", StationKind::Api, "rebuild-index")
//!     .with_plan(PlanType::Day, 1)
//!     .with_repeat(7);
//! let envelope = plans.submit(request).await;
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::MsgPackCodec;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::outcome::{LocalFailure, Outcome, ProtocolState, RemoteStatus};
use crate::pool::ConnectionPool;
use crate::protocol::{
    decode_reply, encode, FrameDescriptor, Message, PLAN_CALL, PLAN_COMMAND, PLAN_PUBLISH,
};
use crate::result::{ErrorCode, ResultEnvelope, ResultTranslator};

/// Commands a plan may issue against a plain station.
pub const STATION_COMMANDS: [&str; 3] = ["pause", "close", "resume"];

/// How a plan's time value is interpreted.
///
/// Ordered from one-shot to the coarsest repeating unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Run once, as soon as possible.
    #[default]
    None,
    /// Run once at `plan_time`.
    Time,
    Second,
    Minute,
    Hour,
    Day,
    /// `plan_value` is the weekday, 0 = Sunday.
    Week,
    /// `plan_value` is the day of month.
    Month,
}

impl PlanType {
    /// Whether the plan runs more than once.
    #[inline]
    pub fn is_repeating(self) -> bool {
        self > PlanType::Time
    }
}

/// Kind of the target station, which decides the plan descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    Api,
    Vote,
    Notify,
    /// Any other user station. Only station commands may be planned.
    Plain,
    /// Built-in stations. Plans are refused.
    System,
}

/// Plan record carried in the plan frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    pub plan_type: PlanType,
    pub plan_value: i32,
    pub plan_repeat: i32,
    pub description: Option<String>,
    pub no_skip: bool,
    /// Unix seconds; 0 for "not set".
    pub plan_time: i64,
    pub skip_set: i32,
}

impl PlanInfo {
    /// Apply the scheduler's normalization rules.
    ///
    /// - weekly value 7 is Sunday, sent as 0
    /// - one-shot plans run once and skip nothing
    /// - repeating plans extend the repeat count by the skip count
    pub fn normalized(mut self) -> Self {
        if self.plan_type == PlanType::Week && self.plan_value == 7 {
            self.plan_value = 0;
        }
        if self.plan_type.is_repeating() {
            if self.skip_set > 0 {
                self.plan_repeat = self.plan_repeat.saturating_add(self.skip_set);
            }
        } else {
            self.skip_set = 0;
            self.plan_repeat = 1;
        }
        self
    }
}

/// A plan submission.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub station: String,
    pub kind: StationKind,
    pub command: String,
    pub argument: Option<String>,
    pub context: Option<String>,
    pub plan_type: PlanType,
    pub plan_value: i32,
    pub repeat: i32,
    pub description: Option<String>,
    pub no_skip: bool,
    pub plan_time: Option<SystemTime>,
    pub skip_set: i32,
}

impl PlanRequest {
    pub fn new(station: impl Into<String>, kind: StationKind, command: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            kind,
            command: command.into(),
            argument: None,
            context: None,
            plan_type: PlanType::None,
            plan_value: 0,
            repeat: 1,
            description: None,
            no_skip: false,
            plan_time: None,
            skip_set: 0,
        }
    }

    pub fn with_plan(mut self, plan_type: PlanType, value: i32) -> Self {
        self.plan_type = plan_type;
        self.plan_value = value;
        self
    }

    pub fn with_repeat(mut self, repeat: i32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_skip_set(mut self, skip_set: i32) -> Self {
        self.skip_set = skip_set;
        self
    }

    pub fn with_time(mut self, at: SystemTime) -> Self {
        self.plan_time = Some(at);
        self
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_no_skip(mut self, no_skip: bool) -> Self {
        self.no_skip = no_skip;
        self
    }

    /// The normalized plan record for this request.
    pub fn plan_info(&self) -> PlanInfo {
        let plan_time = self
            .plan_time
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        PlanInfo {
            plan_type: self.plan_type,
            plan_value: self.plan_value,
            plan_repeat: self.repeat,
            description: self.description.clone(),
            no_skip: self.no_skip,
            plan_time,
            skip_set: self.skip_set,
        }
        .normalized()
    }
}

/// Submits plans over the shared pool.
pub struct PlanClient {
    pool: Arc<ConnectionPool>,
    translator: ResultTranslator,
    config: Arc<ClientConfig>,
}

impl PlanClient {
    pub fn new(pool: Arc<ConnectionPool>, config: ClientConfig) -> Self {
        Self {
            pool,
            translator: ResultTranslator::new(config.station_name.clone()),
            config: Arc::new(config),
        }
    }

    /// Submit one plan. Always yields an envelope; success iff the scheduler
    /// queued the plan.
    pub async fn submit(&self, mut request: PlanRequest) -> ResultEnvelope {
        if request.station.trim().is_empty() || request.command.trim().is_empty() {
            return self.rejected("station and command are required");
        }
        if request.kind == StationKind::System {
            return self.rejected("plans are not allowed on system stations");
        }
        if matches!(request.kind, StationKind::Plain) {
            request.command = request.command.to_lowercase();
            if !STATION_COMMANDS.contains(&request.command.as_str()) {
                return self.rejected("plain stations only accept pause, close and resume");
            }
        }

        let message = match self.encode_plan(&request) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(station = %request.station, "plan encoding failed: {}", e);
                return self
                    .translator
                    .translate(Outcome::Local(LocalFailure::LocalException), None);
            }
        };

        let leased = tokio::time::timeout(
            self.config.call_timeout(),
            self.pool.lease(&request.station, &request.command),
        )
        .await;
        let mut socket = match leased {
            Ok(Some(socket)) => socket,
            Ok(None) => {
                return self
                    .translator
                    .translate(Outcome::Local(LocalFailure::NotReady), None);
            }
            Err(_) => {
                tracing::warn!(station = %request.station, "plan connect timed out");
                return self
                    .translator
                    .translate(Outcome::Remote(RemoteStatus::TimedOut), None);
            }
        };

        if let Err(e) = socket.send(message).await {
            tracing::warn!(station = %request.station, "plan send failed: {}", e);
            socket.mark_unhealthy();
            return self
                .translator
                .translate(Outcome::Local(LocalFailure::SendError), None);
        }

        let received = tokio::time::timeout(self.config.call_timeout(), socket.recv()).await;
        let reply = match received {
            Ok(Ok(message)) => match decode_reply(&message) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(station = %request.station, "plan reply decode failed: {}", e);
                    socket.mark_unhealthy();
                    return self
                        .translator
                        .translate(Outcome::Local(LocalFailure::LocalException), None);
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(station = %request.station, "plan receive failed: {}", e);
                socket.mark_unhealthy();
                return self
                    .translator
                    .translate(Outcome::Local(LocalFailure::RecvError), None);
            }
            Err(_) => {
                socket.mark_unhealthy();
                return self
                    .translator
                    .translate(Outcome::Remote(RemoteStatus::TimedOut), None);
            }
        };
        drop(socket);

        let state = Outcome::from_wire(reply.marker());
        let envelope = if state == Outcome::Protocol(ProtocolState::Queued) {
            let mut envelope = self.translator.translate(Outcome::OK, Some(&reply));
            envelope.payload = None;
            envelope
        } else {
            let mut envelope = self.translator.translate(state, Some(&reply));
            if envelope.is_success() {
                // Anything but Queued means the plan was not accepted.
                envelope.code = ErrorCode::LogicalError;
                envelope.message = format!("plan was not queued ({})", state);
                envelope.payload = None;
            }
            envelope
        };
        tracing::debug!(
            station = %request.station,
            command = %request.command,
            state = %state,
            "plan submitted"
        );
        envelope
    }

    fn rejected(&self, message: &str) -> ResultEnvelope {
        ResultEnvelope::error(
            ErrorCode::ArgumentError,
            message,
            self.translator.local_origin(),
        )
    }

    fn encode_plan(&self, request: &PlanRequest) -> Result<Message> {
        let plan = Some(Bytes::from(MsgPackCodec::encode(&request.plan_info())?));
        let text = |value: Option<&str>| value.map(|v| Bytes::copy_from_slice(v.as_bytes()));
        let key = text(Some(self.config.service_key.as_str()));
        let command = text(Some(request.command.as_str()));
        let argument = text(request.argument.as_deref());
        let context = text(request.context.as_deref());

        let (descriptor, values): (&FrameDescriptor, Vec<Option<Bytes>>) = match request.kind {
            StationKind::Api | StationKind::Vote => {
                (&PLAN_CALL, vec![plan, context, command, argument, key])
            }
            // Publish plans carry the title in the command slot and the body in the argument slot.
            StationKind::Notify => (&PLAN_PUBLISH, vec![plan, context, command, argument, key]),
            StationKind::Plain | StationKind::System => {
                (&PLAN_COMMAND, vec![plan, command, argument, key])
            }
        };
        encode(descriptor, &values)
    }
}
