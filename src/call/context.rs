//! The mutable record of one call attempt.

use bytes::Bytes;
use uuid::Uuid;

use crate::outcome::Outcome;
use crate::protocol::{DecodedMessage, FrameTag};

/// Where an attempt is in the exchange.
///
/// `Failed` is reachable from every other phase and absorbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallPhase {
    #[default]
    Idle,
    Prepared,
    Sent,
    AwaitingAck,
    Running,
    Completed,
    Failed,
}

impl CallPhase {
    /// Whether the attempt has finished.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, CallPhase::Completed | CallPhase::Failed)
    }
}

/// One RPC attempt.
///
/// `request_id` is generated on creation and never changes. `outcome` starts
/// `Unset` and is written once; a retry is a new `CallContext`.
///
/// ```
/// use stationwire::{CallContext, Outcome};
///
/// let ctx = CallContext::new("orders", "create").with_argument(r#"{"sku":"A1"}"#);
/// assert_eq!(ctx.station(), "orders");
/// assert_eq!(ctx.request_id().len(), 32);
/// assert_eq!(ctx.outcome(), Outcome::Unset);
/// ```
#[derive(Debug, Clone)]
pub struct CallContext {
    station: String,
    command: String,
    request_id: String,
    title: Option<Bytes>,
    caller_global_id: Option<String>,
    callee_global_id: Option<String>,
    context_blob: Option<String>,
    argument: Option<String>,
    extended_argument: Option<String>,
    result_payload: Option<String>,
    outcome: Outcome,
    origin_point: Option<String>,
    phase: CallPhase,
    simple: bool,
    last_reply: Option<DecodedMessage>,
}

impl CallContext {
    /// Create a context with a fresh request id.
    pub fn new(station: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            command: command.into(),
            request_id: Uuid::new_v4().simple().to_string(),
            title: None,
            caller_global_id: None,
            callee_global_id: None,
            context_blob: None,
            argument: None,
            extended_argument: None,
            result_payload: None,
            outcome: Outcome::Unset,
            origin_point: None,
            phase: CallPhase::Idle,
            simple: false,
            last_reply: None,
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_extended_argument(mut self, argument: impl Into<String>) -> Self {
        self.extended_argument = Some(argument.into());
        self
    }

    /// Propagated caller context, already serialized.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_blob = Some(context.into());
        self
    }

    pub fn with_caller_global_id(mut self, id: impl Into<String>) -> Self {
        self.caller_global_id = Some(id.into());
        self
    }

    /// Raw caller identity/title frame, sent unconverted.
    pub fn with_title(mut self, title: impl Into<Bytes>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Skip the handler chain for this call.
    pub fn simple(mut self) -> Self {
        self.simple = true;
        self
    }

    pub fn set_argument(&mut self, argument: Option<String>) {
        self.argument = argument;
    }

    pub fn set_extended_argument(&mut self, argument: Option<String>) {
        self.extended_argument = argument;
    }

    pub fn set_context(&mut self, context: Option<String>) {
        self.context_blob = context;
    }

    pub fn set_caller_global_id(&mut self, id: Option<String>) {
        self.caller_global_id = id;
    }

    #[inline]
    pub fn station(&self) -> &str {
        &self.station
    }

    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[inline]
    pub fn title(&self) -> Option<&Bytes> {
        self.title.as_ref()
    }

    #[inline]
    pub fn caller_global_id(&self) -> Option<&str> {
        self.caller_global_id.as_deref()
    }

    /// Global id the remote assigned, when a reply carried one.
    #[inline]
    pub fn callee_global_id(&self) -> Option<&str> {
        self.callee_global_id.as_deref()
    }

    #[inline]
    pub fn context_blob(&self) -> Option<&str> {
        self.context_blob.as_deref()
    }

    #[inline]
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    #[inline]
    pub fn extended_argument(&self) -> Option<&str> {
        self.extended_argument.as_deref()
    }

    /// Result payload. Only meaningful when the outcome is success.
    #[inline]
    pub fn result_payload(&self) -> Option<&str> {
        self.result_payload.as_deref()
    }

    #[inline]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Node that produced the result, when a reply named one.
    #[inline]
    pub fn origin_point(&self) -> Option<&str> {
        self.origin_point.as_deref()
    }

    #[inline]
    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    #[inline]
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// Last reply decoded during the attempt.
    #[inline]
    pub fn last_reply(&self) -> Option<&DecodedMessage> {
        self.last_reply.as_ref()
    }

    pub(crate) fn set_phase(&mut self, phase: CallPhase) {
        if !self.phase.is_terminal() {
            self.phase = phase;
        }
    }

    /// Write the outcome. Returns `false` and keeps the first value if it was already set.
    pub(crate) fn set_outcome(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_set() {
            tracing::warn!(
                request_id = %self.request_id,
                current = %self.outcome,
                rejected = %outcome,
                "outcome already written"
            );
            return false;
        }
        self.outcome = outcome;
        true
    }

    pub(crate) fn fail(&mut self, outcome: Outcome) {
        self.set_outcome(outcome);
        self.set_phase(CallPhase::Failed);
    }

    pub(crate) fn complete(&mut self, outcome: Outcome) {
        self.set_outcome(outcome);
        self.set_phase(CallPhase::Completed);
    }

    pub(crate) fn set_result_payload(&mut self, payload: Option<String>) {
        self.result_payload = payload;
    }

    /// Record a decoded reply and pick up the identifiers it carries.
    pub(crate) fn absorb_reply(&mut self, reply: DecodedMessage) {
        if let Some(global_id) = reply.text(FrameTag::GlobalId) {
            self.callee_global_id = Some(global_id);
        }
        if let Some(origin) = reply.text(FrameTag::Responser) {
            self.origin_point = Some(origin);
        }
        self.last_reply = Some(reply);
    }
}
