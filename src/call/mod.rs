//! Call module - the per-attempt record and the engine that drives it.
//!
//! - [`CallContext`] - identifiers, payload fields and the outcome of one attempt
//! - [`CallEngine`] - send, acknowledge receive, result receive

mod context;
mod engine;

pub use context::{CallContext, CallPhase};
pub use engine::CallEngine;
