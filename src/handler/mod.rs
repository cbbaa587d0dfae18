//! Handler module - pre/post hooks around every call.
//!
//! Provides:
//! - [`CallHandler`] - `before_call` / `after_call` hooks for one call
//! - [`HandlerRegistry`] - ordered handler factories
//! - [`install`] / [`installed`] - the process-wide registry
//!
//! # Lifecycle
//!
//! The process-wide registry is built and installed once at startup, before
//! any call is issued, and is read-only afterwards. Each call asks every
//! factory for a fresh handler, runs the before-hooks in registration order
//! ahead of any I/O and the after-hooks in the same order once the outcome is
//! final. Hook errors and panics are logged and never change the outcome.
//!
//! # Example
//!
//! ```
//! use stationwire::handler::{CallHandler, HandlerRegistry};
//! use stationwire::CallContext;
//!
//! struct Audit;
//!
//! impl CallHandler for Audit {
//!     fn before_call(&mut self, ctx: &mut CallContext) -> stationwire::Result<()> {
//!         ctx.set_caller_global_id(Some("audit-7".to_string()));
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("audit", || Box::new(Audit) as Box<dyn CallHandler>);
//! assert_eq!(registry.names(), vec!["audit"]);
//! ```

mod registry;

pub use registry::{install, installed, CallHandler, HandlerChain, HandlerFactory, HandlerRegistry};
