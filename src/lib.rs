//! # stationwire
//!
//! RPC client engine for station-addressed services that exchange
//! multi-frame messages over pooled request/reply sockets.
//!
//! ## Architecture
//!
//! - **Frame codec** ([`protocol`]): static descriptors per command group,
//!   positional slots, tolerant decoding
//! - **Connection pool** ([`pool`]): per-station socket sets, leases that
//!   return or discard on drop
//! - **Call engine** ([`call`]): send, acknowledge receive, result receive,
//!   with a pre/post [`handler`] chain
//! - **Result translator** ([`result`]): every [`Outcome`] to one
//!   [`ResultEnvelope`]
//!
//! The [`plan`] client and the [`gateway`] adapter reuse the same pool,
//! codec and translator.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stationwire::pool::{ConnectionPool, StaticDirectory};
//! use stationwire::transport::StreamConnector;
//! use stationwire::{CallEngine, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::load("stationwire.json").unwrap();
//!     let directory = Arc::new(StaticDirectory::new());
//!     directory.insert("orders", vec!["tcp://10.0.0.5:7001".to_string()]);
//!
//!     let pool = Arc::new(ConnectionPool::from_config(
//!         directory,
//!         Arc::new(StreamConnector::from_config(&config)),
//!         &config,
//!     ));
//!     let engine = CallEngine::new(pool, config);
//!
//!     let envelope = engine.call_json("orders", "create", &serde_json::json!({"sku": "A1"})).await;
//!     println!("{}", envelope.to_json().unwrap());
//! }
//! ```

pub mod call;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod outcome;
pub mod plan;
pub mod pool;
pub mod protocol;
pub mod result;
pub mod transport;

pub use call::{CallContext, CallEngine, CallPhase};
pub use config::ClientConfig;
pub use error::{Result, StationError};
pub use gateway::{Gateway, GatewayRequest, NetworkFailure};
pub use outcome::{LocalFailure, Outcome, ProtocolState, RemoteStatus};
pub use plan::{PlanClient, PlanRequest, PlanType, StationKind};
pub use result::{ErrorCode, ResultEnvelope, ResultTranslator};
