//! Call Demo - one request against a loopback station.
//!
//! This example demonstrates:
//! - Wiring a directory, connector and pool into a `CallEngine`
//! - Registering a logging handler around every call
//! - Reading the result envelope
//!
//! A scripted "orders" station is served on 127.0.0.1 so the demo is
//! self-contained.
//!
//! ```sh
//! RUST_LOG=stationwire=debug cargo run --example call
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use stationwire::handler::{CallHandler, HandlerRegistry};
use stationwire::pool::{ConnectionPool, StaticDirectory};
use stationwire::protocol::{decode_request, encode_tagged, FrameTag};
use stationwire::transport::{FramedSocket, StreamConnector};
use stationwire::{CallContext, CallEngine, ClientConfig};

const RUNNING: u8 = 0x03;
const OK: u8 = 0x01;

#[derive(Serialize)]
struct CreateOrder<'a> {
    sku: &'a str,
    quantity: u32,
}

/// Logs every call the engine makes.
struct Audit;

impl CallHandler for Audit {
    fn before_call(&mut self, ctx: &mut CallContext) -> stationwire::Result<()> {
        tracing::info!(station = ctx.station(), command = ctx.command(), "calling");
        Ok(())
    }

    fn after_call(&mut self, ctx: &CallContext) -> stationwire::Result<()> {
        tracing::info!(
            station = ctx.station(),
            outcome = %ctx.outcome(),
            origin = ctx.origin_point().unwrap_or("-"),
            "called"
        );
        Ok(())
    }
}

/// Serve one connection: acknowledge with Running, then answer with the
/// argument wrapped in an order record.
async fn serve_orders(listener: TcpListener) -> stationwire::Result<()> {
    let (stream, _) = listener.accept().await?;
    let mut peer = FramedSocket::new(stream, "orders-1");

    loop {
        let message = match peer.recv_message().await {
            Ok(message) => message,
            Err(stationwire::StationError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        let request = decode_request(&message)?;
        let argument = request.text(FrameTag::Argument).unwrap_or_else(|| "null".to_string());
        tracing::info!(
            command = request.text(FrameTag::Command).as_deref().unwrap_or("-"),
            "station received request"
        );

        peer.send_message(&encode_tagged(RUNNING, &[])?).await?;

        let result = format!(r#"{{"id":42,"order":{}}}"#, argument);
        let reply = encode_tagged(
            OK,
            &[
                (FrameTag::JsonValue.as_byte(), Bytes::from(result)),
                (FrameTag::Responser.as_byte(), Bytes::from_static(b"orders-1")),
            ],
        )?;
        peer.send_message(&reply).await?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("tcp://{}", listener.local_addr()?);
    let station = tokio::spawn(serve_orders(listener));

    let directory = Arc::new(StaticDirectory::new());
    directory.insert("orders", vec![endpoint]);

    let config = ClientConfig::new()
        .with_station_name("demo")
        .with_service_key("demo-key")
        .with_call_timeout(Duration::from_secs(5));
    let pool = Arc::new(ConnectionPool::from_config(
        directory,
        Arc::new(StreamConnector::from_config(&config)),
        &config,
    ));

    let mut handlers = HandlerRegistry::new();
    handlers.register("audit", || Box::new(Audit) as Box<dyn CallHandler>);
    let engine = CallEngine::new(pool, config).with_handlers(Arc::new(handlers));

    let envelope = engine
        .call_json("orders", "create", &CreateOrder { sku: "A1", quantity: 2 })
        .await;
    println!("{}", envelope.to_json()?);

    // An unknown station fails locally without touching the network.
    let envelope = engine.call_json("billing", "charge", &()).await;
    println!("{}", envelope.to_json()?);

    drop(engine);
    station.await??;
    Ok(())
}
