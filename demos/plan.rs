//! Plan Demo - scheduling calls against a loopback station.
//!
//! This example demonstrates:
//! - Submitting repeating and one-shot plans with `PlanClient`
//! - How plain stations only accept station commands
//!
//! The scripted "reports" station decodes each plan record and answers
//! Queued.
//!
//! ```sh
//! RUST_LOG=stationwire=debug cargo run --example plan
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use stationwire::codec::MsgPackCodec;
use stationwire::plan::PlanInfo;
use stationwire::pool::{ConnectionPool, StaticDirectory};
use stationwire::protocol::{decode_request, encode_tagged, FrameTag};
use stationwire::transport::{FramedSocket, StreamConnector};
use stationwire::{ClientConfig, PlanClient, PlanRequest, PlanType, StationError, StationKind};

const QUEUED: u8 = 0x02;

async fn serve_scheduler(listener: TcpListener) -> stationwire::Result<()> {
    let (stream, _) = listener.accept().await?;
    let mut peer = FramedSocket::new(stream, "reports-1");

    loop {
        let message = match peer.recv_message().await {
            Ok(message) => message,
            Err(StationError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        let request = decode_request(&message)?;
        let plan: PlanInfo = match request.get(FrameTag::Plan) {
            Some(bytes) => MsgPackCodec::decode(bytes)?,
            None => return Err(StationError::FrameInvalid("plan frame missing".to_string())),
        };
        tracing::info!(
            command = request.text(FrameTag::Command).as_deref().unwrap_or("-"),
            plan_type = ?plan.plan_type,
            repeat = plan.plan_repeat,
            skip = plan.skip_set,
            "plan queued"
        );
        peer.send_message(&encode_tagged(QUEUED, &[])?).await?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("tcp://{}", listener.local_addr()?);
    let scheduler = tokio::spawn(serve_scheduler(listener));

    let directory = Arc::new(StaticDirectory::new());
    directory.insert("reports", vec![endpoint]);

    let config = ClientConfig::new()
        .with_station_name("demo")
        .with_call_timeout(Duration::from_secs(5));
    let pool = Arc::new(ConnectionPool::from_config(
        directory,
        Arc::new(StreamConnector::from_config(&config)),
        &config,
    ));
    let client = PlanClient::new(pool, config);

    // Every day, three times, skipping the first run.
    let daily = PlanRequest::new("reports", StationKind::Api, "daily_summary")
        .with_plan(PlanType::Day, 1)
        .with_repeat(3)
        .with_skip_set(1)
        .with_argument(r#"{"format":"pdf"}"#)
        .with_description("daily summary");
    println!("{}", client.submit(daily).await.to_json()?);

    // Once, an hour from now.
    let once = PlanRequest::new("reports", StationKind::Api, "rebuild_index")
        .with_plan(PlanType::Time, 0)
        .with_time(SystemTime::now() + Duration::from_secs(3600));
    println!("{}", client.submit(once).await.to_json()?);

    // Rejected locally: plain stations only take pause, close and resume.
    let bad = PlanRequest::new("reports", StationKind::Plain, "rebuild_index");
    println!("{}", client.submit(bad).await.to_json()?);

    drop(client);
    scheduler.await??;
    Ok(())
}
