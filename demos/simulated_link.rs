//! # Example: simulated_link
//!
//! Supervises a tunnel backed by the in-memory engine, with timings shrunk to
//! seconds so the whole story fits in a short run.
//!
//! ## Flow
//! ```text
//! start ─► handshake ─► Steady
//!   t≈4s   peer drops           → LinkLost
//!          reconnects fail      → ReconnectScheduled / ReconnectFailed (growing gaps)
//!   t≈10s  engine recovers      → LinkReestablished → LinkRecovered
//! stop
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example simulated_link --features test-utils
//! ```

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use linkvisor::mock::{MockEngine, MockPlatform};
use linkvisor::{BackoffPolicy, Config, LogWriter, Platform, Subscribe, Supervisor, TunnelConfig};
use tracing_subscriber::EnvFilter;

const PRIVATE_KEY: &str = "YEocP0e2o1WT5GlvBvQzVF7EeR6z9aCk4ANOVPBsw2M=";
const PEER_KEY: &str = "9jalV3EEBnVXahro0pRMQ+cHlmjE33Slo9tddzCVtCw=";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        sample_interval: Duration::from_secs(1),
        grace_period: Duration::from_secs(3),
        backoff: BackoffPolicy {
            initial: Duration::from_secs(1),
            step: Duration::from_secs(1),
            max: Duration::from_secs(4),
        },
        settle_after_disconnect: Duration::from_millis(100),
        settle_after_connect: Duration::from_millis(200),
        ..Config::default()
    };

    let engine = MockEngine::healthy();
    let platform: Arc<dyn Platform> = MockPlatform::new(engine.clone());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg, platform)
        .with_subscribers(subs)
        .build();

    let tunnel = TunnelConfig::new(
        Ipv4Addr::new(10, 6, 0, 2),
        PRIVATE_KEY,
        "vpn.example.com",
        PEER_KEY,
        51820,
    )
    .with_name("demo0");
    sup.start(tunnel).await?;
    println!("{}", sup.describe_configuration().await);

    tokio::time::sleep(Duration::from_secs(4)).await;
    println!("[demo] peer drops, reconnects will not help for a while");
    engine.set_up_on_connect(false);
    engine.set_peer_up(false);

    tokio::time::sleep(Duration::from_secs(6)).await;
    println!("[demo] engine healthy again");
    engine.set_up_on_connect(true);

    tokio::time::sleep(Duration::from_secs(6)).await;
    println!("[demo] connected = {}", sup.is_connected().await);

    sup.stop().await;
    // Let the subscriber workers flush.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
