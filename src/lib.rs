//! # linkvisor
//!
//! **Linkvisor** keeps an encrypted tunnel link alive over an unreliable network.
//!
//! It samples the health of one tunnel session on a fixed period, decides when the
//! link has silently failed, and drives reconnect attempts with a startup grace
//! window followed by linear, capped backoff. The tunnel protocol itself (handshake,
//! encapsulation, routing, interface bring-up) stays behind three narrow traits
//! implemented by an external engine: [`Platform`], [`TunnelHandle`] and
//! [`RouteInstaller`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!             TunnelConfig
//!                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (one tunnel)                                          │
//! │  - start / stop (serialized)                                      │
//! │  - is_connected / last_handshake / describe_configuration         │
//! │  - Bus (broadcast events) + SubscriberSet (fan-out)               │
//! └──────┬───────────────────────────────────────────────────┬────────┘
//!        ▼ spawn                                             │ Platform
//! ┌──────────────────────────────┐                           │ TunnelHandle
//! │  LinkActor                   │ ── ReconnectSequencer ────┤ RouteInstaller
//! │  - SupervisorState (owned)   │                           │ (external engine)
//! │  - sample every interval     │                           │
//! └──────┬───────────────────────┘                           │
//!        │ Events: LinkLost, ReconnectScheduled, LinkRecovered, ...
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                 SubscriberSet (per-subscriber queues)
//!                       ┌────────┼────────┐
//!                       ▼        ▼        ▼
//!                   LogWriter  sub2 ...  subN
//! ```
//!
//! ### Lifecycle of one run
//! ```text
//! Startup ──(healthy handshake | grace elapsed)──► Steady
//!
//! Steady, every sample:
//!   ├─ healthy           ─► Healthy, or LinkRecovered{attempts} after a loss
//!   ├─ first unhealthy   ─► LinkLost (disconnected_since = now)
//!   └─ still unhealthy   ─► gap elapsed ? attempt += 1, ReconnectSequencer
//!                                       : keep backing off
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                               |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------------|
//! | **Supervision**   | Start, stop and query one supervised tunnel.                 | [`Supervisor`], [`SupervisorBuilder`]            |
//! | **State machine** | Grace window, loss detection and backoff gating.             | [`SupervisorState`], [`Verdict`]                 |
//! | **Collaborators** | The external engine boundary.                                | [`Platform`], [`TunnelHandle`], [`RouteInstaller`] |
//! | **Policies**      | Linear, capped wait between reconnect attempts.              | [`BackoffPolicy`]                                |
//! | **Subscriber API**| Hook into link events (logging, metrics, alerts).            | [`Subscribe`], [`Event`], [`EventKind`]          |
//! | **Errors**        | Typed errors for start-up and configuration.                 | [`StartError`], [`ConfigError`], [`LinkError`]   |
//! | **Configuration** | Timings and tunnel identity, loadable from TOML.             | [`Config`], [`ConfigFile`], [`TunnelConfig`]     |
//! | **Roaming**       | Spot peers reappearing on a new source port.                 | [`roaming::RoamingDetector`]                     |
//!
//! ## Optional features
//! - `logging` _(default)_: exports the built-in [`LogWriter`] subscriber.
//! - `test-utils`: exports the scripted in-memory engine in [`mock`].
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use linkvisor::{ConfigFile, Platform, Subscribe, Supervisor};
//!
//! async fn run(platform: Arc<dyn Platform>) -> Result<(), Box<dyn std::error::Error>> {
//!     let file = ConfigFile::load("/etc/linkvisor.toml")?;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(linkvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(file.supervision, platform)
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // Brings the tunnel up, supervises it until SIGINT/SIGTERM, then stops it.
//!     sup.run_until_signal(file.tunnel).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod link;
mod policies;
mod subscribers;

pub mod roaming;

// ---- Public re-exports ----

pub use config::{Config, ConfigFile, MAX_SAMPLE_INTERVAL};
pub use core::{
    AttemptOutcome, LinkActor, LossCause, NOT_ESTABLISHED, Observation, Phase,
    ReconnectSequencer, Supervisor, SupervisorBuilder, SupervisorState, Tick, Verdict,
};
pub use error::{ConfigError, LinkError, RuntimeError, StartError};
pub use events::{Bus, Event, EventKind};
pub use link::{
    ALLOW_ALL_MASK, ALLOW_ALL_NETWORK, ConnectStatus, Endpoint, Health, Link, Platform,
    RouteInstaller, TunnelConfig, TunnelHandle,
};
pub use policies::BackoffPolicy;
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: scripted in-memory engine for tests and demos.
// Enable with: `--features test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub use link::mock;

// Optional: built-in subscriber writing events through `tracing`.
// Enabled by default: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
