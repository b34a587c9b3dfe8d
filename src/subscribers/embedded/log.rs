//! # LogWriter: events rendered through `tracing`
//!
//! A subscriber that turns every [`Event`] into one `tracing` record with
//! structured fields. Install any `tracing` subscriber (e.g. `tracing-subscriber`'s
//! `fmt`) to see the output.
//!
//! ## Example output
//! ```text
//! INFO  tunnel="wg0" supervision started
//! DEBUG tunnel="wg0" elapsed_ms=15000 grace_ms=60000 waiting for handshake
//! WARN  tunnel="wg0" reason="peer down" link lost
//! WARN  tunnel="wg0" attempt=1 wait_ms=10000 reconnect attempt
//! ERROR tunnel="wg0" attempt=1 reason="route installation failed: busy" reconnect failed
//! INFO  tunnel="wg0" attempts=2 down_ms=25000 link recovered
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tunnel = e.tunnel.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::SupervisionStarted => {
                info!(tunnel, "supervision started");
            }
            EventKind::SupervisionStopped => {
                info!(tunnel, "supervision stopped");
            }
            EventKind::ResolutionPending => {
                warn!(tunnel, "endpoint resolution in progress, connection postponed");
            }
            EventKind::CollaboratorError => {
                warn!(tunnel, reason, "tunnel engine call or supervision task failed");
            }
            EventKind::StartupWaiting => {
                debug!(
                    tunnel,
                    elapsed_ms = e.delay_ms,
                    grace_ms = e.timeout_ms,
                    "waiting for handshake"
                );
            }
            EventKind::HandshakeEstablished => {
                info!(tunnel, elapsed_ms = e.delay_ms, "handshake established during grace period");
            }
            EventKind::GraceElapsed => {
                info!(tunnel, grace_ms = e.timeout_ms, "grace period over");
            }
            EventKind::LinkLost => {
                warn!(tunnel, reason, "link lost");
            }
            EventKind::ReconnectScheduled => {
                warn!(tunnel, attempt = e.attempt, wait_ms = e.delay_ms, "reconnect attempt");
            }
            EventKind::ReconnectDeferred => {
                warn!(tunnel, attempt = e.attempt, "endpoint resolution in progress, reconnect postponed");
            }
            EventKind::ReconnectFailed => {
                error!(tunnel, attempt = e.attempt, reason, "reconnect failed");
            }
            EventKind::LinkReestablished => {
                info!(tunnel, attempt = e.attempt, "link re-established");
            }
            EventKind::LinkRecovered => {
                info!(tunnel, attempts = e.attempt, down_ms = e.delay_ms, "link recovered");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = tunnel, reason, "subscriber dropped an event");
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = tunnel, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
