//! # ReconnectSequencer: one ordered reconnect attempt.
//!
//! ```text
//! disconnect ─► settle ─► connect ─┬─► PendingResolution ──► DeferredPendingResolution
//!  (errors ignored)                ├─► Err ─────────────────► Failed
//!                                  └─► Connected
//!                                        ▼
//!                                      settle ─► set_default_route ─► add_allowed_subnet(0/0)
//!                                                        │                     │
//!                                                        └──── Err ────────────┴──► Failed
//!                                                                              ▼
//!                                                           is_peer_up ? Reestablished : Failed
//! ```
//!
//! The sequencer owns no supervision state. Both settle pauses race the
//! cancellation token; a cancelled attempt yields `None`. Clones share one
//! gate, so the periodic loop and an on-demand check never interleave steps.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::link::{ConnectStatus, Link};

/// Reason reported when every step succeeded but the peer is still down.
pub const NOT_ESTABLISHED: &str = "not yet established";

/// Result of one reconnect attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// All steps succeeded and the peer reports up.
    Reestablished,
    /// The endpoint is still resolving; routes were not touched.
    DeferredPendingResolution,
    /// A step failed, or the peer stayed down.
    Failed(String),
}

impl AttemptOutcome {
    /// The event announcing this outcome for `tunnel`.
    pub(crate) fn into_event(self, tunnel: Arc<str>) -> Event {
        let ev = match self {
            Self::Reestablished => Event::new(EventKind::LinkReestablished),
            Self::DeferredPendingResolution => Event::new(EventKind::ReconnectDeferred),
            Self::Failed(reason) => Event::new(EventKind::ReconnectFailed).with_reason(reason),
        };
        ev.with_tunnel(tunnel)
    }
}

/// Runs reconnect attempts against one link.
#[derive(Clone)]
pub struct ReconnectSequencer {
    gate: Arc<Mutex<()>>,
    link: Link,
    settle_after_disconnect: Duration,
    settle_after_connect: Duration,
    bus: Bus,
    tunnel: Arc<str>,
}

impl ReconnectSequencer {
    pub fn new(
        link: Link,
        settle_after_disconnect: Duration,
        settle_after_connect: Duration,
        bus: Bus,
        tunnel: Arc<str>,
    ) -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
            link,
            settle_after_disconnect,
            settle_after_connect,
            bus,
            tunnel,
        }
    }

    /// Runs one attempt. Returns `None` if `token` was cancelled mid-way.
    ///
    /// Waits for an attempt already running on a clone to finish first.
    pub async fn attempt(&self, token: &CancellationToken) -> Option<AttemptOutcome> {
        let _turn = select! {
            biased;
            turn = self.gate.lock() => turn,
            _ = token.cancelled() => return None,
        };

        if let Err(e) = self.link.tunnel.disconnect().await {
            self.bus.publish(
                Event::new(EventKind::CollaboratorError)
                    .with_tunnel(self.tunnel.clone())
                    .with_reason(e.to_string()),
            );
        }
        settle(self.settle_after_disconnect, token).await?;

        match self.link.tunnel.connect().await {
            Ok(ConnectStatus::Connected) => {}
            Ok(ConnectStatus::PendingResolution) => {
                return Some(AttemptOutcome::DeferredPendingResolution);
            }
            Err(e) => return Some(AttemptOutcome::Failed(e.to_string())),
        }
        settle(self.settle_after_connect, token).await?;

        if let Err(e) = self.link.install_routes().await {
            return Some(AttemptOutcome::Failed(e.to_string()));
        }

        if self.link.tunnel.is_peer_up().await {
            Some(AttemptOutcome::Reestablished)
        } else {
            Some(AttemptOutcome::Failed(NOT_ESTABLISHED.to_string()))
        }
    }
}

/// Sleeps for `d` unless `token` fires first.
async fn settle(d: Duration, token: &CancellationToken) -> Option<()> {
    select! {
        _ = token.cancelled() => None,
        _ = time::sleep(d) => Some(()),
    }
}
