//! # Runtime events emitted by the supervisor and link actors.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: supervision started/stopped
//! - **Startup events**: grace-window progress
//! - **Link events**: loss, reconnect attempts and their outcomes, recovery
//! - **Subscriber events**: fan-out overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, tunnel name,
//! attempt numbers, reasons, and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use linkvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReconnectFailed)
//!     .with_tunnel("wg0")
//!     .with_reason("not yet established")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(30));
//!
//! assert_eq!(ev.kind, EventKind::ReconnectFailed);
//! assert_eq!(ev.tunnel.as_deref(), Some("wg0"));
//! assert_eq!(ev.reason.as_deref(), Some("not yet established"));
//! assert_eq!(ev.delay_ms, Some(30_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `tunnel`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `tunnel`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Lifecycle events ===
    /// Tunnel brought up and supervision task spawned.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    SupervisionStarted,

    /// Supervision task joined and the tunnel disconnected.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    SupervisionStopped,

    /// Endpoint hostname still resolving when the tunnel was brought up.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    ResolutionPending,

    /// An external call failed in a place where the failure is tolerated, or
    /// the supervision task itself stopped unexpectedly.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `reason`: error message
    CollaboratorError,

    // === Startup events ===
    /// Still inside the grace window and no handshake yet.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `delay_ms`: time elapsed since supervision began
    /// - `timeout_ms`: the grace window
    StartupWaiting,

    /// First healthy handshake observed inside the grace window.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `delay_ms`: time elapsed since supervision began
    HandshakeEstablished,

    /// Grace window elapsed without a handshake; failure detection begins.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `timeout_ms`: the grace window
    GraceElapsed,

    // === Link events ===
    /// First unhealthy sample in steady phase.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `reason`: "peer down" or the stale handshake description
    LinkLost,

    /// A reconnect attempt is being launched.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `attempt`: attempt number (1-based, since the link was lost)
    /// - `delay_ms`: backoff wait that preceded this attempt
    ReconnectScheduled,

    /// Connect reported that endpoint resolution is still in progress.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `attempt`: attempt number
    ReconnectDeferred,

    /// The attempt did not bring the link back.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `attempt`: attempt number
    /// - `reason`: failure message
    ReconnectFailed,

    /// The attempt completed and the peer reports up.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `attempt`: attempt number
    LinkReestablished,

    /// A healthy sample after the link had been lost.
    ///
    /// Sets:
    /// - `tunnel`: tunnel name
    /// - `attempt`: number of attempts it took
    /// - `delay_ms`: how long the link was down
    LinkRecovered,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// A configured window (grace period) in milliseconds.
    pub timeout_ms: Option<u32>,
    /// A wait or elapsed duration in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Name of the tunnel (or subscriber, for subscriber events).
    pub tunnel: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            attempt: None,
            timeout_ms: None,
            reason: None,
            delay_ms: None,
            tunnel: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a tunnel name.
    #[inline]
    pub fn with_tunnel(mut self, tunnel: impl Into<Arc<str>>) -> Self {
        self.tunnel = Some(tunnel.into());
        self
    }

    /// Attaches a window duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(clamp_ms(d));
        self
    }

    /// Attaches a wait/elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(clamp_ms(d));
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_tunnel(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_tunnel(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }

    /// Returns the delay field as a [`Duration`], if set.
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

fn clamp_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
