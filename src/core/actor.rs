//! # LinkActor: periodic supervision of one tunnel.
//!
//! The actor is the single owner of a [`SupervisorState`]. Samples and reconnect
//! attempts are strictly sequential inside it, so the state needs no locking.
//!
//! ## Event flow
//! ```text
//! every sample_interval:
//!   Health::probe(tunnel) ──► SupervisorState::observe(tick, health)
//!     ├─ grace elapsed    → GraceElapsed
//!     ├─ Waiting          → StartupWaiting
//!     ├─ Established      → HandshakeEstablished
//!     ├─ Healthy          → (nothing)
//!     ├─ Recovered        → LinkRecovered
//!     ├─ LinkLost         → LinkLost
//!     ├─ BackingOff       → (nothing)
//!     └─ Reconnect        → ReconnectScheduled ──► ReconnectSequencer::attempt()
//!                              ├─ Reestablished             → LinkReestablished
//!                              ├─ DeferredPendingResolution → ReconnectDeferred
//!                              └─ Failed(reason)            → ReconnectFailed
//! ```
//!
//! ## Rules
//! - The first sample happens one interval after supervision began.
//! - A slow attempt delays the next sample; missed ticks are not replayed.
//! - Nothing inside the loop fails: collaborator errors become events.
//! - Cancellation is honored between samples and during settle pauses.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio::select;
use tokio_util::sync::CancellationToken;

use super::sequencer::{AttemptOutcome, ReconnectSequencer};
use super::state::{SupervisorState, Tick, Verdict};
use crate::config::Config;
use crate::events::{Bus, Event, EventKind};
use crate::link::{Health, Link};

/// Supervises one started tunnel until cancelled.
pub struct LinkActor {
    tunnel: Arc<str>,
    link: Link,
    bus: Bus,
    state: SupervisorState,
    sequencer: ReconnectSequencer,
    sample_interval: Duration,
    grace_period: Duration,
}

impl LinkActor {
    /// Creates an actor whose supervision run began at `started_at`.
    pub fn new(tunnel: Arc<str>, link: Link, cfg: &Config, bus: Bus, started_at: Instant) -> Self {
        let sequencer = ReconnectSequencer::new(
            link.clone(),
            cfg.settle_after_disconnect,
            cfg.settle_after_connect,
            bus.clone(),
            tunnel.clone(),
        );
        Self {
            tunnel,
            link,
            bus,
            state: SupervisorState::new(started_at, cfg),
            sequencer,
            sample_interval: cfg.sample_interval_clamped(),
            grace_period: cfg.grace_period,
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// The actor's reconnect sequencer; clones share its attempt gate.
    pub fn sequencer(&self) -> &ReconnectSequencer {
        &self.sequencer
    }

    /// Samples every interval until `token` is cancelled.
    pub async fn run(mut self, token: CancellationToken) {
        let period = self.sample_interval;
        let first = self
            .state
            .started_at()
            .checked_add(period)
            .unwrap_or_else(Instant::now);
        let mut ticker = time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.sample(Tick::now(), &token).await.is_break() {
                break;
            }
        }
    }

    /// Takes one health sample and acts on it.
    ///
    /// Breaks only when `token` is cancelled during a reconnect attempt.
    pub async fn sample(&mut self, tick: Tick, token: &CancellationToken) -> ControlFlow<()> {
        let health = Health::probe(self.link.tunnel.as_ref()).await;
        let obs = self.state.observe(tick, health);

        if obs.grace_elapsed {
            self.publish(self.event(EventKind::GraceElapsed).with_timeout(self.grace_period));
        }

        match obs.verdict {
            Verdict::Healthy | Verdict::BackingOff { .. } => {}
            Verdict::Waiting { elapsed } => self.publish(
                self.event(EventKind::StartupWaiting)
                    .with_delay(elapsed)
                    .with_timeout(self.grace_period),
            ),
            Verdict::Established { elapsed } => {
                self.publish(self.event(EventKind::HandshakeEstablished).with_delay(elapsed))
            }
            Verdict::Recovered { attempts, down_for } => self.publish(
                self.event(EventKind::LinkRecovered)
                    .with_attempt(attempts)
                    .with_delay(down_for),
            ),
            Verdict::LinkLost { cause } => {
                self.publish(self.event(EventKind::LinkLost).with_reason(cause.to_string()))
            }
            Verdict::Reconnect { attempt, waited } => {
                self.publish(
                    self.event(EventKind::ReconnectScheduled)
                        .with_attempt(attempt)
                        .with_delay(waited),
                );
                let Some(outcome) = self.sequencer.attempt(token).await else {
                    return ControlFlow::Break(());
                };
                self.publish_outcome(attempt, outcome);
            }
        }
        ControlFlow::Continue(())
    }

    fn publish_outcome(&self, attempt: u32, outcome: AttemptOutcome) {
        self.publish(outcome.into_event(self.tunnel.clone()).with_attempt(attempt));
    }

    #[inline]
    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_tunnel(self.tunnel.clone())
    }

    #[inline]
    fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }
}
