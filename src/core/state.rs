//! # Supervision state machine.
//!
//! [`SupervisorState`] turns one health sample into one [`Verdict`]. It owns no
//! I/O and no clock: the caller passes a [`Tick`] and a [`Health`] and acts on
//! the verdict (publish an event, run a reconnect attempt).
//!
//! ```text
//!             healthy handshake              grace elapsed
//!   Startup ───────────────────► Steady ◄─────────────────── Startup
//!                                  │
//!        healthy ◄─────────────────┤ unhealthy
//!   (Recovered if it was lost)     ▼
//!                           LinkLost (disconnected_since = now)
//!                                  │ unhealthy, gap elapsed
//!                                  ▼
//!                           Reconnect { attempt } ──► BackingOff ──► Reconnect ...
//! ```
//!
//! ## Backoff gating
//! The gap before the first attempt is measured from detection, every later gap
//! from the previous attempt. The first two gaps are `wait_for(0)`, the one
//! after attempt `n` (n ≥ 2) is `wait_for(n - 1)`. With the default policy the
//! attempts land 10s, 20s, 40s, 70s ... after detection.
//!
//! ## Invariants
//! - `attempts == 0` and `last_attempt_at == None` whenever `disconnected_since == None`
//! - `last_attempt_at >= disconnected_since` when both are set
//! - `Startup → Steady` only, never back within one run

use std::fmt;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::config::Config;
use crate::link::Health;
use crate::policies::BackoffPolicy;

/// Supervision phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Inside the grace window; failures are not acted on.
    Startup,
    /// Failure detection and reconnects are active.
    Steady,
}

/// Timestamp of one sample.
///
/// `now` drives the state machine; `wall` is only compared with the engine's
/// wall-clock handshake time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub now: Instant,
    pub wall: SystemTime,
}

impl Tick {
    /// Reads both clocks.
    pub fn now() -> Self {
        Self {
            now: Instant::now(),
            wall: SystemTime::now(),
        }
    }

    /// Returns a tick `d` later on both clocks.
    pub fn advance(self, d: Duration) -> Self {
        Self {
            now: self.now + d,
            wall: self.wall + d,
        }
    }
}

/// Why a steady link was declared lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossCause {
    /// The engine reports the peer as down.
    PeerDown,
    /// The last handshake is older than the stale threshold.
    StaleHandshake {
        /// Age of the handshake at detection.
        age: Duration,
    },
}

impl fmt::Display for LossCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossCause::PeerDown => f.write_str("peer down"),
            LossCause::StaleHandshake { age } => {
                write!(f, "handshake stale for {}s", age.as_secs())
            }
        }
    }
}

/// Decision taken for one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Startup, no handshake yet.
    Waiting { elapsed: Duration },
    /// Startup ended by a healthy handshake.
    Established { elapsed: Duration },
    /// Steady and healthy, nothing was lost.
    Healthy,
    /// Healthy again after a loss.
    Recovered { attempts: u32, down_for: Duration },
    /// First unhealthy sample in steady phase.
    LinkLost { cause: LossCause },
    /// Still down, the next attempt is not due yet.
    BackingOff { attempts: u32, remaining: Duration },
    /// Still down and an attempt is due; `attempt` is already counted.
    Reconnect { attempt: u32, waited: Duration },
}

/// Verdict plus whether this sample ended the grace window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// The grace window elapsed without a handshake on this sample.
    pub grace_elapsed: bool,
    pub verdict: Verdict,
}

/// Per-run supervision state, owned by exactly one link actor.
#[derive(Clone, Debug)]
pub struct SupervisorState {
    phase: Phase,
    started_at: Instant,
    disconnected_since: Option<Instant>,
    attempts: u32,
    last_attempt_at: Option<Instant>,

    grace_period: Duration,
    stale_threshold: Duration,
    backoff: BackoffPolicy,
}

impl SupervisorState {
    /// Fresh state for a run that began at `started_at`.
    pub fn new(started_at: Instant, cfg: &Config) -> Self {
        Self {
            phase: Phase::Startup,
            started_at,
            disconnected_since: None,
            attempts: 0,
            last_attempt_at: None,
            grace_period: cfg.grace_period,
            stale_threshold: cfg.stale_threshold,
            backoff: cfg.backoff,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn disconnected_since(&self) -> Option<Instant> {
        self.disconnected_since
    }

    /// Reconnect attempts since the link was lost.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_attempt_at(&self) -> Option<Instant> {
        self.last_attempt_at
    }

    /// Applies one health sample.
    pub fn observe(&mut self, tick: Tick, health: Health) -> Observation {
        let mut grace_elapsed = false;
        if self.phase == Phase::Startup {
            let elapsed = tick.now.saturating_duration_since(self.started_at);
            if elapsed < self.grace_period {
                if health.peer_up && health.latest_handshake.is_some() {
                    self.phase = Phase::Steady;
                    self.clear_loss();
                    return Observation {
                        grace_elapsed,
                        verdict: Verdict::Established { elapsed },
                    };
                }
                return Observation {
                    grace_elapsed,
                    verdict: Verdict::Waiting { elapsed },
                };
            }
            self.phase = Phase::Steady;
            grace_elapsed = true;
        }

        Observation {
            grace_elapsed,
            verdict: self.observe_steady(tick, health),
        }
    }

    fn observe_steady(&mut self, tick: Tick, health: Health) -> Verdict {
        let cause = match self.loss_cause(tick.wall, health) {
            None => {
                return match self.disconnected_since {
                    Some(since) => {
                        let attempts = self.attempts;
                        self.clear_loss();
                        Verdict::Recovered {
                            attempts,
                            down_for: tick.now.saturating_duration_since(since),
                        }
                    }
                    None => Verdict::Healthy,
                };
            }
            Some(cause) => cause,
        };

        let Some(since) = self.disconnected_since else {
            self.disconnected_since = Some(tick.now);
            self.attempts = 0;
            self.last_attempt_at = None;
            return Verdict::LinkLost { cause };
        };

        let (reference, slot) = match self.last_attempt_at {
            None => (since, 0),
            Some(at) => (at, self.attempts.saturating_sub(1)),
        };
        let wait = self.backoff.wait_for(slot);
        let elapsed = tick.now.saturating_duration_since(reference);
        if elapsed < wait {
            return Verdict::BackingOff {
                attempts: self.attempts,
                remaining: wait - elapsed,
            };
        }

        self.last_attempt_at = Some(tick.now);
        self.attempts = self.attempts.saturating_add(1);
        Verdict::Reconnect {
            attempt: self.attempts,
            waited: wait,
        }
    }

    /// `None` when the sample counts as healthy in steady phase.
    ///
    /// A handshake reported in the future (clock adjustments) counts as fresh.
    fn loss_cause(&self, wall: SystemTime, health: Health) -> Option<LossCause> {
        if !health.peer_up {
            return Some(LossCause::PeerDown);
        }
        let age = health
            .latest_handshake
            .and_then(|hs| wall.duration_since(hs).ok())?;
        (age > self.stale_threshold).then_some(LossCause::StaleHandshake { age })
    }

    fn clear_loss(&mut self) {
        self.disconnected_since = None;
        self.attempts = 0;
        self.last_attempt_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    fn cfg() -> Config {
        Config::default()
    }

    fn up(tick: Tick) -> Health {
        Health {
            peer_up: true,
            latest_handshake: Some(tick.wall),
        }
    }

    fn down() -> Health {
        Health {
            peer_up: false,
            latest_handshake: None,
        }
    }

    fn assert_invariants(st: &SupervisorState) {
        if st.disconnected_since().is_none() {
            assert_eq!(st.attempts(), 0);
            assert!(st.last_attempt_at().is_none());
        }
        if let (Some(since), Some(at)) = (st.disconnected_since(), st.last_attempt_at()) {
            assert!(at >= since);
        }
    }

    /// Runs `state` until steady with a lost link detected at the returned tick.
    fn lost_at_grace(st: &mut SupervisorState, t0: Tick) -> Tick {
        let at = t0.advance(60 * SEC);
        let obs = st.observe(at, down());
        assert!(obs.grace_elapsed);
        assert!(matches!(obs.verdict, Verdict::LinkLost { .. }));
        at
    }

    #[test]
    fn test_healthy_during_grace_enters_steady() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());

        let obs = st.observe(t0.advance(5 * SEC), up(t0));
        assert_eq!(
            obs.verdict,
            Verdict::Established {
                elapsed: 5 * SEC
            }
        );
        assert!(!obs.grace_elapsed);
        assert_eq!(st.phase(), Phase::Steady);
        assert!(st.disconnected_since().is_none());
        assert_invariants(&st);
    }

    #[test]
    fn test_peer_up_without_handshake_keeps_waiting() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        let health = Health {
            peer_up: true,
            latest_handshake: None,
        };
        let obs = st.observe(t0.advance(5 * SEC), health);
        assert!(matches!(obs.verdict, Verdict::Waiting { .. }));
        assert_eq!(st.phase(), Phase::Startup);
    }

    #[test]
    fn test_unhealthy_grace_flips_exactly_at_boundary() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());

        for secs in (5..60).step_by(5) {
            let obs = st.observe(t0.advance(secs * SEC), down());
            assert_eq!(
                obs.verdict,
                Verdict::Waiting {
                    elapsed: secs * SEC
                }
            );
            assert_eq!(st.phase(), Phase::Startup);
            assert_eq!(st.attempts(), 0);
        }

        let obs = st.observe(t0.advance(60 * SEC), down());
        assert!(obs.grace_elapsed);
        assert_eq!(st.phase(), Phase::Steady);
        assert_eq!(
            obs.verdict,
            Verdict::LinkLost {
                cause: LossCause::PeerDown
            }
        );
    }

    #[test]
    fn test_grace_elapsed_while_healthy_is_steady_healthy() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        let at = t0.advance(61 * SEC);
        let obs = st.observe(at, up(at));
        assert!(obs.grace_elapsed);
        assert_eq!(obs.verdict, Verdict::Healthy);
        assert_eq!(st.phase(), Phase::Steady);
    }

    #[test]
    fn test_first_attempt_waits_for_initial_backoff() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        let lost = lost_at_grace(&mut st, t0);
        assert_eq!(st.disconnected_since(), Some(lost.now));
        assert_eq!(st.attempts(), 0);

        let obs = st.observe(lost.advance(5 * SEC), down());
        assert_eq!(
            obs.verdict,
            Verdict::BackingOff {
                attempts: 0,
                remaining: 5 * SEC
            }
        );
        assert_eq!(st.attempts(), 0);

        let at = lost.advance(10 * SEC);
        let obs = st.observe(at, down());
        assert_eq!(
            obs.verdict,
            Verdict::Reconnect {
                attempt: 1,
                waited: 10 * SEC
            }
        );
        assert_eq!(st.attempts(), 1);
        assert_eq!(st.last_attempt_at(), Some(at.now));
        assert_invariants(&st);
    }

    #[test]
    fn test_attempt_gaps_grow_linearly() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        let lost = lost_at_grace(&mut st, t0);

        let mut attempts_at = Vec::new();
        for secs in 1..=80u32 {
            let obs = st.observe(lost.advance(secs * SEC), down());
            if let Verdict::Reconnect { .. } = obs.verdict {
                attempts_at.push(secs);
            }
            assert_invariants(&st);
        }
        assert_eq!(attempts_at, vec![10, 20, 40, 70]);
    }

    #[test]
    fn test_two_attempts_in_twenty_five_seconds() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        let lost = lost_at_grace(&mut st, t0);

        let reconnects = (1..=5u32)
            .map(|i| st.observe(lost.advance(i * 5 * SEC), down()))
            .filter(|obs| matches!(obs.verdict, Verdict::Reconnect { .. }))
            .count();
        assert_eq!(reconnects, 2);
        assert_eq!(st.attempts(), 2);
    }

    #[test]
    fn test_recovery_reports_attempts_once_and_clears() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        let lost = lost_at_grace(&mut st, t0);
        st.observe(lost.advance(10 * SEC), down());
        st.observe(lost.advance(20 * SEC), down());
        st.observe(lost.advance(40 * SEC), down());
        assert_eq!(st.attempts(), 3);

        let at = lost.advance(45 * SEC);
        let obs = st.observe(at, up(at));
        assert_eq!(
            obs.verdict,
            Verdict::Recovered {
                attempts: 3,
                down_for: 45 * SEC
            }
        );
        assert!(st.disconnected_since().is_none());
        assert_eq!(st.attempts(), 0);
        assert_invariants(&st);

        let at = at.advance(5 * SEC);
        assert_eq!(st.observe(at, up(at)).verdict, Verdict::Healthy);
    }

    #[test]
    fn test_stale_handshake_is_a_loss() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        st.observe(t0.advance(SEC), up(t0));

        let at = t0.advance(400 * SEC);
        let stale = Health {
            peer_up: true,
            latest_handshake: Some(t0.wall),
        };
        let obs = st.observe(at, stale);
        assert_eq!(
            obs.verdict,
            Verdict::LinkLost {
                cause: LossCause::StaleHandshake { age: 400 * SEC }
            }
        );
        assert_eq!(
            LossCause::StaleHandshake { age: 400 * SEC }.to_string(),
            "handshake stale for 400s"
        );
    }

    #[test]
    fn test_handshake_at_threshold_or_in_future_is_fresh() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        st.observe(t0.advance(SEC), up(t0));

        let at = t0.advance(300 * SEC);
        let edge = Health {
            peer_up: true,
            latest_handshake: Some(t0.wall),
        };
        assert_eq!(st.observe(at, edge).verdict, Verdict::Healthy);

        let future = Health {
            peer_up: true,
            latest_handshake: Some(at.wall + 3600 * SEC),
        };
        assert_eq!(st.observe(at.advance(SEC), future).verdict, Verdict::Healthy);
    }

    #[test]
    fn test_steady_peer_up_without_handshake_is_healthy() {
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg());
        st.observe(t0.advance(SEC), up(t0));
        let health = Health {
            peer_up: true,
            latest_handshake: None,
        };
        assert_eq!(st.observe(t0.advance(6 * SEC), health).verdict, Verdict::Healthy);
    }

    #[test]
    fn test_capped_gap_repeats_forever() {
        let cfg = Config {
            backoff: BackoffPolicy {
                initial: 10 * SEC,
                step: 10 * SEC,
                max: 30 * SEC,
            },
            ..Config::default()
        };
        let t0 = Tick::now();
        let mut st = SupervisorState::new(t0.now, &cfg);
        let lost = lost_at_grace(&mut st, t0);

        let mut last = None;
        let mut gaps = Vec::new();
        for secs in 1..=200u32 {
            if let Verdict::Reconnect { .. } = st.observe(lost.advance(secs * SEC), down()).verdict {
                if let Some(prev) = last {
                    gaps.push(secs - prev);
                }
                last = Some(secs);
            }
        }
        assert_eq!(&gaps[..3], &[10, 20, 30]);
        assert!(gaps[3..].iter().all(|g| *g == 30));
    }
}
