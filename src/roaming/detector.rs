//! Confirmed endpoint port changes.
//!
//! A datagram from a known peer IP on an unexpected source port is recorded.
//! Three consecutive datagrams from the same new port confirm the change,
//! unless the last restart is less than [`RESTART_GRACE`] ago. After a
//! restart, [`RoamingDetector::verify`] checks once the grace window is over
//! whether the engine picked up each confirmed change.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::time::Instant;

use super::endpoints::EndpointTable;

/// Consecutive identical ports needed to confirm a change.
pub const CONFIRMATIONS: usize = 3;
/// Ports remembered per source IP.
pub const HISTORY_CAP: usize = 10;
/// Quiet window after a restart.
pub const RESTART_GRACE: Duration = Duration::from_secs(30);

/// A peer seen on another port than the one the engine knows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortChange {
    pub peer: String,
    pub ip: IpAddr,
    pub old_port: u16,
    pub new_port: u16,
}

/// What one datagram told the detector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Roaming {
    /// New port seen; `streak` consecutive datagrams so far.
    Observed { ip: IpAddr, port: u16, streak: usize },
    /// Confirmed, but a restart happened less than the grace window ago.
    Suppressed(PortChange),
    /// Confirmed; the caller should restart the tunnel and report it.
    Confirmed(PortChange),
}

/// Result of checking one pending change after a restart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The engine now uses the new port.
    Applied(PortChange),
    /// The peer is known but still on another port; kept pending.
    NotApplied { change: PortChange, current_port: u16 },
    /// The peer IP disappeared from the table; dropped.
    Missing(PortChange),
}

/// Detects peers roaming to a new source port.
#[derive(Debug)]
pub struct RoamingDetector {
    table: EndpointTable,
    history: HashMap<IpAddr, Vec<u16>>,
    last_restart: Option<Instant>,
    check_scheduled: bool,
    pending: HashMap<IpAddr, PortChange>,
}

impl RoamingDetector {
    pub fn new(table: EndpointTable) -> Self {
        Self {
            table,
            history: HashMap::new(),
            last_restart: None,
            check_scheduled: false,
            pending: HashMap::new(),
        }
    }

    pub fn table(&self) -> &EndpointTable {
        &self.table
    }

    /// Changes confirmed and restarted for, not yet seen applied.
    pub fn pending(&self) -> impl Iterator<Item = &PortChange> {
        self.pending.values()
    }

    /// Feeds one inbound datagram source.
    ///
    /// Returns `None` for unknown IPs and for the port the engine already knows.
    pub fn observe(&mut self, src: SocketAddr, now: Instant) -> Option<Roaming> {
        let ip = src.ip();
        let port = src.port();
        let (peer, known_port) = self.table.by_ip(ip)?;
        if port == known_port {
            return None;
        }
        let change = PortChange {
            peer: peer.to_string(),
            ip,
            old_port: known_port,
            new_port: port,
        };

        let in_grace = self.in_grace(now);
        let history = self.history.entry(ip).or_default();
        history.push(port);
        if history.len() > HISTORY_CAP {
            let excess = history.len() - HISTORY_CAP;
            history.drain(..excess);
        }

        let streak = history.iter().rev().take_while(|p| **p == port).count();
        if streak < CONFIRMATIONS {
            return Some(Roaming::Observed { ip, port, streak });
        }
        if in_grace {
            return Some(Roaming::Suppressed(change));
        }
        history.clear();
        Some(Roaming::Confirmed(change))
    }

    /// Records that the tunnel was restarted for `change`.
    ///
    /// `table` is the endpoint table read right after the restart.
    pub fn restarted(&mut self, now: Instant, change: PortChange, table: EndpointTable) {
        self.last_restart = Some(now);
        self.check_scheduled = true;
        self.pending.insert(change.ip, change);
        self.table = table;
    }

    /// True when a post-restart check is scheduled and the grace window is over.
    pub fn verification_due(&self, now: Instant) -> bool {
        self.check_scheduled && !self.in_grace(now)
    }

    /// Checks pending changes against a fresh table. Does nothing until due.
    ///
    /// Changes not yet applied stay pending; the fresh table replaces the known one.
    pub fn verify(&mut self, table: EndpointTable, now: Instant) -> Vec<Verification> {
        if !self.verification_due(now) {
            return Vec::new();
        }
        self.check_scheduled = false;

        let mut report = Vec::with_capacity(self.pending.len());
        let mut still_pending = HashMap::new();
        for (ip, change) in self.pending.drain() {
            match table.by_ip(ip) {
                Some((_, current)) if current == change.new_port => {
                    report.push(Verification::Applied(change));
                }
                Some((_, current)) => {
                    still_pending.insert(ip, change.clone());
                    report.push(Verification::NotApplied {
                        change,
                        current_port: current,
                    });
                }
                None => report.push(Verification::Missing(change)),
            }
        }
        self.pending = still_pending;
        self.table = table;
        report
    }

    fn in_grace(&self, now: Instant) -> bool {
        self.last_restart
            .is_some_and(|at| now.saturating_duration_since(at) < RESTART_GRACE)
    }
}
