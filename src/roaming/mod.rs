//! # Endpoint roaming detection.
//!
//! Peers behind NAT may reappear on a new source port before the tunnel engine
//! notices. This module spots that from passively captured datagrams:
//!
//! - [`EndpointTable`] holds what the engine believes (parsed from `wg show`);
//! - [`parse_capture_line`] turns one packet-capture line into a source address;
//! - [`RoamingDetector`] confirms a port change after repeated evidence and
//!   checks, after a restart, whether the engine picked it up.
//!
//! Running the capture and restarting the tunnel are left to the caller.
//!
//! ```rust
//! use linkvisor::roaming::{EndpointTable, Roaming, RoamingDetector};
//! use tokio::time::Instant;
//!
//! let table = EndpointTable::parse_wg_show("peer: AAAA\n  endpoint: 198.51.100.7:40000\n");
//! let mut detector = RoamingDetector::new(table);
//! let now = Instant::now();
//! let src = "198.51.100.7:40001".parse().unwrap();
//!
//! detector.observe(src, now);
//! detector.observe(src, now);
//! assert!(matches!(detector.observe(src, now), Some(Roaming::Confirmed(_))));
//! ```

mod detector;
mod endpoints;

pub use detector::{
    CONFIRMATIONS, HISTORY_CAP, PortChange, RESTART_GRACE, Roaming, RoamingDetector, Verification,
};
pub use endpoints::{EndpointTable, parse_capture_line};
