//! Recovery policies.
//!
//! This module groups the knobs that control **how long** the supervisor waits
//! between reconnect attempts once a link has been declared lost.
//!
//! ## Contents
//! - [`BackoffPolicy`] linear, capped delay between attempts (initial / step / max)
//!
//! ## Quick wiring
//! ```text
//! Config { backoff: BackoffPolicy, .. }
//!      └─► core::state::SupervisorState uses:
//!           - backoff.wait_for(n) to decide whether the next attempt is due
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → initial=10s, step=10s, max=120s (ceiling 300s).

mod backoff;

pub use backoff::BackoffPolicy;
