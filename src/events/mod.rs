//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to observations made by the supervisor, link actors,
//! the reconnect sequencer and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `LinkActor`, `ReconnectSequencer`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's listener (fans out to `SubscriberSet`) and
//!   any receiver handed out by `Supervisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
