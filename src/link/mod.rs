//! # Collaborator boundary: the external tunnel engine.
//!
//! linkvisor never speaks the tunnel protocol itself. Everything it needs from the
//! engine and the network stack goes through three narrow async traits:
//!
//! - [`Platform`]: one-time platform setup and tunnel session creation;
//! - [`TunnelHandle`]: connect / disconnect / liveness of one session;
//! - [`RouteInstaller`]: default route and allowed-subnet entries.
//!
//! A created session is handed back as a [`Link`], which bundles the handle and
//! the route installer (usually the same engine object behind two trait objects).
//!
//! ```text
//! Supervisor::start(cfg)
//!   ├─► Platform::initialize_platform()
//!   ├─► Platform::initialize_tunnel(&cfg) ──► Link { tunnel, routes }
//!   ├─► TunnelHandle::connect()
//!   ├─► RouteInstaller::set_default_route()
//!   └─► RouteInstaller::add_allowed_subnet(0.0.0.0, 0.0.0.0)
//! ```

mod config;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::LinkError;

pub use config::{Endpoint, TunnelConfig};

/// Network of the allow-all route installed on every (re)connect.
pub const ALLOW_ALL_NETWORK: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
/// Mask of the allow-all route installed on every (re)connect.
pub const ALLOW_ALL_MASK: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Successful outcomes of [`TunnelHandle::connect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectStatus {
    /// The session is connecting; the handshake follows asynchronously.
    Connected,
    /// The endpoint hostname is still being resolved; connection is postponed.
    ///
    /// Not an error: the caller simply tries again later.
    PendingResolution,
}

/// # Handle to one established tunnel session.
///
/// Implementations wrap the external engine. `disconnect` must be idempotent.
#[async_trait]
pub trait TunnelHandle: Send + Sync + 'static {
    /// Brings the session up.
    async fn connect(&self) -> Result<ConnectStatus, LinkError>;

    /// Tears the session down. Calling it on a session that is already down succeeds.
    async fn disconnect(&self) -> Result<(), LinkError>;

    /// True when the engine reports the peer as up.
    async fn is_peer_up(&self) -> bool;

    /// Wall-clock time of the most recent completed handshake, if any.
    async fn latest_handshake(&self) -> Option<SystemTime>;

    /// The endpoint address the engine resolved, if known. Diagnostic only.
    fn resolved_endpoint(&self) -> Option<IpAddr> {
        None
    }
}

/// # Route management for the tunnel interface.
#[async_trait]
pub trait RouteInstaller: Send + Sync + 'static {
    /// Makes the tunnel interface the default route.
    async fn set_default_route(&self) -> Result<(), LinkError>;

    /// Adds an allowed-subnet entry routed through the tunnel.
    async fn add_allowed_subnet(&self, network: Ipv4Addr, mask: Ipv4Addr)
    -> Result<(), LinkError>;
}

/// # Platform bring-up and session factory.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// One-time platform initialization. Called on every `start`.
    async fn initialize_platform(&self) -> Result<(), LinkError>;

    /// Creates a tunnel session from the given configuration.
    async fn initialize_tunnel(&self, config: &TunnelConfig) -> Result<Link, LinkError>;
}

/// A created tunnel session: its handle and its route installer.
#[derive(Clone)]
pub struct Link {
    /// Session handle.
    pub tunnel: Arc<dyn TunnelHandle>,
    /// Route installer bound to the same session.
    pub routes: Arc<dyn RouteInstaller>,
}

impl Link {
    /// Bundles a handle and a route installer.
    pub fn new(tunnel: Arc<dyn TunnelHandle>, routes: Arc<dyn RouteInstaller>) -> Self {
        Self { tunnel, routes }
    }

    /// Uses one engine object for both roles.
    pub fn from_engine<E>(engine: Arc<E>) -> Self
    where
        E: TunnelHandle + RouteInstaller,
    {
        Self {
            tunnel: engine.clone(),
            routes: engine,
        }
    }

    /// Installs the default route, then the allow-all subnet.
    pub(crate) async fn install_routes(&self) -> Result<(), LinkError> {
        self.routes.set_default_route().await?;
        self.routes
            .add_allowed_subnet(ALLOW_ALL_NETWORK, ALLOW_ALL_MASK)
            .await
    }
}

/// One health sample of a [`TunnelHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Health {
    /// Engine reports the peer as up.
    pub peer_up: bool,
    /// Most recent handshake, `None` when none happened yet.
    pub latest_handshake: Option<SystemTime>,
}

impl Health {
    /// Queries the handle for both liveness signals.
    pub async fn probe(tunnel: &dyn TunnelHandle) -> Self {
        Self {
            peer_up: tunnel.is_peer_up().await,
            latest_handshake: tunnel.latest_handshake().await,
        }
    }
}
