//! In-memory tunnel engine for tests and demos.
//!
//! [`MockEngine`] implements both [`TunnelHandle`] and [`RouteInstaller`] with
//! scripted outcomes and a call log; [`MockPlatform`] hands it out as a [`Link`].
//!
//! Behavior:
//! - `disconnect` marks the peer down;
//! - `connect` pops the next scripted result (default `Ok(Connected)`) and, when
//!   `up_on_connect` is set, marks the peer up with a fresh handshake.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use async_trait::async_trait;

use super::{ConnectStatus, Link, Platform, RouteInstaller, TunnelConfig, TunnelHandle};
use crate::error::LinkError;

/// One recorded collaborator call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Connect,
    Disconnect,
    SetDefaultRoute,
    AddAllowedSubnet(Ipv4Addr, Ipv4Addr),
}

#[derive(Default)]
struct State {
    peer_up: bool,
    handshake: Option<SystemTime>,
    up_on_connect: bool,
    connect_script: VecDeque<Result<ConnectStatus, LinkError>>,
    default_route_error: Option<LinkError>,
    allowed_subnet_error: Option<LinkError>,
    resolved: Option<IpAddr>,
    calls: Vec<Call>,
}

/// Scripted tunnel engine.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<State>,
}

impl MockEngine {
    /// Peer down, no handshake, `connect` does not bring the peer up.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Peer up with a handshake just now; `connect` keeps it up.
    pub fn healthy() -> Arc<Self> {
        let engine = Self::new();
        {
            let mut st = engine.lock();
            st.peer_up = true;
            st.handshake = Some(SystemTime::now());
            st.up_on_connect = true;
        }
        engine
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_peer_up(&self, up: bool) {
        self.lock().peer_up = up;
    }

    pub fn set_handshake(&self, at: Option<SystemTime>) {
        self.lock().handshake = at;
    }

    /// Whether a successful `connect` brings the peer up.
    pub fn set_up_on_connect(&self, up: bool) {
        self.lock().up_on_connect = up;
    }

    /// Queues the result of a future `connect` call.
    pub fn push_connect(&self, result: Result<ConnectStatus, LinkError>) {
        self.lock().connect_script.push_back(result);
    }

    pub fn fail_default_route(&self, err: Option<LinkError>) {
        self.lock().default_route_error = err;
    }

    pub fn fail_allowed_subnet(&self, err: Option<LinkError>) {
        self.lock().allowed_subnet_error = err;
    }

    pub fn set_resolved(&self, ip: Option<IpAddr>) {
        self.lock().resolved = ip;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `call` exactly.
    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl TunnelHandle for MockEngine {
    async fn connect(&self) -> Result<ConnectStatus, LinkError> {
        let mut st = self.lock();
        st.calls.push(Call::Connect);
        let res = st
            .connect_script
            .pop_front()
            .unwrap_or(Ok(ConnectStatus::Connected));
        if matches!(res, Ok(ConnectStatus::Connected)) && st.up_on_connect {
            st.peer_up = true;
            st.handshake = Some(SystemTime::now());
        }
        res
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        let mut st = self.lock();
        st.calls.push(Call::Disconnect);
        st.peer_up = false;
        Ok(())
    }

    async fn is_peer_up(&self) -> bool {
        self.lock().peer_up
    }

    async fn latest_handshake(&self) -> Option<SystemTime> {
        self.lock().handshake
    }

    fn resolved_endpoint(&self) -> Option<IpAddr> {
        self.lock().resolved
    }
}

#[async_trait]
impl RouteInstaller for MockEngine {
    async fn set_default_route(&self) -> Result<(), LinkError> {
        let mut st = self.lock();
        st.calls.push(Call::SetDefaultRoute);
        match &st.default_route_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn add_allowed_subnet(
        &self,
        network: Ipv4Addr,
        mask: Ipv4Addr,
    ) -> Result<(), LinkError> {
        let mut st = self.lock();
        st.calls.push(Call::AddAllowedSubnet(network, mask));
        match &st.allowed_subnet_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Platform handing out one shared [`MockEngine`].
pub struct MockPlatform {
    engine: Arc<MockEngine>,
    platform_error: Mutex<Option<LinkError>>,
    init_error: Mutex<Option<LinkError>>,
    tunnels_created: Mutex<usize>,
}

impl MockPlatform {
    pub fn new(engine: Arc<MockEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            platform_error: Mutex::new(None),
            init_error: Mutex::new(None),
            tunnels_created: Mutex::new(0),
        })
    }

    pub fn engine(&self) -> &Arc<MockEngine> {
        &self.engine
    }

    pub fn fail_platform(&self, err: Option<LinkError>) {
        *lock(&self.platform_error) = err;
    }

    pub fn fail_init(&self, err: Option<LinkError>) {
        *lock(&self.init_error) = err;
    }

    /// Number of successful `initialize_tunnel` calls.
    pub fn tunnels_created(&self) -> usize {
        *lock(&self.tunnels_created)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Platform for MockPlatform {
    async fn initialize_platform(&self) -> Result<(), LinkError> {
        match lock(&self.platform_error).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn initialize_tunnel(&self, _config: &TunnelConfig) -> Result<Link, LinkError> {
        if let Some(err) = lock(&self.init_error).clone() {
            return Err(err);
        }
        *lock(&self.tunnels_created) += 1;
        Ok(Link::from_engine(self.engine.clone()))
    }
}
