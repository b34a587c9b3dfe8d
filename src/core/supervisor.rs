//! # Supervisor: owns one tunnel's lifecycle and its supervision actor.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], the platform and
//! the global [`Config`]. `start` brings a tunnel up and spawns a [`LinkActor`];
//! `stop` cancels and joins it, then disconnects the tunnel.
//!
//! ## High-level architecture
//! ```text
//! start(cfg):
//!   stop previous run (if any)
//!   cfg.validate()
//!   Platform::initialize_platform()
//!   Platform::initialize_tunnel(&cfg) ──► Link
//!   TunnelHandle::connect()            (PendingResolution → ResolutionPending event)
//!   RouteInstaller::set_default_route()
//!   RouteInstaller::add_allowed_subnet(0.0.0.0, 0.0.0.0)
//!   spawn LinkActor::run(child token)  ──► publish SupervisionStarted
//!   (any failure: disconnect the partial link, return StartError)
//!
//! Event flow:
//!   LinkActor / Sequencer ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                  └──► Supervisor::subscribe() receivers
//!
//! stop():
//!   token.cancel() ─► join actor ─► TunnelHandle::disconnect() ─► publish SupervisionStopped
//!
//! check_connection():
//!   peer up ? nothing : ReconnectSequencer::attempt() ─► publish outcome
//! ```
//!
//! ## Rules
//! - Lifecycle calls (`start`, `stop`, `check_connection`) are serialized;
//!   status queries are not and never block on them.
//! - An on-demand attempt and the actor's own attempt never overlap.
//! - `stop` on a stopped supervisor does nothing.
//! - A panicking actor is reported as `CollaboratorError`; the tunnel stays up
//!   until `stop`.
//! - Dropping the supervisor cancels its actor and listener without disconnecting.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use linkvisor::{Config, Platform, Supervisor, TunnelConfig};
//!
//! async fn supervise(platform: Arc<dyn Platform>, tunnel: TunnelConfig) -> Result<(), linkvisor::RuntimeError> {
//!     let sup = Supervisor::builder(Config::default(), platform)
//!         .with_subscribers(vec![Arc::new(linkvisor::LogWriter::new()) as Arc<dyn linkvisor::Subscribe>])
//!         .build();
//!     sup.run_until_signal(tunnel).await
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use futures::FutureExt;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::{select, time::Instant};
use tokio_util::sync::CancellationToken;

use super::actor::LinkActor;
use super::builder::SupervisorBuilder;
use super::sequencer::{AttemptOutcome, ReconnectSequencer};
use super::shutdown;
use crate::config::Config;
use crate::error::{RuntimeError, StartError};
use crate::events::{Bus, Event, EventKind};
use crate::link::{ConnectStatus, Link, Platform, TunnelConfig};
use crate::subscribers::{SubscriberSet, panic_message};

/// The started tunnel, shared between the lifecycle slot and status queries.
struct Active {
    config: TunnelConfig,
    link: Link,
    name: Arc<str>,
}

/// A running supervision actor.
struct Running {
    active: Arc<Active>,
    token: CancellationToken,
    sequencer: ReconnectSequencer,
    join: JoinHandle<()>,
}

/// Starts, supervises and stops one tunnel.
///
/// Call [`stop`](Self::stop) before dropping it: `Drop` cannot await, so it
/// only cancels supervision and the tunnel is left connected.
pub struct Supervisor {
    cfg: Config,
    platform: Arc<dyn Platform>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    runtime_token: CancellationToken,
    lifecycle: Mutex<Option<Running>>,
    current: RwLock<Option<Arc<Active>>>,
}

impl Supervisor {
    /// Creates a builder for a supervisor using `platform`.
    pub fn builder(cfg: Config, platform: Arc<dyn Platform>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, platform)
    }

    /// Must be called inside a tokio runtime: spawns the subscriber listener.
    pub(crate) fn new_internal(
        cfg: Config,
        platform: Arc<dyn Platform>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        let sup = Self {
            cfg,
            platform,
            bus,
            subs,
            runtime_token: CancellationToken::new(),
            lifecycle: Mutex::new(None),
            current: RwLock::new(None),
        };
        sup.subscriber_listener();
        sup
    }

    /// Supervision timings in use.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns a receiver for every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Brings the tunnel up and starts supervising it.
    ///
    /// A run already in progress is stopped first. On error nothing keeps
    /// running and a partially created tunnel is disconnected.
    pub async fn start(&self, config: TunnelConfig) -> Result<(), StartError> {
        let mut slot = self.lifecycle.lock().await;
        if let Some(running) = slot.take() {
            self.shutdown_running(running).await;
        }

        config.validate()?;
        self.platform
            .initialize_platform()
            .await
            .map_err(StartError::Platform)?;
        let link = self
            .platform
            .initialize_tunnel(&config)
            .await
            .map_err(StartError::Tunnel)?;

        let name: Arc<str> = Arc::from(config.name.as_str());
        if let Err(err) = self.bring_up(&link, &name).await {
            if let Err(e) = link.tunnel.disconnect().await {
                self.publish_collaborator_error(&name, e.to_string());
            }
            return Err(err);
        }

        let active = Arc::new(Active { config, link, name });
        let token = self.runtime_token.child_token();
        let actor = LinkActor::new(
            active.name.clone(),
            active.link.clone(),
            &self.cfg,
            self.bus.clone(),
            Instant::now(),
        );

        self.bus
            .publish(Event::new(EventKind::SupervisionStarted).with_tunnel(active.name.clone()));
        let sequencer = actor.sequencer().clone();
        let join = tokio::spawn(supervise(
            actor,
            token.clone(),
            self.bus.clone(),
            active.name.clone(),
        ));

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(active.clone());
        *slot = Some(Running {
            active,
            token,
            sequencer,
            join,
        });
        Ok(())
    }

    /// Stops supervision and disconnects the tunnel. Safe to call repeatedly.
    pub async fn stop(&self) {
        let mut slot = self.lifecycle.lock().await;
        if let Some(running) = slot.take() {
            self.shutdown_running(running).await;
        }
    }

    /// Checks the link once, outside the sampling period.
    ///
    /// With the peer down, runs one reconnect attempt right away and publishes
    /// its outcome. Returns `None` when nothing is started, the peer is up, or
    /// the attempt was cancelled. The latest handshake stays available through
    /// [`last_handshake`](Self::last_handshake).
    pub async fn check_connection(&self) -> Option<AttemptOutcome> {
        let slot = self.lifecycle.lock().await;
        let running = slot.as_ref()?;
        if running.active.link.tunnel.is_peer_up().await {
            return None;
        }

        let outcome = running.sequencer.attempt(&running.token).await?;
        self.bus
            .publish(outcome.clone().into_event(running.active.name.clone()));
        Some(outcome)
    }

    /// True while a tunnel is started and its peer reports up.
    pub async fn is_connected(&self) -> bool {
        match self.active() {
            Some(active) => active.link.tunnel.is_peer_up().await,
            None => false,
        }
    }

    /// Most recent handshake of the started tunnel, if any.
    pub async fn last_handshake(&self) -> Option<SystemTime> {
        match self.active() {
            Some(active) => active.link.tunnel.latest_handshake().await,
            None => None,
        }
    }

    /// Human-readable dump of the started tunnel's configuration and status.
    ///
    /// The private key is never included.
    pub async fn describe_configuration(&self) -> String {
        let Some(active) = self.active() else {
            return "Tunnel Configuration: not started".to_string();
        };
        let cfg = &active.config;
        let connected = active.link.tunnel.is_peer_up().await;

        let mut out = String::new();
        out.push_str(&format!("Tunnel Configuration ({}):\n", cfg.name));
        out.push_str(&format!("  Local IP: {}\n", cfg.address));
        out.push_str(&format!("  Subnet: {}\n", cfg.netmask));
        out.push_str(&format!("  Gateway: {}\n", cfg.gateway));
        out.push_str(&format!("  Endpoint: {}:{}\n", cfg.endpoint, cfg.port));
        out.push_str(&format!("  Peer Public Key: {}\n", cfg.peer_public_key));
        out.push_str(&format!(
            "  Preshared Key: {}\n",
            if cfg.preshared_key.is_some() { "IN USE" } else { "NOT IN USE" }
        ));
        out.push_str(&format!(
            "  Connection Status: {}\n",
            if connected { "CONNECTED" } else { "DISCONNECTED" }
        ));
        match cfg.persistent_keepalive {
            0 => out.push_str("  Keepalive: (DISABLED)\n"),
            secs => out.push_str(&format!("  Keepalive: {secs} seconds\n")),
        }
        let resolved = active
            .link
            .tunnel
            .resolved_endpoint()
            .or_else(|| cfg.endpoint.ip());
        match resolved {
            Some(ip) => out.push_str(&format!("  Resolved Endpoint IP: {ip}\n")),
            None => out.push_str("  Resolved Endpoint IP: unresolved\n"),
        }
        out
    }

    /// Starts the tunnel, waits for a termination signal, then stops it.
    pub async fn run_until_signal(&self, config: TunnelConfig) -> Result<(), RuntimeError> {
        self.start(config).await?;
        let waited = shutdown::wait_for_shutdown_signal().await;
        self.stop().await;
        waited.map_err(RuntimeError::Signal)
    }

    async fn bring_up(&self, link: &Link, name: &Arc<str>) -> Result<(), StartError> {
        match link.tunnel.connect().await.map_err(StartError::Tunnel)? {
            ConnectStatus::Connected => {}
            ConnectStatus::PendingResolution => self
                .bus
                .publish(Event::new(EventKind::ResolutionPending).with_tunnel(name.clone())),
        }
        link.install_routes().await.map_err(StartError::Routes)
    }

    async fn shutdown_running(&self, running: Running) {
        let name = running.active.name.clone();
        running.token.cancel();
        if let Err(e) = running.join.await {
            self.publish_collaborator_error(&name, format!("supervision task failed: {e}"));
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;

        if let Err(e) = running.active.link.tunnel.disconnect().await {
            self.publish_collaborator_error(&name, e.to_string());
        }
        self.bus
            .publish(Event::new(EventKind::SupervisionStopped).with_tunnel(name));
    }

    fn active(&self) -> Option<Arc<Active>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish_collaborator_error(&self, name: &Arc<str>, reason: String) {
        self.bus.publish(
            Event::new(EventKind::CollaboratorError)
                .with_tunnel(name.clone())
                .with_reason(reason),
        );
    }

    /// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            loop {
                select! {
                    _ = token.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
    }
}

/// Runs `actor` until cancelled, reporting a panic instead of losing it.
async fn supervise(actor: LinkActor, token: CancellationToken, bus: Bus, tunnel: Arc<str>) {
    if let Err(panic) = AssertUnwindSafe(actor.run(token)).catch_unwind().await {
        bus.publish(
            Event::new(EventKind::CollaboratorError)
                .with_tunnel(tunnel)
                .with_reason(format!("supervision stopped: {}", panic_message(&*panic))),
        );
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time;

    use super::*;
    use crate::error::LinkError;
    use crate::link::mock::{Call, MockEngine, MockPlatform};
    use crate::link::TunnelHandle;
    use crate::subscribers::Subscribe;

    const KEY_A: &str = "YEocP0e2o1WT5GlvBvQzVF7EeR6z9aCk4ANOVPBsw2M=";
    const KEY_B: &str = "9jalV3EEBnVXahro0pRMQ+cHlmjE33Slo9tddzCVtCw=";

    fn tunnel() -> TunnelConfig {
        TunnelConfig::new(Ipv4Addr::new(10, 6, 0, 2), KEY_A, "203.0.113.9", KEY_B, 51820)
    }

    fn supervisor(platform: &Arc<MockPlatform>) -> Arc<Supervisor> {
        let platform: Arc<dyn Platform> = platform.clone();
        Supervisor::builder(Config::default(), platform).build()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    fn count(kinds: &[EventKind], kind: EventKind) -> usize {
        kinds.iter().filter(|k| **k == kind).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_start_never_reconnects() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        time::sleep(Duration::from_secs(120)).await;

        assert!(sup.is_connected().await);
        assert!(sup.last_handshake().await.is_some());
        let kinds = drain(&mut rx);
        assert_eq!(kinds[0], EventKind::SupervisionStarted);
        assert_eq!(count(&kinds, EventKind::HandshakeEstablished), 1);
        assert_eq!(count(&kinds, EventKind::ReconnectScheduled), 0);
        assert_eq!(platform.engine().count(&Call::Connect), 1);
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_bring_up_in_order() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);

        sup.start(tunnel()).await.unwrap();

        assert_eq!(
            platform.engine().calls(),
            vec![
                Call::Connect,
                Call::SetDefaultRoute,
                Call::AddAllowedSubnet(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED),
            ]
        );
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_grace_then_two_attempts() {
        let platform = MockPlatform::new(MockEngine::new());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        // Loss is detected on the 60s sample; stop just before the 90s sample.
        time::sleep(Duration::from_secs(87)).await;
        let kinds = drain(&mut rx);

        assert_eq!(count(&kinds, EventKind::GraceElapsed), 1);
        assert_eq!(count(&kinds, EventKind::LinkLost), 1);
        assert_eq!(count(&kinds, EventKind::ReconnectScheduled), 2);
        assert_eq!(count(&kinds, EventKind::ReconnectFailed), 2);
        assert_eq!(platform.engine().count(&Call::Connect), 3);
        assert!(!sup.is_connected().await);
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_emits_one_recovered_event() {
        let engine = MockEngine::new();
        let platform = MockPlatform::new(engine.clone());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        time::sleep(Duration::from_secs(72)).await;
        engine.set_up_on_connect(true);
        time::sleep(Duration::from_secs(30)).await;

        let kinds = drain(&mut rx);
        assert_eq!(count(&kinds, EventKind::LinkReestablished), 1);
        assert_eq!(count(&kinds, EventKind::LinkRecovered), 1);
        assert!(sup.is_connected().await);
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_connection_reconnects_a_down_peer() {
        let engine = MockEngine::new();
        let platform = MockPlatform::new(engine.clone());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        engine.clear_calls();
        engine.set_up_on_connect(true);
        drain(&mut rx);

        assert_eq!(sup.check_connection().await, Some(AttemptOutcome::Reestablished));
        assert_eq!(
            engine.calls(),
            vec![
                Call::Disconnect,
                Call::Connect,
                Call::SetDefaultRoute,
                Call::AddAllowedSubnet(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED),
            ]
        );
        assert!(sup.is_connected().await);
        let kinds = drain(&mut rx);
        assert_eq!(count(&kinds, EventKind::LinkReestablished), 1);
        assert_eq!(count(&kinds, EventKind::ReconnectScheduled), 0);
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_connection_leaves_a_healthy_link_alone() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);

        assert_eq!(sup.check_connection().await, None);

        sup.start(tunnel()).await.unwrap();
        platform.engine().clear_calls();
        assert_eq!(sup.check_connection().await, None);
        assert!(platform.engine().calls().is_empty());
        assert!(sup.last_handshake().await.is_some());
        sup.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_sample_interval_still_supervises() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let cfg = Config::from_toml("sample_interval_secs = 9223372036854775807").unwrap();
        let sup = Supervisor::builder(cfg, platform.clone() as Arc<dyn Platform>).build();
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        time::sleep(Duration::from_secs(120)).await;
        sup.stop().await;

        let kinds = drain(&mut rx);
        assert_eq!(count(&kinds, EventKind::CollaboratorError), 0);
        assert_eq!(count(&kinds, EventKind::SupervisionStopped), 1);
        assert_eq!(platform.engine().count(&Call::Disconnect), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_without_stop_leaves_tunnel_up() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);

        sup.start(tunnel()).await.unwrap();
        drop(sup);
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(platform.engine().count(&Call::Disconnect), 0);
        assert!(platform.engine().is_peer_up().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_is_safe() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        sup.stop().await;
        sup.stop().await;

        assert!(!sup.is_connected().await);
        assert!(sup.last_handshake().await.is_none());
        assert_eq!(platform.engine().count(&Call::Disconnect), 1);
        let kinds = drain(&mut rx);
        assert_eq!(count(&kinds, EventKind::SupervisionStopped), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_an_attempt() {
        let platform = MockPlatform::new(MockEngine::new());
        let sup = supervisor(&platform);

        sup.start(tunnel()).await.unwrap();
        // The first attempt starts on the 70s sample and settles for 3s.
        time::sleep(Duration::from_millis(70_500)).await;
        sup.stop().await;

        assert_eq!(platform.engine().count(&Call::Connect), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_begins_fresh() {
        let engine = MockEngine::new();
        let platform = MockPlatform::new(engine.clone());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();
        time::sleep(Duration::from_secs(72)).await;
        sup.start(tunnel().with_name("wg1")).await.unwrap();
        drain(&mut rx);

        time::sleep(Duration::from_secs(30)).await;
        let kinds = drain(&mut rx);
        assert!(kinds.iter().all(|k| *k == EventKind::StartupWaiting));
        assert_eq!(platform.tunnels_created(), 2);
        sup.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_config_touches_nothing() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);
        let mut cfg = tunnel();
        cfg.port = 0;

        let err = sup.start(cfg).await.unwrap_err();

        assert_eq!(err.as_label(), "start_config");
        assert_eq!(platform.tunnels_created(), 0);
        assert!(platform.engine().calls().is_empty());
    }

    #[tokio::test]
    async fn test_platform_and_init_errors() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);

        platform.fail_platform(Some(LinkError::Platform("no crypto".into())));
        let err = sup.start(tunnel()).await.unwrap_err();
        assert_eq!(err.as_label(), "start_platform");

        platform.fail_platform(None);
        platform.fail_init(Some(LinkError::Init("bad key".into())));
        let err = sup.start(tunnel()).await.unwrap_err();
        assert_eq!(err.as_label(), "start_tunnel");
        assert!(!sup.is_connected().await);
    }

    #[tokio::test]
    async fn test_route_error_disconnects_partial_link() {
        let engine = MockEngine::healthy();
        engine.fail_allowed_subnet(Some(LinkError::Route("table full".into())));
        let platform = MockPlatform::new(engine.clone());
        let sup = supervisor(&platform);

        let err = sup.start(tunnel()).await.unwrap_err();

        assert!(matches!(err, StartError::Routes(LinkError::Route(_))));
        assert_eq!(engine.calls().last(), Some(&Call::Disconnect));
        assert!(!sup.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_error_fails_start() {
        let engine = MockEngine::healthy();
        engine.push_connect(Err(LinkError::Connect("refused".into())));
        let platform = MockPlatform::new(engine.clone());
        let sup = supervisor(&platform);

        let err = sup.start(tunnel()).await.unwrap_err();

        assert_eq!(err.as_label(), "start_tunnel");
        assert_eq!(engine.count(&Call::SetDefaultRoute), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_resolution_is_not_an_error() {
        let engine = MockEngine::new();
        engine.push_connect(Ok(ConnectStatus::PendingResolution));
        let platform = MockPlatform::new(engine.clone());
        let sup = supervisor(&platform);
        let mut rx = sup.subscribe();

        sup.start(tunnel()).await.unwrap();

        let kinds = drain(&mut rx);
        assert_eq!(
            kinds,
            vec![EventKind::ResolutionPending, EventKind::SupervisionStarted]
        );
        assert_eq!(engine.count(&Call::SetDefaultRoute), 1);
        sup.stop().await;
    }

    #[tokio::test]
    async fn test_describe_configuration() {
        let platform = MockPlatform::new(MockEngine::healthy());
        let sup = supervisor(&platform);
        assert!(sup.describe_configuration().await.contains("not started"));

        sup.start(tunnel().with_keepalive(0)).await.unwrap();
        let dump = sup.describe_configuration().await;

        assert!(dump.contains("Local IP: 10.6.0.2"));
        assert!(dump.contains("Subnet: 255.255.255.255"));
        assert!(dump.contains("Endpoint: 203.0.113.9:51820"));
        assert!(dump.contains(KEY_B));
        assert!(dump.contains("Preshared Key: NOT IN USE"));
        assert!(dump.contains("Connection Status: CONNECTED"));
        assert!(dump.contains("Keepalive: (DISABLED)"));
        assert!(dump.contains("Resolved Endpoint IP: 203.0.113.9"));
        assert!(!dump.contains(KEY_A));
        sup.stop().await;
    }

    struct Counter(std::sync::Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, ev: &Event) {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_lifecycle_events() {
        let counter = Arc::new(Counter(std::sync::Mutex::new(Vec::new())));
        let platform: Arc<dyn Platform> = MockPlatform::new(MockEngine::healthy());
        let sup = Supervisor::builder(Config::default(), platform)
            .with_subscribers(vec![counter.clone() as Arc<dyn Subscribe>])
            .build();

        sup.start(tunnel()).await.unwrap();
        sup.stop().await;

        for _ in 0..50 {
            if counter.0.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let seen = counter.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![EventKind::SupervisionStarted, EventKind::SupervisionStopped]
        );
    }
}
