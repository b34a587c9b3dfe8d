//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized timings for link supervision, and
//! [`ConfigFile`], the on-disk TOML layout bundling it with a
//! [`TunnelConfig`](crate::TunnelConfig).
//!
//! ## TOML layout
//! ```toml
//! [supervision]
//! sample_interval_secs = 5
//! grace_period_secs = 60
//! stale_threshold_secs = 300
//! backoff_initial_secs = 10
//! backoff_step_secs = 10
//! backoff_max_secs = 120
//! settle_after_disconnect_ms = 1000
//! settle_after_connect_ms = 2000
//! bus_capacity = 1024
//!
//! [tunnel]
//! private_key = "..."
//! address = "10.6.0.2"
//! endpoint = "vpn.example.com"
//! peer_public_key = "..."
//! ```
//!
//! Every `[supervision]` key is optional and falls back to [`Config::default`].
//!
//! ## Sentinel values
//! - `sample_interval = 0` → clamped to 1ms (a zero period would spin)
//! - `sample_interval` above one day → clamped to [`MAX_SAMPLE_INTERVAL`]
//! - `bus_capacity = 0` → clamped to 1

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::link::TunnelConfig;
use crate::policies::BackoffPolicy;

/// Longest accepted sampling period.
pub const MAX_SAMPLE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Global configuration for the supervision runtime.
///
/// ## Field semantics
/// - `sample_interval`: period between two health samples
/// - `grace_period`: startup window during which no reconnect is attempted
/// - `stale_threshold`: a handshake older than this marks the link as down
/// - `backoff`: wait between reconnect attempts
/// - `settle_after_disconnect` / `settle_after_connect`: pauses inside one attempt
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct Config {
    /// Period between two health samples.
    pub sample_interval: Duration,

    /// Startup window after `start` during which failures are not acted on.
    ///
    /// Ends early as soon as a healthy handshake is observed.
    pub grace_period: Duration,

    /// Maximum handshake age still considered alive in steady phase.
    pub stale_threshold: Duration,

    /// Wait between reconnect attempts.
    pub backoff: BackoffPolicy,

    /// Pause after `disconnect` so the stack releases interface/session resources.
    pub settle_after_disconnect: Duration,

    /// Pause after `connect` so the handshake can be initiated.
    pub settle_after_connect: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the sampling period clamped to `1ms..=MAX_SAMPLE_INTERVAL`.
    #[inline]
    pub fn sample_interval_clamped(&self) -> Duration {
        self.sample_interval
            .clamp(Duration::from_millis(1), MAX_SAMPLE_INTERVAL)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Parses a TOML document whose top-level keys are the supervision keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `sample_interval = 5s`
    /// - `grace_period = 60s`
    /// - `stale_threshold = 300s`
    /// - `backoff = BackoffPolicy::default()` (10s, +10s, max 120s)
    /// - `settle_after_disconnect = 1s`
    /// - `settle_after_connect = 2s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
            grace_period: Duration::from_secs(60),
            stale_threshold: Duration::from_secs(300),
            backoff: BackoffPolicy::default(),
            settle_after_disconnect: Duration::from_secs(1),
            settle_after_connect: Duration::from_secs(2),
            bus_capacity: 1024,
        }
    }
}

/// Flat, integer-valued TOML form of [`Config`].
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    sample_interval_secs: u64,
    grace_period_secs: u64,
    stale_threshold_secs: u64,
    backoff_initial_secs: u64,
    backoff_step_secs: u64,
    backoff_max_secs: u64,
    settle_after_disconnect_ms: u64,
    settle_after_connect_ms: u64,
    bus_capacity: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        let cfg = Config::default();
        Self {
            sample_interval_secs: cfg.sample_interval.as_secs(),
            grace_period_secs: cfg.grace_period.as_secs(),
            stale_threshold_secs: cfg.stale_threshold.as_secs(),
            backoff_initial_secs: cfg.backoff.initial.as_secs(),
            backoff_step_secs: cfg.backoff.step.as_secs(),
            backoff_max_secs: cfg.backoff.max.as_secs(),
            settle_after_disconnect_ms: cfg.settle_after_disconnect.as_millis() as u64,
            settle_after_connect_ms: cfg.settle_after_connect.as_millis() as u64,
            bus_capacity: cfg.bus_capacity,
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            sample_interval: Duration::from_secs(raw.sample_interval_secs),
            grace_period: Duration::from_secs(raw.grace_period_secs),
            stale_threshold: Duration::from_secs(raw.stale_threshold_secs),
            backoff: BackoffPolicy {
                initial: Duration::from_secs(raw.backoff_initial_secs),
                step: Duration::from_secs(raw.backoff_step_secs),
                max: Duration::from_secs(raw.backoff_max_secs),
            },
            settle_after_disconnect: Duration::from_millis(raw.settle_after_disconnect_ms),
            settle_after_connect: Duration::from_millis(raw.settle_after_connect_ms),
            bus_capacity: raw.bus_capacity,
        }
    }
}

/// On-disk configuration: supervision timings plus the tunnel to supervise.
#[derive(Clone, Debug, Deserialize)]
pub struct ConfigFile {
    /// Supervision timings (all keys optional).
    #[serde(default)]
    pub supervision: Config,

    /// The tunnel identity and endpoint.
    pub tunnel: TunnelConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string and validate the tunnel section.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.tunnel.validate()?;
        Ok(file)
    }
}
