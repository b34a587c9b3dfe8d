//! Error types used by the linkvisor runtime and its collaborators.
//!
//! This module defines four enums:
//!
//! - [`LinkError`]: failures reported by the external tunnel engine or network stack.
//! - [`ConfigError`]: invalid or unreadable configuration.
//! - [`StartError`]: why [`Supervisor::start`](crate::Supervisor::start) refused to bring a tunnel up.
//! - [`RuntimeError`]: failures of the signal-driven run loop.
//!
//! Only `start` surfaces errors to its caller. Everything that goes wrong inside
//! the supervision loop is converted into an [`Event`](crate::Event) instead.
//! All of them provide `as_label` for logs/metrics.

use thiserror::Error;

/// # Errors produced by the external tunnel engine.
///
/// Collaborators ([`Platform`](crate::Platform), [`TunnelHandle`](crate::TunnelHandle),
/// [`RouteInstaller`](crate::RouteInstaller)) report failures with this type.
/// Messages are free-form; the variant tells which step failed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Platform-level initialization failed (crypto backend, timers, ...).
    #[error("platform initialization failed: {0}")]
    Platform(String),

    /// The tunnel session could not be created from the given configuration.
    #[error("tunnel initialization failed: {0}")]
    Init(String),

    /// Connecting the tunnel session failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Tearing the tunnel session down failed.
    #[error("disconnect failed: {0}")]
    Disconnect(String),

    /// Installing a route for the tunnel interface failed.
    #[error("route installation failed: {0}")]
    Route(String),
}

impl LinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use linkvisor::LinkError;
    ///
    /// let err = LinkError::Route("no such interface".into());
    /// assert_eq!(err.as_label(), "link_route");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LinkError::Platform(_) => "link_platform",
            LinkError::Init(_) => "link_init",
            LinkError::Connect(_) => "link_connect",
            LinkError::Disconnect(_) => "link_disconnect",
            LinkError::Route(_) => "link_route",
        }
    }
}

/// # Configuration errors.
///
/// Raised while parsing or validating [`Config`](crate::Config) and
/// [`TunnelConfig`](crate::TunnelConfig).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required field is empty or absent.
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    /// A field has a value the tunnel cannot use.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The TOML document could not be deserialized.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Missing(_) => "config_missing",
            ConfigError::Invalid { .. } => "config_invalid",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::Io(_) => "config_io",
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// # Errors returned by [`Supervisor::start`](crate::Supervisor::start).
///
/// Each variant is fatal to that start call: no supervision task is spawned and
/// any partially created tunnel is disconnected before returning.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StartError {
    /// The tunnel configuration was rejected before touching the platform.
    #[error("invalid tunnel configuration: {0}")]
    Config(#[from] ConfigError),

    /// `initialize_platform` failed.
    #[error("platform unavailable: {0}")]
    Platform(#[source] LinkError),

    /// `initialize_tunnel` or the initial `connect` failed.
    #[error("tunnel could not be started: {0}")]
    Tunnel(#[source] LinkError),

    /// Installing the default route or the allow-all subnet failed.
    #[error("tunnel routes could not be installed: {0}")]
    Routes(#[source] LinkError),
}

impl StartError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use linkvisor::{LinkError, StartError};
    ///
    /// let err = StartError::Routes(LinkError::Route("busy".into()));
    /// assert_eq!(err.as_label(), "start_routes");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StartError::Config(_) => "start_config",
            StartError::Platform(_) => "start_platform",
            StartError::Tunnel(_) => "start_tunnel",
            StartError::Routes(_) => "start_routes",
        }
    }
}

/// # Errors produced by the supervision runtime itself.
///
/// Returned by [`Supervisor::run_until_signal`](crate::Supervisor::run_until_signal).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The tunnel could not be started.
    #[error(transparent)]
    Start(#[from] StartError),

    /// OS signal listeners could not be registered; the tunnel was stopped again.
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Start(e) => e.as_label(),
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
