//! Error types used by the idle-tracker runtime and its collaborators.
//!
//! This module defines four error enums:
//!
//! - [`ConfigError`]: invalid runtime settings or an unreadable broker file.
//! - [`PublishError`]: a single publish attempt rejected by the sink.
//! - [`SourceError`]: an activity source that did not respond.
//! - [`RuntimeError`]: conditions that end the process.
//!
//! Each type provides `as_label` (stable snake_case) for logs, mirroring the
//! labels used in [`Event`](crate::Event) reasons.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::TimerDeath;

/// # Invalid configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The publish interval must be strictly positive.
    #[error("publish interval must be greater than zero")]
    ZeroInterval,

    /// The broker file could not be read.
    #[error("cannot read broker config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The broker file is not valid TOML or misses required keys.
    #[error("invalid broker config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The requested profile does not exist in the broker file.
    #[error("broker profile {profile:?} not found")]
    MissingProfile { profile: String },

    /// No configuration directory could be determined for this user.
    #[error("no configuration directory available")]
    NoConfigDir,

    /// TLS files are configured but cannot form a usable TLS setup.
    #[error("invalid TLS settings: {reason}")]
    Tls { reason: String },

    /// The log filter is invalid or a global logger is already installed.
    #[error("cannot initialise logging: {reason}")]
    Logging { reason: String },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroInterval => "config_zero_interval",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::MissingProfile { .. } => "config_missing_profile",
            ConfigError::NoConfigDir => "config_no_dir",
            ConfigError::Tls { .. } => "config_tls",
            ConfigError::Logging { .. } => "config_logging",
        }
    }
}

/// # A rejected publish attempt.
///
/// The numeric [`code`](PublishError::code) mirrors the bus client's return
/// code; a successful publish has no error and is equivalent to code `0`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The sink reported a non-zero return code.
    #[error("publish rejected (code {code}): {detail}")]
    Rejected { code: i32, detail: String },

    /// The sink is not connected to its broker.
    #[error("sink not connected")]
    NotConnected,

    /// The sink has been shut down.
    #[error("sink closed")]
    Closed,
}

impl PublishError {
    /// Numeric code as reported by the bus client (never `0`).
    ///
    /// `NotConnected` and `Closed` use the MQTT client codes for "no connection"
    /// (4) and "connection lost" (7).
    pub fn code(&self) -> i32 {
        match self {
            PublishError::Rejected { code, .. } => *code,
            PublishError::NotConnected => 4,
            PublishError::Closed => 7,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Rejected { .. } => "publish_rejected",
            PublishError::NotConnected => "publish_not_connected",
            PublishError::Closed => "publish_closed",
        }
    }
}

/// # An activity source that could not be used.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Nothing answered at this identity.
    #[error("activity source {identity} unavailable: {reason}")]
    Unavailable { identity: String, reason: String },

    /// The source answered but change notifications could not be registered.
    #[error("cannot watch activity source {identity}: {reason}")]
    Watch { identity: String, reason: String },
}

impl SourceError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::Unavailable { .. } => "source_unavailable",
            SourceError::Watch { .. } => "source_watch",
        }
    }
}

/// # Conditions that stop the tracker.
///
/// Every variant maps to a non-zero process exit status via
/// [`RuntimeError::exit_code`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// None of the candidate activity sources responded.
    #[error("no activity source found (tried: {tried:?})")]
    NoActivitySource { tried: Vec<String> },

    /// The publisher's timer died after too many consecutive failures.
    #[error("publisher died after {} consecutive failures", .0.failures)]
    PublisherDied(TimerDeath),

    /// The broker refused the connection.
    #[error("broker refused connection, return code {code}")]
    BrokerRefused { code: u8 },

    /// The broker connection could not be established at all.
    #[error("broker connection failed: {reason}")]
    BrokerUnreachable { reason: String },

    /// Signal handlers could not be installed.
    #[error("signal handling failed: {0}")]
    Signal(#[from] std::io::Error),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use idle_tracker::RuntimeError;
    ///
    /// let err = RuntimeError::BrokerRefused { code: 5 };
    /// assert_eq!(err.as_label(), "runtime_broker_refused");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoActivitySource { .. } => "runtime_no_activity_source",
            RuntimeError::PublisherDied(_) => "runtime_publisher_died",
            RuntimeError::BrokerRefused { .. } => "runtime_broker_refused",
            RuntimeError::BrokerUnreachable { .. } => "runtime_broker_unreachable",
            RuntimeError::Signal(_) => "runtime_signal",
            RuntimeError::Config(_) => "runtime_config",
        }
    }

    /// Process exit status for this condition (always non-zero).
    pub fn exit_code(&self) -> u8 {
        match self {
            RuntimeError::Config(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_error_codes_are_never_zero() {
        let errs = [
            PublishError::Rejected {
                code: 7,
                detail: "nope".into(),
            },
            PublishError::NotConnected,
            PublishError::Closed,
        ];
        for e in errs {
            assert_ne!(e.code(), 0, "{e}");
        }
    }

    #[test]
    fn publish_and_source_labels_are_stable() {
        let rejected = PublishError::Rejected {
            code: 15,
            detail: "request queue full".into(),
        };
        assert_eq!(rejected.as_label(), "publish_rejected");
        assert_eq!(PublishError::NotConnected.as_label(), "publish_not_connected");
        assert_eq!(PublishError::Closed.as_label(), "publish_closed");

        let unavailable = SourceError::Unavailable {
            identity: "org.gnome.ScreenSaver".into(),
            reason: "no such name".into(),
        };
        let watch = SourceError::Watch {
            identity: "org.gnome.ScreenSaver".into(),
            reason: "no signal".into(),
        };
        assert_eq!(unavailable.as_label(), "source_unavailable");
        assert_eq!(watch.as_label(), "source_watch");
    }

    #[test]
    fn runtime_errors_exit_non_zero() {
        let errs = [
            RuntimeError::NoActivitySource { tried: vec![] },
            RuntimeError::BrokerRefused { code: 5 },
            RuntimeError::Config(ConfigError::ZeroInterval),
        ];
        for e in errs {
            assert_ne!(e.exit_code(), 0, "{}", e.as_label());
        }
    }
}
