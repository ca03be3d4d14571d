//! # Runtime and broker configuration.
//!
//! - [`Config`]: publisher cadence, failure threshold and event bus sizing.
//! - [`BrokerConfig`]: one broker profile from `~/.config/mqtt/mqtt.toml`.
//!
//! ## Sentinel values
//! - `failure_threshold = 0` → never give up (only cancellation stops publishing)
//!
//! ## Broker file
//! ```toml
//! [default]
//! broker = "mqtt.example.net"
//! port = 8883
//! username = "tracker"
//! password = "secret"
//! ca_certs = "ca.pem"        # relative paths resolve against the file's directory
//! certfile = "client.pem"
//! keyfile = "client.key"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Global configuration for the tracker runtime.
///
/// ## Field semantics
/// - `interval`: heartbeat period between publishes (must be `> 0`)
/// - `failure_threshold`: consecutive failed publishes before the timer dies (`0` = never)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub interval: Duration,
    pub failure_threshold: u32,
    pub bus_capacity: usize,
}

impl Config {
    /// Rejects settings the retry timer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// Failure threshold as an `Option` (`None` → infinite retries).
    #[inline]
    pub fn failure_limit(&self) -> Option<u32> {
        match self.failure_threshold {
            0 => None,
            n => Some(n),
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `interval = 5s`
    /// - `failure_threshold = 5`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            failure_threshold: 5,
            bus_capacity: 1024,
        }
    }
}

/// Connection settings for one broker profile.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BrokerConfig {
    pub broker: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub certfile: Option<PathBuf>,
    #[serde(default)]
    pub keyfile: Option<PathBuf>,
    #[serde(default)]
    pub ca_certs: Option<PathBuf>,
}

impl BrokerConfig {
    /// Loads `profile` from the TOML file at `path`.
    pub fn load(path: &Path, profile: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, profile, root).map_err(|e| match e {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Missing(profile) => ConfigError::MissingProfile { profile },
        })
    }

    /// Loads `profile` from `mqtt.toml` in the default config directory.
    pub fn load_default(profile: &str) -> Result<Self, ConfigError> {
        Self::load(&default_config_root()?.join("mqtt.toml"), profile)
    }

    fn parse(text: &str, profile: &str, root: &Path) -> Result<Self, ParseFailure> {
        let mut profiles: HashMap<String, BrokerConfig> =
            toml::from_str(text).map_err(ParseFailure::Toml)?;
        let mut cfg = profiles
            .remove(profile)
            .ok_or_else(|| ParseFailure::Missing(profile.to_string()))?;
        cfg.resolve_relative(root);
        Ok(cfg)
    }

    /// True when any certificate file is configured.
    pub fn tls_enabled(&self) -> bool {
        self.certfile.is_some() || self.keyfile.is_some() || self.ca_certs.is_some()
    }

    fn resolve_relative(&mut self, root: &Path) {
        for file in [&mut self.certfile, &mut self.keyfile, &mut self.ca_certs]
            .into_iter()
            .flatten()
        {
            if file.is_relative() {
                *file = root.join(&*file);
            }
        }
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Missing(String),
}

/// `<user config dir>/mqtt`, e.g. `~/.config/mqtt` on Linux.
pub fn default_config_root() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|d| d.join("mqtt"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Client id of the form `idle-tracker-<0..=1000>`.
pub fn generate_client_id() -> String {
    format!("idle-tracker-{}", rand::random_range(0..=1000u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[default]
broker = "mqtt.example.net"
port = 8883
username = "tracker"
password = "secret"
ca_certs = "ca.pem"
keyfile = "/etc/ssl/client.key"

[plain]
broker = "localhost"
port = 1883
"#;

    #[test]
    fn relative_cert_paths_resolve_against_file_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mqtt.toml");
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(SAMPLE.as_bytes()))
            .expect("write config");

        let cfg = BrokerConfig::load(&path, "default").expect("load");
        assert_eq!(cfg.broker, "mqtt.example.net");
        assert_eq!(cfg.port, 8883);
        assert_eq!(cfg.ca_certs, Some(dir.path().join("ca.pem")));
        assert_eq!(cfg.keyfile, Some(PathBuf::from("/etc/ssl/client.key")));
        assert!(cfg.tls_enabled());
    }

    #[test]
    fn profile_without_tls_or_credentials() {
        let cfg = BrokerConfig::parse(SAMPLE, "plain", Path::new("/cfg")).ok().expect("plain");
        assert_eq!(cfg.port, 1883);
        assert!(cfg.username.is_none());
        assert!(!cfg.tls_enabled());
    }

    #[test]
    fn missing_profile_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mqtt.toml");
        std::fs::write(&path, SAMPLE).expect("write config");
        let err = BrokerConfig::load(&path, "office").expect_err("no such profile");
        assert_eq!(err.as_label(), "config_missing_profile");
    }

    #[test]
    fn unreadable_file_is_reported() {
        let err = BrokerConfig::load(Path::new("/nonexistent/mqtt.toml"), "default")
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn defaults_and_sentinels() {
        let cfg = Config::default();
        assert_eq!(cfg.interval, Duration::from_secs(5));
        assert_eq!(cfg.failure_limit(), Some(5));
        assert!(cfg.validate().is_ok());

        let forever = Config {
            failure_threshold: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(forever.failure_limit(), None);
        assert_eq!(forever.bus_capacity_clamped(), 1);
    }

    #[test]
    fn client_id_has_expected_shape() {
        let id = generate_client_id();
        let n: u32 = id
            .strip_prefix("idle-tracker-")
            .and_then(|s| s.parse().ok())
            .expect("numeric suffix");
        assert!(n <= 1000);
    }
}
