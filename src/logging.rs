//! # Tracing initialisation for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the level comes from the verbosity
//! count (`0 → info`, `1 → debug`, `2+ → trace`). Records go to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::ConfigError;

/// Output format of log records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per record.
    Json,
}

/// Level directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(format: LogFormat, verbosity: u8) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_for(verbosity)))
        .map_err(|e| ConfigError::Logging {
            reason: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let res = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };
    res.map_err(|e| ConfigError::Logging {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(7), "trace");
    }

    #[test]
    fn second_init_is_an_error() {
        let _ = init(LogFormat::Pretty, 0);
        let second = init(LogFormat::Json, 0);
        assert!(matches!(second, Err(ConfigError::Logging { .. })));
    }
}
