use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::error;

/// Log severities, most severe first.
///
/// The ordering follows the npm levels used by the host logging frameworks the
/// shipper sits behind, so `Severity::Error < Severity::Silly`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warn,
    Info,
    Http,
    Verbose,
    Debug,
    Silly,
}

impl AsRef<str> for Severity {
    fn as_ref(&self) -> &str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Http => "http",
            Severity::Verbose => "verbose",
            Severity::Debug => "debug",
            Severity::Silly => "silly",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl Severity {
    /// Whether a record at `level` passes a `self` minimum.
    #[must_use]
    pub fn allows(self, level: Severity) -> bool {
        level <= self
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Http | Severity::Verbose | Severity::Debug => "debug",
            Severity::Silly => "trace",
        }
    }

    /// Construct a `Severity` from a `log::Level`
    #[must_use]
    pub fn from_log_level(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warn,
            log::Level::Info => Severity::Info,
            log::Level::Debug => Severity::Debug,
            log::Level::Trace => Severity::Silly,
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warn" | "warning" => Ok(Severity::Warn),
            "info" => Ok(Severity::Info),
            "http" => Ok(Severity::Http),
            "verbose" => Ok(Severity::Verbose),
            "debug" => Ok(Severity::Debug),
            "silly" | "trace" => Ok(Severity::Silly),
            _ => Err(format!(
                "Invalid log level: '{s}'. Valid levels are: error, warn, info, http, verbose, debug, silly",
            )),
        }
    }
}

fn deserialize_or<'de, D>(deserializer: D, fallback: Severity) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    if let Value::String(s) = value {
        match Severity::from_str(&s) {
            Ok(level) => Ok(level),
            Err(e) => {
                error!("{e}, using {fallback}");
                Ok(fallback)
            }
        }
    } else {
        error!("Expected a string for log level, got {value:?}, using {fallback}");
        Ok(fallback)
    }
}

/// Minimum shipping level; falls back to `info`.
pub fn deserialize_level<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_or(deserializer, Severity::Info)
}

/// Diagnostics level; falls back to `warn`.
pub fn deserialize_log_level<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_or(deserializer, Severity::Warn)
}
