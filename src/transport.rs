use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{Config, ConfigError, Severity};
use crate::logs::constants::{DURATION_FIELD, TRANSPORT_NAME};
use crate::logs::enricher::EnrichError;
use crate::logs::failure::FailureSink;
use crate::logs::profiler::Profiler;
use crate::logs::shipper::Shipper;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum TransportError {
    #[error(transparent)]
    Enrich(#[from] EnrichError),
}

/// Completion signal of a single log call. `Ok` once the entry is queued (or
/// filtered out), never tied to the network.
pub type Ack = Result<(), TransportError>;

/// What a host logging framework talks to.
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Minimum severity this transport accepts.
    fn level(&self) -> Severity;

    fn log(&self, level: &str, message: &str, fields: Option<Value>) -> Ack;
}

pub struct SumoLogicTransport {
    level: Severity,
    shipper: Shipper,
    profiler: Profiler,
}

impl SumoLogicTransport {
    pub fn new(config: Arc<Config>, failure_sink: FailureSink) -> Result<Self, ConfigError> {
        let level = config.level;
        Ok(Self::with_shipper(level, Shipper::new(config, failure_sink)?))
    }

    #[must_use]
    pub fn with_shipper(level: Severity, shipper: Shipper) -> Self {
        SumoLogicTransport {
            level,
            shipper,
            profiler: Profiler::default(),
        }
    }

    #[must_use]
    pub fn shipper(&self) -> &Shipper {
        &self.shipper
    }

    /// Starts a timer for `id`, or stops it and logs an `info` entry named `id`
    /// carrying the elapsed whole milliseconds as `durationMs`.
    pub fn profile(&self, id: &str, fields: Option<Value>) -> Ack {
        let Some(elapsed) = self.profiler.profile(id) else {
            return Ok(());
        };

        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let fields = match fields {
            None | Some(Value::Null) => {
                let mut fields = Map::new();
                fields.insert(DURATION_FIELD.to_string(), millis.into());
                Value::Object(fields)
            }
            Some(Value::Object(mut fields)) => {
                fields.insert(DURATION_FIELD.to_string(), millis.into());
                Value::Object(fields)
            }
            // Left for the enricher to reject
            Some(other) => other,
        };
        self.log(Severity::Info.as_ref(), id, Some(fields))
    }

    /// Stops the flush timer and makes a last attempt at shipping.
    pub async fn close(&self) {
        self.shipper.close().await;
    }
}

impl Transport for SumoLogicTransport {
    fn name(&self) -> &str {
        TRANSPORT_NAME
    }

    fn level(&self) -> Severity {
        self.level
    }

    /// Levels outside the npm set (syslog `notice`, `crit`, ...) have no rank
    /// to compare against and are shipped unfiltered, under their own name.
    fn log(&self, level: &str, message: &str, fields: Option<Value>) -> Ack {
        let level = match Severity::from_str(level) {
            Ok(severity) if !self.level.allows(severity) => return Ok(()),
            Ok(severity) => severity.as_ref().to_string(),
            Err(_) => level.to_string(),
        };

        self.shipper.enqueue(&level, message, fields)?;
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn level(&self) -> Severity {
        (**self).level()
    }

    fn log(&self, level: &str, message: &str, fields: Option<Value>) -> Ack {
        (**self).log(level, message, fields)
    }
}

/// Targets never forwarded by [`LogBridge`]. Shipping their records would
/// trigger more of them.
const IGNORED_TARGETS: [&str; 7] = ["sumoship", "reqwest", "hyper", "h2", "rustls", "tokio", "mio"];

/// Forwards `log` records to a [`Transport`].
pub struct LogBridge<T> {
    transport: T,
}

impl<T: Transport> LogBridge<T> {
    pub fn new(transport: T) -> Self {
        LogBridge { transport }
    }

    /// Installs the bridge as the global `log` logger.
    pub fn init(transport: T) -> Result<(), log::SetLoggerError>
    where
        T: 'static,
    {
        let max = match transport.level() {
            Severity::Error => log::LevelFilter::Error,
            Severity::Warn => log::LevelFilter::Warn,
            Severity::Info => log::LevelFilter::Info,
            Severity::Http | Severity::Verbose | Severity::Debug => log::LevelFilter::Debug,
            Severity::Silly => log::LevelFilter::Trace,
        };
        log::set_boxed_logger(Box::new(LogBridge::new(transport)))?;
        log::set_max_level(max);
        Ok(())
    }
}

fn is_ignored(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|ignored| {
        target
            .strip_prefix(ignored)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

impl<T: Transport> log::Log for LogBridge<T> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        !is_ignored(metadata.target())
            && self
                .transport
                .level()
                .allows(Severity::from_log_level(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = Severity::from_log_level(record.level());
        let message = record.args().to_string();
        if let Err(e) = self.transport.log(level.as_ref(), &message, None) {
            tracing::debug!("Dropped log record: {e}");
        }
    }

    fn flush(&self) {}
}
