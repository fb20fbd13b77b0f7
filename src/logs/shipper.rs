use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::logs::aggregator::Aggregator;
use crate::logs::enricher::{EnrichError, Enricher};
use crate::logs::entry::PendingEntry;
use crate::logs::failure::FailureSink;
use crate::logs::flusher::{FlushFuture, FlushOutcome, Flusher, Tick};
use crate::logs::sender::{HttpSender, LogSender};

/// Batches log entries in memory and ships them on a fixed interval.
///
/// Entries go through [`Shipper::enqueue`] from any thread. The flush timer is
/// armed by the first enqueue and runs until [`Shipper::shutdown`] (or drop);
/// a later enqueue arms it again. A tick on an empty queue does nothing.
pub struct Shipper {
    enricher: Enricher,
    aggregator: Arc<Mutex<Aggregator>>,
    flusher: Arc<Flusher>,
    interval: Duration,
    timer: Mutex<Option<CancellationToken>>,
    runtime: Handle,
}

impl Shipper {
    /// Builds a shipper posting to `config.url`.
    ///
    /// Must be called from within a Tokio runtime, the flush timer and the
    /// requests run on it.
    pub fn new(config: Arc<Config>, failure_sink: FailureSink) -> Result<Self, ConfigError> {
        let sender = HttpSender::new(&config)?;
        Self::with_sender(config, Arc::new(sender), failure_sink)
    }

    pub fn with_sender(
        config: Arc<Config>,
        sender: Arc<dyn LogSender>,
        failure_sink: FailureSink,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let aggregator = Arc::new(Mutex::new(Aggregator::default()));
        let flusher = Arc::new(Flusher::new(
            sender,
            Arc::clone(&aggregator),
            failure_sink,
            runtime.clone(),
        ));

        Ok(Shipper {
            enricher: Enricher::new(&config),
            aggregator,
            flusher,
            interval: config.flush_interval(),
            timer: Mutex::new(None),
            runtime,
        })
    }

    /// Enriches and queues one log call. Never blocks and never touches the
    /// network; a malformed call only fails itself.
    pub fn enqueue(
        &self,
        level: &str,
        message: &str,
        fields: Option<Value>,
    ) -> Result<(), EnrichError> {
        let Some(entry) = self.enricher.enrich(level, message, fields)? else {
            return Ok(());
        };

        self.aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(entry);
        self.arm_timer_if_idle();
        Ok(())
    }

    /// Runs one flush cycle right away, as if the timer had fired.
    pub fn tick(&self) -> Tick {
        self.flusher.tick()
    }

    /// Resolves once the most recently started flush is over.
    #[must_use]
    pub fn last_flush(&self) -> FlushFuture {
        self.flusher.last_flush()
    }

    #[must_use]
    pub fn pending(&self) -> Vec<PendingEntry> {
        self.aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stops the flush timer. Queued entries stay queued and an in-flight
    /// flush runs to completion.
    pub fn shutdown(&self) {
        if let Some(token) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            debug!("Stopping log flush timer");
            token.cancel();
        }
    }

    /// Stops the timer and makes a last attempt at shipping what is queued.
    pub async fn close(&self) -> FlushOutcome {
        self.shutdown();
        let mut settled = FlushOutcome::Idle;
        loop {
            match self.tick() {
                Tick::Started(_) => return self.last_flush().await,
                Tick::Empty => return settled,
                // A tick that fired before the timer was cancelled may still be
                // storing its flush, wait for it and try again
                Tick::InFlight => {
                    settled = self.last_flush().await;
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    fn arm_timer_if_idle(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let flusher = Arc::clone(&self.flusher);
        let period = self.interval;
        let first = Instant::now() + period;
        self.runtime.spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        flusher.tick();
                    }
                }
            }
        });

        debug!("Armed log flush timer every {period:?}");
        *timer = Some(token);
    }
}

impl Drop for Shipper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
