use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::logs::aggregator::{Aggregator, Batch};
use crate::logs::failure::FailureSink;
use crate::logs::sender::LogSender;

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Nothing queued, no request issued.
    Empty,
    /// A flush is still outstanding, the tick was ignored.
    InFlight,
    /// A flush covering this many entries was started.
    Started(usize),
}

/// How a flush ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No flush has run yet.
    Idle,
    /// The entries were delivered and removed from the queue.
    Sent(usize),
    /// Delivery failed, the entries stay queued for the next tick.
    Failed(usize),
    /// The flush task died before finishing, the entries stay queued.
    Aborted,
}

pub type FlushFuture = Shared<BoxFuture<'static, FlushOutcome>>;

/// Clears the in-flight flag when the flush it belongs to is over, however it
/// ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Ships snapshots of the queue, never more than one at a time.
pub struct Flusher {
    sender: Arc<dyn LogSender>,
    aggregator: Arc<Mutex<Aggregator>>,
    failure_sink: FailureSink,
    in_flight: Arc<AtomicBool>,
    last_flush: Mutex<FlushFuture>,
    runtime: Handle,
}

impl Flusher {
    #[must_use]
    pub fn new(
        sender: Arc<dyn LogSender>,
        aggregator: Arc<Mutex<Aggregator>>,
        failure_sink: FailureSink,
        runtime: Handle,
    ) -> Self {
        Flusher {
            sender,
            aggregator,
            failure_sink,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_flush: Mutex::new(settled(FlushOutcome::Idle)),
            runtime,
        }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Resolves once the most recently started flush is over.
    #[must_use]
    pub fn last_flush(&self) -> FlushFuture {
        self.last_flush
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Starts a flush of everything queued right now, unless one is already
    /// running or there is nothing to send.
    pub fn tick(self: &Arc<Self>) -> Tick {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous flush still in flight, skipping tick");
            return Tick::InFlight;
        }
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let batch = self
            .aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_batch();
        let Some(batch) = batch else {
            return Tick::Empty;
        };

        let count = batch.count;
        let mut last_flush = self
            .last_flush
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let flusher = Arc::clone(self);
        let handle = self.runtime.spawn(async move {
            let _guard = guard;
            flusher.send(batch).await
        });
        let flush = async move {
            handle.await.unwrap_or_else(|e| {
                error!("Flush task did not complete: {e}");
                FlushOutcome::Aborted
            })
        }
        .boxed()
        .shared();

        *last_flush = flush;
        Tick::Started(count)
    }

    async fn send(&self, batch: Batch) -> FlushOutcome {
        let Batch { count, body } = batch;
        debug!("Flushing {count} log entries");

        match self.sender.send(body).await {
            Ok(()) => {
                // Only what was snapshotted, entries added meanwhile stay queued
                self.aggregator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove_sent(count);
                debug!("Successfully flushed {count} log entries");
                FlushOutcome::Sent(count)
            }
            Err(e) => {
                self.failure_sink.handle(e).await;
                FlushOutcome::Failed(count)
            }
        }
    }
}

fn settled(outcome: FlushOutcome) -> FlushFuture {
    futures::future::ready(outcome).boxed().shared()
}
