use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::logs::sender::TransmissionError;

/// Receives the error of every failed flush.
///
/// Any `Fn(TransmissionError) -> impl Future<Output = ()>` qualifies, so an
/// async closure can be handed over directly.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn on_error(&self, error: TransmissionError);
}

#[async_trait]
impl<F, Fut> ErrorHandler for F
where
    F: Fn(TransmissionError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_error(&self, error: TransmissionError) {
        self(error).await;
    }
}

/// Where transmission failures end up. Neither variant lets a failure escape
/// to the caller.
#[derive(Clone, Default)]
pub enum FailureSink {
    /// Log the failure and carry on.
    #[default]
    Silent,
    /// Hand the failure to a user supplied handler and wait for it.
    Delegated(Arc<dyn ErrorHandler>),
}

impl FailureSink {
    #[must_use]
    pub fn delegated<H>(handler: H) -> Self
    where
        H: ErrorHandler + 'static,
    {
        FailureSink::Delegated(Arc::new(handler))
    }

    pub async fn handle(&self, error: TransmissionError) {
        match self {
            FailureSink::Silent => error!("Failed to ship logs, will retry: {error}"),
            FailureSink::Delegated(handler) => handler.on_error(error).await,
        }
    }
}

impl fmt::Debug for FailureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureSink::Silent => f.write_str("Silent"),
            FailureSink::Delegated(_) => f.write_str("Delegated"),
        }
    }
}
