use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Start/stop timers keyed by an id.
#[derive(Debug, Default)]
pub struct Profiler {
    started: Mutex<HashMap<String, Instant>>,
}

impl Profiler {
    /// The first call for `id` starts a timer and returns `None`. The second
    /// stops it and returns the elapsed time.
    pub fn profile(&self, id: &str) -> Option<Duration> {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        match started.remove(id) {
            Some(start) => Some(start.elapsed()),
            None => {
                started.insert(id.to_string(), Instant::now());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn measures_between_calls() {
        let profiler = Profiler::default();
        assert_eq!(profiler.profile("foo"), None);
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(profiler.profile("foo"), Some(Duration::from_millis(500)));
        // Forgotten once stopped
        assert_eq!(profiler.profile("foo"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ids_are_independent() {
        let profiler = Profiler::default();
        assert_eq!(profiler.profile("a"), None);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(profiler.profile("b"), None);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(profiler.profile("a"), Some(Duration::from_millis(200)));
        assert_eq!(profiler.profile("b"), Some(Duration::from_millis(100)));
    }
}
