use std::collections::VecDeque;
use tracing::debug;

use crate::logs::entry::PendingEntry;

/// Snapshot of the head of the queue, serialized for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Number of queued entries covered by `body`.
    pub count: usize,
    /// One JSON document per entry, each terminated by `\n`.
    pub body: Vec<u8>,
}

#[derive(Default, Debug)]
pub struct Aggregator {
    entries: VecDeque<PendingEntry>,
}

impl Aggregator {
    pub fn add(&mut self, entry: PendingEntry) {
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }

    /// Serializes every entry currently queued without removing any of them.
    ///
    /// Entries stay queued until [`Aggregator::remove_sent`] is called with the
    /// returned count, so anything added in the meantime is left for the next
    /// batch.
    #[must_use]
    pub fn get_batch(&self) -> Option<Batch> {
        if self.entries.is_empty() {
            return None;
        }

        let count = self.entries.len();
        let mut body: Vec<u8> = Vec::new();
        for entry in &self.entries {
            match serde_json::to_vec(entry) {
                Ok(line) => {
                    body.extend(line);
                    body.push(b'\n');
                }
                Err(e) => debug!("Failed to serialize log: {}", e),
            }
        }

        Some(Batch { count, body })
    }

    /// Drops the first `count` entries.
    pub fn remove_sent(&mut self, count: usize) {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
    }
}
