use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default bound on the activity log
pub const DEFAULT_MAX_ACTIVITY: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Action,
    Meeting,
}

/// One logged occurrence. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unix epoch milliseconds (hub processing time)
    pub timestamp: i64,
    pub agent: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
}

/// Bounded activity log, newest first.
#[derive(Clone, Debug)]
pub struct ActivityHistory {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityHistory {
    /// Create an empty history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the head, evicting the oldest entries beyond the bound.
    pub fn append(&mut self, entry: ActivityEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Full ordered sequence, newest first
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACTIVITY)
    }
}
