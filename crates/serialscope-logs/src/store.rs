use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use serialscope_types::LogLine;

/// Append-only, sequence-indexed line store
///
/// The canonical store is unbounded for the session; the hidden log is
/// created with a capacity and evicts its oldest line when full. Sequences
/// keep counting across `clear`, so an identity is never handed out twice.
#[derive(Clone, Debug)]
pub struct LogStore {
    /// Internal storage - shared lines so snapshots are cheap
    entries: VecDeque<Arc<LogLine>>,

    /// Maximum capacity (None = unbounded)
    capacity: Option<usize>,

    /// Next sequence to assign
    next_sequence: u64,
}

impl LogStore {
    /// Create a store that is never pruned
    pub fn unbounded() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
            next_sequence: 0,
        }
    }

    /// Create a store that keeps at most `capacity` lines
    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity.max(1)),
            next_sequence: 0,
        }
    }

    /// Append a line, evicting the oldest if at capacity
    pub fn push(&mut self, timestamp: DateTime<Utc>, text: String) -> Arc<LogLine> {
        let line = Arc::new(LogLine::new(self.next_sequence, timestamp, text));
        self.next_sequence += 1;

        if let Some(capacity) = self.capacity {
            if self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(Arc::clone(&line));
        line
    }

    /// Look up a line by sequence in O(1)
    pub fn get(&self, sequence: u64) -> Option<&Arc<LogLine>> {
        let first = self.entries.front()?.sequence;
        let index = usize::try_from(sequence.checked_sub(first)?).ok()?;
        self.entries.get(index)
    }

    /// Get all lines (Arc clones are cheap)
    pub fn all(&self) -> Vec<Arc<LogLine>> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence the next appended line will receive
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Remove every line; sequence numbering continues
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
