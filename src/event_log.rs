//! Bounded event log

use std::collections::VecDeque;

/// Default number of lines kept
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Ring of log lines; the oldest line is evicted once full
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    lines: VecDeque<String>,
    capacity: usize,
    /// Lines ever pushed, including evicted ones
    total: u64,
}

impl EventLog {
    /// Create an empty log. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
        self.total += 1;
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Last `n` lines, oldest first
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let skip = self.len().saturating_sub(n);
        self.lines().skip(skip).collect()
    }

    /// Lines pushed after the first `seen`, as far as they are still held
    pub fn since(&self, seen: u64) -> Vec<&str> {
        if self.is_empty() {
            return Vec::new();
        }
        let fresh = self.total.saturating_sub(seen);
        self.tail(usize::try_from(fresh).unwrap_or(usize::MAX))
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
