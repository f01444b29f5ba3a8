use std::collections::VecDeque;

use crate::Detection;

/// Default number of detections kept in the window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 5;

/// Bounded FIFO of the most recent detections.
///
/// Only frames that produced a detection enter the window; empty frames leave
/// it untouched.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    entries: VecDeque<Detection>,
    capacity: usize,
}

impl HistoryWindow {
    /// Create an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push the detection of one frame, evicting the oldest entry when full.
    pub fn ingest(&mut self, detection: Option<Detection>) {
        let Some(detection) = detection else {
            return;
        };
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(detection);
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no detection has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
