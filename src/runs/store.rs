//! Bounded in-memory store of recently served runs.

use std::collections::VecDeque;
use std::sync::RwLock;

use super::types::CorrelatedRun;

/// Recent runs, newest first, capped at a fixed capacity.
///
/// Safe to share between request tasks; writers serialize on the lock.
#[derive(Debug)]
pub struct RunStore {
    capacity: usize,
    runs: RwLock<VecDeque<CorrelatedRun>>,
}

impl RunStore {
    /// Create an empty store. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            runs: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of retained runs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or replace a run and move it to the front.
    pub fn record(&self, run: CorrelatedRun) {
        let mut runs = self.runs.write().unwrap_or_else(|e| e.into_inner());
        runs.retain(|existing| existing.id != run.id);
        runs.push_front(run);
        runs.truncate(self.capacity);
    }

    /// All runs, newest first.
    pub fn list(&self) -> Vec<CorrelatedRun> {
        let runs = self.runs.read().unwrap_or_else(|e| e.into_inner());
        runs.iter().cloned().collect()
    }

    /// Find a run by id.
    pub fn get(&self, id: u64) -> Option<CorrelatedRun> {
        let runs = self.runs.read().unwrap_or_else(|e| e.into_inner());
        runs.iter().find(|run| run.id == id).cloned()
    }

    /// Number of stored runs.
    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
