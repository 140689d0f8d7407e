//! Finished results waiting to be collected.

use std::collections::HashMap;

use crate::error::SchedulerError;

/// Result of a finished request: the work's value or its failure.
pub type Outcome<T> = std::result::Result<T, SchedulerError>;

/// Results keyed by request id, handed out at most once.
#[derive(Debug)]
pub struct ResultStore<T> {
    results: HashMap<String, Outcome<T>>,
}

impl<T> ResultStore<T> {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
        }
    }

    pub fn insert(&mut self, request_id: String, outcome: Outcome<T>) {
        self.results.insert(request_id, outcome);
    }

    /// Remove and return the result; later calls for the same id get `None`.
    pub fn take(&mut self, request_id: &str) -> Option<Outcome<T>> {
        self.results.remove(request_id)
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.results.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> Default for ResultStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
