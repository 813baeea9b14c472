//! Monotonic id generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Yields consecutive integers starting from 0.
#[derive(Debug, Default)]
pub struct IdGenerator {
    current: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.
    pub fn next_id(&self) -> u64 {
        self.current.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the id the next call will hand out.
    pub fn peek(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }
}
