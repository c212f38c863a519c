//! FIFO of task ids waiting to be dispatched.

use std::collections::VecDeque;

use anyhow::{bail, Result};

/// A bounded FIFO of idle task ids for the current phase.
///
/// The queue itself is not synchronized; it lives inside
/// [`JobState`](super::job::JobState) and is only touched under its lock.
#[derive(Debug)]
pub struct WorkQueue {
    ids: VecDeque<u32>,
    capacity: usize,
}

impl WorkQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Drop whatever is queued and enqueue `0..count`.
    pub fn refill(&mut self, count: u32) -> Result<()> {
        self.ids.clear();
        for id in 0..count {
            self.push(id)?;
        }
        Ok(())
    }

    /// Append an id. Fails when the queue is full, which means an id was
    /// queued twice.
    pub fn push(&mut self, id: u32) -> Result<()> {
        if self.ids.len() >= self.capacity {
            bail!("work queue full ({} ids), cannot queue task {}", self.capacity, id);
        }
        self.ids.push_back(id);
        Ok(())
    }

    /// Take the oldest id, if any. Never blocks.
    pub fn pop(&mut self) -> Option<u32> {
        self.ids.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
