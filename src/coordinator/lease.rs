//! Lease bookkeeping for dispatched tasks.
//!
//! Every dispatch arms a [`Lease`]. Leases are never revoked: when one comes
//! due, the job state compares it against the task's current phase, status
//! and dispatch generation, and ignores it if the task moved on.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::rpc::WorkType;

/// One armed lease. Orders by deadline first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lease {
    pub deadline: Instant,
    pub work_type: WorkType,
    pub task_id: u32,
    /// Dispatch generation of the task when the lease was armed.
    pub generation: u64,
}

/// Min-heap of armed leases.
#[derive(Debug, Default)]
pub struct LeaseScheduler {
    heap: BinaryHeap<Reverse<Lease>>,
}

impl LeaseScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, lease: Lease) {
        self.heap.push(Reverse(lease));
    }

    /// Deadline of the earliest armed lease.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(lease)| lease.deadline)
    }

    /// Remove and return every lease whose deadline is at or before `now`,
    /// earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<Lease> {
        let mut due = Vec::new();
        while let Some(Reverse(lease)) = self.heap.peek() {
            if lease.deadline > now {
                break;
            }
            due.push(*lease);
            self.heap.pop();
        }
        due
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
