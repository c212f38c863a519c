//! The job's phase state machine.
//!
//! [`JobState`] owns everything the coordinator knows: the inputs, the
//! current phase, the status array of that phase, the work queue and the
//! armed leases. Callers hold it behind one mutex; every method here runs to
//! completion without awaiting, so each transition is atomic with respect to
//! the others.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::lease::{Lease, LeaseScheduler};
use super::queue::WorkQueue;
use crate::rpc::{AcquireTaskReply, TaskAssignment, WorkType};

/// Phase of the job. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Map,
    Reduce,
    Done,
}

impl Phase {
    /// The kind of task dispatched in this phase.
    pub fn work_type(self) -> Option<WorkType> {
        match self {
            Phase::Map => Some(WorkType::Map),
            Phase::Reduce => Some(WorkType::Reduce),
            Phase::Done => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    InProgress,
    Completed,
    /// Lease expired while in progress. The id is back in the queue.
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskStatus {
    pub state: TaskState,
    pub lease_deadline: Option<Instant>,
    /// Number of times this task has been dispatched in its phase.
    pub generation: u64,
}

impl TaskStatus {
    fn idle() -> Self {
        Self {
            state: TaskState::Idle,
            lease_deadline: None,
            generation: 0,
        }
    }
}

/// What a completion report did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The task was marked completed.
    Accepted,
    /// The task was marked completed and finished its phase; the job is now
    /// in the contained phase.
    Advanced(Phase),
    /// The task had already been completed.
    Duplicate,
    /// The report is for a phase the job is not in.
    Stale,
}

#[derive(Debug)]
pub struct JobState {
    n_map: u32,
    n_reduce: u32,
    inputs: Vec<String>,
    phase: Phase,
    /// Status of every task of the current phase.
    tasks: Vec<TaskStatus>,
    /// Distinct completed tasks of the current phase.
    completed: u32,
    queue: WorkQueue,
    leases: LeaseScheduler,
    lease_duration: Duration,
}

impl JobState {
    /// Create a job over `inputs` (one map task each) with `n_reduce` reduce
    /// tasks.
    pub fn new(inputs: Vec<String>, n_reduce: u32, lease_duration: Duration) -> Result<Self> {
        if n_reduce == 0 {
            bail!("a job needs at least one reduce task");
        }
        let n_map = u32::try_from(inputs.len()).map_err(|_| anyhow!("too many inputs"))?;
        let capacity = n_map.max(n_reduce) as usize;

        let mut job = Self {
            n_map,
            n_reduce,
            inputs,
            phase: Phase::Map,
            tasks: Vec::new(),
            completed: 0,
            queue: WorkQueue::with_capacity(capacity),
            leases: LeaseScheduler::new(),
            lease_duration,
        };
        job.enter(Phase::Map)?;
        Ok(job)
    }

    /// Reset the per-task bookkeeping for `phase`. A phase without tasks is
    /// finished on entry.
    fn enter(&mut self, phase: Phase) -> Result<()> {
        let count = self.task_count(phase);
        self.phase = phase;
        self.tasks = vec![TaskStatus::idle(); count as usize];
        self.completed = 0;
        self.queue.refill(count)?;

        if phase != Phase::Done && count == 0 {
            info!(?phase, "phase has no tasks, skipping");
            return self.advance();
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        let next = match self.phase {
            Phase::Map => Phase::Reduce,
            Phase::Reduce => Phase::Done,
            Phase::Done => return Ok(()),
        };
        info!(from = ?self.phase, to = ?next, "phase complete");
        self.enter(next)
    }

    fn task_count(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Map => self.n_map,
            Phase::Reduce => self.n_reduce,
            Phase::Done => 0,
        }
    }

    /// Hand out the next queued task of the current phase and arm its lease.
    pub fn acquire(&mut self, now: Instant) -> AcquireTaskReply {
        let Some(work_type) = self.phase.work_type() else {
            return AcquireTaskReply::JobDone;
        };
        let Some(task_id) = self.queue.pop() else {
            return AcquireTaskReply::NoWorkAvailable;
        };

        let task = &mut self.tasks[task_id as usize];
        match task.state {
            TaskState::Idle | TaskState::Failed => {}
            // A reclaimed task that its original worker completed after all.
            TaskState::InProgress | TaskState::Completed => {
                debug!(?work_type, task_id, state = ?task.state, "dropping queued task");
                return AcquireTaskReply::NoWorkAvailable;
            }
        }

        let deadline = now + self.lease_duration;
        task.state = TaskState::InProgress;
        task.generation += 1;
        task.lease_deadline = Some(deadline);
        self.leases.arm(Lease {
            deadline,
            work_type,
            task_id,
            generation: task.generation,
        });
        debug!(?work_type, task_id, generation = task.generation, "dispatched task");

        let input = match work_type {
            WorkType::Map => Some(self.inputs[task_id as usize].clone()),
            WorkType::Reduce => None,
        };
        AcquireTaskReply::Assigned(TaskAssignment {
            work_type,
            task_id,
            n_map: self.n_map,
            n_reduce: self.n_reduce,
            input,
        })
    }

    /// Record that a task finished.
    ///
    /// Fails only for an id outside the current phase's range.
    pub fn report(&mut self, work_type: WorkType, task_id: u32) -> Result<ReportOutcome> {
        if self.phase.work_type() != Some(work_type) {
            debug!(?work_type, task_id, phase = ?self.phase, "ignoring stale report");
            return Ok(ReportOutcome::Stale);
        }

        let count = self.tasks.len();
        let task = self
            .tasks
            .get_mut(task_id as usize)
            .ok_or_else(|| anyhow!("{work_type:?} task {task_id} out of range (0..{count})"))?;
        if task.state == TaskState::Completed {
            debug!(?work_type, task_id, "ignoring duplicate report");
            return Ok(ReportOutcome::Duplicate);
        }

        task.state = TaskState::Completed;
        task.lease_deadline = None;
        self.completed += 1;
        info!(?work_type, task_id, done = self.completed, total = count, "task completed");

        if self.completed as usize == count {
            self.advance()?;
            return Ok(ReportOutcome::Advanced(self.phase));
        }
        Ok(ReportOutcome::Accepted)
    }

    /// Fail and requeue every task whose lease is due at `now` and still
    /// refers to its current dispatch. Returns the leases that took effect.
    ///
    /// A task that cannot be requeued stays in progress and its lease is
    /// re-armed, so it is tried again later.
    pub fn expire_leases(&mut self, now: Instant) -> Vec<Lease> {
        let mut reclaimed = Vec::new();
        for lease in self.leases.pop_due(now) {
            if self.phase.work_type() != Some(lease.work_type) {
                continue;
            }
            let Some(task) = self.tasks.get_mut(lease.task_id as usize) else {
                continue;
            };
            if task.state != TaskState::InProgress || task.generation != lease.generation {
                continue;
            }

            if let Err(e) = self.queue.push(lease.task_id) {
                error!(
                    work_type = ?lease.work_type,
                    task_id = lease.task_id,
                    "cannot requeue expired task: {e:#}"
                );
                let deadline = now + self.lease_duration;
                task.lease_deadline = Some(deadline);
                self.leases.arm(Lease { deadline, ..lease });
                continue;
            }
            task.state = TaskState::Failed;
            task.lease_deadline = None;
            warn!(
                work_type = ?lease.work_type,
                task_id = lease.task_id,
                generation = lease.generation,
                "lease expired, task requeued"
            );
            reclaimed.push(lease);
        }
        reclaimed
    }

    /// When the next armed lease comes due.
    pub fn next_lease_deadline(&self) -> Option<Instant> {
        self.leases.next_deadline()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn n_map(&self) -> u32 {
        self.n_map
    }

    pub fn n_reduce(&self) -> u32 {
        self.n_reduce
    }

    /// Distinct completed tasks in the current phase.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Ids waiting in the work queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn task(&self, task_id: u32) -> Option<&TaskStatus> {
        self.tasks.get(task_id as usize)
    }
}
