//! The worker: poll the coordinator, run tasks, report them.
//!
//! A worker runs one task at a time. It only reports a task after every file
//! of that task is in place; if anything fails it simply moves on and lets
//! the task's lease expire so that it gets redispatched.

pub mod map;
pub mod reduce;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tokio::time::sleep;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};
use tracing::{debug, error, info, warn};

use crate::rpc::{
    AcquireTaskReply, AcquireTaskRequest, CoordinatorClient, ReportCompletionRequest,
    TaskAssignment, WorkType,
};
use crate::Workload;

/// Bounded exponential backoff for RPCs to the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per call, the first one included.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << retry.min(16))
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Coordinator address, `host:port` or a full `http://` URL.
    pub coordinator: String,
    /// Shared directory holding intermediate artifacts and output shards.
    pub dir: PathBuf,
    /// Pause after the coordinator has nothing to hand out.
    pub idle_backoff: Duration,
    pub retry: RetryPolicy,
    /// Auxiliary arguments passed to the workload functions.
    pub aux: Bytes,
}

/// What a worker did before the job ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub maps: u32,
    pub reduces: u32,
    /// Attempts that failed locally and were left for the lease to reclaim.
    pub failed: u32,
}

pub struct Worker {
    client: CoordinatorClient<Channel>,
    config: WorkerConfig,
    workload: Workload,
}

impl Worker {
    /// Set up a worker. The connection is established lazily by the first
    /// call, which is retried like any other.
    pub fn new(config: WorkerConfig, workload: Workload) -> Result<Self> {
        let url = if config.coordinator.contains("://") {
            config.coordinator.clone()
        } else {
            format!("http://{}", config.coordinator)
        };
        let channel = Endpoint::from_shared(url.clone())
            .with_context(|| format!("invalid coordinator address {url}"))?
            .connect_timeout(Duration::from_secs(5))
            .connect_lazy();

        Ok(Self {
            client: CoordinatorClient::new(channel),
            config,
            workload,
        })
    }

    /// Poll for tasks until the coordinator says the job is done.
    pub async fn run(self) -> Result<WorkerSummary> {
        let mut summary = WorkerSummary::default();
        loop {
            let task = match self.acquire().await? {
                AcquireTaskReply::Assigned(task) => task,
                AcquireTaskReply::NoWorkAvailable => {
                    debug!("no work available, backing off");
                    sleep(self.config.idle_backoff).await;
                    continue;
                }
                AcquireTaskReply::JobDone => {
                    info!(?summary, "job done, worker exiting");
                    return Ok(summary);
                }
            };

            match self.execute(&task).await {
                Ok(()) => {
                    self.report(task.work_type, task.task_id).await?;
                    match task.work_type {
                        WorkType::Map => summary.maps += 1,
                        WorkType::Reduce => summary.reduces += 1,
                    }
                }
                Err(e) => {
                    error!(
                        work_type = ?task.work_type,
                        task_id = task.task_id,
                        "task failed, leaving it to be reclaimed: {e:#}"
                    );
                    summary.failed += 1;
                    sleep(self.config.idle_backoff).await;
                }
            }
        }
    }

    /// Run the task's executor off the async runtime.
    async fn execute(&self, task: &TaskAssignment) -> Result<()> {
        let dir = self.config.dir.clone();
        let aux = self.config.aux.clone();
        let workload = self.workload;
        let task = task.clone();

        tokio::task::spawn_blocking(move || match task.work_type {
            WorkType::Map => {
                let input = task
                    .input
                    .as_deref()
                    .ok_or_else(|| anyhow!("map task {} has no input", task.task_id))?;
                map::perform_map(&dir, &workload, &aux, task.task_id, task.n_reduce, input)
                    .map(|_| ())
            }
            WorkType::Reduce => {
                reduce::perform_reduce(&dir, &workload, &aux, task.task_id, task.n_map).map(|_| ())
            }
        })
        .await
        .context("executor panicked")?
    }

    async fn acquire(&self) -> Result<AcquireTaskReply> {
        retry(self.config.retry, "AcquireTask", || {
            let mut client = self.client.clone();
            async move {
                client
                    .acquire_task(Request::new(AcquireTaskRequest {}))
                    .await
                    .map(|r| r.into_inner())
            }
        })
        .await
    }

    async fn report(&self, work_type: WorkType, task_id: u32) -> Result<()> {
        retry(self.config.retry, "ReportCompletion", || {
            let mut client = self.client.clone();
            async move {
                client
                    .report_completion(Request::new(ReportCompletionRequest { work_type, task_id }))
                    .await
                    .map(|_| ())
            }
        })
        .await?;
        debug!(?work_type, task_id, "reported completion");
        Ok(())
    }
}

/// Connect to the coordinator and work until the job is done.
pub async fn run(config: WorkerConfig, workload: Workload) -> Result<WorkerSummary> {
    Worker::new(config, workload)?.run().await
}

fn is_transient(status: &Status) -> bool {
    matches!(
        status.code(),
        Code::Unavailable | Code::Unknown | Code::DeadlineExceeded | Code::Cancelled
    )
}

/// Call `call` until it succeeds, fails permanently, or runs out of attempts.
async fn retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Status>>,
{
    let mut retries = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(status) if is_transient(&status) && retries + 1 < policy.attempts => {
                let delay = policy.delay(retries);
                warn!(
                    "{what} failed ({}), retrying in {:?}",
                    status.message(),
                    delay
                );
                sleep(delay).await;
                retries += 1;
            }
            Err(status) => {
                return Err(anyhow!(
                    "{what} failed after {} attempt(s): {status}",
                    retries + 1
                ))
            }
        }
    }
}
