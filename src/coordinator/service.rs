use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use super::job::{JobState, ReportOutcome};
use crate::rpc::{
    AcquireTaskReply, AcquireTaskRequest, Coordinator, CoordinatorServer, JobDoneReply,
    JobDoneRequest, ReportCompletionReply, ReportCompletionRequest,
};

/// How often the shutdown watcher checks whether the job is done.
const DONE_POLL: Duration = Duration::from_millis(200);

/// The coordinator's gRPC service.
///
/// Cheap to clone; clones share the same job.
#[derive(Debug, Clone)]
pub struct CoordinatorService {
    job: Arc<Mutex<JobState>>,
    /// Wakes the lease monitor when a new lease is armed.
    lease_armed: Arc<Notify>,
}

impl CoordinatorService {
    pub fn new(job: JobState) -> Self {
        Self {
            job: Arc::new(Mutex::new(job)),
            lease_armed: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.job.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True once every reduce task has completed.
    pub fn done(&self) -> bool {
        self.lock().is_done()
    }

    /// Run `f` against the job state under the lock.
    pub fn inspect<T>(&self, f: impl FnOnce(&JobState) -> T) -> T {
        f(&self.lock())
    }

    /// Start the task that expires leases. It runs until the job is done.
    pub fn spawn_lease_monitor(&self) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move { service.monitor_leases().await })
    }

    async fn monitor_leases(self) {
        loop {
            let next = {
                let job = self.lock();
                if job.is_done() {
                    return;
                }
                job.next_lease_deadline()
            };

            match next {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        // An earlier deadline may have been armed.
                        _ = self.lease_armed.notified() => continue,
                    }
                }
                None => {
                    // Nothing armed; the next dispatch or the end of the job
                    // wakes us.
                    self.lease_armed.notified().await;
                    continue;
                }
            }

            let reclaimed = self.lock().expire_leases(Instant::now());
            if !reclaimed.is_empty() {
                debug!(count = reclaimed.len(), "reclaimed expired leases");
            }
        }
    }
}

#[tonic::async_trait]
impl Coordinator for CoordinatorService {
    async fn acquire_task(
        &self,
        _request: Request<AcquireTaskRequest>,
    ) -> Result<Response<AcquireTaskReply>, Status> {
        let reply = self.lock().acquire(Instant::now());
        if matches!(reply, AcquireTaskReply::Assigned(_)) {
            self.lease_armed.notify_one();
        }
        Ok(Response::new(reply))
    }

    async fn report_completion(
        &self,
        request: Request<ReportCompletionRequest>,
    ) -> Result<Response<ReportCompletionReply>, Status> {
        let ReportCompletionRequest { work_type, task_id } = request.into_inner();
        let outcome = self
            .lock()
            .report(work_type, task_id)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        if let ReportOutcome::Advanced(phase) = outcome {
            info!(?phase, "job advanced");
            // Let the monitor notice the end of the job.
            self.lease_armed.notify_one();
        }
        Ok(Response::new(ReportCompletionReply {}))
    }

    async fn job_done(
        &self,
        _request: Request<JobDoneRequest>,
    ) -> Result<Response<JobDoneReply>, Status> {
        Ok(Response::new(JobDoneReply { done: self.done() }))
    }
}

/// Serve `service` on `listener` until the job is done, then keep answering
/// for `linger` so polling workers learn that the job is over.
pub async fn serve(
    service: CoordinatorService,
    listener: TcpListener,
    linger: Duration,
) -> Result<(), tonic::transport::Error> {
    let monitor = service.spawn_lease_monitor();

    let watcher = service.clone();
    let shutdown = async move {
        while !watcher.done() {
            tokio::time::sleep(DONE_POLL).await;
        }
        info!("job done, shutting down in {:?}", linger);
        tokio::time::sleep(linger).await;
    };

    let served = Server::builder()
        .add_service(CoordinatorServer::new(service))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await;
    monitor.abort();
    served
}

/// Bind `addr` and [`serve`] on it.
pub async fn serve_on(
    service: CoordinatorService,
    addr: SocketAddr,
    linger: Duration,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("coordinator listening on {}", listener.local_addr()?);
    serve(service, listener, linger).await?;
    Ok(())
}
