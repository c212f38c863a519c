use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use mrlease::coordinator::{serve, CoordinatorService, JobState};
use mrlease::rpc::{
    AcquireTaskReply, AcquireTaskRequest, CoordinatorClient, JobDoneRequest,
    ReportCompletionRequest, WorkType,
};
use mrlease::sequential::{self, Job};
use mrlease::shuffle::{intermediate_name, output_name, partition};
use mrlease::worker::{self, RetryPolicy, WorkerConfig, WorkerSummary};
use mrlease::workload;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(30);

fn write_inputs(dir: &Path, files: &[(&str, &str)]) -> Vec<String> {
    files
        .iter()
        .map(|(name, content)| {
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect()
}

async fn start_coordinator(
    inputs: Vec<String>,
    n_reduce: u32,
    lease: Duration,
) -> (SocketAddr, CoordinatorService) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = CoordinatorService::new(JobState::new(inputs, n_reduce, lease).unwrap());
    tokio::spawn(serve(service.clone(), listener, Duration::from_secs(5)));
    (addr, service)
}

fn spawn_worker(addr: SocketAddr, dir: &Path, aux: Bytes) -> JoinHandle<anyhow::Result<WorkerSummary>> {
    let config = WorkerConfig {
        coordinator: addr.to_string(),
        dir: dir.to_path_buf(),
        idle_backoff: Duration::from_millis(50),
        retry: RetryPolicy {
            attempts: 10,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(200),
        },
        aux,
    };
    tokio::spawn(worker::run(config, workload::named("wc").unwrap()))
}

async fn client(addr: SocketAddr) -> CoordinatorClient<tonic::transport::Channel> {
    CoordinatorClient::connect(format!("http://{addr}")).await.unwrap()
}

fn read_shards(dir: &Path, n_reduce: u32) -> Vec<String> {
    (0..n_reduce)
        .map(|r| fs::read_to_string(dir.join(output_name(r))).unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn word_count_with_two_workers() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), &[("a.txt", "x y x"), ("b.txt", "y z")]);
    let (addr, service) = start_coordinator(inputs.clone(), 2, Duration::from_secs(10)).await;

    let workers = [
        spawn_worker(addr, dir.path(), Bytes::new()),
        spawn_worker(addr, dir.path(), Bytes::new()),
    ];
    let mut total = WorkerSummary::default();
    for handle in workers {
        let summary = timeout(DEADLINE, handle).await.unwrap().unwrap().unwrap();
        total.maps += summary.maps;
        total.reduces += summary.reduces;
        total.failed += summary.failed;
    }
    assert!(service.done());
    assert_eq!(total, WorkerSummary { maps: 2, reduces: 2, failed: 0 });

    // Every (m, r) artifact exists, empty or not.
    for m in 0..2 {
        for r in 0..2 {
            assert!(dir.path().join(intermediate_name(m, r)).exists());
        }
    }

    let shards = read_shards(dir.path(), 2);
    let mut lines = Vec::new();
    for (r, shard) in shards.iter().enumerate() {
        for line in shard.lines() {
            let (word, _) = line.split_once(' ').unwrap();
            assert_eq!(partition(word.as_bytes(), 2) as usize, r, "{word} in shard {r}");
            lines.push(line.to_string());
        }
    }
    lines.sort();
    assert_eq!(lines, vec!["x 2", "y 2", "z 1"]);

    // Same bytes as the in-process engine.
    let reference = Job {
        inputs,
        output: dir.path().join("reference"),
        n_reduce: 2,
        aux: Bytes::new(),
    };
    sequential::run(&reference, &workload::named("wc").unwrap()).unwrap();
    assert_eq!(shards, read_shards(&reference.output, 2));

    let mut client = client(addr).await;
    let done = client.job_done(JobDoneRequest {}).await.unwrap().into_inner();
    assert!(done.done);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abandoned_task_is_reclaimed_after_its_lease() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(
        dir.path(),
        &[("a.txt", "one two"), ("b.txt", "two three"), ("c.txt", "three")],
    );
    let (addr, service) = start_coordinator(inputs, 3, Duration::from_millis(500)).await;

    // A worker that takes a task and disappears.
    let mut crashed = client(addr).await;
    let reply = crashed.acquire_task(AcquireTaskRequest {}).await.unwrap().into_inner();
    let abandoned = match reply {
        AcquireTaskReply::Assigned(task) => task,
        other => panic!("expected a task, got {other:?}"),
    };
    assert_eq!(abandoned.work_type, WorkType::Map);

    let summary = timeout(DEADLINE, spawn_worker(addr, dir.path(), Bytes::new()))
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(service.done());
    assert_eq!(summary.maps, 3);
    assert_eq!(summary.reduces, 3);

    let mut lines: Vec<String> = read_shards(dir.path(), 3)
        .iter()
        .flat_map(|s| s.lines().map(str::to_string).collect::<Vec<_>>())
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["one 1", "three 2", "two 2"]);

    // The original holder finally reports: acknowledged, nothing changes.
    crashed
        .report_completion(ReportCompletionRequest {
            work_type: abandoned.work_type,
            task_id: abandoned.task_id,
        })
        .await
        .unwrap();
    assert!(service.done());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reports_are_checked_over_the_wire() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), &[("a.txt", "x")]);
    let (addr, service) = start_coordinator(inputs, 1, Duration::from_secs(10)).await;
    let mut client = client(addr).await;

    let status = client
        .report_completion(ReportCompletionRequest {
            work_type: WorkType::Map,
            task_id: 7,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);

    // A reduce report while mapping is stale and ignored.
    client
        .report_completion(ReportCompletionRequest {
            work_type: WorkType::Reduce,
            task_id: 0,
        })
        .await
        .unwrap();
    assert_eq!(service.inspect(|job| job.completed()), 0);

    let reply = client.acquire_task(AcquireTaskRequest {}).await.unwrap().into_inner();
    assert!(matches!(reply, AcquireTaskReply::Assigned(ref t) if t.work_type == WorkType::Map));
    assert_eq!(
        client.acquire_task(AcquireTaskRequest {}).await.unwrap().into_inner(),
        AcquireTaskReply::NoWorkAvailable
    );
    let done = client.job_done(JobDoneRequest {}).await.unwrap().into_inner();
    assert!(!done.done);
}
