use clap::Parser;
use mrlease::cmd::worker::Args;
use mrlease::utils::init_tracing;
use mrlease::worker::{self, RetryPolicy, WorkerConfig};
use mrlease::workload;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let app = workload::named(&args.workload)?;
    let config = WorkerConfig {
        coordinator: args.join.clone(),
        dir: args.dir.clone(),
        idle_backoff: args.backoff(),
        retry: RetryPolicy {
            attempts: args.retries.max(1),
            ..RetryPolicy::default()
        },
        aux: workload::encode_aux(&args.args)?,
    };

    info!(coordinator = %config.coordinator, workload = %args.workload, "worker starting");
    let summary = worker::run(config, app).await?;
    info!(
        maps = summary.maps,
        reduces = summary.reduces,
        failed = summary.failed,
        "worker finished"
    );
    Ok(())
}
