use std::net::SocketAddr;

use clap::Parser;
use mrlease::cmd::coordinator::Args;
use mrlease::coordinator::{serve_on, CoordinatorService, JobState};
use mrlease::utils::{expand_inputs, init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let inputs = expand_inputs(&args.inputs)?;
    let job = JobState::new(inputs, args.n_reduce, args.lease())?;
    info!(
        n_map = job.n_map(),
        n_reduce = job.n_reduce(),
        lease = ?args.lease(),
        "starting job"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    serve_on(CoordinatorService::new(job), addr, args.linger()).await?;
    info!("coordinator exiting");
    Ok(())
}
