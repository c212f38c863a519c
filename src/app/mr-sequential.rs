use std::path::PathBuf;

use clap::Parser;
use mrlease::cmd::sequential::Args;
use mrlease::sequential::{self, Job};
use mrlease::utils::{expand_inputs, init_tracing};
use mrlease::workload;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let app = workload::named(&args.workload)?;
    let job = Job {
        inputs: expand_inputs(&[&args.input])?,
        output: PathBuf::from(&args.output),
        n_reduce: args.n_reduce,
        aux: workload::encode_aux(&args.args)?,
    };

    let shards = sequential::run(&job, &app)?;
    info!(shards = shards.len(), output = %args.output, "sequential job done");
    Ok(())
}
