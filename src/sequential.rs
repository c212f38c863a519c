//! An in-process MapReduce engine.
//!
//! Runs the same map, partition, sort and reduce steps as the distributed
//! system, one input after another, and writes the same `mr-out-<r>` shards.
//! Used to produce reference output for a distributed run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use tracing::info;

use crate::shuffle::{output_name, split_into_buckets, write_atomic};
use crate::worker::map::apply_map;
use crate::worker::reduce::reduce_pairs;
use crate::{KeyValue, Workload};

/// A sequential job.
#[derive(Debug, Clone)]
pub struct Job {
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub n_reduce: u32,
    pub aux: Bytes,
}

/// Map every input into `n_reduce` buckets.
pub fn perform_map(job: &Job, workload: &Workload) -> Result<Vec<Vec<KeyValue>>> {
    let mut buckets = vec![Vec::new(); job.n_reduce as usize];
    for input in &job.inputs {
        let content = fs::read(input).with_context(|| format!("cannot read input {input}"))?;
        let pairs = apply_map(workload, &job.aux, input, Bytes::from(content))?;
        for (r, bucket) in split_into_buckets(pairs, job.n_reduce).into_iter().enumerate() {
            buckets[r].extend(bucket);
        }
    }
    Ok(buckets)
}

/// Reduce each bucket into its output shard, empty buckets included.
pub fn perform_reduce(
    output: &Path,
    workload: &Workload,
    aux: &Bytes,
    buckets: Vec<Vec<KeyValue>>,
) -> Result<Vec<PathBuf>> {
    buckets
        .into_iter()
        .enumerate()
        .map(|(reduce_id, bucket)| {
            let shard = reduce_pairs(workload, aux, bucket)?;
            write_atomic(output, &output_name(reduce_id as u32), &shard)
        })
        .collect()
}

/// Run `job` to completion and return the shard paths in reduce id order.
pub fn run(job: &Job, workload: &Workload) -> Result<Vec<PathBuf>> {
    if job.n_reduce == 0 {
        bail!("n_reduce must be at least 1");
    }
    fs::create_dir_all(&job.output)
        .with_context(|| format!("cannot create {}", job.output.display()))?;

    info!(inputs = job.inputs.len(), n_reduce = job.n_reduce, "running sequential job");
    let buckets = perform_map(job, workload)?;
    perform_reduce(&job.output, workload, &job.aux, buckets)
}
