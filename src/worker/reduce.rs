//! Reduce executor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::{BufMut, Bytes, BytesMut};
use itertools::Itertools;
use tracing::{debug, info};

use crate::shuffle::{output_name, read_intermediate, write_atomic};
use crate::{KeyValue, Workload};

/// Sort `pairs` by key, group equal keys and reduce each group.
///
/// The sort is stable, so the values of a key reach the reduce function in
/// the order they were gathered. Returns the shard contents: one
/// `<key> <value>\n` line per distinct key, keys ascending.
pub fn reduce_pairs(workload: &Workload, aux: &Bytes, mut pairs: Vec<KeyValue>) -> Result<Bytes> {
    pairs.sort_by(|a, b| a.key.cmp(&b.key));

    let reduce_func = workload.reduce_fn;
    let mut out = BytesMut::new();
    for (key, group) in &pairs.into_iter().chunk_by(KeyValue::key) {
        let values = group.map(KeyValue::into_value);
        let reduced = reduce_func(key.clone(), Box::new(values), aux.clone())
            .with_context(|| format!("reduce of key {:?} failed", String::from_utf8_lossy(&key)))?;
        out.put_slice(&key);
        out.put_u8(b' ');
        out.put_slice(&reduced);
        out.put_u8(b'\n');
    }
    Ok(out.freeze())
}

/// Execute reduce task `reduce_id`: gather its artifact from every map task
/// in `dir`, reduce, and write the output shard.
pub fn perform_reduce(
    dir: &Path,
    workload: &Workload,
    aux: &Bytes,
    reduce_id: u32,
    n_map: u32,
) -> Result<PathBuf> {
    info!(reduce_id, n_map, "starting reduce task");

    let mut pairs = Vec::new();
    for map_id in 0..n_map {
        pairs.extend(read_intermediate(dir, map_id, reduce_id)?);
    }
    debug!(reduce_id, pairs = pairs.len(), "gathered intermediate pairs");

    let shard = reduce_pairs(workload, aux, pairs)?;
    write_atomic(dir, &output_name(reduce_id), &shard)
}
