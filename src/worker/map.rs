//! Map executor.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{debug, info};

use crate::shuffle::{split_into_buckets, write_intermediate};
use crate::{KeyValue, Workload};

/// Run the workload's map function over one input.
///
/// The input is handed over as a single pair: its reference as the key and
/// its entire contents as the value.
pub fn apply_map(workload: &Workload, aux: &Bytes, input: &str, content: Bytes) -> Result<Vec<KeyValue>> {
    let input_kv = KeyValue {
        key: Bytes::from(input.to_owned()),
        value: content,
    };
    let map_func = workload.map_fn;
    map_func(input_kv, aux.clone())
        .with_context(|| format!("map over {input} failed"))?
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("map over {input} failed"))
}

/// Execute map task `map_id` over `input`, writing one artifact per reduce
/// bucket into `dir`.
///
/// All `n_reduce` artifacts are written, empty ones included, before this
/// returns `Ok`. Returns their paths in bucket order.
pub fn perform_map(
    dir: &Path,
    workload: &Workload,
    aux: &Bytes,
    map_id: u32,
    n_reduce: u32,
    input: &str,
) -> Result<Vec<PathBuf>> {
    info!(map_id, input, "starting map task");

    let content = fs::read(input).with_context(|| format!("cannot read input {input}"))?;
    let pairs = apply_map(workload, aux, input, Bytes::from(content))?;
    debug!(map_id, pairs = pairs.len(), "map produced pairs");

    split_into_buckets(pairs, n_reduce)
        .iter()
        .enumerate()
        .map(|(reduce_id, bucket)| write_intermediate(dir, map_id, reduce_id as u32, bucket))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shuffle::{partition, read_intermediate};
    use crate::workload;
    use tempfile::TempDir;

    #[test]
    fn writes_every_bucket_with_matching_keys() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.txt");
        fs::write(&input, "x y x q r s t").unwrap();
        let wc = workload::named("wc").unwrap();

        let paths = perform_map(dir.path(), &wc, &Bytes::new(), 4, 3, input.to_str().unwrap()).unwrap();
        assert_eq!(paths.len(), 3);

        let mut seen = 0;
        for reduce_id in 0..3 {
            let pairs = read_intermediate(dir.path(), 4, reduce_id).unwrap();
            assert!(pairs.iter().all(|kv| partition(&kv.key, 3) == reduce_id));
            seen += pairs.len();
        }
        assert_eq!(seen, 7);
    }

    #[test]
    fn empty_input_still_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("empty.txt");
        fs::write(&input, "").unwrap();
        let wc = workload::named("wc").unwrap();

        perform_map(dir.path(), &wc, &Bytes::new(), 0, 5, input.to_str().unwrap()).unwrap();
        for reduce_id in 0..5 {
            assert!(read_intermediate(dir.path(), 0, reduce_id).unwrap().is_empty());
        }
    }

    #[test]
    fn missing_input_fails_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let wc = workload::named("wc").unwrap();
        let missing = dir.path().join("missing.txt");

        assert!(perform_map(dir.path(), &wc, &Bytes::new(), 0, 2, missing.to_str().unwrap()).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
