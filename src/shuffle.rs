//! The contract between map and reduce workers.
//!
//! Map task `m` writes one artifact per reduce bucket `r`, named
//! `mr-tmp-<m>-<r>`. Reduce task `r` reads `mr-tmp-<i>-<r>` for every
//! `i in 0..n_map` and writes `mr-out-<r>`. Readers enumerate names instead
//! of listing the directory, so every artifact must exist (possibly empty)
//! before the map task reports completion.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use uuid::Uuid;

use crate::{codec, ihash, KeyValue};

pub const INTERMEDIATE_PREFIX: &str = "mr-tmp";
pub const OUTPUT_PREFIX: &str = "mr-out";

/// The reduce bucket a key belongs to.
#[inline]
pub fn partition(key: &[u8], n_reduce: u32) -> u32 {
    ihash(key) % n_reduce
}

/// Name of the artifact map task `map_id` produces for reduce task `reduce_id`.
pub fn intermediate_name(map_id: u32, reduce_id: u32) -> String {
    format!("{INTERMEDIATE_PREFIX}-{map_id}-{reduce_id}")
}

/// Name of the output shard of reduce task `reduce_id`.
pub fn output_name(reduce_id: u32) -> String {
    format!("{OUTPUT_PREFIX}-{reduce_id}")
}

/// Split pairs into `n_reduce` buckets, keeping emission order inside each.
pub fn split_into_buckets(
    pairs: impl IntoIterator<Item = KeyValue>,
    n_reduce: u32,
) -> Vec<Vec<KeyValue>> {
    let mut buckets = vec![Vec::new(); n_reduce as usize];
    for kv in pairs {
        buckets[partition(&kv.key, n_reduce) as usize].push(kv);
    }
    buckets
}

/// Write `contents` to `dir/name` so readers see either the old file or the
/// complete new one.
///
/// The data goes to a uniquely named sibling first and is renamed into
/// place, which is atomic on a single filesystem. Two attempts racing on the
/// same name each rename a complete file; the last one wins.
pub fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf> {
    let target = dir.join(name);
    let staging = dir.join(format!(".{name}.{}", Uuid::new_v4()));

    let written = (|| -> Result<()> {
        let mut file = fs::File::create(&staging)
            .with_context(|| format!("cannot create {}", staging.display()))?;
        file.write_all(contents)
            .with_context(|| format!("cannot write {}", staging.display()))?;
        file.sync_all()
            .with_context(|| format!("cannot flush {}", staging.display()))?;
        fs::rename(&staging, &target).with_context(|| {
            format!("cannot rename {} to {}", staging.display(), target.display())
        })
    })();

    if written.is_err() {
        let _ = fs::remove_file(&staging);
    }
    written.map(|_| target)
}

/// Write one bucket as artifact `(map_id, reduce_id)`.
pub fn write_intermediate(
    dir: &Path,
    map_id: u32,
    reduce_id: u32,
    pairs: &[KeyValue],
) -> Result<PathBuf> {
    let name = intermediate_name(map_id, reduce_id);
    let contents = codec::encode(pairs).with_context(|| format!("cannot encode {name}"))?;
    write_atomic(dir, &name, &contents)
}

/// Read and decode artifact `(map_id, reduce_id)`.
///
/// A missing artifact is an error: the map phase guarantees it exists.
pub fn read_intermediate(dir: &Path, map_id: u32, reduce_id: u32) -> Result<Vec<KeyValue>> {
    let path = dir.join(intermediate_name(map_id, reduce_id));
    let raw = fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;
    codec::decode(Bytes::from(raw)).with_context(|| format!("corrupt artifact {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names_are_pure_functions_of_ids() {
        assert_eq!(intermediate_name(3, 7), "mr-tmp-3-7");
        assert_eq!(output_name(4), "mr-out-4");
    }

    #[test]
    fn buckets_follow_partition_and_keep_order() {
        let pairs: Vec<KeyValue> = ["x", "y", "x", "z", "y"]
            .iter()
            .enumerate()
            .map(|(i, w)| KeyValue::new(w.to_string(), i.to_string()))
            .collect();
        let buckets = split_into_buckets(pairs.clone(), 3);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), pairs.len());
        for (r, bucket) in buckets.iter().enumerate() {
            let expected: Vec<KeyValue> = pairs
                .iter()
                .filter(|kv| partition(&kv.key, 3) as usize == r)
                .cloned()
                .collect();
            assert_eq!(bucket, &expected);
        }
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_staging_files() {
        let dir = TempDir::new().unwrap();
        write_atomic(dir.path(), "mr-out-0", b"first").unwrap();
        let path = write_atomic(dir.path(), "mr-out-0", b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["mr-out-0"]);
    }

    #[test]
    fn atomic_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(write_atomic(&missing, "mr-out-0", b"x").is_err());
    }

    #[test]
    fn intermediate_roundtrip_and_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let pairs = vec![KeyValue::new("k", "v")];
        write_intermediate(dir.path(), 2, 5, &pairs).unwrap();

        assert_eq!(read_intermediate(dir.path(), 2, 5).unwrap(), pairs);
        assert!(read_intermediate(dir.path(), 2, 4).is_err());
    }
}
