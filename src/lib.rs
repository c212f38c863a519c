//! A fault-tolerant MapReduce system built around task leases.
//!
//! A single coordinator hands out map and reduce tasks to any number of
//! polling workers. Tasks that are not reported complete within their lease
//! are reclaimed and handed to someone else, so a job finishes as long as
//! some worker keeps running. Intermediate data is exchanged through a shared
//! directory using a fixed naming contract (see [`shuffle`]).

use bytes::Bytes;
use std::hash::Hasher;

pub mod cmd;
pub mod codec;
pub mod coordinator;
pub mod rpc;
pub mod sequential;
pub mod shuffle;
pub mod utils;
pub mod worker;
pub mod workload;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes the input reference and its full contents as a
/// key-value pair, plus auxiliary arguments.
///
/// It returns an iterator that yields intermediate key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: Bytes) -> MapOutput;

/// A reduce function takes in a key, an iterator over every value recorded
/// for that key, and an auxiliary argument. It returns the reduced value.
pub type ReduceFn = fn(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    aux: Bytes,
) -> anyhow::Result<Bytes>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,
    /// The value.
    pub value: Bytes,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

/// Hashes an intermediate key. The reduce bucket for a key is
/// `ihash(key) % n_reduce`.
///
/// FNV is stable across processes and platforms, which the shuffle relies
/// on: every map worker must put a given key in the same bucket.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::with_key(0);
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_is_deterministic_and_31_bit() {
        for key in ["", "x", "hello", "a much longer key with spaces"] {
            let h = ihash(key.as_bytes());
            assert_eq!(h, ihash(key.as_bytes()));
            assert!(h <= 0x7fff_ffff);
        }
    }

    #[test]
    fn ihash_separates_keys() {
        assert_ne!(ihash(b"x"), ihash(b"y"));
    }
}
