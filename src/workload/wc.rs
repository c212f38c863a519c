//! A MapReduce-compatible implementation of word count.
//!
//! Every intermediate value is the decimal string `1`; the reduced value is
//! the decimal total.

use crate::*;
use anyhow::{Context, Result};
use bytes::Bytes;

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let s = String::from_utf8(kv.value.as_ref().into())?;
    let words = s
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>();

    let iter = words
        .into_iter()
        .map(|word| Ok(KeyValue::new(word, Bytes::from_static(b"1"))));
    Ok(Box::new(iter))
}

pub fn reduce(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let mut count: u64 = 0;
    for value in values {
        let n: u64 = std::str::from_utf8(&value)
            .ok()
            .and_then(|s| s.parse().ok())
            .with_context(|| format!("bad count {:?} for {:?}", value, key))?;
        count += n;
    }
    Ok(Bytes::from(count.to_string()))
}
