//! Converts MapReduce application names to actual application code.
//!
//! # Example
//!
//! To get the word count application:
//! ```
//! # use anyhow::Result;
//! use mrlease::workload;
//! # fn main() -> Result<()> {
//! let wc = workload::named("wc")?;
//! # Ok(())
//! # }
//! ```

use crate::Workload;
use anyhow::{bail, Result};
use bytes::Bytes;

pub mod grep;
pub mod indexer;
pub mod wc;

/// Names accepted by [`named`].
pub const NAMES: &[&str] = &["wc", "grep", "indexer"];

/// Gets the [`Workload`] named `name`.
///
/// Returns [`None`] if no application with the given name was found.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        }),
        "grep" => Some(Workload {
            map_fn: grep::map,
            reduce_fn: grep::reduce,
        }),
        "indexer" => Some(Workload {
            map_fn: indexer::map,
            reduce_fn: indexer::reduce,
        }),
        _ => None,
    }
}

/// Gets the [`Workload`] named `name`.
///
/// Returns an [`anyhow::Error`] if no application with the given name was found.
pub fn named(name: &str) -> Result<Workload> {
    match try_named(name) {
        Some(app) => Ok(app),
        None => bail!("No app named `{}` found (known: {}).", name, NAMES.join(", ")),
    }
}

/// Serialize auxiliary command line arguments the way workloads expect them:
/// a JSON array of strings.
pub fn encode_aux(args: &[String]) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(args)?))
}

/// Inverse of [`encode_aux`]. Empty input means no arguments.
pub fn decode_aux(aux: &[u8]) -> Result<Vec<String>> {
    if aux.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(aux)?)
}
