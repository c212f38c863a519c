//! Utility functions that may be helpful for implementing
//! and testing MapReduce.

use anyhow::{bail, Context, Result};
use glob::glob;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber used by the binaries.
///
/// The level defaults to `info` and can be overridden with `RUST_LOG`.
/// Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Expand glob patterns into a list of input references.
///
/// Every pattern must match at least one path; matches of a single pattern are
/// sorted, and patterns keep the order they were given in. A pattern without
/// glob metacharacters names the file itself.
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<String>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let mut matched = glob(pattern)
            .with_context(|| format!("invalid input pattern {pattern}"))?
            .map(|entry| entry.map(|path| path.to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("cannot expand {pattern}"))?;
        if matched.is_empty() {
            bail!("input pattern {pattern} matched nothing");
        }
        matched.sort();
        inputs.extend(matched);
    }
    Ok(inputs)
}
