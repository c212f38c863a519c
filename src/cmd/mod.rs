//! Command line arguments of the binaries.

pub mod coordinator;
pub mod sequential;
pub mod worker;
