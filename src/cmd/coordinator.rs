use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Port for the coordinator to listen on
    #[clap(short = 'P', long, default_value_t = 50051)]
    pub port: u16,
    /// Number of reduce tasks
    #[clap(short = 'r', long, default_value_t = 10)]
    pub n_reduce: u32,
    /// Seconds a worker has to finish a task before it is handed out again
    #[clap(short = 't', long, default_value_t = 10)]
    pub lease_secs: u64,
    /// Seconds to keep serving after the job is done
    #[clap(long, default_value_t = 2)]
    pub linger_secs: u64,
    /// Input files, one map task each. Glob patterns are expanded.
    #[clap(required = true)]
    pub inputs: Vec<String>,
}

impl Args {
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_secs)
    }
}
