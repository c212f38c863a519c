use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Connect to a coordinator at the given IP address and port
    #[clap(short, long)]
    pub join: String,
    /// Name of the workload
    #[clap(short, long, default_value = "wc")]
    pub workload: String,
    /// Shared directory for intermediate files and output shards
    #[clap(short, long, default_value = ".")]
    pub dir: PathBuf,
    /// Milliseconds to wait when no task is available
    #[clap(short, long, default_value_t = 1000)]
    pub backoff_ms: u64,
    /// Attempts per coordinator RPC before giving up
    #[clap(short, long, default_value_t = 5)]
    pub retries: u32,
    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}

impl Args {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aux_args_follow_the_separator() {
        let args = Args::try_parse_from([
            "mr-worker", "--join", "localhost:50051", "-w", "grep", "--", "--term", "x",
        ])
        .unwrap();
        assert_eq!(args.workload, "grep");
        assert_eq!(args.dir, PathBuf::from("."));
        assert_eq!(args.args, vec!["--term", "x"]);
    }
}
