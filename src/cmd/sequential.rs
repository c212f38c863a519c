use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Glob spec for the input files
    #[arg(short, long)]
    pub input: String,
    /// Name of the workload
    #[arg(short, long)]
    pub workload: String,
    /// Output directory
    #[arg(short, long)]
    pub output: String,
    /// Number of output shards
    #[arg(short, long, default_value_t = 10)]
    pub n_reduce: u32,
    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}
