use clap::Parser;

use crate::file::DEFAULT_CACHE_CAPACITY;

#[derive(Parser, Debug)]
#[command(name = "rangefile")]
#[command(version)]
#[command(about = "Count lines of a remote resource using HTTP Range requests", long_about = None)]
#[command(after_help = "Examples:\n  \
  rangefile https://example.com/access.log.gz      count lines of a gzipped remote log\n  \
  rangefile --cache-size 1048576 ./local.log       count lines of a local file with a 1 MiB block\n  \
  RUST_LOG=debug rangefile https://example.com/x   show every range request")]
pub struct Cli {
    /// HTTP URL or local file path
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    /// Read-ahead block size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_size: u64,

    /// Reads larger than this skip the block (default: half the block)
    #[arg(long, value_name = "BYTES")]
    pub bypass_threshold: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Attempts per request on timeout or connect failures
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub max_retry: u32,

    /// Count raw bytes even if the content type says gzip
    #[arg(long)]
    pub no_gunzip: bool,

    /// Quiet mode: no progress counter
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.resource.starts_with("http://") || self.resource.starts_with("https://")
    }
}
