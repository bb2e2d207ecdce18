//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use superfetch_http::HttpFetcherConfig;
use superfetch_pipeline::{Compression, JobSettings};

/// Fetch every URL listed in the input containers and store the responses
/// as size-capped Avro segments under OUTPUT.
///
/// Locations are local paths or `s3://bucket/key` URLs. The location of each
/// sealed segment is printed on stdout, one per line.
#[derive(Parser, Debug)]
#[command(name = "superfetch", version, about)]
pub struct Config {
    /// Directory receiving the result segments
    pub output: String,

    /// Input containers of work items, processed in order
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Maximum number of fetches in flight
    #[arg(short = 'c', long, env = "SUPERFETCH_CONCURRENCY", default_value_t = 5)]
    pub concurrency: usize,

    /// Per-request timeout in seconds, body included
    #[arg(long, env = "SUPERFETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Segment size threshold in bytes
    #[arg(long, env = "SUPERFETCH_SEGMENT_SIZE", default_value_t = 100_000_000)]
    pub segment_size: u64,

    /// Block compression of output segments (null, deflate, zstandard)
    #[arg(long, env = "SUPERFETCH_COMPRESSION", default_value_t = Compression::Zstandard)]
    pub compression: Compression,

    /// Work items buffered between the decoder and the fetchers
    #[arg(long, env = "SUPERFETCH_CHANNEL_CAPACITY", default_value_t = 64)]
    pub channel_capacity: usize,

    /// User-agent header sent with every request
    #[arg(long, env = "SUPERFETCH_USER_AGENT", default_value = "bfgbot")]
    pub user_agent: String,

    /// Open file descriptor limit to request at startup
    #[arg(long, env = "SUPERFETCH_NOFILE_LIMIT", default_value_t = 100_000)]
    pub nofile_limit: u64,

    /// Directory for downloads and staged uploads (defaults to the OS temp dir)
    #[arg(long, env = "SUPERFETCH_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Use path-style S3 addressing, as MinIO requires
    #[arg(long, env = "SUPERFETCH_S3_FORCE_PATH_STYLE")]
    pub s3_force_path_style: bool,

    /// Log output format
    #[arg(long, env = "SUPERFETCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            concurrency: self.concurrency,
            max_segment_size: self.segment_size,
            compression: self.compression,
            channel_capacity: self.channel_capacity,
        }
    }

    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}
