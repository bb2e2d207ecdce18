//! Superfetch - Bulk URL Fetcher
//!
//! Reads URLs from Avro inputs, fetches each with one HTTP GET, and writes
//! the responses into size-capped Avro segments on local disk or S3.

mod config;
mod limits;
mod logging;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use superfetch_http::HttpFetcher;
use superfetch_pipeline::{run_job, Job, SealedSegment, StorageGateway};
use superfetch_s3::{client_from_env, S3ObjectStore};
use tracing::info;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let config = Config::parse();
    logging::init(config.log_format);

    info!(
        output = %config.output,
        inputs = config.inputs.len(),
        "Starting superfetch"
    );

    limits::raise_nofile_limit(config.nofile_limit);

    let job = Job::parse(&config.output, &config.inputs, config.job_settings())
        .context("Invalid job locations")?;

    let s3_client = client_from_env(config.s3_force_path_style).await;
    let store = S3ObjectStore::new(s3_client);
    let gateway = match &config.staging_dir {
        Some(dir) => StorageGateway::with_staging_dir(store, dir),
        None => StorageGateway::new(store),
    };

    let fetcher = HttpFetcher::new(config.fetcher_config()).context("Failed to build HTTP fetcher")?;

    let report = run_job(job, Arc::new(gateway), Arc::new(fetcher))
        .await
        .context("Run failed")?;

    print_segments(&mut io::stdout().lock(), &report.segments)
        .context("Failed to write segment locations")?;

    info!(
        segments = report.segments.len(),
        dispatched = report.stats.dispatched,
        succeeded = report.stats.succeeded,
        failed = report.stats.failed,
        "Done"
    );

    Ok(())
}

/// Write one line per sealed segment location, in sealing order
fn print_segments(out: &mut impl Write, segments: &[SealedSegment]) -> io::Result<()> {
    for segment in segments {
        writeln!(out, "{}", segment.location)?;
    }
    out.flush()
}
