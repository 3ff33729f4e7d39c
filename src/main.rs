//! Main entry point for the rangefile CLI application.
//!
//! Counts the lines of a remote (or local) resource through a
//! [`VirtualFile`], transparently gunzipping gzip content on the way.

use anyhow::Result;
use clap::Parser;
use flate2::bufread::MultiGzDecoder;
use indicatif::{HumanCount, ProgressBar, ProgressDrawTarget, ProgressStyle};
use memchr::memchr_iter;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use rangefile::{
    Cli, FileTransport, HttpTransport, HttpTransportOptions, Transport, VirtualFile,
    VirtualFileOptions,
};

/// Minimum delay between two progress updates on stderr.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut options = VirtualFileOptions::default().with_cache_capacity(cli.cache_size);
    if let Some(threshold) = cli.bypass_threshold {
        options = options.with_bypass_threshold(threshold);
    }

    if cli.is_http_url() {
        let transport_options = HttpTransportOptions::default()
            .with_timeout(Duration::from_secs(cli.timeout))
            .with_max_retry(cli.max_retry);
        let transport = HttpTransport::with_options(cli.resource.clone(), transport_options)?;
        count_resource(transport, options, &cli)
    } else {
        let transport = FileTransport::new(Path::new(&cli.resource))?;
        count_resource(transport, options, &cli)
    }
}

/// Open the resource, count its lines and report the traffic it took.
fn count_resource<T: Transport>(
    transport: T,
    options: VirtualFileOptions,
    cli: &Cli,
) -> Result<()> {
    let mut file = VirtualFile::open_with(transport, options)?;
    println!(
        "Size:{} Content-Type:{}",
        file.total_size(),
        file.content_type()
    );

    let pb = progress_bar(cli.quiet);
    let gunzip = !cli.no_gunzip && file.content_type().contains("gzip");

    let lines = if gunzip {
        let decoder = BufReader::new(MultiGzDecoder::new(&mut file));
        count_lines(decoder, |n| pb.set_position(n))?
    } else {
        count_lines(&mut file, |n| pb.set_position(n))?
    };
    pb.finish_and_clear();

    println!("Read {} lines", HumanCount(lines));

    if !cli.quiet {
        let stats = file.stats();
        eprintln!(
            "Total bytes transferred: {} in {} range requests",
            format_size(stats.bytes_fetched),
            stats.range_requests
        );
    }

    file.close();
    Ok(())
}

/// Count newline-terminated lines, plus a trailing unterminated one.
///
/// `on_progress` receives the running count after every chunk.
fn count_lines<R: BufRead>(mut reader: R, mut on_progress: impl FnMut(u64)) -> io::Result<u64> {
    let mut lines = 0u64;
    let mut unterminated = false;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        lines += memchr_iter(b'\n', buf).count() as u64;
        unterminated = buf.last() != Some(&b'\n');

        let len = buf.len();
        reader.consume(len);
        on_progress(lines);
    }

    if unterminated {
        lines += 1;
    }
    Ok(lines)
}

/// Spinner with the running line count, drawn on stderr at most every
/// [`PROGRESS_INTERVAL`]. Hidden in quiet mode.
fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let hz = (1000 / PROGRESS_INTERVAL.as_millis()) as u8;
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(hz));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {human_pos} lines ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(1048576), "1.00 MB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
