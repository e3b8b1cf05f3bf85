//! strmlnk - Harvest episode stream links from streaming platform listings
//!
//! This library drives a controlled chromium browser to episode-listing
//! pages of several streaming platforms, extracts per-episode metadata from
//! the rendered DOM, and writes one `.strmlnk` record per episode under a
//! `TV/<show>/S<season>E<episode>` layout.

mod browser;
mod dom;
mod normalize;
mod orchestrator;
mod providers;
mod record;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

// Re-export error types
pub use browser::{BrowserError, BrowserSession};
pub use dom::{DomElement, DomError, Element, PageDom};
pub use providers::{ExtractError, Provider};
pub use record::{EpisodeLink, SinkError, StreamLinkSink};

/// How long a watch pass sleeps before re-reading the watch file.
const WATCH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// How long a debug run keeps the visible browser window alive.
const DEBUG_LINGER: Duration = Duration::from_secs(600);

/// Configuration threaded from the CLI into a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory stream links are written below
    pub output_dir: PathBuf,
    /// Show the browser window and linger after a direct-URL run
    pub debug: bool,
    /// File with URLs to re-scrape in an indefinite loop
    pub watch: Option<PathBuf>,
    /// Listing pages to scrape once, in order
    pub urls: Vec<String>,
}

/// Top-level error type for a strmlnk run
#[derive(Debug, Error)]
pub enum StrmlnkError {
    /// The browser could not be launched or driven
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The watch file could not be read
    #[error("Failed to read watch file {path}: {source}")]
    WatchFile { path: PathBuf, source: io::Error },
}

/// Runs the whole batch: launches the browser session, processes the direct
/// URLs in order, then services the watch loop if one was requested.
///
/// Per-page failures are reported and skipped inside the orchestrator; only
/// resource acquisition (browser launch, watch file) is fatal. The browser
/// session is released on every exit path, including fatal errors raised
/// after launch.
pub async fn run(options: RunOptions) -> Result<(), StrmlnkError> {
    info!("launching chromium");
    let session = BrowserSession::launch(!options.debug).await?;
    info!("connected to chromium");

    let result = drive(&session, &options).await;
    session.close().await;
    result
}

async fn drive(session: &BrowserSession, options: &RunOptions) -> Result<(), StrmlnkError> {
    let sink = StreamLinkSink::new(&options.output_dir);

    for url in &options.urls {
        orchestrator::process_url(session, &sink, url).await;
    }

    if let Some(watch) = &options.watch {
        loop {
            let urls = read_watch_urls(watch).map_err(|source| StrmlnkError::WatchFile {
                path: watch.clone(),
                source,
            })?;
            for url in &urls {
                orchestrator::process_url(session, &sink, url).await;
            }
            info!(
                "watch pass complete, next in {} hours",
                WATCH_INTERVAL.as_secs() / 3600
            );
            tokio::time::sleep(WATCH_INTERVAL).await;
        }
    }

    if options.debug {
        info!("debug run finished, keeping the window alive");
        tokio::time::sleep(DEBUG_LINGER).await;
    }

    Ok(())
}

/// Reads the watch file: one URL as the first whitespace-delimited token per
/// line, lines without a token skipped.
fn read_watch_urls(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_read_watch_urls_takes_first_token_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://www.sho.com/a  refresh daily").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "https://www.hulu.com/b").unwrap();

        let urls = read_watch_urls(file.path()).unwrap();
        assert_eq!(urls, vec!["https://www.sho.com/a", "https://www.hulu.com/b"]);
    }

    #[test]
    fn test_read_watch_urls_missing_file_is_an_error() {
        assert!(read_watch_urls(Path::new("/nonexistent/watch.txt")).is_err());
    }
}
