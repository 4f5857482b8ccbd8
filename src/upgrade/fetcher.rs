//! Release archive download.
//!
//! [`ArchiveFetcher`] downloads one archive per [`DownloadJob`]. With more
//! than one thread it asks the server for the archive size and range
//! support, splits the archive into that many byte ranges and downloads them
//! as concurrent tasks, each writing at its own offset in the destination.
//! Any failed range fails the whole job. Servers that do not advertise
//! `Accept-Ranges: bytes` or a `Content-Length` get a single-stream download.
//!
//! Progress is reported through [`ProgressBar`] and never affects the
//! result.

use anyhow::{Context, Result};
use futures::StreamExt;
use futures::future::try_join_all;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::SelfupError;
use crate::utils::progress::ProgressBar;

/// One archive download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    /// Where the archive is fetched from
    pub url: String,
    /// File the archive is written to; created or truncated
    pub dest: PathBuf,
    /// Number of parallel range requests; only values above 1 split the download
    pub threads: usize,
    /// Whether to draw a progress bar
    pub show_progress: bool,
}

impl DownloadJob {
    /// Create a job downloading `url` into `dest`.
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            threads: 0,
            show_progress: false,
        }
    }

    /// Use `threads` parallel range requests.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Draw a progress bar while downloading.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// A contiguous, inclusive byte range of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte
    pub start: u64,
    /// Last byte, inclusive
    pub end: u64,
}

impl ByteRange {
    fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Split `total` bytes into at most `parts` contiguous ranges.
///
/// Earlier ranges absorb the remainder, so sizes differ by at most one byte.
/// Never yields empty ranges: fewer ranges are returned when `total < parts`.
pub fn plan_ranges(total: u64, parts: usize) -> Vec<ByteRange> {
    if total == 0 || parts == 0 {
        return Vec::new();
    }
    let parts = (parts as u64).min(total);
    let base = total / parts;
    let remainder = total % parts;

    let mut ranges = Vec::with_capacity(parts as usize);
    let mut start = 0;
    for i in 0..parts {
        let len = base + u64::from(i < remainder);
        ranges.push(ByteRange {
            start,
            end: start + len - 1,
        });
        start += len;
    }
    ranges
}

/// Downloads release archives over HTTP.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
}

impl ArchiveFetcher {
    /// Create a fetcher using `client` for every request.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
        }
    }

    /// Download `job.url` into `job.dest`.
    ///
    /// On failure the partially written destination is removed.
    ///
    /// # Errors
    ///
    /// - [`SelfupError::HttpStatus`] when the server answers with a non-success status
    /// - [`SelfupError::DownloadFailed`] on transport failures or short range bodies
    /// - IO errors writing the destination, with the path in context
    pub async fn fetch(&self, job: &DownloadJob) -> Result<()> {
        let result = self.fetch_inner(job).await;
        if result.is_err()
            && let Err(e) = tokio::fs::remove_file(&job.dest).await
        {
            debug!("No partial download to remove at {}: {}", job.dest.display(), e);
        }
        result
    }

    async fn fetch_inner(&self, job: &DownloadJob) -> Result<()> {
        if job.threads > 1 {
            match self.query_range_support(&job.url).await? {
                Some(total) => return self.fetch_ranges(job, total).await,
                None => {
                    warn!("{} does not support range requests, downloading in one stream", job.url)
                }
            }
        }
        self.fetch_single(job).await
    }

    /// Size of the archive when the server supports byte ranges.
    ///
    /// A rejected `HEAD` counts as no range support.
    async fn query_range_support(&self, url: &str) -> Result<Option<u64>> {
        let response = self.client.head(url).send().await.map_err(|e| download_error(url, &e))?;
        let status = response.status();
        if !status.is_success() {
            warn!("HEAD {} returned {}", url, status);
            return Ok(None);
        }

        let headers = response.headers();
        let accepts_bytes = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.split(',').any(|unit| unit.trim() == "bytes"));
        let length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|len| *len > 0);

        debug!("HEAD {}: accept-ranges={} content-length={:?}", url, accepts_bytes, length);
        Ok(length.filter(|_| accepts_bytes))
    }

    async fn fetch_single(&self, job: &DownloadJob) -> Result<()> {
        debug!("Downloading {} into {}", job.url, job.dest.display());
        let response =
            self.client.get(&job.url).send().await.map_err(|e| download_error(&job.url, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SelfupError::HttpStatus {
                url: job.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let progress = ProgressBar::for_download(response.content_length(), job.show_progress);
        progress.set_message(file_label(&job.dest));

        let mut file = File::create(&job.dest)
            .await
            .with_context(|| format!("Failed to create {}", job.dest.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_error(&job.url, &e))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", job.dest.display()))?;
            progress.inc(chunk.len() as u64);
        }
        file.flush().await.with_context(|| format!("Failed to flush {}", job.dest.display()))?;

        progress.finish_and_clear();
        info!("Downloaded {} bytes from {}", progress.position(), job.url);
        Ok(())
    }

    async fn fetch_ranges(&self, job: &DownloadJob, total: u64) -> Result<()> {
        let ranges = plan_ranges(total, job.threads);
        info!("Downloading {} bytes from {} in {} ranges", total, job.url, ranges.len());

        let file = File::create(&job.dest)
            .await
            .with_context(|| format!("Failed to create {}", job.dest.display()))?;
        file.set_len(total)
            .await
            .with_context(|| format!("Failed to allocate {}", job.dest.display()))?;
        drop(file);

        let progress = ProgressBar::for_download(Some(total), job.show_progress);
        progress.set_message(file_label(&job.dest));

        let tasks = ranges.into_iter().enumerate().map(|(index, range)| {
            let client = self.client.clone();
            let url = job.url.clone();
            let dest = job.dest.clone();
            let progress = progress.clone();
            tokio::spawn(
                async move { fetch_range(&client, &url, &dest, index, range, &progress).await },
            )
        });

        let results = try_join_all(tasks).await.context("Range download task panicked")?;
        results.into_iter().collect::<Result<Vec<()>>>()?;

        progress.finish_and_clear();
        Ok(())
    }
}

async fn fetch_range(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    index: usize,
    range: ByteRange,
    progress: &ProgressBar,
) -> Result<()> {
    debug!("Range {} of {}: {}", index, url, range.header_value());
    let response = client
        .get(url)
        .header(RANGE, range.header_value())
        .send()
        .await
        .map_err(|e| download_error(url, &e))?;

    let status = response.status();
    if status != reqwest::StatusCode::PARTIAL_CONTENT {
        if !status.is_success() {
            return Err(SelfupError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        return Err(SelfupError::DownloadFailed {
            url: url.to_string(),
            reason: format!("server ignored range {} (status {status})", range.header_value()),
        }
        .into());
    }

    let mut file = OpenOptions::new()
        .write(true)
        .open(dest)
        .await
        .with_context(|| format!("Failed to open {} for range {index}", dest.display()))?;
    file.seek(SeekFrom::Start(range.start))
        .await
        .with_context(|| format!("Failed to seek in {}", dest.display()))?;

    let mut received: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| download_error(url, &e))?;
        let remaining = range.len().saturating_sub(received);
        let take = (chunk.len() as u64).min(remaining) as usize;
        file.write_all(&chunk[..take])
            .await
            .with_context(|| format!("Failed to write range {index} of {}", dest.display()))?;
        received += take as u64;
        progress.inc(take as u64);
    }
    file.flush().await.with_context(|| format!("Failed to flush {}", dest.display()))?;

    if received != range.len() {
        return Err(SelfupError::DownloadFailed {
            url: url.to_string(),
            reason: format!(
                "range {} ended after {received} of {} bytes",
                range.header_value(),
                range.len()
            ),
        }
        .into());
    }
    debug!("Range {} of {} complete", index, url);
    Ok(())
}

/// Fire-and-forget request that bumps the download counter of the release
/// archive at `url`.
///
/// Used when archives are served from a custom location so the release page
/// still counts the download. The body is written into a temporary directory
/// that is removed when the task ends. The result is never observed: every
/// failure is logged at debug level and dropped.
pub fn spawn_download_count(client: reqwest::Client, url: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = async {
            let dir = tempfile::tempdir().context("Failed to create temp dir")?;
            let job = DownloadJob::new(url.clone(), dir.path().join("count.tar.gz"));
            ArchiveFetcher::new(client).fetch(&job).await
        }
        .await;
        match result {
            Ok(()) => debug!("Counted download of {}", url),
            Err(e) => debug!("Download count request to {} failed: {:#}", url, e),
        }
    })
}

fn download_error(url: &str, error: &reqwest::Error) -> anyhow::Error {
    SelfupError::DownloadFailed {
        url: url.to_string(),
        reason: error.to_string(),
    }
    .into()
}

fn file_label(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
