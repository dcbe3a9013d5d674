//! Segment fetching.
//!
//! The [`Fetcher`] walks the manifest references in order and materializes
//! each one as a slot file in the destination directory. A slot that already
//! exists is skipped, which is what makes an interrupted run resumable.
//! Bodies are written to a `.part` file first and renamed into place, so a
//! slot never holds a half-written transfer.

mod http;

pub use http::{origin_of, HttpSource};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use segforge_common::paths::{partial_path, slot_path};
use segforge_common::{LocalSegment, SegmentKind, SegmentReference, SegmentSet, SegmentState};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Why a single transfer failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("empty response body")]
    Empty,

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability for streaming one remote segment to a local file.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Stream `url` into `dest`, returning the number of bytes written.
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// A segment that could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentFailure {
    pub index: usize,
    pub location: String,
    pub error: String,
}

/// Outcome of a fetch pass.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes: u64,
    pub cancelled: bool,
    pub failures: Vec<SegmentFailure>,
    #[serde(skip)]
    pub set: SegmentSet,
}

/// Sequential, failure-absorbing segment downloader.
pub struct Fetcher {
    source: Arc<dyn SegmentSource>,
    retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(source: Arc<dyn SegmentSource>) -> Self {
        Self {
            source,
            retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Extra attempts per segment, with a delay growing linearly per attempt.
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Fetch every reference into `dir`.
    ///
    /// Only failing to create `dir` is an error. Individual transfer failures
    /// are counted, logged and recorded as [`SegmentState::Failed`].
    pub async fn fetch(
        &self,
        references: &[SegmentReference],
        dir: &Path,
        kind: SegmentKind,
        cancel: &CancellationToken,
    ) -> Result<FetchReport> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let total = references.len();
        let mut segments = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut bytes = 0;
        let mut cancelled = false;

        tracing::info!("Fetching {} segments into {}", total, dir.display());

        for reference in references {
            let mut segment = LocalSegment::pending(reference.index, slot_path(dir, kind, reference.index));

            if cancelled || cancel.is_cancelled() {
                cancelled = true;
                segments.push(segment);
                continue;
            }

            let existing = tokio::fs::metadata(&segment.path)
                .await
                .ok()
                .filter(|meta| meta.is_file() && meta.len() > 0);
            if let Some(meta) = existing {
                tracing::info!(
                    "[{}/{}] {} already exists, skipping",
                    reference.index + 1,
                    total,
                    segment.path.display()
                );
                segment.size_bytes = meta.len();
                segment.state = SegmentState::Skipped;
                segments.push(segment);
                continue;
            }

            match self.fetch_one(&reference.location, &segment.path).await {
                Ok(size) => {
                    tracing::info!(
                        "[{}/{}] Downloaded {} ({} bytes)",
                        reference.index + 1,
                        total,
                        reference.location,
                        size
                    );
                    bytes += size;
                    segment.size_bytes = size;
                    segment.state = SegmentState::Downloaded;
                }
                Err(e) => {
                    tracing::warn!(
                        "[{}/{}] Failed to download {}: {}",
                        reference.index + 1,
                        total,
                        reference.location,
                        e
                    );
                    failures.push(SegmentFailure {
                        index: reference.index,
                        location: reference.location.clone(),
                        error: e.to_string(),
                    });
                    segment.state = SegmentState::Failed;
                }
            }
            segments.push(segment);
        }

        let set = SegmentSet::new(kind, dir, segments);
        let report = FetchReport {
            downloaded: set.count(SegmentState::Downloaded),
            skipped: set.count(SegmentState::Skipped),
            failed: set.count(SegmentState::Failed),
            bytes,
            cancelled,
            failures,
            set,
        };

        if cancelled {
            tracing::warn!("Fetch cancelled; rerun to resume");
        }
        if report.failed > 0 {
            tracing::warn!("Download complete with {} errors", report.failed);
        } else {
            tracing::info!("Download complete");
        }

        Ok(report)
    }

    /// Fetch one slot with retries, via a partial file.
    async fn fetch_one(&self, url: &str, slot: &Path) -> Result<u64, FetchError> {
        let partial = partial_path(slot);
        let mut attempt = 0;

        loop {
            let result = match self.source.fetch_to(url, &partial).await {
                Ok(size) => tokio::fs::rename(&partial, slot)
                    .await
                    .map(|_| size)
                    .map_err(FetchError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(size) => return Ok(size),
                Err(e) => {
                    let _ = tokio::fs::remove_file(&partial).await;
                    if attempt >= self.retries {
                        return Err(e);
                    }
                    attempt += 1;
                    tracing::debug!(
                        "Attempt {} for {} failed: {}; retrying",
                        attempt,
                        url,
                        e
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
            }
        }
    }
}
