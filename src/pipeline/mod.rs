//! Fetch, validate and assemble, strictly in that order.

mod report;

pub use report::{ManifestSummary, RunReport};

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use segforge_av::assembly::AssemblyEngine;
use segforge_av::{SystemRunner, ToolRunner};
use segforge_common::{SegmentKind, SegmentSet};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::fetch::{origin_of, Fetcher, HttpSource, SegmentSource};
use crate::validate::{Thresholds, ValidationReport, Validator};

/// Inputs of a full `run`.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub manifest: PathBuf,
    pub base_url: Option<String>,
    pub output_dir: PathBuf,
    pub output_file: PathBuf,
    /// `None` picks the kind from existing slots or the segment locations,
    /// then checks it against the content of the first segment.
    pub kind: Option<SegmentKind>,
    pub combine: bool,
    pub skip_validation: bool,
}

/// Wires the stages together with their collaborators.
pub struct Pipeline {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    ffmpeg: Option<PathBuf>,
    source: Option<Arc<dyn SegmentSource>>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runner: Arc::new(SystemRunner),
            ffmpeg: None,
            source: None,
        }
    }

    /// Run tools through `runner`, invoking ffmpeg as `ffmpeg`.
    pub fn with_tool_runner(mut self, runner: Arc<dyn ToolRunner>, ffmpeg: impl Into<PathBuf>) -> Self {
        self.runner = runner;
        self.ffmpeg = Some(ffmpeg.into());
        self
    }

    /// Fetch segments from `source` instead of over HTTP.
    pub fn with_source(mut self, source: Arc<dyn SegmentSource>) -> Self {
        self.source = Some(source);
        self
    }

    fn ffmpeg(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.ffmpeg {
            return Ok(path.clone());
        }
        segforge_av::tools::get_tool_path("ffmpeg", self.config.tools.ffmpeg_path.as_deref())
            .context("ffmpeg is required for this step")
    }

    fn http_source(&self, first_location: Option<&str>) -> Result<Arc<dyn SegmentSource>> {
        if let Some(ref source) = self.source {
            return Ok(source.clone());
        }
        let referer = self
            .config
            .http
            .referer
            .clone()
            .or_else(|| first_location.and_then(origin_of));
        tracing::debug!("Using referer {:?}", referer);
        let source = HttpSource::new(&self.config.http, referer.as_deref())
            .context("Failed to build HTTP client")?;
        Ok(Arc::new(source))
    }

    /// Parse the manifest, fetch, validate and (optionally) assemble.
    ///
    /// Errors only when the manifest is unreadable, the output directory
    /// cannot be created, or a needed tool is missing. Per-segment and
    /// per-strategy failures are in the report.
    pub async fn run(&self, request: &RunRequest, cancel: &CancellationToken) -> Result<RunReport> {
        let manifest = segforge_manifest::parse_file(&request.manifest, request.base_url.as_deref())
            .with_context(|| format!("Failed to load manifest {:?}", request.manifest))?;

        for warning in &manifest.warnings {
            tracing::warn!("{}", warning);
        }
        if let Some(ref encryption) = manifest.encryption {
            tracing::warn!(
                "Playlist is {} encrypted; assembly will most likely fail",
                encryption.method
            );
        }
        if !manifest.is_endlist {
            tracing::debug!("Playlist has no #EXT-X-ENDLIST; it may be a live window");
        }

        let kind = request.kind.unwrap_or_else(|| {
            existing_kind(&request.output_dir)
                .unwrap_or_else(|| SegmentKind::infer(manifest.locations()))
        });
        tracing::info!("Found {} {} segment URLs", manifest.references.len(), kind);

        let mut report = RunReport::new(kind);
        report.manifest = Some(ManifestSummary::from(&manifest));

        let source = self.http_source(manifest.locations().next())?;
        let fetcher = Fetcher::new(source).with_retries(
            self.config.http.retries,
            Duration::from_millis(self.config.http.retry_delay_ms),
        );
        let mut fetched = fetcher
            .fetch(&manifest.references, &request.output_dir, kind, cancel)
            .await?;
        if request.kind.is_none() {
            fetched.set = match_content(fetched.set)?;
            report.kind = fetched.set.kind();
        }
        let mut set = fetched.set.clone();
        report.fetch = Some(fetched);
        if report.cancelled() {
            return Ok(report);
        }

        if request.skip_validation || !self.config.validation.enabled {
            tracing::info!("Skipping validation");
        } else {
            let validation = self.validator()?.validate(&mut set, cancel).await;
            report.validation = Some(validation);
            if report.cancelled() {
                return Ok(report);
            }
        }

        if request.combine {
            report.assembly = Some(self.assemble_set(&set, &request.output_file, cancel).await?);
        }

        Ok(report)
    }

    /// Validate and assemble segments already on disk.
    pub async fn combine(
        &self,
        dir: &Path,
        kind: Option<SegmentKind>,
        output: &Path,
        skip_validation: bool,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let mut set = scan_dir(dir, kind)?;
        let mut report = RunReport::new(set.kind());

        if !skip_validation && self.config.validation.enabled {
            report.validation = Some(self.validator()?.validate(&mut set, cancel).await);
            if report.cancelled() {
                return Ok(report);
            }
        }

        report.assembly = Some(self.assemble_set(&set, output, cancel).await?);
        Ok(report)
    }

    /// Validate segments already on disk.
    pub async fn validate(
        &self,
        dir: &Path,
        kind: Option<SegmentKind>,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport> {
        let mut set = scan_dir(dir, kind)?;
        Ok(self.validator()?.validate(&mut set, cancel).await)
    }

    fn validator(&self) -> Result<Validator> {
        let settings = &self.config.validation;
        let validator = Validator::new(Thresholds {
            min_image_bytes: settings.min_image_bytes,
            min_transport_bytes: settings.min_transport_bytes,
        });
        if !settings.decode_probe {
            return Ok(validator);
        }
        Ok(validator.with_decode_probe(
            self.runner.clone(),
            self.ffmpeg()?,
            Duration::from_secs(settings.probe_timeout_secs),
        ))
    }

    async fn assemble_set(
        &self,
        set: &SegmentSet,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<segforge_av::assembly::AssemblyReport> {
        let engine = AssemblyEngine::new(
            self.runner.clone(),
            self.ffmpeg()?,
            self.config.assembly.to_options(),
        );
        Ok(engine.assemble(set, output, cancel).await)
    }
}

/// Pick the segment kind from the slot files present in `dir`.
pub fn detect_kind(dir: &Path) -> Result<SegmentKind> {
    let images = SegmentSet::scan(dir, SegmentKind::Image)
        .with_context(|| format!("Failed to read segment directory {:?}", dir))?;
    if images.is_empty() {
        Ok(SegmentKind::Transport)
    } else {
        Ok(SegmentKind::Image)
    }
}

/// Kind of the slot files already in `dir`, if there are any.
fn existing_kind(dir: &Path) -> Option<SegmentKind> {
    [SegmentKind::Image, SegmentKind::Transport]
        .into_iter()
        .find(|&kind| SegmentSet::scan(dir, kind).is_ok_and(|set| !set.is_empty()))
}

/// Scan `dir`; without an explicit kind, detect it and check the content.
fn scan_dir(dir: &Path, kind: Option<SegmentKind>) -> Result<SegmentSet> {
    let set = SegmentSet::scan(dir, kind.map_or_else(|| detect_kind(dir), Ok)?)
        .with_context(|| format!("Failed to read segment directory {:?}", dir))?;
    match kind {
        Some(_) => Ok(set),
        None => match_content(set),
    }
}

/// Re-file `set` under the kind its first usable segment actually contains.
fn match_content(set: SegmentSet) -> Result<SegmentSet> {
    let Some(found) = sniff_first(&set).filter(|&found| found != set.kind()) else {
        return Ok(set);
    };

    tracing::warn!(
        "Segments fetched as {} contain {} data; renaming slots",
        set.kind(),
        found
    );
    let dir = set.dir().to_path_buf();
    set.relabel(found)
        .with_context(|| format!("Failed to rename segments in {:?}", dir))
}

fn sniff_first(set: &SegmentSet) -> Option<SegmentKind> {
    let first = set.usable().next()?;
    let mut head = [0u8; 4];
    let read = std::fs::File::open(&first.path)
        .and_then(|mut file| file.read(&mut head))
        .ok()?;
    SegmentKind::sniff(&head[..read])
}
