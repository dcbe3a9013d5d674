//! Segment integrity validation.
//!
//! The validator is the only integrity gate between fetching and assembly:
//! a 200 response can still carry a truncated or garbage body. Every present
//! segment goes through the static checks in [`markers`]; optionally ffmpeg
//! is then asked to decode it. Rejected segments are deleted and marked
//! [`SegmentState::Invalid`] so assembly works with whatever is left.

pub mod markers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use segforge_av::probe::{decode_probe, ProbeVerdict};
use segforge_av::ToolRunner;
use segforge_common::{SegmentSet, SegmentState};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use markers::{check_static, InvalidReason, Thresholds, Verdict};

/// A segment removed by validation.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub path: PathBuf,
    #[serde(flatten)]
    pub reason: InvalidReason,
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub valid: usize,
    pub removed: usize,
    pub cancelled: bool,
    pub rejections: Vec<Rejection>,
}

struct DecodeProbe {
    runner: Arc<dyn ToolRunner>,
    ffmpeg: PathBuf,
    timeout: Duration,
}

/// Static and optional decode checks over a segment set.
pub struct Validator {
    thresholds: Thresholds,
    probe: Option<DecodeProbe>,
}

impl Validator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            probe: None,
        }
    }

    /// Also require each segment to decode with ffmpeg within `timeout`.
    pub fn with_decode_probe(
        mut self,
        runner: Arc<dyn ToolRunner>,
        ffmpeg: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        self.probe = Some(DecodeProbe {
            runner,
            ffmpeg: ffmpeg.into(),
            timeout,
        });
        self
    }

    /// Classify every present segment in `set`, removing the invalid ones.
    ///
    /// Never fails. A file that is already gone when it is removed counts as
    /// removed all the same.
    pub async fn validate(&self, set: &mut SegmentSet, cancel: &CancellationToken) -> ValidationReport {
        let kind = set.kind();
        let total = set.usable_count();
        let mut report = ValidationReport::default();
        let mut probe = self.probe.as_ref();

        tracing::info!("Validating {} {} segments", total, kind);

        let present = set.segments_mut().iter_mut().filter(|s| s.state.is_present());
        for (position, segment) in present.enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Validation cancelled after {} of {} segments", position, total);
                report.cancelled = true;
                break;
            }
            if position > 0 && position % 100 == 0 {
                tracing::info!("Progress: {}/{} segments checked", position, total);
            }

            let mut verdict = check_static(&segment.path, kind, &self.thresholds);

            if let Some(p) = probe.filter(|_| verdict == Verdict::Valid) {
                match decode_probe(p.runner.as_ref(), &p.ffmpeg, &segment.path, p.timeout).await {
                    ProbeVerdict::Decodable => {}
                    ProbeVerdict::Undecodable { diagnostic } => {
                        verdict = Verdict::Invalid(InvalidReason::Undecodable { diagnostic });
                    }
                    ProbeVerdict::TimedOut => {
                        verdict = Verdict::Invalid(InvalidReason::ProbeTimedOut);
                    }
                    ProbeVerdict::Unavailable { message } => {
                        tracing::warn!("Decode probe unavailable ({}); continuing with static checks only", message);
                        probe = None;
                    }
                }
            }

            match verdict {
                Verdict::Valid => report.valid += 1,
                Verdict::Invalid(reason) => {
                    tracing::warn!(
                        "Removing {}: {}",
                        segment.path.display(),
                        reason
                    );
                    if let Err(e) = std::fs::remove_file(&segment.path) {
                        tracing::debug!("Could not remove {}: {}", segment.path.display(), e);
                    }
                    segment.state = SegmentState::Invalid;
                    segment.size_bytes = 0;
                    report.removed += 1;
                    report.rejections.push(Rejection {
                        index: segment.index,
                        path: segment.path.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            "Validation complete: {} valid, {} removed",
            report.valid,
            report.removed
        );
        report
    }
}
