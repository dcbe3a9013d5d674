//! Per-attempt outcomes and the overall assembly report.

use std::path::{Path, PathBuf};

use segforge_common::SegmentKind;
use serde::Serialize;

use super::Strategy;

/// Result of a single strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyOutcome {
    /// Strategy that produced this outcome.
    pub strategy: Strategy,
    /// Whether the output met the viability predicate.
    pub success: bool,
    /// Requested output path.
    pub output_path: PathBuf,
    /// Size of the output file after the attempt, 0 when absent.
    pub output_size_bytes: u64,
    /// Tail of the tool's stderr or a description of what went wrong.
    pub diagnostic: String,
    /// Exit code of the final invocation, when it exited.
    pub exit_code: Option<i32>,
    /// Whether the final invocation hit its timeout.
    pub timed_out: bool,
}

impl AssemblyOutcome {
    /// Outcome for an attempt that never produced a usable invocation.
    pub(crate) fn failed(strategy: Strategy, output: &Path, diagnostic: impl Into<String>) -> Self {
        Self {
            strategy,
            success: false,
            output_path: output.to_path_buf(),
            output_size_bytes: output_size(output),
            diagnostic: diagnostic.into(),
            exit_code: None,
            timed_out: false,
        }
    }

    /// Output size in MiB, for summaries.
    pub fn output_size_mb(&self) -> f64 {
        self.output_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Size of `path`, or 0 when it does not exist or is not a file.
pub(crate) fn output_size(path: &Path) -> u64 {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .unwrap_or(0)
}

/// The viability predicate: the output exists and exceeds `min_bytes`.
pub fn is_viable(path: &Path, min_bytes: u64) -> bool {
    output_size(path) > min_bytes
}

/// Everything the engine learned while walking a ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Kind of the assembled segments.
    pub kind: SegmentKind,
    /// Number of segments handed to the strategies.
    pub segment_count: usize,
    /// Strategies attempted, in order.
    pub attempted: Vec<Strategy>,
    /// Outcome of the winning or last attempted strategy.
    pub outcome: Option<AssemblyOutcome>,
    /// Whether the run stopped because of cancellation.
    pub cancelled: bool,
    /// Warning from the pre-assembly format sniff.
    pub format_warning: Option<String>,
    /// Likely cause when every strategy failed.
    pub hint: Option<String>,
}

impl AssemblyReport {
    pub(crate) fn new(kind: SegmentKind, segment_count: usize) -> Self {
        Self {
            kind,
            segment_count,
            attempted: Vec::new(),
            outcome: None,
            cancelled: false,
            format_warning: None,
            hint: None,
        }
    }

    /// Whether some strategy produced a viable output.
    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.success)
    }

    /// The strategy that produced the output, if any.
    pub fn winning_strategy(&self) -> Option<Strategy> {
        self.outcome
            .as_ref()
            .filter(|o| o.success)
            .map(|o| o.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn viability_needs_existing_nontrivial_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        assert!(!is_viable(&out, 1024));

        fs::write(&out, vec![0u8; 1024]).unwrap();
        assert!(!is_viable(&out, 1024));

        fs::write(&out, vec![0u8; 1025]).unwrap();
        assert!(is_viable(&out, 1024));

        assert!(!is_viable(dir.path(), 0));
    }

    #[test]
    fn report_success_follows_outcome() {
        let mut report = AssemblyReport::new(SegmentKind::Image, 3);
        assert!(!report.succeeded());
        assert_eq!(report.winning_strategy(), None);

        let mut outcome =
            AssemblyOutcome::failed(Strategy::ConcatList, Path::new("/nonexistent/out.mp4"), "x");
        assert_eq!(outcome.output_size_bytes, 0);
        report.outcome = Some(outcome.clone());
        assert!(!report.succeeded());

        outcome.success = true;
        report.outcome = Some(outcome);
        assert_eq!(report.winning_strategy(), Some(Strategy::ConcatList));
    }

    #[test]
    fn report_serializes() {
        let report = AssemblyReport::new(SegmentKind::Transport, 0);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "transport");
        assert_eq!(json["cancelled"], false);
    }
}
