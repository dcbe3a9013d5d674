//! Decode probing of individual segments.

use std::path::Path;
use std::time::Duration;

use crate::command::{truncate_diagnostic, ToolCommand, ToolRun, ToolRunner};

/// Characters of ffmpeg stderr kept in a probe verdict.
const PROBE_DIAGNOSTIC_CHARS: usize = 100;

/// What the decode probe concluded about one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// ffmpeg decoded the whole file without error.
    Decodable,
    /// ffmpeg exited non-zero.
    Undecodable {
        /// Tail of ffmpeg's error output.
        diagnostic: String,
    },
    /// The probe did not finish in time.
    TimedOut,
    /// ffmpeg could not be launched.
    Unavailable {
        /// Launch error text.
        message: String,
    },
}

/// Build the probe command: decode everything, write nothing.
pub fn probe_command(ffmpeg: &Path, file: &Path, timeout: Duration) -> ToolCommand {
    ToolCommand::new(ffmpeg)
        .args(["-v", "error", "-i"])
        .path_arg(file)
        .args(["-f", "null", "-"])
        .timeout(timeout)
}

/// Run the decode probe on a single file.
pub async fn decode_probe(
    runner: &dyn ToolRunner,
    ffmpeg: &Path,
    file: &Path,
    timeout: Duration,
) -> ProbeVerdict {
    match runner.run(&probe_command(ffmpeg, file, timeout)).await {
        Ok(ToolRun::Exited(out)) if out.success() => ProbeVerdict::Decodable,
        Ok(ToolRun::Exited(out)) => ProbeVerdict::Undecodable {
            diagnostic: truncate_diagnostic(&out.stderr, PROBE_DIAGNOSTIC_CHARS),
        },
        Ok(ToolRun::TimedOut { .. }) => ProbeVerdict::TimedOut,
        Err(e) => ProbeVerdict::Unavailable {
            message: e.to_string(),
        },
    }
}
