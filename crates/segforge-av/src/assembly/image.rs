//! Strategies for sequences of JPEG frames.

use std::path::PathBuf;

use segforge_common::paths::slot_file_name;
use tracing::{debug, info};

use super::concat;
use super::engine::{describe_run, Job, Step};
use super::Strategy;
use crate::{Result, Workspace};

/// Encoder settings shared by the regular image strategies.
const ENCODE_ARGS: &[&str] = &[
    "-c:v",
    "libx264",
    "-preset",
    "medium",
    "-crf",
    "23",
    "-pix_fmt",
    "yuv420p",
    "-vf",
    "scale=trunc(iw/2)*2:trunc(ih/2)*2",
    "-movflags",
    "+faststart",
];

const STAGED_FRAME_PATTERN: &str = "frame%06d.jpg";

fn staged_frame_name(position: usize) -> String {
    format!("frame{position:06}.jpg")
}

/// An `image2` input pattern, staged into a workspace when needed.
struct PatternInput {
    pattern: PathBuf,
    start_number: usize,
    /// Output frame cap; slot files past the set must not be read.
    frames: usize,
    _staging: Option<Workspace>,
}

impl Job<'_> {
    /// Resolve the `image2` pattern for the usable frames.
    ///
    /// The demuxer stops at the first missing number, so a set with gaps is
    /// linked into a workspace under contiguous names first.
    fn pattern_input(&self) -> Result<PatternInput> {
        let kind = self.set.kind();
        let pattern_name = format!("{}%04d.{}", kind.slot_prefix(), kind.extension());
        let indices: Vec<usize> = self.set.usable().map(|s| s.index).collect();
        let first = indices.first().copied().unwrap_or(0);
        let contiguous = indices.iter().enumerate().all(|(pos, &index)| index == first + pos);

        if contiguous {
            return Ok(PatternInput {
                pattern: self.set.dir().join(pattern_name),
                start_number: first,
                frames: indices.len(),
                _staging: None,
            });
        }

        debug!("Frame indices have gaps; staging {} frames", self.inputs.len());
        let workspace = self.workspace()?;
        concat::stage_sequence(self.inputs, workspace.temp_dir(), |pos| {
            slot_file_name(kind, pos)
        })?;
        Ok(PatternInput {
            pattern: workspace.temp_dir().join(pattern_name),
            start_number: 0,
            frames: indices.len(),
            _staging: Some(workspace),
        })
    }

    pub(crate) async fn pattern_sequence(&self) -> Result<Step> {
        let input = self.pattern_input()?;

        let mut command = self
            .ffmpeg()
            .args(["-f", "image2", "-framerate"])
            .arg(self.framerate());
        if input.start_number > 0 {
            command = command
                .arg("-start_number")
                .arg(input.start_number.to_string());
        }
        let command = command
            .arg("-i")
            .path_arg(&input.pattern)
            .arg("-frames:v")
            .arg(input.frames.to_string())
            .args(ENCODE_ARGS.iter().copied())
            .path_arg(self.output)
            .timeout(Strategy::PatternSequence.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn concat_list(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let list = workspace.temp_file("file_list.txt");
        let frame_duration = 1.0 / f64::from(self.options.framerate);
        concat::write_list(&list, self.inputs, Some(frame_duration))?;

        let command = self
            .ffmpeg()
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path_arg(&list)
            .args(ENCODE_ARGS.iter().copied())
            .path_arg(self.output)
            .timeout(Strategy::ConcatList.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn staged_copy(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let pattern = workspace.temp_file(STAGED_FRAME_PATTERN);
        let prefix = self.prefix();

        info!("Staging {} frames for a trial encode", prefix.len());
        concat::stage_sequence(prefix, workspace.temp_dir(), staged_frame_name)?;

        let trial_output = workspace.temp_file("test_output.mp4");
        let trial = self
            .ffmpeg()
            .args(["-f", "image2", "-framerate"])
            .arg(self.framerate())
            .arg("-i")
            .path_arg(&pattern)
            .args([
                "-c:v", "libx264", "-preset", "fast", "-crf", "25", "-pix_fmt", "yuv420p", "-t",
                "10",
            ])
            .path_arg(&trial_output)
            .timeout(Strategy::StagedCopy.trial_timeout());

        let run = self.run(trial).await?;
        if !self.trial_passed(&run, &trial_output) {
            return Ok(Step::Declined(format!("trial encode failed: {}", describe_run(&run))));
        }

        info!("Trial encode worked; staging all {} frames", self.inputs.len());
        let staged = prefix.len();
        concat::stage_sequence(&self.inputs[staged..], workspace.temp_dir(), |pos| {
            staged_frame_name(staged + pos)
        })?;

        let command = self
            .ffmpeg()
            .args(["-f", "image2", "-framerate"])
            .arg(self.framerate())
            .arg("-i")
            .path_arg(&pattern)
            .args(ENCODE_ARGS.iter().copied())
            .path_arg(self.output)
            .timeout(Strategy::StagedCopy.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn max_tolerance(&self) -> Result<Step> {
        let input = self.pattern_input()?;

        let mut command = self
            .ffmpeg()
            .args([
                "-analyzeduration",
                "2147483647",
                "-probesize",
                "2147483647",
                "-f",
                "image2",
                "-framerate",
            ])
            .arg(self.framerate());
        if input.start_number > 0 {
            command = command
                .arg("-start_number")
                .arg(input.start_number.to_string());
        }
        let command = command
            .arg("-i")
            .path_arg(&input.pattern)
            .arg("-frames:v")
            .arg(input.frames.to_string())
            .args([
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-crf",
                "28",
                "-pix_fmt",
                "yuv420p",
                "-avoid_negative_ts",
                "make_zero",
                "-fflags",
                "+discardcorrupt+genpts+igndts",
                "-err_detect",
                "ignore_err",
                "-ignore_unknown",
                "-max_muxing_queue_size",
                "4096",
            ])
            .path_arg(self.output)
            .timeout(Strategy::MaxTolerance.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }
}
