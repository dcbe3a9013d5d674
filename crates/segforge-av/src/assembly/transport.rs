//! Strategies for MPEG transport stream chunks.

use tracing::{debug, info};

use super::concat;
use super::engine::{describe_run, Job, Step};
use super::Strategy;
use crate::{Result, Workspace};

/// Raw elementary stream interpretations tried by the last resort, as
/// (ffmpeg demuxer, file extension).
const RAW_CODECS: &[(&str, &str)] = &[("h264", "h264"), ("hevc", "h265")];

impl Job<'_> {
    /// Write the concat demuxer list for all inputs.
    fn segment_list(&self, workspace: &Workspace) -> Result<std::path::PathBuf> {
        let list = workspace.temp_file("segment_list.txt");
        concat::write_list(&list, self.inputs, None)?;
        Ok(list)
    }

    pub(crate) async fn concat_demux_copy(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let list = self.segment_list(&workspace)?;

        let command = self
            .ffmpeg()
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path_arg(&list)
            .args(["-c", "copy", "-bsf:a", "aac_adtstoasc"])
            .path_arg(self.output)
            .timeout(Strategy::ConcatDemuxCopy.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn concat_protocol_copy(&self) -> Result<Step> {
        let command = self
            .ffmpeg()
            .arg("-i")
            .arg(concat::protocol_input(self.inputs)?)
            .args(["-c", "copy", "-bsf:a", "aac_adtstoasc"])
            .path_arg(self.output)
            .timeout(Strategy::ConcatProtocolCopy.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn binary_concat_remux(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let joined = workspace.temp_file("temp_concat.ts");
        let bytes = concat::concatenate(self.inputs, &joined)?;
        debug!("Concatenated {} segments ({} bytes)", self.inputs.len(), bytes);

        let command = self
            .ffmpeg()
            .arg("-i")
            .path_arg(&joined)
            .args(["-c", "copy", "-bsf:a", "aac_adtstoasc"])
            .path_arg(self.output)
            .timeout(Strategy::BinaryConcatRemux.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn reencode_tolerant(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let list = self.segment_list(&workspace)?;

        info!("Re-encoding {} segments; this takes a while", self.inputs.len());
        let command = self
            .ffmpeg()
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path_arg(&list)
            .args([
                "-c:v",
                "libx264",
                "-preset",
                "fast",
                "-crf",
                "23",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-movflags",
                "+faststart",
                "-max_muxing_queue_size",
                "9999",
                "-err_detect",
                "ignore_err",
                "-fflags",
                "+genpts+igndts",
            ])
            .path_arg(self.output)
            .timeout(Strategy::ReencodeTolerant.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    pub(crate) async fn max_tolerance_copy(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let list = self.segment_list(&workspace)?;

        let command = self
            .ffmpeg()
            .args(["-f", "concat", "-safe", "0", "-i"])
            .path_arg(&list)
            .args([
                "-c:v",
                "copy",
                "-c:a",
                "copy",
                "-bsf:a",
                "aac_adtstoasc",
                "-avoid_negative_ts",
                "make_zero",
                "-fflags",
                "+discardcorrupt+genpts+igndts",
                "-err_detect",
                "ignore_err",
                "-ignore_unknown",
                "-max_muxing_queue_size",
                "9999",
                "-f",
                "mp4",
            ])
            .path_arg(self.output)
            .timeout(Strategy::MaxToleranceCopy.timeout());

        Ok(Step::Ran(self.run(command).await?))
    }

    /// Treat the segment bytes as a bare video elementary stream.
    ///
    /// Each codec is tried on the prefix sample first; the first one that
    /// remuxes cleanly is applied to the whole set.
    pub(crate) async fn raw_elementary_probe(&self) -> Result<Step> {
        let workspace = self.workspace()?;
        let trial_output = workspace.temp_file("test_raw.mp4");
        let mut failures = Vec::new();

        for &(codec, extension) in RAW_CODECS {
            let raw = workspace.temp_file(&format!("temp_raw.{extension}"));
            concat::concatenate(self.prefix(), &raw)?;

            let trial = self
                .ffmpeg()
                .args(["-f", codec, "-i"])
                .path_arg(&raw)
                .args(["-c:v", "copy", "-f", "mp4"])
                .path_arg(&trial_output)
                .timeout(Strategy::RawElementaryProbe.trial_timeout());

            let run = self.run(trial).await?;
            if !self.trial_passed(&run, &trial_output) {
                debug!("Raw {} interpretation failed", codec);
                failures.push(format!("{codec}: {}", describe_run(&run)));
                continue;
            }

            info!("Segments remux as raw {}; processing all of them", codec);
            concat::concatenate(self.inputs, &raw)?;
            let command = self
                .ffmpeg()
                .args(["-f", codec, "-i"])
                .path_arg(&raw)
                .args(["-c:v", "copy", "-f", "mp4"])
                .path_arg(self.output)
                .timeout(Strategy::RawElementaryProbe.timeout());

            return Ok(Step::Ran(self.run(command).await?));
        }

        Ok(Step::Declined(format!(
            "no raw stream interpretation worked ({})",
            failures.join("; ")
        )))
    }
}
