use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use segforge_common::{SegmentKind, SegmentSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::outcome::output_size;
use super::{AssemblyOptions, AssemblyOutcome, AssemblyReport, Strategy};
use crate::command::{truncate_diagnostic, ToolCommand, ToolRun, ToolRunner};
use crate::{Result, Workspace};

/// Characters of stderr kept in an outcome diagnostic.
const DIAGNOSTIC_CHARS: usize = 300;

/// MPEG-TS packet sync byte.
const TS_SYNC_BYTE: u8 = 0x47;

/// Drives the strategy ladders.
pub struct AssemblyEngine {
    runner: Arc<dyn ToolRunner>,
    ffmpeg: PathBuf,
    options: AssemblyOptions,
}

/// What a strategy handed back to the engine.
pub(crate) enum Step {
    /// The final invocation ran; judge its output.
    Ran(ToolRun),
    /// The strategy gave up before writing the output.
    Declined(String),
}

/// Everything a strategy needs for one attempt.
pub(crate) struct Job<'a> {
    pub runner: &'a dyn ToolRunner,
    pub ffmpeg: &'a Path,
    pub options: &'a AssemblyOptions,
    pub set: &'a SegmentSet,
    pub inputs: &'a [PathBuf],
    pub output: &'a Path,
}

impl Job<'_> {
    /// An ffmpeg invocation that overwrites its output.
    pub fn ffmpeg(&self) -> ToolCommand {
        ToolCommand::new(self.ffmpeg).arg("-y")
    }

    pub async fn run(&self, command: ToolCommand) -> Result<ToolRun> {
        self.runner.run(&command).await
    }

    pub fn workspace(&self) -> Result<Workspace> {
        Workspace::new_in(self.set.dir())
    }

    pub fn framerate(&self) -> String {
        self.options.framerate.to_string()
    }

    /// The leading slice used by trial runs.
    pub fn prefix(&self) -> &[PathBuf] {
        &self.inputs[..self.inputs.len().min(self.options.prefix_sample)]
    }

    /// Whether a trial invocation succeeded outright.
    pub fn trial_passed(&self, run: &ToolRun, trial_output: &Path) -> bool {
        run.success() && output_size(trial_output) > self.options.min_output_bytes
    }
}

/// Short description of a failed run, for declined steps.
pub(crate) fn describe_run(run: &ToolRun) -> String {
    match run {
        ToolRun::TimedOut { after } => format!("timed out after {}s", after.as_secs()),
        ToolRun::Exited(out) => {
            let tail = truncate_diagnostic(&out.stderr, DIAGNOSTIC_CHARS);
            match out.exit_code {
                Some(code) if tail.is_empty() => format!("exit status {code}"),
                Some(code) => format!("exit status {code}: {tail}"),
                None => format!("terminated by signal: {tail}"),
            }
        }
    }
}

impl AssemblyEngine {
    /// Create an engine running `ffmpeg` through `runner`.
    pub fn new(runner: Arc<dyn ToolRunner>, ffmpeg: impl Into<PathBuf>, options: AssemblyOptions) -> Self {
        Self {
            runner,
            ffmpeg: ffmpeg.into(),
            options,
        }
    }

    /// Assemble the usable segments of `set` into `output`.
    ///
    /// Never fails: every problem ends up in the returned report. The
    /// segments themselves are left untouched so a failed run can be retried
    /// or recovered by hand. `cancel` is checked before each strategy.
    pub async fn assemble(
        &self,
        set: &SegmentSet,
        output: &Path,
        cancel: &CancellationToken,
    ) -> AssemblyReport {
        let kind = set.kind();
        let inputs = set.usable_paths();
        let mut report = AssemblyReport::new(kind, inputs.len());

        if inputs.is_empty() {
            warn!("No usable {} segments in {}", kind, set.dir().display());
            report.hint = Some(format!(
                "no usable {} segments in {}",
                kind,
                set.dir().display()
            ));
            return report;
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                report.hint = Some(format!(
                    "cannot create output directory {}: {e}",
                    parent.display()
                ));
                return report;
            }
        }

        if kind == SegmentKind::Transport {
            report.format_warning = sniff_transport(&inputs[0]);
            if let Some(warning) = &report.format_warning {
                warn!("{warning}");
            }
        }

        info!(
            "Assembling {} {} segments into {}",
            inputs.len(),
            kind,
            output.display()
        );

        let job = Job {
            runner: self.runner.as_ref(),
            ffmpeg: &self.ffmpeg,
            options: &self.options,
            set,
            inputs: &inputs,
            output,
        };

        for &strategy in Strategy::ladder(kind) {
            if cancel.is_cancelled() {
                info!("Assembly cancelled before {strategy}");
                report.cancelled = true;
                break;
            }

            report.attempted.push(strategy);
            remove_stale_output(output);
            info!("Trying {strategy}");

            let outcome = self.attempt(strategy, &job).await;
            if outcome.success {
                info!(
                    "{} produced {} ({:.1} MB)",
                    strategy,
                    output.display(),
                    outcome.output_size_mb()
                );
                report.outcome = Some(outcome);
                return report;
            }

            warn!("{} failed: {}", strategy, outcome.diagnostic);
            report.outcome = Some(outcome);
        }

        remove_stale_output(output);
        if !report.cancelled {
            let hint = exhaustion_hint(kind, set.dir());
            warn!("{hint}");
            report.hint = Some(hint);
        }
        report
    }

    async fn attempt(&self, strategy: Strategy, job: &Job<'_>) -> AssemblyOutcome {
        let step = match strategy {
            Strategy::PatternSequence => job.pattern_sequence().await,
            Strategy::ConcatList => job.concat_list().await,
            Strategy::StagedCopy => job.staged_copy().await,
            Strategy::MaxTolerance => job.max_tolerance().await,
            Strategy::ConcatDemuxCopy => job.concat_demux_copy().await,
            Strategy::ConcatProtocolCopy => job.concat_protocol_copy().await,
            Strategy::BinaryConcatRemux => job.binary_concat_remux().await,
            Strategy::ReencodeTolerant => job.reencode_tolerant().await,
            Strategy::MaxToleranceCopy => job.max_tolerance_copy().await,
            Strategy::RawElementaryProbe => job.raw_elementary_probe().await,
        };

        match step {
            Ok(Step::Ran(run)) => self.judge(strategy, job.output, &run),
            Ok(Step::Declined(reason)) => AssemblyOutcome::failed(strategy, job.output, reason),
            Err(e) => AssemblyOutcome::failed(strategy, job.output, e.to_string()),
        }
    }

    /// Apply the viability predicate to a finished invocation.
    fn judge(&self, strategy: Strategy, output: &Path, run: &ToolRun) -> AssemblyOutcome {
        let size = output_size(output);
        let viable = size > self.options.min_output_bytes;
        let tolerant = strategy.accepts_tool_errors() && !self.options.strict;

        let success = match run {
            ToolRun::TimedOut { .. } => false,
            ToolRun::Exited(out) => viable && (out.success() || tolerant),
        };

        if success && !run.success() {
            warn!(
                "{} exited with {:?} but left a {} byte output; it may not play cleanly",
                strategy,
                run.exit_code(),
                size
            );
        }

        let diagnostic = match run {
            ToolRun::Exited(out) if out.success() && !viable => format!(
                "output missing or not larger than {} bytes",
                self.options.min_output_bytes
            ),
            _ => describe_run(run),
        };

        AssemblyOutcome {
            strategy,
            success,
            output_path: output.to_path_buf(),
            output_size_bytes: size,
            diagnostic,
            exit_code: run.exit_code(),
            timed_out: matches!(run, ToolRun::TimedOut { .. }),
        }
    }
}

fn remove_stale_output(output: &Path) {
    if output.is_file() {
        debug!("Removing stale output {}", output.display());
        if let Err(e) = std::fs::remove_file(output) {
            warn!("Could not remove {}: {}", output.display(), e);
        }
    }
}

/// Check the first segment for an MPEG-TS sync byte in its first four bytes.
fn sniff_transport(first: &Path) -> Option<String> {
    let mut header = [0u8; 4];
    let read = File::open(first).and_then(|mut f| {
        let n = f.read(&mut header)?;
        Ok(n)
    });

    match read {
        Ok(n) if header[..n].contains(&TS_SYNC_BYTE) => None,
        Ok(_) => Some(format!(
            "{} does not look like MPEG-TS; the segments may be encrypted, corrupted, or in another format",
            first.display()
        )),
        Err(e) => Some(format!("could not check format of {}: {e}", first.display())),
    }
}

fn exhaustion_hint(kind: SegmentKind, dir: &Path) -> String {
    let cause = match kind {
        SegmentKind::Transport => {
            "the segments may be encrypted (look for #EXT-X-KEY in the playlist) or use a codec ffmpeg cannot remux"
        }
        SegmentKind::Image => {
            "the JPEG files may use a format that is incompatible with ffmpeg's MJPEG decoder"
        }
    };
    format!(
        "all assembly strategies failed: {cause}; downloaded segments were kept in {}",
        dir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolOutput;
    use async_trait::async_trait;
    use segforge_common::paths::slot_path;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    /// What the fake tool does for one call.
    #[derive(Clone, Copy)]
    enum Act {
        /// Exit with `code` after writing `bytes` to the last argument.
        Exit { code: i32, bytes: Option<usize> },
        TimedOut,
    }

    type Script = Box<dyn Fn(usize, &ToolCommand) -> Act + Send + Sync>;

    struct FakeRunner {
        calls: Mutex<Vec<ToolCommand>>,
        script: Script,
    }

    impl FakeRunner {
        fn new(script: impl Fn(usize, &ToolCommand) -> Act + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Box::new(script),
            })
        }

        fn calls(&self) -> Vec<ToolCommand> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolRunner for FakeRunner {
        async fn run(&self, command: &ToolCommand) -> Result<ToolRun> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(command.clone());
                calls.len() - 1
            };
            match (self.script)(call, command) {
                Act::Exit { code, bytes } => {
                    if let Some(n) = bytes {
                        let target = command.arguments().last().unwrap();
                        fs::write(target, vec![0u8; n]).unwrap();
                    }
                    Ok(ToolRun::Exited(ToolOutput {
                        exit_code: Some(code),
                        stdout: String::new(),
                        stderr: format!("fake failure {call}"),
                    }))
                }
                Act::TimedOut => Ok(ToolRun::TimedOut {
                    after: command.time_limit(),
                }),
            }
        }
    }

    fn ok(bytes: usize) -> Act {
        Act::Exit {
            code: 0,
            bytes: Some(bytes),
        }
    }

    fn fail() -> Act {
        Act::Exit { code: 1, bytes: None }
    }

    fn segments(dir: &Path, kind: SegmentKind, indices: &[usize], body: &[u8]) -> SegmentSet {
        for &index in indices {
            fs::write(slot_path(dir, kind, index), body).unwrap();
        }
        SegmentSet::scan(dir, kind).unwrap()
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    fn engine(runner: Arc<FakeRunner>, options: AssemblyOptions) -> AssemblyEngine {
        AssemblyEngine::new(runner, "ffmpeg", options)
    }

    #[tokio::test]
    async fn valid_set_uses_exactly_one_strategy() {
        let seg_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1, 2], b"jpeg");
        let output = out_dir.path().join("nested").join("output_video.mp4");

        let runner = FakeRunner::new(|_, _| ok(4096));
        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        assert!(report.succeeded());
        assert_eq!(report.attempted, [Strategy::PatternSequence]);
        assert_eq!(report.winning_strategy(), Some(Strategy::PatternSequence));
        assert_eq!(report.outcome.as_ref().unwrap().output_size_bytes, 4096);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        let args = calls[0].arguments();
        assert_eq!(args.last().unwrap(), &output.to_string_lossy());
        assert!(args.iter().any(|a| a.ends_with("video%04d.jpeg")));
        assert!(!args.iter().any(|a| a == "-start_number"));
        assert!(args.iter().any(|a| a == "scale=trunc(iw/2)*2:trunc(ih/2)*2"));
        assert_eq!(calls[0].time_limit(), Duration::from_secs(300));
        assert_eq!(entries(seg_dir.path()), 3);
    }

    #[tokio::test]
    async fn undersized_output_escalates_in_ladder_order() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Transport, &[0, 1, 2], &[0x47; 376]);
        let output = seg_dir.path().join("out.mp4");

        let runner = FakeRunner::new(|call, _| if call < 2 { ok(10) } else { ok(2048) });
        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        assert_eq!(
            report.attempted,
            [
                Strategy::ConcatDemuxCopy,
                Strategy::ConcatProtocolCopy,
                Strategy::BinaryConcatRemux
            ]
        );
        assert!(report.succeeded());
        assert!(report.format_warning.is_none());

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].arguments().iter().any(|a| a.starts_with("concat:/")));
        assert!(calls[2].arguments().iter().any(|a| a.ends_with("temp_concat.ts")));
        // Segments plus the output; lists and the concatenated file are gone.
        assert_eq!(entries(seg_dir.path()), 4);
    }

    #[tokio::test]
    async fn exhausted_transport_ladder_reports_encryption_hint() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Transport, &[0, 1], &[0x00; 400]);
        let output = seg_dir.path().join("out.mp4");

        let runner = FakeRunner::new(|_, _| fail());
        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        assert!(!report.succeeded());
        assert_eq!(report.attempted, Strategy::ladder(SegmentKind::Transport));
        assert!(report.hint.as_deref().unwrap().contains("#EXT-X-KEY"));
        assert!(report.format_warning.is_some());
        // Five single-shot strategies plus an h264 and an hevc trial.
        assert_eq!(runner.calls().len(), 7);
        assert!(!output.exists());
        assert_eq!(entries(seg_dir.path()), 2);
    }

    #[tokio::test]
    async fn ladder_order_is_deterministic() {
        let mut orders = Vec::new();
        for _ in 0..2 {
            let seg_dir = tempfile::tempdir().unwrap();
            let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1], b"jpeg");
            let runner = FakeRunner::new(|_, _| fail());
            let report = engine(runner.clone(), AssemblyOptions::default())
                .assemble(&set, &seg_dir.path().join("o.mp4"), &CancellationToken::new())
                .await;
            assert!(report.hint.as_deref().unwrap().contains("MJPEG"));
            orders.push((report.attempted, runner.calls()));
        }
        assert_eq!(orders[0].0, orders[1].0);
        assert_eq!(orders[0].1.len(), orders[1].1.len());
    }

    #[tokio::test]
    async fn tolerant_strategy_accepts_nonzero_exit_unless_strict() {
        let erroring = |_: usize, _: &ToolCommand| Act::Exit {
            code: 1,
            bytes: Some(4096),
        };

        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1], b"jpeg");
        let output = seg_dir.path().join("out.mp4");

        let report = engine(FakeRunner::new(erroring), AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;
        assert_eq!(report.winning_strategy(), Some(Strategy::MaxTolerance));
        assert_eq!(report.attempted.len(), 4);
        assert_eq!(report.outcome.as_ref().unwrap().exit_code, Some(1));

        let strict = AssemblyOptions {
            strict: true,
            ..AssemblyOptions::default()
        };
        let report = engine(FakeRunner::new(erroring), strict)
            .assemble(&set, &output, &CancellationToken::new())
            .await;
        assert!(!report.succeeded());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn timeout_is_a_strategy_failure() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1], b"jpeg");
        let output = seg_dir.path().join("out.mp4");

        let runner = FakeRunner::new(|call, _| if call == 0 { Act::TimedOut } else { ok(2048) });
        let report = engine(runner, AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        assert_eq!(report.attempted, [Strategy::PatternSequence, Strategy::ConcatList]);
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn timed_out_outcome_is_flagged() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Transport, &[0], &[0x47; 188]);
        let output = seg_dir.path().join("out.mp4");

        let runner = FakeRunner::new(|_, _| Act::TimedOut);
        let report = engine(runner, AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        // The raw probe declines after its trials time out.
        let last = report.outcome.unwrap();
        assert_eq!(last.strategy, Strategy::RawElementaryProbe);
        assert!(last.diagnostic.contains("timed out"));
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_strategy() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1], b"jpeg");
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let runner = FakeRunner::new(move |_, _| {
            token.cancel();
            fail()
        });
        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &seg_dir.path().join("out.mp4"), &cancel)
            .await;

        assert!(report.cancelled);
        assert_eq!(report.attempted, [Strategy::PatternSequence]);
        assert_eq!(runner.calls().len(), 1);
        assert!(report.hint.is_none());
    }

    #[tokio::test]
    async fn empty_set_fails_without_running_tools() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = SegmentSet::scan(seg_dir.path(), SegmentKind::Image).unwrap();
        let runner = FakeRunner::new(|_, _| ok(4096));

        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &seg_dir.path().join("out.mp4"), &CancellationToken::new())
            .await;

        assert!(!report.succeeded());
        assert!(report.attempted.is_empty());
        assert!(runner.calls().is_empty());
        assert!(report.hint.unwrap().contains("no usable"));
    }

    #[tokio::test]
    async fn contiguous_set_not_starting_at_zero_passes_start_number() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[5, 6, 7], b"jpeg");
        let runner = FakeRunner::new(|_, _| ok(4096));

        engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &seg_dir.path().join("out.mp4"), &CancellationToken::new())
            .await;

        let args = runner.calls()[0].arguments().to_vec();
        let pos = args.iter().position(|a| a == "-start_number").unwrap();
        assert_eq!(args[pos + 1], "5");
    }

    #[tokio::test]
    async fn pattern_input_reads_only_the_frames_in_the_set() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1], b"jpeg");
        // Left over from an earlier, longer playlist.
        fs::write(slot_path(seg_dir.path(), SegmentKind::Image, 2), b"jpeg").unwrap();

        let runner = FakeRunner::new(|_, cmd| {
            if cmd.arguments().iter().any(|a| a == "ultrafast") {
                ok(4096)
            } else {
                fail()
            }
        });
        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &seg_dir.path().join("out.mp4"), &CancellationToken::new())
            .await;
        assert_eq!(report.winning_strategy(), Some(Strategy::MaxTolerance));

        let pattern_calls: Vec<Vec<String>> = runner
            .calls()
            .iter()
            .map(|c| c.arguments().to_vec())
            .filter(|args| args.iter().any(|a| a.ends_with("video%04d.jpeg")))
            .collect();
        assert_eq!(pattern_calls.len(), 2);
        for args in pattern_calls {
            let pos = args.iter().position(|a| a == "-frames:v").unwrap();
            assert_eq!(args[pos + 1], "2");
        }
    }

    #[tokio::test]
    async fn gapped_set_is_staged_contiguously() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 2, 3], b"jpeg");
        let staged = Arc::new(Mutex::new(Vec::new()));

        let seen = staged.clone();
        let runner = FakeRunner::new(move |_, cmd| {
            let input = cmd
                .arguments()
                .iter()
                .position(|a| a == "-i")
                .map(|p| PathBuf::from(&cmd.arguments()[p + 1]))
                .unwrap();
            let dir = input.parent().unwrap().to_path_buf();
            let mut names: Vec<String> = fs::read_dir(&dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            seen.lock().unwrap().push((dir, names));
            ok(4096)
        });

        let report = engine(runner, AssemblyOptions::default())
            .assemble(&set, &seg_dir.path().join("out.mp4"), &CancellationToken::new())
            .await;
        assert!(report.succeeded());

        let staged = staged.lock().unwrap();
        let (dir, names) = &staged[0];
        assert_ne!(dir, seg_dir.path());
        assert_eq!(names, &["video0000.jpeg", "video0001.jpeg", "video0002.jpeg"]);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn staged_copy_trials_prefix_then_encodes_everything() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Image, &[0, 1, 2, 3, 4], b"jpeg");
        let output = seg_dir.path().join("out.mp4");
        let options = AssemblyOptions {
            prefix_sample: 2,
            ..AssemblyOptions::default()
        };

        let runner = FakeRunner::new(|call, _| if call < 2 { fail() } else { ok(4096) });
        let report = engine(runner.clone(), options)
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        assert_eq!(report.winning_strategy(), Some(Strategy::StagedCopy));
        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        let trial = calls[2].arguments();
        assert!(trial.last().unwrap().ends_with("test_output.mp4"));
        assert!(trial.windows(2).any(|w| w == ["-t", "10"]));
        assert_eq!(calls[2].time_limit(), Duration::from_secs(60));
        assert_eq!(calls[3].arguments().last().unwrap(), &output.to_string_lossy());
        assert_eq!(entries(seg_dir.path()), 6);
    }

    #[tokio::test]
    async fn raw_probe_falls_back_to_hevc() {
        let seg_dir = tempfile::tempdir().unwrap();
        let set = segments(seg_dir.path(), SegmentKind::Transport, &[0, 1], &[0x47; 188]);
        let output = seg_dir.path().join("out.mp4");

        // Fail the five copy/encode strategies and the h264 trial.
        let runner = FakeRunner::new(|call, _| if call < 6 { fail() } else { ok(4096) });
        let report = engine(runner.clone(), AssemblyOptions::default())
            .assemble(&set, &output, &CancellationToken::new())
            .await;

        assert_eq!(report.winning_strategy(), Some(Strategy::RawElementaryProbe));
        let calls = runner.calls();
        assert_eq!(calls.len(), 8);
        assert!(calls[5].arguments().windows(2).any(|w| w == ["-f", "h264"]));
        assert!(calls[6].arguments().windows(2).any(|w| w == ["-f", "hevc"]));
        assert!(calls[7].arguments().windows(2).any(|w| w == ["-f", "hevc"]));
        assert_eq!(calls[7].arguments().last().unwrap(), &output.to_string_lossy());
        assert_eq!(entries(seg_dir.path()), 3);
    }

    #[test]
    fn sniff_detects_missing_sync_byte() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.ts");
        let bad = dir.path().join("bad.ts");
        fs::write(&good, [0x00, 0x47, 0x00, 0x00]).unwrap();
        fs::write(&bad, [0x12, 0x34, 0x56, 0x78, 0x47]).unwrap();

        assert!(sniff_transport(&good).is_none());
        assert!(sniff_transport(&bad).unwrap().contains("encrypted"));
        assert!(sniff_transport(&dir.path().join("missing.ts")).is_some());
    }
}
