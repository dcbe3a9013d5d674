//! Bounded execution of external tool commands.
//!
//! A run has three outcomes, modelled explicitly: the process exited (with
//! whatever status), the process was killed at its deadline
//! ([`ToolRun::TimedOut`]), or it never started (`Err`). Callers decide what
//! a non-zero exit means; nothing here turns it into an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Result of a bounded tool invocation that managed to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRun {
    /// The process ran to completion.
    Exited(ToolOutput),
    /// The process was killed after exceeding its timeout.
    TimedOut {
        /// The timeout that was exceeded.
        after: Duration,
    },
}

impl ToolRun {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(out) if out.success())
    }

    /// Exit code, if the process exited.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(out) => out.exit_code,
            Self::TimedOut { .. } => None,
        }
    }

    /// Captured stderr, if the process exited.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exited(out) => Some(&out.stderr),
            Self::TimedOut { .. } => None,
        }
    }
}

/// A builder for constructing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use segforge_av::ToolCommand;
/// use std::time::Duration;
///
/// # async fn example() -> segforge_av::Result<()> {
/// let run = ToolCommand::new("ffmpeg")
///     .args(["-v", "error", "-i", "segment0000.ts", "-f", "null", "-"])
///     .timeout(Duration::from_secs(5))
///     .run()
///     .await?;
/// println!("decodes: {}", run.success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, s: impl Into<String>) -> Self {
        self.args.push(s.into());
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Append multiple arguments.
    pub fn args(mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Argument vector.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Configured timeout.
    pub fn time_limit(&self) -> Duration {
        self.timeout
    }

    /// Short program name for messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// The child is killed if the timeout elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program does not exist.
    /// - [`Error::Spawn`] for any other launch failure (including argument
    ///   vectors the OS refuses).
    /// - [`Error::Io`] if waiting on the process fails.
    pub async fn run(&self) -> Result<ToolRun> {
        let program_name = self.program_name();

        tracing::debug!("exec: {} {}", program_name, self.args.join(" "));

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(&program_name)
                } else {
                    Error::spawn(&program_name, e.to_string())
                }
            })?;

        // On timeout the wait future is dropped, which drops the child and
        // kill_on_drop terminates it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolRun::Exited(ToolOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })),
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_elapsed) => {
                tracing::warn!("{} timed out after {:?}", program_name, self.timeout);
                Ok(ToolRun::TimedOut {
                    after: self.timeout,
                })
            }
        }
    }
}

/// Capability for running external tools.
///
/// The assembly engine and the decode probe only talk to this trait, so the
/// process layer can be swapped out.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the command to completion or timeout.
    async fn run(&self, command: &ToolCommand) -> Result<ToolRun>;
}

/// Runs commands as real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolRun> {
        command.run().await
    }
}

/// Keep only the tail of tool output for reporting.
///
/// ffmpeg prints its banner first and the actual failure last, so the end of
/// stderr is the useful part.
///
/// ```
/// use segforge_av::command::truncate_diagnostic;
///
/// assert_eq!(truncate_diagnostic("short", 10), "short");
/// assert_eq!(truncate_diagnostic("0123456789abc", 3), "...abc");
/// ```
pub fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max_chars).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_echo() {
        let run = ToolCommand::new("echo").arg("hello").run().await;

        match run {
            Ok(ToolRun::Exited(out)) => {
                assert!(out.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Ok(other) => panic!("unexpected run result: {other:?}"),
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let run = ToolCommand::new("sh").args(["-c", "echo boom >&2; exit 3"]).run().await;

        if let Ok(run) = run {
            assert!(!run.success());
            assert_eq!(run.exit_code(), Some(3));
            assert_eq!(run.stderr().map(str::trim), Some("boom"));
        }
    }

    #[tokio::test]
    async fn nonexistent_tool_is_not_found() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345").run().await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let result = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .run()
            .await;

        if let Ok(run) = result {
            assert_eq!(
                run,
                ToolRun::TimedOut {
                    after: Duration::from_millis(100)
                }
            );
        }
    }

    #[test]
    fn builder_collects_arguments() {
        let cmd = ToolCommand::new("/usr/bin/ffmpeg")
            .arg("-y")
            .args(["-f", "concat"])
            .path_arg(Path::new("/tmp/list.txt"))
            .timeout(Duration::from_secs(60));

        assert_eq!(cmd.program_name(), "ffmpeg");
        assert_eq!(cmd.arguments(), ["-y", "-f", "concat", "/tmp/list.txt"]);
        assert_eq!(cmd.time_limit(), Duration::from_secs(60));
    }

    #[test]
    fn truncate_keeps_char_boundaries() {
        let text = "ééééé";
        assert_eq!(truncate_diagnostic(text, 2), "...éé");
    }
}
