//! Error types for segforge-av.
//!
//! These cover failures to *start* work: a missing tool, an I/O failure while
//! staging files. A tool that runs and fails is not an error here; it is
//! reported as a [`ToolRun`](crate::ToolRun) and judged by the caller.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating external tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool could not be launched.
    #[error("failed to launch {tool}: {message}")]
    Spawn { tool: String, message: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Segment bookkeeping failed.
    #[error(transparent)]
    Segments(#[from] segforge_common::Error),

    /// Workspace error.
    #[error("workspace error: {0}")]
    Workspace(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a spawn error.
    pub fn spawn(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
