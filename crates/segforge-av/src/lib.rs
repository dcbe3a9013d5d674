//! # segforge-av
//!
//! External tool orchestration for segforge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`tools`]) -- locate ffmpeg/ffprobe and report versions.
//! - **Command execution** ([`ToolCommand`], [`ToolRunner`]) -- bounded
//!   subprocess calls whose result is a tagged [`ToolRun`]: exited (with any
//!   status) or timed out.
//! - **Workspace management** ([`Workspace`]) -- scratch directories that are
//!   removed on every exit path.
//! - **Decode probe** ([`probe`]) -- ask ffmpeg whether a single segment decodes.
//! - **Assembly** ([`assembly`]) -- the escalating strategy ladders that mux a
//!   validated segment set into one output file.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use segforge_av::assembly::{AssemblyEngine, AssemblyOptions};
//! use segforge_av::{tools, SystemRunner};
//! use segforge_common::{SegmentKind, SegmentSet};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> segforge_av::Result<()> {
//! let ffmpeg = tools::require_tool("ffmpeg")?;
//! let engine = AssemblyEngine::new(Arc::new(SystemRunner), ffmpeg, AssemblyOptions::default());
//! let set = SegmentSet::scan("downloaded_segments".as_ref(), SegmentKind::Transport)?;
//! let report = engine
//!     .assemble(&set, "output_video.mp4".as_ref(), &CancellationToken::new())
//!     .await;
//! println!("success: {}", report.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod command;
mod error;
pub mod probe;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{SystemRunner, ToolCommand, ToolOutput, ToolRun, ToolRunner};
pub use error::{Error, Result};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
pub use workspace::Workspace;
