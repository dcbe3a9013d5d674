//! Scratch space for assembly strategies.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory for intermediate files.
///
/// Concatenation lists, staged copies and probe outputs all live in a
/// workspace. The directory and everything in it is removed when the
/// workspace is dropped, so a strategy that bails out early with `?` or
/// returns a failed outcome leaves nothing behind.
///
/// # Example
///
/// ```no_run
/// use segforge_av::Workspace;
///
/// let workspace = Workspace::new_in("downloaded_segments".as_ref())?;
/// let list = workspace.temp_file("segment_list.txt");
/// // ... write the list, run ffmpeg ...
/// drop(workspace);
/// # Ok::<(), segforge_av::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a workspace inside `parent`.
    ///
    /// Keeping scratch files next to the segments avoids filling a small
    /// system temp partition when whole segment sets are staged.
    pub fn new_in(parent: &Path) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(".segforge-")
            .tempdir_in(parent)
            .map_err(|e| Error::Workspace(format!("{}: {e}", parent.display())))?;

        Ok(Self { temp_dir })
    }

    /// Get the temp directory path.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a temp file path with the given name.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
