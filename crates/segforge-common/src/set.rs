//! The explicit index-to-path mapping passed between pipeline stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::paths::{parse_slot_index, slot_path};
use crate::{Error, LocalSegment, Result, SegmentKind, SegmentState};

/// An ordered collection of local segment slots of a single kind.
///
/// Segments are kept sorted by index. Stages mutate states in place; only
/// segments whose state [`is_present`](SegmentState::is_present) are handed
/// to assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSet {
    kind: SegmentKind,
    dir: PathBuf,
    segments: Vec<LocalSegment>,
}

impl SegmentSet {
    /// Build a set from segments produced by the fetcher.
    pub fn new(kind: SegmentKind, dir: impl Into<PathBuf>, mut segments: Vec<LocalSegment>) -> Self {
        segments.sort_by_key(|s| s.index);
        Self {
            kind,
            dir: dir.into(),
            segments,
        }
    }

    /// Rebuild a set from the slot files already present in `dir`.
    ///
    /// Every recognised slot is recorded as [`SegmentState::Skipped`]. Files
    /// that do not follow the slot naming for `kind` are ignored.
    pub fn scan(dir: &Path, kind: SegmentKind) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::not_found(format!("{}", dir.display())));
        }

        let mut segments = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(|n| parse_slot_index(kind, n)) else {
                continue;
            };
            segments.push(LocalSegment {
                index,
                path: entry.path(),
                size_bytes: entry.metadata()?.len(),
                state: SegmentState::Skipped,
            });
        }

        Ok(Self::new(kind, dir, segments))
    }

    /// Move every present slot file to its name under `kind`.
    ///
    /// Used when the content of the segments contradicts the kind they were
    /// fetched as. Slots that have no file only get their path updated.
    pub fn relabel(self, kind: SegmentKind) -> Result<Self> {
        if kind == self.kind {
            return Ok(self);
        }

        let mut segments = self.segments;
        for segment in &mut segments {
            let target = slot_path(&self.dir, kind, segment.index);
            if segment.state.is_present() {
                std::fs::rename(&segment.path, &target)?;
            }
            segment.path = target;
        }
        Ok(Self::new(kind, self.dir, segments))
    }

    /// Segment kind shared by every slot in the set.
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Directory holding the slots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All segments, in index order.
    pub fn segments(&self) -> &[LocalSegment] {
        &self.segments
    }

    /// Mutable access for stages that update segment states.
    pub fn segments_mut(&mut self) -> &mut [LocalSegment] {
        &mut self.segments
    }

    /// Segments whose file should be present on disk, in index order.
    pub fn usable(&self) -> impl Iterator<Item = &LocalSegment> {
        self.segments.iter().filter(|s| s.state.is_present())
    }

    /// Paths of the usable segments, in index order.
    pub fn usable_paths(&self) -> Vec<PathBuf> {
        self.usable().map(|s| s.path.clone()).collect()
    }

    /// Number of usable segments.
    pub fn usable_count(&self) -> usize {
        self.usable().count()
    }

    /// Number of segments in the given state.
    pub fn count(&self, state: SegmentState) -> usize {
        self.segments.iter().filter(|s| s.state == state).count()
    }

    /// Total number of slots, whatever their state.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the set has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::slot_path;
    use std::fs;

    #[test]
    fn scan_orders_numerically_not_lexically() {
        let dir = tempfile::tempdir().unwrap();
        for index in [10_000, 2, 9_999] {
            fs::write(slot_path(dir.path(), SegmentKind::Transport, index), b"x").unwrap();
        }
        fs::write(dir.path().join("segment_list.txt"), b"noise").unwrap();
        fs::write(dir.path().join("segment0003.ts.part"), b"partial").unwrap();

        let set = SegmentSet::scan(dir.path(), SegmentKind::Transport).unwrap();
        let indices: Vec<usize> = set.segments().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![2, 9_999, 10_000]);
        assert!(set.segments().iter().all(|s| s.state == SegmentState::Skipped));
    }

    #[test]
    fn scan_ignores_other_kind() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(slot_path(dir.path(), SegmentKind::Image, 0), b"jpeg").unwrap();
        fs::write(slot_path(dir.path(), SegmentKind::Transport, 0), b"ts").unwrap();

        let set = SegmentSet::scan(dir.path(), SegmentKind::Image).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.segments()[0].size_bytes, 4);
    }

    #[test]
    fn relabel_renames_present_slots() {
        let dir = tempfile::tempdir().unwrap();
        for index in [0, 2] {
            fs::write(slot_path(dir.path(), SegmentKind::Image, index), b"ts").unwrap();
        }
        let mut segments = SegmentSet::scan(dir.path(), SegmentKind::Image)
            .unwrap()
            .segments()
            .to_vec();
        let mut failed = LocalSegment::pending(1, slot_path(dir.path(), SegmentKind::Image, 1));
        failed.state = SegmentState::Failed;
        segments.push(failed);

        let set = SegmentSet::new(SegmentKind::Image, dir.path(), segments)
            .relabel(SegmentKind::Transport)
            .unwrap();

        assert_eq!(set.kind(), SegmentKind::Transport);
        assert_eq!(set.segments()[1].path, slot_path(dir.path(), SegmentKind::Transport, 1));
        assert_eq!(set.segments()[1].state, SegmentState::Failed);
        let rescanned = SegmentSet::scan(dir.path(), SegmentKind::Transport).unwrap();
        assert_eq!(rescanned.usable_paths(), set.usable_paths());
        assert!(SegmentSet::scan(dir.path(), SegmentKind::Image).unwrap().is_empty());
    }

    #[test]
    fn scan_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = SegmentSet::scan(&missing, SegmentKind::Image).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn usable_skips_failed_and_invalid() {
        let dir = PathBuf::from("/segments");
        let mut segments = Vec::new();
        for (index, state) in [
            (3, SegmentState::Downloaded),
            (0, SegmentState::Failed),
            (1, SegmentState::Skipped),
            (2, SegmentState::Invalid),
        ] {
            let mut seg = LocalSegment::pending(index, slot_path(&dir, SegmentKind::Image, index));
            seg.state = state;
            segments.push(seg);
        }

        let set = SegmentSet::new(SegmentKind::Image, &dir, segments);
        let usable: Vec<usize> = set.usable().map(|s| s.index).collect();
        assert_eq!(usable, vec![1, 3]);
        assert_eq!(set.count(SegmentState::Failed), 1);
        assert_eq!(set.usable_count(), 2);
    }
}
