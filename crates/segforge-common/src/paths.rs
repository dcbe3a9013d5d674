//! Slot naming for downloaded segments.
//!
//! Slots are named `<prefix><index:04>.<ext>`, e.g. `video0003.jpeg` or
//! `segment0042.ts`. The zero padding keeps directory listings readable, but
//! nothing downstream relies on lexical order: [`parse_slot_index`] recovers
//! the numeric index, so indices past 9999 still sort correctly.

use std::path::{Path, PathBuf};

use crate::SegmentKind;

/// Suffix appended to a slot while its body is still being written.
pub const PARTIAL_SUFFIX: &str = "part";

/// Build the slot file name for a segment index.
///
/// # Examples
///
/// ```
/// use segforge_common::{SegmentKind, paths::slot_file_name};
///
/// assert_eq!(slot_file_name(SegmentKind::Image, 0), "video0000.jpeg");
/// assert_eq!(slot_file_name(SegmentKind::Transport, 12345), "segment12345.ts");
/// ```
pub fn slot_file_name(kind: SegmentKind, index: usize) -> String {
    format!("{}{:04}.{}", kind.slot_prefix(), index, kind.extension())
}

/// Full slot path inside `dir`.
pub fn slot_path(dir: &Path, kind: SegmentKind, index: usize) -> PathBuf {
    dir.join(slot_file_name(kind, index))
}

/// Path used while a slot is being written.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use segforge_common::paths::partial_path;
///
/// let part = partial_path(Path::new("out/segment0001.ts"));
/// assert_eq!(part, Path::new("out/segment0001.ts.part"));
/// ```
pub fn partial_path(slot: &Path) -> PathBuf {
    let mut name = slot.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Recover the segment index from a slot file name.
///
/// Returns `None` for anything that is not a slot of `kind`, including
/// partial files and names with a non-numeric index.
///
/// # Examples
///
/// ```
/// use segforge_common::{SegmentKind, paths::parse_slot_index};
///
/// assert_eq!(parse_slot_index(SegmentKind::Image, "video0012.jpeg"), Some(12));
/// assert_eq!(parse_slot_index(SegmentKind::Image, "segment0012.ts"), None);
/// assert_eq!(parse_slot_index(SegmentKind::Transport, "segment0001.ts.part"), None);
/// ```
pub fn parse_slot_index(kind: SegmentKind, file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(kind.slot_prefix())?
        .strip_suffix(kind.extension())?
        .strip_suffix('.')?;

    if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names_are_zero_padded() {
        assert_eq!(slot_file_name(SegmentKind::Image, 5), "video0005.jpeg");
        assert_eq!(slot_file_name(SegmentKind::Transport, 999), "segment0999.ts");
    }

    #[test]
    fn slot_path_joins_directory() {
        let path = slot_path(Path::new("/tmp/out"), SegmentKind::Transport, 3);
        assert_eq!(path, PathBuf::from("/tmp/out/segment0003.ts"));
    }

    #[test]
    fn parse_round_trips_large_indices() {
        let name = slot_file_name(SegmentKind::Transport, 10_001);
        assert_eq!(parse_slot_index(SegmentKind::Transport, &name), Some(10_001));
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert_eq!(parse_slot_index(SegmentKind::Image, "video.jpeg"), None);
        assert_eq!(parse_slot_index(SegmentKind::Image, "video12.jpeg"), None);
        assert_eq!(parse_slot_index(SegmentKind::Image, "videoabcd.jpeg"), None);
        assert_eq!(parse_slot_index(SegmentKind::Image, "frame000001.jpg"), None);
        assert_eq!(parse_slot_index(SegmentKind::Transport, "segment_list.txt"), None);
    }
}
