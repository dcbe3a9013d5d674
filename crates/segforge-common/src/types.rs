//! Core type definitions for segments as they move through the pipeline.
//!
//! A [`SegmentReference`] is what the manifest says; a [`LocalSegment`] is
//! what ended up on disk and what the later stages learned about it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The encoding of the individual segments listed by a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// One JPEG frame per segment.
    Image,
    /// MPEG transport stream chunks.
    Transport,
}

impl SegmentKind {
    /// File extension used for local slots of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "jpeg",
            Self::Transport => "ts",
        }
    }

    /// File name prefix used for local slots of this kind.
    pub fn slot_prefix(&self) -> &'static str {
        match self {
            Self::Image => "video",
            Self::Transport => "segment",
        }
    }

    /// Infer the kind from segment locations.
    ///
    /// Image is chosen only when every location names a `.jpeg`/`.jpg`
    /// resource (query strings and fragments are ignored). An empty input
    /// yields [`SegmentKind::Transport`].
    ///
    /// ```
    /// use segforge_common::SegmentKind;
    ///
    /// let kind = SegmentKind::infer(["a/0.jpeg", "https://cdn/1.JPG?sig=x"]);
    /// assert_eq!(kind, SegmentKind::Image);
    /// assert_eq!(SegmentKind::infer(["0.jpeg", "1.ts"]), SegmentKind::Transport);
    /// ```
    pub fn infer<'a>(locations: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen_any = false;
        for location in locations {
            seen_any = true;
            let path = location
                .split(['?', '#'])
                .next()
                .unwrap_or(location)
                .to_ascii_lowercase();
            if !(path.ends_with(".jpeg") || path.ends_with(".jpg")) {
                return Self::Transport;
            }
        }
        if seen_any {
            Self::Image
        } else {
            Self::Transport
        }
    }
}

impl SegmentKind {
    /// Identify the kind from the first bytes of a segment body.
    ///
    /// Servers routinely label transport chunks `.jpeg`, so content wins over
    /// the name whenever it is recognisable.
    ///
    /// ```
    /// use segforge_common::SegmentKind;
    ///
    /// assert_eq!(SegmentKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(SegmentKind::Image));
    /// assert_eq!(SegmentKind::sniff(&[0x47, 0x40, 0x00, 0x10]), Some(SegmentKind::Transport));
    /// assert_eq!(SegmentKind::sniff(b"<html>"), None);
    /// ```
    pub fn sniff(head: &[u8]) -> Option<Self> {
        if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Image)
        } else if head.first() == Some(&0x47) {
            Some(Self::Transport)
        } else {
            None
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

impl FromStr for SegmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" | "jpeg" | "jpg" => Ok(Self::Image),
            "transport" | "ts" | "mpegts" => Ok(Self::Transport),
            _ => Err(format!("Unknown segment kind: {s}")),
        }
    }
}

/// One segment entry parsed from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReference {
    /// Zero-based position among the accepted segment lines.
    pub index: usize,
    /// Fully resolved URL of the segment.
    pub location: String,
    /// Whether the manifest line was already an absolute URL.
    pub is_absolute: bool,
}

/// Lifecycle state of a local segment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    /// Slot opened, transfer not finished.
    Pending,
    /// Body fetched in this run.
    Downloaded,
    /// Slot was already populated by an earlier run.
    Skipped,
    /// Transfer failed; no file is present.
    Failed,
    /// Rejected by validation; the file has been removed.
    Invalid,
}

impl SegmentState {
    /// Whether a file is expected to be present for this state.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Skipped)
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Downloaded => write!(f, "downloaded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// A segment slot on local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSegment {
    /// Index of the originating [`SegmentReference`].
    pub index: usize,
    /// Slot path inside the destination directory.
    pub path: PathBuf,
    /// Size of the slot file in bytes (0 when absent).
    pub size_bytes: u64,
    /// Current lifecycle state.
    pub state: SegmentState,
}

impl LocalSegment {
    /// Open a new pending slot.
    pub fn pending(index: usize, path: PathBuf) -> Self {
        Self {
            index,
            path,
            size_bytes: 0,
            state: SegmentState::Pending,
        }
    }
}
