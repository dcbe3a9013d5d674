//! Static integrity checks: size, start marker, end marker.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use segforge_common::SegmentKind;
use serde::Serialize;

/// JPEG start of image followed by the first marker prefix.
pub const JPEG_START: [u8; 3] = [0xFF, 0xD8, 0xFF];
/// JPEG end of image.
pub const JPEG_END: [u8; 2] = [0xFF, 0xD9];
/// MPEG-TS sync byte that starts every packet.
pub const TS_SYNC: u8 = 0x47;
/// MPEG-TS packet size.
pub const TS_PACKET: u64 = 188;

/// Why a segment was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidReason {
    TooSmall { size: u64, min: u64 },
    MissingStartMarker,
    MissingEndMarker,
    Undecodable { diagnostic: String },
    ProbeTimedOut,
    Unreadable { message: String },
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall { size, min } => write!(f, "too small ({size} bytes, minimum {min})"),
            Self::MissingStartMarker => write!(f, "invalid header"),
            Self::MissingEndMarker => write!(f, "truncated (no end marker)"),
            Self::Undecodable { diagnostic } if diagnostic.is_empty() => {
                write!(f, "ffmpeg cannot decode it")
            }
            Self::Undecodable { diagnostic } => write!(f, "ffmpeg cannot decode it: {diagnostic}"),
            Self::ProbeTimedOut => write!(f, "decode probe timed out"),
            Self::Unreadable { message } => write!(f, "unreadable: {message}"),
        }
    }
}

/// Classification of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(InvalidReason),
}

/// Minimum plausible sizes per segment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub min_image_bytes: u64,
    pub min_transport_bytes: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_image_bytes: 512,
            min_transport_bytes: TS_PACKET,
        }
    }
}

impl Thresholds {
    pub fn for_kind(&self, kind: SegmentKind) -> u64 {
        match kind {
            SegmentKind::Image => self.min_image_bytes,
            SegmentKind::Transport => self.min_transport_bytes,
        }
    }
}

/// Run the static checks in order. The size check never opens the file.
pub fn check_static(path: &Path, kind: SegmentKind, thresholds: &Thresholds) -> Verdict {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            return Verdict::Invalid(InvalidReason::Unreadable {
                message: e.to_string(),
            })
        }
    };

    let min = thresholds.for_kind(kind);
    if size < min {
        return Verdict::Invalid(InvalidReason::TooSmall { size, min });
    }

    let checked = match kind {
        SegmentKind::Image => check_jpeg(path),
        SegmentKind::Transport => check_transport(path, size),
    };
    match checked {
        Ok(verdict) => verdict,
        Err(e) => Verdict::Invalid(InvalidReason::Unreadable {
            message: e.to_string(),
        }),
    }
}

fn check_jpeg(path: &Path) -> io::Result<Verdict> {
    let mut file = File::open(path)?;

    let mut head = [0u8; 3];
    if file.read_exact(&mut head).is_err() || head != JPEG_START {
        return Ok(Verdict::Invalid(InvalidReason::MissingStartMarker));
    }

    let mut tail = [0u8; 2];
    file.seek(SeekFrom::End(-2))?;
    file.read_exact(&mut tail)?;
    if tail != JPEG_END {
        return Ok(Verdict::Invalid(InvalidReason::MissingEndMarker));
    }

    Ok(Verdict::Valid)
}

/// Transport streams have no trailer; a sync byte at the start of the last
/// full packet shows the body ends on a packet boundary.
fn check_transport(path: &Path, size: u64) -> io::Result<Verdict> {
    let mut file = File::open(path)?;

    let mut byte = [0u8; 1];
    if file.read_exact(&mut byte).is_err() || byte[0] != TS_SYNC {
        return Ok(Verdict::Invalid(InvalidReason::MissingStartMarker));
    }

    if size < TS_PACKET {
        return Ok(Verdict::Invalid(InvalidReason::MissingEndMarker));
    }
    file.seek(SeekFrom::Start(size - TS_PACKET))?;
    file.read_exact(&mut byte)?;
    if byte[0] != TS_SYNC {
        return Ok(Verdict::Invalid(InvalidReason::MissingEndMarker));
    }

    Ok(Verdict::Valid)
}
