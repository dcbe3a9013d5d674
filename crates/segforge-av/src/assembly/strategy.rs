//! The strategy catalog and the ladders built from it.

use std::fmt;
use std::time::Duration;

use segforge_common::SegmentKind;
use serde::Serialize;

/// One way of muxing a segment set into a single output file.
///
/// Strategies carry no state. The engine walks a ladder of them in order
/// until one produces a viable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Image: `image2` demuxer over the slot name pattern.
    PatternSequence,
    /// Image: concat demuxer with an explicit per-frame duration.
    ConcatList,
    /// Image: renumbered copies in a workspace, tried on a prefix first.
    StagedCopy,
    /// Image: huge probe buffers, corrupt frame discarding, loose acceptance.
    MaxTolerance,
    /// Transport: concat demuxer, stream copy.
    ConcatDemuxCopy,
    /// Transport: `concat:` protocol, stream copy.
    ConcatProtocolCopy,
    /// Transport: byte-level concatenation, then a remux.
    BinaryConcatRemux,
    /// Transport: full re-encode with error-tolerant flags.
    ReencodeTolerant,
    /// Transport: stream copy with every tolerance flag, loose acceptance.
    MaxToleranceCopy,
    /// Transport: treat the bytes as a raw H.264, then HEVC, elementary stream.
    RawElementaryProbe,
}

const IMAGE_LADDER: &[Strategy] = &[
    Strategy::PatternSequence,
    Strategy::ConcatList,
    Strategy::StagedCopy,
    Strategy::MaxTolerance,
];

const TRANSPORT_LADDER: &[Strategy] = &[
    Strategy::ConcatDemuxCopy,
    Strategy::ConcatProtocolCopy,
    Strategy::BinaryConcatRemux,
    Strategy::ReencodeTolerant,
    Strategy::MaxToleranceCopy,
    Strategy::RawElementaryProbe,
];

impl Strategy {
    /// The fixed ladder for a segment kind, most conservative first.
    pub fn ladder(kind: SegmentKind) -> &'static [Strategy] {
        match kind {
            SegmentKind::Image => IMAGE_LADDER,
            SegmentKind::Transport => TRANSPORT_LADDER,
        }
    }

    /// Stable name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PatternSequence => "pattern_sequence",
            Self::ConcatList => "concat_list",
            Self::StagedCopy => "staged_copy",
            Self::MaxTolerance => "max_tolerance",
            Self::ConcatDemuxCopy => "concat_demux_copy",
            Self::ConcatProtocolCopy => "concat_protocol_copy",
            Self::BinaryConcatRemux => "binary_concat_remux",
            Self::ReencodeTolerant => "reencode_tolerant",
            Self::MaxToleranceCopy => "max_tolerance_copy",
            Self::RawElementaryProbe => "raw_elementary_probe",
        }
    }

    /// Time limit for the invocation that writes the final output.
    pub fn timeout(&self) -> Duration {
        match self {
            Self::PatternSequence | Self::ConcatList => Duration::from_secs(300),
            Self::ReencodeTolerant | Self::MaxTolerance => Duration::from_secs(3600),
            Self::StagedCopy
            | Self::ConcatDemuxCopy
            | Self::ConcatProtocolCopy
            | Self::BinaryConcatRemux
            | Self::MaxToleranceCopy
            | Self::RawElementaryProbe => Duration::from_secs(1800),
        }
    }

    /// Time limit for the prefix trial of two-phase strategies.
    pub fn trial_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Whether a non-zero exit is acceptable when the output is viable.
    pub fn accepts_tool_errors(&self) -> bool {
        matches!(self, Self::MaxTolerance | Self::MaxToleranceCopy)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
