//! Multi-strategy assembly of a segment set into one output file.
//!
//! The [`AssemblyEngine`] walks the [`Strategy`] ladder for the set's kind and
//! stops at the first attempt whose output passes [`is_viable`]. Every
//! strategy owns a [`Workspace`](crate::Workspace) for its intermediate files,
//! so lists, staged copies and trial outputs are gone once the attempt
//! returns, whichever way it went.

pub mod concat;
mod engine;
mod image;
mod outcome;
mod strategy;
mod transport;

pub use engine::AssemblyEngine;
pub use outcome::{is_viable, AssemblyOutcome, AssemblyReport};
pub use strategy::Strategy;

use serde::{Deserialize, Serialize};

/// Tunables shared by every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    /// Frames per second for image sequences.
    pub framerate: u32,
    /// An output must be strictly larger than this to count as viable.
    pub min_output_bytes: u64,
    /// Require a zero exit status even from the tolerant strategies.
    pub strict: bool,
    /// Number of segments used for the trial run of two-phase strategies.
    pub prefix_sample: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            framerate: 30,
            min_output_bytes: 1024,
            strict: false,
            prefix_sample: 100,
        }
    }
}
