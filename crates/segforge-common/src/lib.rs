//! Segforge-Common: Shared types, constants, and utilities.
//!
//! This crate provides the data model that flows between the segforge stages:
//!
//! - **Segment types**: [`SegmentKind`], [`SegmentReference`], [`LocalSegment`]
//!   and [`SegmentState`]
//! - **Segment sets**: [`SegmentSet`], the explicit index-to-path mapping
//!   handed from the fetcher to the validator and on to assembly
//! - **Slot naming**: zero-padded file names and their inverse in [`paths`]
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use segforge_common::{SegmentKind, paths::slot_file_name};
//!
//! assert_eq!(slot_file_name(SegmentKind::Image, 7), "video0007.jpeg");
//! assert_eq!(slot_file_name(SegmentKind::Transport, 12), "segment0012.ts");
//! ```

pub mod error;
pub mod paths;
pub mod set;
pub mod types;

pub use error::{Error, Result};
pub use set::SegmentSet;
pub use types::*;
