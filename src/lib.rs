//! Segforge - rebuild a video from the segments listed in a playlist
//!
//! This library crate exposes the pipeline stages for the binary and for
//! integration testing.

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod validate;
