use clap::{Parser, Subcommand, ValueEnum};
use segforge_common::SegmentKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "segforge")]
#[command(author, version, about = "Rebuild a video from the segments of an HLS-style playlist")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Segment kind selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Decide from the segment names
    Auto,
    /// JPEG frames
    Image,
    /// MPEG transport stream chunks
    Transport,
}

impl KindArg {
    pub fn resolve(self) -> Option<SegmentKind> {
        match self {
            KindArg::Auto => None,
            KindArg::Image => Some(SegmentKind::Image),
            KindArg::Transport => Some(SegmentKind::Transport),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the segments of a playlist and combine them into one video
    Run {
        /// Playlist file listing the segments
        #[arg(required = true)]
        manifest: PathBuf,

        /// Base URL for relative segment paths
        #[arg(long)]
        base_url: Option<String>,

        /// Directory for downloaded segments
        #[arg(short, long, default_value = "downloaded_segments")]
        output_dir: PathBuf,

        /// Output video file
        #[arg(short = 'v', long, default_value = "output_video.mp4")]
        video: PathBuf,

        /// Frames per second for image segments
        #[arg(short, long)]
        framerate: Option<u32>,

        /// Segment kind
        #[arg(long, value_enum, default_value = "auto")]
        kind: KindArg,

        /// Only download, do not combine
        #[arg(long, conflicts_with = "force_combine")]
        no_combine: bool,

        /// Combine without validating segments first
        #[arg(long)]
        force_combine: bool,

        /// Also decode every segment with ffmpeg during validation
        #[arg(long)]
        decode_probe: bool,

        /// Require a clean ffmpeg exit from every strategy
        #[arg(long)]
        strict: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Combine segments that are already downloaded
    Combine {
        /// Directory holding the segment files
        #[arg(required = true)]
        dir: PathBuf,

        /// Output video file
        #[arg(short = 'v', long, default_value = "output_video.mp4")]
        video: PathBuf,

        /// Frames per second for image segments
        #[arg(short, long)]
        framerate: Option<u32>,

        /// Segment kind
        #[arg(long, value_enum, default_value = "auto")]
        kind: KindArg,

        /// Skip validation
        #[arg(long)]
        force: bool,

        /// Require a clean ffmpeg exit from every strategy
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check downloaded segments and remove corrupt ones
    Validate {
        /// Directory holding the segment files
        #[arg(required = true)]
        dir: PathBuf,

        /// Segment kind
        #[arg(long, value_enum, default_value = "auto")]
        kind: KindArg,

        /// Also decode every segment with ffmpeg
        #[arg(long)]
        decode_probe: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}
