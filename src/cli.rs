//! CLI definitions for vidcache
//!
//! The clap structures live here, apart from main.rs, so tests can parse
//! argument lists without spawning the binary.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build clap styles.
///
/// - Green: headers, usage, command names
/// - White: placeholders and valid values
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
        .valid(AnsiColor::White.on_default())
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "vidcache")]
#[command(about = "Thumbnail and duration cache for folders of video files")]
#[command(
    long_about = "vidcache - Thumbnail and duration cache for folders of video files.

Thumbnails and durations are extracted with ffmpeg/ffprobe on first use and
kept on disk under a size budget. An entry is reused until the source file
is modified.

QUICK START:
    vidcache scan ~/Videos           List videos with cached durations
    vidcache precache ~/Videos       Warm durations for a whole folder
    vidcache thumbnail clip.mp4      Write clip.jpg
    vidcache status                  Show cache usage"
)]
#[command(version)]
#[command(styles = build_cli_styles())]
pub struct Cli {
    /// Use this cache directory instead of the configured one
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch or generate a thumbnail and write it as JPEG
    #[command(long_about = "Fetch a thumbnail from the cache, generating it on a miss.

The frame is taken from the middle of the video and scaled to the configured
size. Without --output the JPEG is written to the current directory as
<video stem>.jpg.

EXAMPLES:
    vidcache thumbnail clip.mp4
    vidcache thumbnail clip.mp4 -o /tmp/preview.jpg")]
    Thumbnail {
        /// Video file
        file: PathBuf,
        /// Output path for the JPEG
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Print the duration of a video as MM:SS
    Duration {
        /// Video file
        file: PathBuf,
    },

    /// List videos in a folder with their cached durations
    Scan {
        /// Folder to list (not recursive)
        dir: PathBuf,
    },

    /// Warm duration metadata for every video in a folder
    #[command(long_about = "Compute and cache the duration of every video in a folder.

Videos that already have a fresh cached duration are skipped. Progress is
shown on stderr. Press Ctrl-C to stop; work done so far stays cached.")]
    Precache {
        /// Folder to warm (not recursive)
        dir: PathBuf,
    },

    /// Delete every cached thumbnail and duration
    Clear,

    /// Show cache size and entry counts
    Status,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
