//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// ascii-reel: play videos as grayscale ASCII art in the terminal
#[derive(Debug, Parser)]
#[command(name = "ascii-reel")]
#[command(version, about = "Play videos as grayscale ASCII art in the terminal")]
#[command(long_about = "Samples a video down to 24 frames per second, stores the \
    frames on disk, then replays them as ASCII art at the video's original pace. \
    After each video you are prompted for another; enter a path that does not \
    exist (or an empty line) to quit.")]
#[command(after_help = "EXAMPLES:
    # Prompt for a video path
    ascii-reel

    # Play one file and exit
    ascii-reel clip.mp4 --once

    # Start immediately and keep frames under /tmp
    ascii-reel clip.mp4 --countdown 0 --store-dir /tmp")]
pub struct Cli {
    /// Video to play first, before prompting
    pub video: Option<PathBuf>,

    /// Path to a config file (default: <config dir>/ascii-reel/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory in which the temporary frame store is created
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Seconds to wait before playback starts
    #[arg(long, value_name = "SECS")]
    pub countdown: Option<u64>,

    /// Exit after the first video instead of prompting for more
    #[arg(long)]
    pub once: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.store_dir {
            config.store.root = Some(dir.clone());
        }
        if let Some(secs) = self.countdown {
            config.playback.countdown_secs = secs;
        }
    }

    /// Log filter for the requested verbosity.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }
}
