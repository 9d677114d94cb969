//! ascii-reel library crate.
//!
//! Video frames are sampled to a fixed rate, stored on disk, then replayed as
//! grayscale ASCII art at their original timing.

pub mod ascii;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod frame;
pub mod playback;
pub mod sampler;
pub mod session;
pub mod source;
pub mod store;
pub mod terminal;
