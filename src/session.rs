//! Play cycles and the interactive loop around them.
//!
//! A cycle takes one video from path to cleanup: check the input, open the
//! decoder, sample into a fresh frame store, count down, play, and delete the
//! store. Every cycle owns its own store, cancel token and scheduler; the
//! outer loop keeps no state between cycles.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cancel::{CancelToken, InterruptHandler};
use crate::config::{Config, DecoderConfig};
use crate::playback::{
    PlaybackError, PlaybackReport, PlaybackScheduler, PlaybackState, Timeline,
};
use crate::sampler::{FrameSampler, SampleError, SampleSummary};
use crate::source::{FfmpegSource, FrameSource, SourceError};
use crate::store::{FrameStore, StoreError};
use crate::terminal::TerminalEnv;

/// Errors that end a play cycle.
///
/// None of them end the process; the interactive loop reports them and
/// decides whether to prompt again.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error(transparent)]
    SourceUnavailable(SourceError),

    #[error("sampling failed: {0}")]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Per-cycle settings resolved from config and command line.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Directory under which `<stem>_gary` stores are created
    pub store_root: PathBuf,
    /// Wait between sampling and the first frame
    pub countdown: Duration,
    pub decoder: DecoderConfig,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store_root: config.store.root_dir(),
            countdown: Duration::from_secs(config.playback.countdown_secs),
            decoder: config.decoder.clone(),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub video: PathBuf,
    pub sample: SampleSummary,
    /// `None` when sampling produced no frames or was cancelled
    pub playback: Option<PlaybackReport>,
}

impl CycleReport {
    /// Whether Ctrl+C stopped the cycle, during sampling or playback.
    pub fn was_cancelled(&self) -> bool {
        self.sample.cancelled
            || matches!(
                self.playback,
                Some(PlaybackReport {
                    state: PlaybackState::Cancelled,
                    ..
                })
            )
    }
}

/// Runs play cycles against one terminal.
pub struct Player<T: TerminalEnv> {
    settings: SessionSettings,
    terminal: T,
    interrupts: Option<InterruptHandler>,
}

impl<T: TerminalEnv> Player<T> {
    pub fn new(settings: SessionSettings, terminal: T) -> Self {
        Self {
            settings,
            terminal,
            interrupts: None,
        }
    }

    /// Route Ctrl+C to the playing cycle.
    pub fn with_interrupts(mut self, handler: InterruptHandler) -> Self {
        self.interrupts = Some(handler);
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Decode `video` with ffmpeg and play it.
    pub fn play_file(&mut self, video: &Path) -> Result<CycleReport, SessionError> {
        if !video.exists() {
            return Err(SessionError::InputNotFound(video.to_path_buf()));
        }

        let mut source = FfmpegSource::open(video, &self.settings.decoder)
            .map_err(SessionError::SourceUnavailable)?;
        println!("source frame rate: {:.2} FPS", source.info().fps);

        self.play_source(video, &mut source)
    }

    /// Sample `source` into a fresh store named after `video`, then play it.
    ///
    /// Ctrl+C is routed to this cycle before the store exists, so an
    /// interrupt while sampling stops the cycle instead of the process. The
    /// store is deleted before returning, whether playback completed, was
    /// cancelled, or failed.
    pub fn play_source<S: FrameSource + ?Sized>(
        &mut self,
        video: &Path,
        source: &mut S,
    ) -> Result<CycleReport, SessionError> {
        let token = CancelToken::new();
        let _armed = self.interrupts.as_ref().map(|h| h.arm(&token));

        let mut store = FrameStore::create(&self.settings.store_root, video)?;

        println!("converting to grayscale frames...");
        let sampler = FrameSampler::default().with_cancel(token.clone());
        let sample = match sampler.run(source, &mut store) {
            Ok(summary) => summary,
            Err(SampleError::Source(e)) if store.frame_count() == 0 => {
                store.remove()?;
                return Err(SessionError::SourceUnavailable(e));
            }
            Err(e) => return Err(e.into()),
        };

        if sample.cancelled {
            store.remove()?;
            println!("conversion stopped");
            return Ok(CycleReport {
                video: video.to_path_buf(),
                sample,
                playback: None,
            });
        }
        println!(
            "saved {} of {} frames to {}",
            sample.sampled,
            sample.decoded,
            store.dir().display()
        );

        if sample.sampled == 0 {
            store.remove()?;
            return Ok(CycleReport {
                video: video.to_path_buf(),
                sample,
                playback: None,
            });
        }

        let playback = self.play_store(&store, sample.sampled, token);
        store.remove()?;
        let playback = playback?;

        if playback.state == PlaybackState::Cancelled {
            println!("playback stopped");
        }
        Ok(CycleReport {
            video: video.to_path_buf(),
            sample,
            playback: Some(playback),
        })
    }

    fn play_store(
        &mut self,
        store: &FrameStore,
        frame_count: usize,
        token: CancelToken,
    ) -> Result<PlaybackReport, SessionError> {
        if !self.settings.countdown.is_zero() {
            println!(
                "playback starts in {} seconds...",
                self.settings.countdown.as_secs()
            );
            println!("press Ctrl+C to stop");
            if token.wait_until(Instant::now() + self.settings.countdown) {
                return Ok(PlaybackReport {
                    state: PlaybackState::Cancelled,
                    rendered: 0,
                    skipped: 0,
                    late: 0,
                });
            }
        }

        let timeline = Timeline::load(store, frame_count);
        let mut scheduler = PlaybackScheduler::new(token);

        self.terminal.begin()?;
        let result = scheduler.run(store, &timeline, &mut self.terminal);
        self.terminal.end()?;

        let report = result?;
        if report.skipped > 0 || report.late > 0 {
            log::info!(
                "played {} frames ({} skipped, {} late)",
                report.rendered,
                report.skipped,
                report.late
            );
        }
        Ok(report)
    }
}

/// Turn a line typed (or dropped) at the prompt into a path.
///
/// Surrounding whitespace and one pair of matching quotes are removed.
/// Returns `None` for an empty line.
pub fn parse_input_path(line: &str) -> Option<PathBuf> {
    let trimmed = line.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|&q| {
            trimmed
                .strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(trimmed)
        .trim();

    (!unquoted.is_empty()).then(|| PathBuf::from(unquoted))
}

/// Print the prompt and read one path. `None` on EOF or an empty line.
pub fn prompt_for_path<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<PathBuf>> {
    write!(out, "Enter a video file path (or drag the file into the terminal): ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(parse_input_path(&line))
}

/// Why the interactive loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// EOF or an empty line at the prompt
    EndOfInput,
    /// The given path does not exist
    InputNotFound(PathBuf),
    /// `once` was requested and one cycle ran
    Once,
}

/// Prompt for videos and play them until the user stops.
///
/// `initial` is played first without prompting. A path that does not exist
/// ends the loop; any other cycle error is reported and the user is prompted
/// again.
pub fn run_loop<R, W, F>(
    input: &mut R,
    out: &mut W,
    initial: Option<PathBuf>,
    once: bool,
    mut play: F,
) -> io::Result<LoopExit>
where
    R: BufRead,
    W: Write,
    F: FnMut(&Path) -> Result<CycleReport, SessionError>,
{
    writeln!(out, "Maximize the terminal for the best experience.")?;
    let mut pending = initial;

    loop {
        let video = match pending.take() {
            Some(video) => video,
            None => match prompt_for_path(input, out)? {
                Some(video) => video,
                None => return Ok(LoopExit::EndOfInput),
            },
        };

        match play(&video) {
            Ok(report) => {
                log::info!(
                    "finished {} ({} frames sampled)",
                    report.video.display(),
                    report.sample.sampled
                );
            }
            Err(SessionError::InputNotFound(path)) => {
                writeln!(out, "Error: file not found: {}", path.display())?;
                return Ok(LoopExit::InputNotFound(path));
            }
            Err(e) => {
                log::debug!("cycle failed: {:?}", e);
                writeln!(out, "Error: {}", e)?;
            }
        }

        if once {
            return Ok(LoopExit::Once);
        }
    }
}
