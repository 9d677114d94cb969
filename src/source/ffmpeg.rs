//! ffprobe/ffmpeg subprocess decoder.
//!
//! The stream is probed once with ffprobe for its size and nominal frame rate,
//! then decoded by an ffmpeg child process writing raw 8-bit gray frames to
//! stdout. ffmpeg's `showinfo` filter logs each frame's presentation time to
//! stderr; a reader thread parses those lines and forwards them over a channel
//! so each frame read from stdout can be paired with its timestamp.
//!
//! The argument list sticks to options accepted by ffmpeg 4.x onward
//! (`-vsync` rather than `-fps_mode`, which needs 5.1).

use std::ffi::OsString;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{FrameSource, SourceError, VideoInfo};
use crate::config::DecoderConfig;
use crate::frame::{GrayFrame, SourceFrame};

/// How long to wait for a frame's showinfo line once its pixels have arrived.
const PTS_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of trailing ffmpeg log lines kept for error reports.
const STDERR_TAIL: usize = 20;

/// A running ffmpeg decode of one video file.
pub struct FfmpegSource {
    path: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    /// One entry per decoded frame; `None` when ffmpeg logged no pts for it
    pts_rx: Receiver<Option<f64>>,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
    info: VideoInfo,
    frame_size: usize,
    frames_read: u64,
    last_timestamp: f64,
    finished: bool,
}

impl FfmpegSource {
    /// Inspect `path` with ffprobe and start decoding it.
    ///
    /// # Errors
    /// [`SourceError::Unavailable`] when the file has no decodable video stream,
    /// [`SourceError::DecoderNotFound`] when ffprobe/ffmpeg cannot be executed.
    pub fn open(path: &Path, config: &DecoderConfig) -> Result<Self, SourceError> {
        let info = stream_info(path, &config.ffprobe)?;
        log::info!(
            "opened {}: {}x{} @ {:.2} fps",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        let mut cmd = Command::new(&config.ffmpeg);
        cmd.args(decode_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_error(&config.ffmpeg, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Io(std::io::Error::other("ffmpeg stdout not captured")))?;

        let (pts_tx, pts_rx) = mpsc::channel();
        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || forward_showinfo(BufReader::new(stderr), &pts_tx))
        });

        Ok(Self {
            path: path.to_path_buf(),
            child,
            stdout: BufReader::new(stdout),
            pts_rx,
            stderr_thread,
            info,
            frame_size: (info.width as usize) * (info.height as usize),
            frames_read: 0,
            last_timestamp: 0.0,
            finished: false,
        })
    }

    /// Timestamp for the frame just read: the logged presentation time when
    /// available, otherwise its position at the nominal rate.
    fn next_timestamp(&mut self) -> f64 {
        let logged = match self.pts_rx.recv_timeout(PTS_TIMEOUT) {
            Ok(pts) => pts,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        };

        let timestamp = logged.unwrap_or_else(|| {
            if self.info.fps > 0.0 {
                self.frames_read as f64 / self.info.fps
            } else {
                self.last_timestamp
            }
        });

        // Streams are consumed as non-decreasing from zero
        let timestamp = timestamp.max(self.last_timestamp).max(0.0);
        self.last_timestamp = timestamp;
        timestamp
    }

    /// Reap the child after stdout closed. A decoder that failed before
    /// producing a single frame means the file could not be decoded.
    fn finish(&mut self) -> Result<(), SourceError> {
        self.finished = true;
        let status = self.child.wait()?;
        let tail = self
            .stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() && self.frames_read == 0 {
            return Err(SourceError::Unavailable {
                path: self.path.clone(),
                reason: tail
                    .last()
                    .cloned()
                    .unwrap_or_else(|| format!("ffmpeg exited with {}", status)),
            });
        }
        if !status.success() {
            log::warn!(
                "ffmpeg exited with {} after {} frames",
                status,
                self.frames_read
            );
        }
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>, SourceError> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.frame_size];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => {}
            // A truncated trailing frame is dropped with the end of stream
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finish()?;
                return Ok(None);
            }
            Err(e) => return Err(SourceError::Io(e)),
        }

        let timestamp = self.next_timestamp();
        self.frames_read += 1;

        Ok(Some(SourceFrame {
            frame: GrayFrame {
                data,
                width: self.info.width,
                height: self.info.height,
            },
            timestamp,
        }))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> SourceError {
    if e.kind() == ErrorKind::NotFound {
        SourceError::DecoderNotFound(program.to_string())
    } else {
        SourceError::Io(e)
    }
}

/// ffmpeg arguments decoding the first video stream of `path` to raw gray
/// frames on stdout, one frame out per frame decoded.
fn decode_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-nostdin", "-hide_banner", "-loglevel", "info", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(
        [
            "-map",
            "0:v:0",
            "-vf",
            "showinfo",
            "-vsync",
            "passthrough",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "gray",
            "-",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

/// Forward one pts entry per showinfo frame line to `tx`, keeping the last
/// few non-showinfo lines for error reports.
fn forward_showinfo<R: BufRead>(reader: R, tx: &Sender<Option<f64>>) -> Vec<String> {
    let mut tail = Vec::new();
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if let Some(pts) = parse_showinfo_frame(&line) {
            if tx.send(pts).is_err() {
                break;
            }
        } else if !line.contains("showinfo") {
            log::debug!("[ffmpeg] {}", line);
            if tail.len() == STDERR_TAIL {
                tail.remove(0);
            }
            tail.push(line);
        }
    }
    tail
}

/// Query display width, height and nominal frame rate of the first video
/// stream.
fn stream_info(path: &Path, ffprobe: &str) -> Result<VideoInfo, SourceError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_streams",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(ffprobe, e))?;

    let unavailable = |reason: String| SourceError::Unavailable {
        path: path.to_path_buf(),
        reason,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unavailable(stderr.trim().to_string()));
    }

    parse_stream_info(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| unavailable("no video stream found".to_string()))
}

/// Read size, rate and rotation from ffprobe `-show_streams` key=value output.
///
/// ffmpeg autorotates while decoding, so a stream rotated by a quarter turn
/// is delivered with width and height swapped relative to its coded size.
fn parse_stream_info(output: &str) -> Option<VideoInfo> {
    let mut width = None;
    let mut height = None;
    let mut fps = None;
    let mut rotation = 0.0_f64;

    // field order is not guaranteed
    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = value.parse::<u32>().ok(),
            "height" => height = value.parse::<u32>().ok(),
            "r_frame_rate" => fps = parse_frame_rate(value),
            // container tag (older ffmpeg) or display matrix side data
            "TAG:rotate" | "rotation" => {
                if let Ok(degrees) = value.trim().parse::<f64>() {
                    rotation = degrees;
                }
            }
            _ => {}
        }
    }

    let (width, height) = match (width, height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        _ => return None,
    };
    let quarter_turn = rotation.is_finite() && (rotation.round() as i64).rem_euclid(180) == 90;
    let (width, height) = if quarter_turn {
        (height, width)
    } else {
        (width, height)
    };

    Some(VideoInfo {
        width,
        height,
        fps: fps.unwrap_or(0.0),
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Extract `pts_time` from an ffmpeg `showinfo` log line.
///
/// ```
/// use ascii_reel::source::parse_showinfo_pts;
///
/// let line = "[Parsed_showinfo_0 @ 0x6000] n:   3 pts:   3003 pts_time:0.1001  duration:1001";
/// assert_eq!(parse_showinfo_pts(line), Some(0.1001));
/// ```
pub fn parse_showinfo_pts(line: &str) -> Option<f64> {
    parse_showinfo_frame(line).flatten()
}

/// Classify a log line: `Some` for every showinfo frame line, carrying the
/// frame's `pts_time` or `None` when it has none (`NOPTS`).
fn parse_showinfo_frame(line: &str) -> Option<Option<f64>> {
    let (_, rest) = line.split_once("pts_time:")?;
    let pts = rest
        .split_whitespace()
        .next()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|v| v.is_finite());
    Some(pts)
}
