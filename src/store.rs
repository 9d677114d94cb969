//! On-disk frame store shared by the sampling and playback phases.
//!
//! A store is a directory named `<video stem>_gary` holding one PNG per sampled
//! frame (`frame_0000.png`, `frame_0001.png`, ...) and a `timestamps.txt` log
//! with one seconds value per line, in index order. The directory is created
//! fresh for every cycle and removed when the cycle ends.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::frame::GrayFrame;

/// Suffix appended to the video's file stem to name the store directory.
pub const STORE_SUFFIX: &str = "_gary";

/// Name of the timestamp log inside the store.
pub const TIMESTAMP_LOG: &str = "timestamps.txt";

/// Extension of persisted frames.
pub const FRAME_EXTENSION: &str = "png";

/// Errors that can occur while writing or reading a frame store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("frame store I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("timestamp log not found at '{}'", .0.display())]
    TimestampLogMissing(PathBuf),

    #[error("timestamp log line {line} is not a number: {value:?}")]
    TimestampLogInvalid { line: usize, value: String },

    #[error("cannot read frame {index} from '{}': {source}", path.display())]
    FrameRead {
        index: usize,
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("cannot write frame {index} to '{}': {source}", path.display())]
    FrameWrite {
        index: usize,
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Read access to persisted frames, in index order.
pub trait FrameReader {
    /// Decode the frame persisted at `index`.
    fn read_frame(&self, index: usize) -> Result<GrayFrame, StoreError>;

    /// All logged timestamps, in index order.
    fn read_timestamps(&self) -> Result<Vec<f64>, StoreError>;
}

/// A `<stem>_gary` directory owned by one play cycle.
///
/// Dropping the store removes the directory, so frames never outlive the
/// cycle even on early returns. [`FrameStore::remove`] does the same but
/// reports failures.
#[derive(Debug)]
pub struct FrameStore {
    dir: PathBuf,
    log: Option<BufWriter<File>>,
    frame_count: usize,
    removed: bool,
}

impl FrameStore {
    /// Directory a store for `video` would occupy under `root`.
    pub fn dir_for(root: &Path, video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        root.join(format!("{}{}", stem, STORE_SUFFIX))
    }

    /// Create an empty store for `video` under `root`.
    ///
    /// Any existing directory of the same name is deleted first.
    pub fn create(root: &Path, video: &Path) -> Result<Self, StoreError> {
        let dir = Self::dir_for(root, video);
        let io_err = |source| StoreError::Io {
            path: dir.clone(),
            source,
        };

        match fs::remove_dir_all(&dir) {
            Ok(()) => log::info!("replaced existing frame store {}", dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }
        fs::create_dir_all(&dir).map_err(io_err)?;

        let log_path = dir.join(TIMESTAMP_LOG);
        let log = File::create(&log_path).map_err(|source| StoreError::Io {
            path: log_path,
            source,
        })?;

        log::debug!("created frame store {}", dir.display());
        Ok(Self {
            dir,
            log: Some(BufWriter::new(log)),
            frame_count: 0,
            removed: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames appended so far.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Path of the frame persisted at `index`.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        frame_path(&self.dir, index)
    }

    pub fn timestamp_log_path(&self) -> PathBuf {
        self.dir.join(TIMESTAMP_LOG)
    }

    /// Persist `frame` as the next index and log its timestamp.
    ///
    /// # Returns
    /// The index assigned to the frame.
    pub fn append(&mut self, frame: &GrayFrame, timestamp: f64) -> Result<usize, StoreError> {
        let index = self.frame_count;
        let path = self.frame_path(index);

        image::save_buffer(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::L8,
        )
        .map_err(|source| StoreError::FrameWrite {
            index,
            path: path.clone(),
            source,
        })?;

        let log_path = self.timestamp_log_path();
        let log = self.log.as_mut().ok_or_else(|| StoreError::Io {
            path: log_path.clone(),
            source: std::io::Error::other("timestamp log already closed"),
        })?;
        let separator = if index == 0 { "" } else { "\n" };
        write!(log, "{}{}", separator, timestamp).map_err(|source| StoreError::Io {
            path: log_path,
            source,
        })?;

        self.frame_count += 1;
        Ok(index)
    }

    /// Flush and close the timestamp log. Further appends fail.
    pub fn finish(&mut self) -> Result<(), StoreError> {
        if let Some(mut log) = self.log.take() {
            log.flush().map_err(|source| StoreError::Io {
                path: self.timestamp_log_path(),
                source,
            })?;
        }
        Ok(())
    }

    /// Delete the store directory.
    pub fn remove(mut self) -> Result<(), StoreError> {
        self.removed = true;
        self.log.take();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                log::debug!("removed frame store {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}

impl FrameReader for FrameStore {
    fn read_frame(&self, index: usize) -> Result<GrayFrame, StoreError> {
        read_frame(&self.dir, index)
    }

    fn read_timestamps(&self) -> Result<Vec<f64>, StoreError> {
        read_timestamp_log(&self.timestamp_log_path())
    }
}

impl Drop for FrameStore {
    fn drop(&mut self) {
        if !self.removed {
            self.log.take();
            if let Err(e) = fs::remove_dir_all(&self.dir) {
                if e.kind() != ErrorKind::NotFound {
                    log::warn!("failed to remove frame store {}: {}", self.dir.display(), e);
                }
            }
        }
    }
}

/// Path of frame `index` inside store directory `dir`.
pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{:04}.{}", index, FRAME_EXTENSION))
}

/// Decode the frame persisted at `index` in `dir` as 8-bit grayscale.
pub fn read_frame(dir: &Path, index: usize) -> Result<GrayFrame, StoreError> {
    let path = frame_path(dir, index);
    let image = image::open(&path)
        .map_err(|source| StoreError::FrameRead {
            index,
            path: path.clone(),
            source,
        })?
        .into_luma8();
    let (width, height) = image.dimensions();
    Ok(GrayFrame {
        data: image.into_raw(),
        width,
        height,
    })
}

/// Parse a timestamp log: one value per line, blank lines ignored.
pub fn read_timestamp_log(path: &Path) -> Result<Vec<f64>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::TimestampLogMissing(path.to_path_buf()))
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.trim()
                .parse::<f64>()
                .map_err(|_| StoreError::TimestampLogInvalid {
                    line: i + 1,
                    value: line.to_string(),
                })
        })
        .collect()
}
