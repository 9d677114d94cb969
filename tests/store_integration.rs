//! Integration tests for the on-disk frame store.
//!
//! Frames are sampled into a real store under a temp directory and read back
//! through the same interface playback uses.

use std::fs;
use std::path::Path;

use ascii_reel::frame::{GrayFrame, SourceFrame};
use ascii_reel::sampler::FrameSampler;
use ascii_reel::source::{FrameSource, SourceError, VideoInfo};
use ascii_reel::store::{frame_path, FrameReader, FrameStore, STORE_SUFFIX, TIMESTAMP_LOG};
use tempfile::TempDir;

/// Constant-rate source whose frames carry their own index as intensity.
struct Counter {
    fps: f64,
    total: usize,
    next: usize,
}

impl Counter {
    fn new(fps: f64, total: usize) -> Self {
        Self { fps, total, next: 0 }
    }
}

impl FrameSource for Counter {
    fn info(&self) -> VideoInfo {
        VideoInfo {
            width: 8,
            height: 6,
            fps: self.fps,
        }
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>, SourceError> {
        if self.next == self.total {
            return Ok(None);
        }
        let frame = GrayFrame::filled(8, 6, (self.next % 256) as u8);
        let timestamp = self.next as f64 / self.fps;
        self.next += 1;
        Ok(Some(SourceFrame { frame, timestamp }))
    }
}

// ==================== Layout Tests ====================

#[test]
fn test_store_named_after_video_stem() {
    let root = TempDir::new().unwrap();
    let store = FrameStore::create(root.path(), Path::new("/somewhere/holiday.mov")).unwrap();
    assert_eq!(
        store.dir(),
        root.path().join(format!("holiday{}", STORE_SUFFIX))
    );
    assert_eq!(store.timestamp_log_path(), store.dir().join(TIMESTAMP_LOG));
}

#[test]
fn test_indices_are_contiguous_from_zero() {
    let root = TempDir::new().unwrap();
    let mut store = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    let summary = FrameSampler::default()
        .run(&mut Counter::new(30.0, 90), &mut store)
        .unwrap();

    assert_eq!(store.frame_count(), summary.sampled);
    for index in 0..summary.sampled {
        assert!(frame_path(store.dir(), index).exists(), "frame {} missing", index);
    }
    assert!(!frame_path(store.dir(), summary.sampled).exists());

    let pngs = fs::read_dir(store.dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
        .count();
    assert_eq!(pngs, summary.sampled);
}

// ==================== Round-Trip Tests ====================

#[test]
fn test_timestamps_round_trip_exactly() {
    let root = TempDir::new().unwrap();
    let mut store = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    let mut expected = Vec::new();
    for i in 0..50 {
        let ts = i as f64 / 29.97 + 0.001 * (i % 3) as f64;
        store.append(&GrayFrame::filled(2, 2, 0), ts).unwrap();
        expected.push(ts);
    }
    store.finish().unwrap();

    assert_eq!(store.read_timestamps().unwrap(), expected);
}

#[test]
fn test_sampled_frames_read_back_in_order() {
    let root = TempDir::new().unwrap();
    let mut store = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    FrameSampler::default()
        .run(&mut Counter::new(24.0, 30), &mut store)
        .unwrap();

    // 24 fps in, 24 fps out: every frame kept, intensity equals index
    assert_eq!(store.frame_count(), 30);
    for index in 0..30 {
        let frame = store.read_frame(index).unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        assert!(frame.data.iter().all(|&v| v as usize == index));
    }
    let timestamps = store.read_timestamps().unwrap();
    assert_eq!(timestamps.len(), 30);
    assert_eq!(timestamps[0], 0.0);
}

#[test]
fn test_log_is_streamed_before_finish() {
    let root = TempDir::new().unwrap();
    let mut store = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    store.append(&GrayFrame::filled(2, 2, 9), 0.0).unwrap();
    store.finish().unwrap();

    let content = fs::read_to_string(store.timestamp_log_path()).unwrap();
    assert_eq!(content, "0");
}

// ==================== Lifecycle Tests ====================

#[test]
fn test_recreate_discards_previous_cycle() {
    let root = TempDir::new().unwrap();
    {
        let mut first = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
        for i in 0..5 {
            first.append(&GrayFrame::filled(2, 2, 0), i as f64).unwrap();
        }
        first.finish().unwrap();
        // Leak the directory to simulate a crashed earlier run
        std::mem::forget(first);
    }

    let mut second = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    assert_eq!(second.frame_count(), 0);
    assert!(!second.frame_path(0).exists());

    second.append(&GrayFrame::filled(2, 2, 0), 0.0).unwrap();
    second.finish().unwrap();
    assert_eq!(second.read_timestamps().unwrap(), vec![0.0]);
    assert!(!second.frame_path(1).exists());
}

#[test]
fn test_remove_leaves_root_intact() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("keep.txt"), b"x").unwrap();

    let mut store = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    store.append(&GrayFrame::filled(2, 2, 0), 0.0).unwrap();
    let dir = store.dir().to_path_buf();
    store.remove().unwrap();

    assert!(!dir.exists());
    assert!(root.path().join("keep.txt").exists());
}

#[test]
fn test_remove_tolerates_already_deleted_dir() {
    let root = TempDir::new().unwrap();
    let store = FrameStore::create(root.path(), Path::new("clip.mp4")).unwrap();
    fs::remove_dir_all(store.dir()).unwrap();
    assert!(store.remove().is_ok());
}
