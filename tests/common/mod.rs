// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Shared fixtures: an in-memory video backend and pose builders.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{DynamicImage, Rgb, RgbImage};

pub use posedetect::io::VideoSink;
pub use posedetect::pose::{Joint, KeyPoint, Pose};
pub use posedetect::source::{VideoBackend, VideoInfo, VideoReader, WriterSettings};
use posedetect::{PoseError, Result};

/// Gray level encoding a frame index, so written frames can be traced back.
pub fn frame_shade(index: usize) -> u8 {
    u8::try_from(index % 200).unwrap() + 20
}

/// A synthetic frame filled with its index shade.
pub fn synthetic_frame(width: u32, height: u32, index: usize) -> DynamicImage {
    let shade = frame_shade(index);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, shade, shade])))
}

/// A video written through a [`MemoryBackend`] sink.
#[derive(Debug, Clone, Default)]
pub struct RecordedVideo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub frames: Vec<RgbImage>,
    pub finished: bool,
}

/// Video backend over synthetic videos registered by path.
///
/// Registered videos get a placeholder file on disk so existence checks pass.
#[derive(Default)]
pub struct MemoryBackend {
    videos: HashMap<PathBuf, VideoInfo>,
    decode_failures: HashMap<PathBuf, usize>,
    recorded: Rc<RefCell<Vec<RecordedVideo>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video and create its placeholder file.
    pub fn add_video(&mut self, path: &Path, width: u32, height: u32, fps: f32, frames: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"synthetic video").unwrap();
        self.videos.insert(
            path.to_path_buf(),
            VideoInfo {
                width,
                height,
                fps,
                total_frames: frames,
            },
        );
    }

    /// Make decoding of a video fail at a frame index.
    pub fn fail_decoding_at(&mut self, path: &Path, index: usize) {
        self.decode_failures.insert(path.to_path_buf(), index);
    }

    /// Videos written so far.
    pub fn recorded(&self) -> Vec<RecordedVideo> {
        self.recorded.borrow().clone()
    }
}

impl VideoBackend for MemoryBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoReader>> {
        let info = self.videos.get(path).cloned().ok_or_else(|| {
            PoseError::InputError(format!("Failed to open video {}", path.display()))
        })?;
        Ok(Box::new(MemoryReader {
            info,
            next: 0,
            fail_at: self.decode_failures.get(path).copied(),
        }))
    }

    fn create_writer(&self, path: &Path, settings: &WriterSettings) -> Result<Box<dyn VideoSink>> {
        fs::write(path, b"")?;
        let index = {
            let mut recorded = self.recorded.borrow_mut();
            recorded.push(RecordedVideo {
                path: path.to_path_buf(),
                width: settings.width,
                height: settings.height,
                fps: settings.fps,
                ..RecordedVideo::default()
            });
            recorded.len() - 1
        };
        Ok(Box::new(MemorySink {
            recorded: Rc::clone(&self.recorded),
            index,
        }))
    }
}

struct MemoryReader {
    info: VideoInfo,
    next: usize,
    fail_at: Option<usize>,
}

impl Iterator for MemoryReader {
    type Item = Result<DynamicImage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.info.total_frames {
            return None;
        }
        let index = self.next;
        self.next += 1;
        if self.fail_at == Some(index) {
            return Some(Err(PoseError::VideoError(format!(
                "corrupt frame {index}"
            ))));
        }
        Some(Ok(synthetic_frame(self.info.width, self.info.height, index)))
    }
}

impl VideoReader for MemoryReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }
}

struct MemorySink {
    recorded: Rc<RefCell<Vec<RecordedVideo>>>,
    index: usize,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &DynamicImage) -> Result<()> {
        let mut recorded = self.recorded.borrow_mut();
        let video = &mut recorded[self.index];
        if frame.width() != video.width || frame.height() != video.height {
            return Err(PoseError::VideoError("frame size mismatch".to_string()));
        }
        video.frames.push(frame.to_rgb8());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let mut recorded = self.recorded.borrow_mut();
        let video = &mut recorded[self.index];
        video.finished = true;
        fs::write(&video.path, format!("{} frames", video.frames.len()))?;
        Ok(())
    }
}

/// A COCO pose with the given joints as `(joint_id, x, y, confidence)`.
pub fn coco_pose(person_id: u32, frame: usize, fps: f64, joints: &[(u32, f32, f32, f32)]) -> Pose {
    #[allow(clippy::cast_precision_loss)]
    let timestamp = frame as f64 / fps;
    let joints = joints
        .iter()
        .map(|&(id, x, y, confidence)| {
            let name = posedetect::Topology::Coco17.joint_name(id).unwrap();
            Joint::new(name, id, KeyPoint::new(x, y, confidence))
        })
        .collect();
    Pose::from_joints(person_id, frame, timestamp, joints)
}

/// A confident left/right shoulder pair.
pub fn shoulders(person_id: u32, frame: usize) -> Pose {
    coco_pose(
        person_id,
        frame,
        10.0,
        &[(5, 10.0, 20.0, 0.9), (6, 50.0, 20.0, 0.8)],
    )
}

/// Files directly inside a directory, sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
