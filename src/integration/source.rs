//! Ordered frame sequences for one checkpoint stream.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{FrameError, ReconcileError, Result};
use crate::frame::Frame;

pub type FrameIter<'a> = Box<dyn Iterator<Item = std::result::Result<Frame, FrameError>> + Send + 'a>;

/// A finite, ordered stream of frames that can be replayed from the start.
///
/// Failing to [`open`](FrameSource::open) is fatal to a run. Individual frames
/// that fail to decode come through as `Err` items and are skipped.
pub trait FrameSource: Sync {
    fn open(&self) -> Result<FrameIter<'_>>;
}

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image files in a directory, in file-name order.
#[derive(Debug, Clone)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Frame files in playback order.
    pub fn frame_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| ReconcileError::SourceUnavailable {
            path: self.dir.clone(),
            reason: err.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_frame_file(path))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

impl FrameSource for DirectoryFrameSource {
    fn open(&self) -> Result<FrameIter<'_>> {
        let paths = self.frame_paths()?;
        tracing::debug!(dir = %self.dir.display(), frames = paths.len(), "opened frame directory");

        Ok(Box::new(paths.into_iter().enumerate().map(|(index, path)| {
            match image::open(&path) {
                Ok(img) => Ok(Frame::new(index, img.to_rgb8()).with_path(path)),
                Err(source) => Err(FrameError::Decode { path, source }),
            }
        })))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Frames already decoded in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrames {
    images: Vec<RgbImage>,
}

impl InMemoryFrames {
    pub fn new(images: Vec<RgbImage>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl FrameSource for InMemoryFrames {
    fn open(&self) -> Result<FrameIter<'_>> {
        Ok(Box::new(
            self.images
                .iter()
                .enumerate()
                .map(|(index, img)| Ok(Frame::new(index, img.clone()))),
        ))
    }
}
