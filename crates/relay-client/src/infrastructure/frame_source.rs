//! Frame source: stands in for the camera.
//!
//! Either cycles through the raw frame files of a directory, in file-name
//! order, or repeats one synthetic horizontal gradient.  All frames are read
//! up front so the broadcast loop never touches the disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("I/O error reading frames from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct FrameSource {
    frames: Vec<Vec<u8>>,
    next: usize,
}

impl FrameSource {
    /// A single synthetic frame of `len` bytes rising linearly from 0 to 255.
    pub fn gradient(len: usize) -> Self {
        Self {
            frames: vec![gradient_frame(len)],
            next: 0,
        }
    }

    /// Loads every regular file in `dir`, sorted by name.  Falls back to a
    /// gradient of `frame_len` bytes when the directory holds no files.
    ///
    /// # Errors
    ///
    /// Returns [`FrameSourceError::Io`] if the directory or one of its files
    /// cannot be read.
    pub fn from_dir(dir: &Path, frame_len: usize) -> Result<Self, FrameSourceError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| FrameSourceError::Io { path, source }
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
            let entry = entry.map_err(io_err(dir))?;
            if entry.file_type().map_err(io_err(dir))?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let frame = std::fs::read(path).map_err(io_err(path.as_path()))?;
            if frame.len() != frame_len {
                warn!(
                    "{} is {} bytes, expected {frame_len}",
                    path.display(),
                    frame.len()
                );
            }
            frames.push(frame);
        }

        if frames.is_empty() {
            info!("no frames in {}; using a gradient", dir.display());
            return Ok(Self::gradient(frame_len));
        }
        info!("loaded {} frame(s) from {}", frames.len(), dir.display());
        Ok(Self { frames, next: 0 })
    }

    /// Loads from `dir` when given, else a gradient.
    ///
    /// # Errors
    ///
    /// See [`FrameSource::from_dir`].
    pub fn open(dir: Option<&Path>, frame_len: usize) -> Result<Self, FrameSourceError> {
        match dir {
            Some(dir) => Self::from_dir(dir, frame_len),
            None => Ok(Self::gradient(frame_len)),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The next frame, wrapping around after the last one.
    pub fn next_frame(&mut self) -> &[u8] {
        let index = self.next;
        self.next = (self.next + 1) % self.frames.len().max(1);
        self.frames.get(index).map(Vec::as_slice).unwrap_or_default()
    }
}

fn gradient_frame(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 256 / len) as u8).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
