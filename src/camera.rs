//! Frame acquisition boundary
//!
//! Frame capture and pixel encoding are external concerns; the session core
//! only needs "give me the latest JPEG, if there is one". The shipped
//! implementation reads frames an external grabber spools into a directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{Error, Result};

/// One captured camera frame, JPEG-encoded
#[derive(Debug, Clone)]
pub struct Frame {
    /// JPEG bytes as produced by the grabber
    pub jpeg: Vec<u8>,
}

/// Source of camera frames shared read-only across capture ticks
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Whether the capture device is active and frames can be expected
    fn is_ready(&self) -> bool;

    /// Grab the next frame, or `None` when no frame is available right now.
    /// A `None` tick is a silent no-op for the caller, never an error.
    async fn capture(&self) -> Option<Frame>;
}

/// Frame source backed by a spool directory of JPEG files
///
/// An external grabber (e.g. an ffmpeg still-image pipe) keeps the directory
/// populated; capture cycles through the files in name order.
pub struct DirectoryFrameSource {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
}

impl DirectoryFrameSource {
    /// Scan `dir` for JPEG frames
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read or holds no frames
    pub fn open(dir: &Path) -> Result<Self> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| Error::Camera(format!("cannot read {}: {e}", dir.display())))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(Error::Camera(format!(
                "no JPEG frames in {}",
                dir.display()
            )));
        }

        tracing::debug!(dir = %dir.display(), frames = frames.len(), "frame source opened");

        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    fn is_ready(&self) -> bool {
        !self.frames.is_empty()
    }

    async fn capture(&self) -> Option<Frame> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        match tokio::fs::read(&self.frames[index]).await {
            Ok(jpeg) => Some(Frame { jpeg }),
            Err(e) => {
                // Grabber may be mid-rewrite; skip this tick
                tracing::debug!(error = %e, "frame unavailable this tick");
                None
            }
        }
    }
}
