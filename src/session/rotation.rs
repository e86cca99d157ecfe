//! Rotation analysis progress tracking

use crate::audio::NarrationClip;
use crate::service::{BoundingBox, RotationFrameOutcome};

/// Frames the service collects before deciding on an object
const ROTATION_TOTAL_FRAMES: u32 = 200;

/// Tracks one rotation analysis session while it runs
///
/// Exists only while the session is in rotation mode; dropped on completion,
/// failure, or reset.
#[derive(Debug)]
pub struct RotationTracker {
    session_id: String,
    progress: f32,
    last_box: Option<BoundingBox>,
}

/// What one rotation frame result means for the session
#[derive(Debug)]
pub enum RotationUpdate {
    /// Nothing usable this frame; keep going
    NoDetection,
    /// Still collecting; progress stored
    Progress(f32),
    /// Terminal: object recognized
    Recognized {
        object: String,
        clip: Option<NarrationClip>,
    },
    /// Terminal: session ended without a recognized object
    Unrecognized { clip: Option<NarrationClip> },
}

impl RotationTracker {
    /// Start tracking the session identified by `session_id`
    #[must_use]
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            progress: 0.0,
            last_box: None,
        }
    }

    /// Apply one per-frame outcome from the service
    pub fn apply(&mut self, outcome: RotationFrameOutcome) -> RotationUpdate {
        match outcome {
            RotationFrameOutcome::NoDetection => RotationUpdate::NoDetection,
            RotationFrameOutcome::Pending {
                progress,
                bounding_box,
            } => {
                // Already normalized to [0, 1] service-side; stored verbatim
                self.progress = progress;
                if bounding_box.is_some() {
                    self.last_box = bounding_box;
                }
                RotationUpdate::Progress(progress)
            }
            RotationFrameOutcome::Complete {
                object,
                clip,
                bounding_box,
            } => {
                if bounding_box.is_some() {
                    self.last_box = bounding_box;
                }
                match object {
                    Some(object) => RotationUpdate::Recognized { object, clip },
                    None => RotationUpdate::Unrecognized { clip },
                }
            }
        }
    }

    /// Correlation token for this session
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Fractional completion in `[0, 1]`
    #[must_use]
    pub const fn progress(&self) -> f32 {
        self.progress
    }

    /// Box around the object in the most recent frame that had one
    #[must_use]
    pub const fn last_box(&self) -> Option<BoundingBox> {
        self.last_box
    }

    /// Approximate "frame N of total" status line
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn status_line(&self) -> String {
        let frame = (self.progress * ROTATION_TOTAL_FRAMES as f32).round() as u32;
        format!("Analyzing... frame {frame} of {ROTATION_TOTAL_FRAMES}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_frames_accumulate_progress() {
        let mut tracker = RotationTracker::new("abc".to_string());

        let update = tracker.apply(RotationFrameOutcome::Pending {
            progress: 0.25,
            bounding_box: None,
        });
        assert!(matches!(update, RotationUpdate::Progress(p) if (p - 0.25).abs() < f32::EPSILON));
        assert_eq!(tracker.status_line(), "Analyzing... frame 50 of 200");
    }

    #[test]
    fn no_detection_keeps_progress() {
        let mut tracker = RotationTracker::new("abc".to_string());
        tracker.apply(RotationFrameOutcome::Pending {
            progress: 0.5,
            bounding_box: None,
        });
        tracker.apply(RotationFrameOutcome::NoDetection);
        assert!((tracker.progress() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn complete_without_object_is_unrecognized() {
        let mut tracker = RotationTracker::new("abc".to_string());
        let update = tracker.apply(RotationFrameOutcome::Complete {
            object: None,
            clip: None,
            bounding_box: None,
        });
        assert!(matches!(update, RotationUpdate::Unrecognized { .. }));
    }
}
