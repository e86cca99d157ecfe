//! Detection/speech service boundary
//!
//! The external service owns visual recognition, rotation analysis, and
//! speech synthesis. This module defines the client-side contract: one
//! request/response pair per capture mode, plus narration synthesis and the
//! announcement bracket the service uses to suppress conflicting detections
//! while a feature is being named.

mod http;

use async_trait::async_trait;

pub use http::HttpDetectionClient;

use crate::audio::NarrationClip;
use crate::Result;

/// Axis-aligned box around a detection, in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Response to starting a rotation analysis session
#[derive(Debug, Clone)]
pub struct RotationStart {
    /// Opaque correlation token echoed back by the service
    pub correlation_id: String,

    /// Spoken rotation instructions, if synthesis succeeded
    pub instructions: Option<NarrationClip>,
}

/// One per-frame result while rotation analysis is running
#[derive(Debug, Clone)]
pub enum RotationFrameOutcome {
    /// Nothing usable in this frame; the analysis continues
    NoDetection,

    /// Analysis still collecting frames
    Pending {
        /// Fractional completion in `[0, 1]`, already normalized service-side
        progress: f32,
        /// Box around the object in this frame, when one was seen
        bounding_box: Option<BoundingBox>,
    },

    /// Analysis finished
    Complete {
        /// Recognized object label, or `None` when the session ended without
        /// a confident recognition
        object: Option<String>,
        /// Result narration (introduction or failure message)
        clip: Option<NarrationClip>,
        /// Final object box, when one was seen
        bounding_box: Option<BoundingBox>,
    },
}

/// One per-frame result while feature detection is running
#[derive(Debug, Clone, Default)]
pub struct FeatureFrameOutcome {
    /// Feature label under the learner's finger, if any
    pub feature: Option<String>,

    /// Human-readable feature name, when it differs from the label
    pub feature_name: Option<String>,

    /// Box around the touched feature
    pub bounding_box: Option<BoundingBox>,

    /// True while the service is suppressing detections for an announcement
    pub is_processing: bool,
}

/// Result of single-shot (non-rotation) object detection
#[derive(Debug, Clone)]
pub struct SingleDetection {
    /// Recognized object label
    pub object: String,

    /// Introduction narration for the object
    pub clip: Option<NarrationClip>,
}

/// Client contract with the detection/speech service
///
/// Transient "nothing detected this frame" responses are `Ok` outcomes, not
/// errors; an `Err` from a submit method is a protocol-level failure.
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Synthesize speech for arbitrary prompt text
    async fn narrate(&self, text: &str, language: &str) -> Result<NarrationClip>;

    /// Start a server-side rotation analysis session
    async fn begin_rotation_session(
        &self,
        session_token: &str,
        language: &str,
    ) -> Result<RotationStart>;

    /// Submit one frame of an active rotation session
    async fn submit_rotation_frame(
        &self,
        jpeg: &[u8],
        language: &str,
    ) -> Result<RotationFrameOutcome>;

    /// Single-shot fallback detection on one frame
    async fn detect_object_once(&self, jpeg: &[u8]) -> Result<SingleDetection>;

    /// Submit one frame while feature detection is active
    async fn submit_feature_frame(
        &self,
        jpeg: &[u8],
        language: &str,
    ) -> Result<FeatureFrameOutcome>;

    /// Tell the service a feature announcement is starting, so it suppresses
    /// conflicting detections until [`end_announcement`](Self::end_announcement)
    async fn begin_announcement(&self) -> Result<()>;

    /// Tell the service the announcement has ended
    async fn end_announcement(&self) -> Result<()>;

    /// Synthesize the announcement for a confirmed feature, or the
    /// "move to the next feature" prompt when `is_next_instruction` is set
    async fn narrate_feature(
        &self,
        feature: Option<&str>,
        is_next_instruction: bool,
        language: &str,
    ) -> Result<NarrationClip>;
}
