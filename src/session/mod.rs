//! Session orchestration core
//!
//! One explicit mode enum plus two mode-scoped sub-components
//! ([`RotationTracker`], [`HoldGate`]) owned by the [`SessionController`],
//! which is the only mutator of session state.

mod controller;
mod hold;
mod rotation;
mod scheduler;

pub use controller::{SessionController, SessionEvent};
pub use hold::HoldGate;
pub use rotation::{RotationTracker, RotationUpdate};
pub use scheduler::CaptureScheduler;

use crate::service::{FeatureFrameOutcome, RotationFrameOutcome};

/// The single active top-level activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Waiting for a command
    #[default]
    Idle,
    /// Rotation analysis in progress
    RotationDetecting,
    /// Feature touch detection in progress
    FeatureDetecting,
}

/// Narration language for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// No language chosen yet; detection commands are gated until one is
    #[default]
    Unselected,
    English,
    Sinhala,
}

impl Language {
    /// Language code sent to the speech service
    #[must_use]
    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::Unselected => None,
            Self::English => Some("en"),
            Self::Sinhala => Some("si"),
        }
    }
}

/// Process-wide session state for one user interaction
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Active mode
    pub mode: Mode,

    /// Selected narration language
    pub language: Language,

    /// Object recognized by the last successful rotation analysis
    pub detected_object: Option<String>,

    /// Whether feature detection may be started
    pub features_unlocked: bool,

    /// One-line user-facing status
    pub status: String,
}

impl Session {
    /// Fresh session in its initial state
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: "Press E or S to select a language".to_string(),
            ..Self::default()
        }
    }
}

/// User commands into the state machine (keyboard E/S/F/T/Q)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Choose the narration language (E / S)
    SelectLanguage(Language),
    /// Start rotation-based object detection (F)
    StartDetection,
    /// Start feature detection (T), guarded on a detected object
    StartFeatures,
    /// Reset everything back to idle (Q)
    Reset,
}

/// Result of one capture-and-submit step
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// Rotation frame answered by the service
    Rotation(RotationFrameOutcome),
    /// Rotation frame submission failed at the protocol level
    RotationError(String),
    /// Feature frame result; submission errors arrive as the default
    /// "nothing observed" outcome
    Feature(FeatureFrameOutcome),
}
