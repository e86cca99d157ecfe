//! Tactile Tutor - camera-driven shape teaching client
//!
//! This library drives an interactive teaching session for physical 3D
//! shapes: the learner rotates a shape in front of a camera until the
//! detection service recognizes it, then touches its features (faces, edges,
//! vertices) while the client names each touched feature aloud.
//!
//! Recognition, rotation analysis, and speech synthesis live in an external
//! HTTP service; this crate owns the session orchestration:
//! - [`session::SessionController`] - the top-level mode state machine
//! - [`session::CaptureScheduler`] - periodic frame capture while a mode runs
//! - [`session::HoldGate`] - touch dwell confirmation with cooldown
//! - [`session::RotationTracker`] - rotation analysis progress and outcomes
//! - [`audio::Narrator`] - strictly sequential narration playback
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  keyboard (E/S/F/T/Q)     capture ticks       │
//! └──────────────┬───────────────────┬────────────┘
//!                │ commands          │ frame results
//! ┌──────────────▼───────────────────▼────────────┐
//! │             SessionController                 │
//! │  mode state │ hold gate │ rotation tracker    │
//! └───────┬───────────────────────────┬───────────┘
//!         │ clips                     │ HTTP
//! ┌───────▼────────┐      ┌───────────▼───────────┐
//! │    Narrator    │      │   Detection service    │
//! │  (FIFO audio)  │      │  (YOLO models + TTS)   │
//! └────────────────┘      └───────────────────────┘
//! ```

pub mod audio;
pub mod camera;
pub mod config;
pub mod error;
pub mod service;
pub mod session;

pub use audio::{ClipPlayer, NarrationClip, Narrator, SpeakerPlayer};
pub use camera::{DirectoryFrameSource, Frame, FrameSource};
pub use config::Config;
pub use error::{Error, Result};
pub use service::{
    BoundingBox, DetectionService, FeatureFrameOutcome, HttpDetectionClient, RotationFrameOutcome,
    RotationStart, SingleDetection,
};
pub use session::{
    CaptureOutcome, CaptureScheduler, HoldGate, Language, Mode, RotationTracker, RotationUpdate,
    Session, SessionCommand, SessionController, SessionEvent,
};
