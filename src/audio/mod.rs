//! Narration audio
//!
//! The service hands back MP3 clips; this module owns decoding, playback,
//! and the sequencer that guarantees clips never overlap.

mod narrator;
mod playback;

pub use narrator::Narrator;
pub use playback::{ClipPlayer, SpeakerPlayer};

/// One unit of synthesized speech queued for sequential playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationClip {
    /// MP3 bytes as returned by the speech service
    pub audio: Vec<u8>,
}

impl NarrationClip {
    /// Wrap raw MP3 bytes
    #[must_use]
    pub fn new(audio: Vec<u8>) -> Self {
        Self { audio }
    }
}
