//! Clip playback through the default output device

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

use super::NarrationClip;

/// Sample rate of the service's MP3 output
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Completion poll interval while a clip is playing
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

/// Plays one narration clip to completion
///
/// The narrator calls [`play`](Self::play) for one clip at a time; `play`
/// resolves when the clip finished or failed. [`cancel`](Self::cancel) asks
/// the player to stop the clip currently playing, used on queue flush.
#[async_trait]
pub trait ClipPlayer: Send + Sync {
    /// Play a clip and wait until it has finished
    async fn play(&self, clip: &NarrationClip) -> Result<()>;

    /// Stop the in-flight clip, if any
    fn cancel(&self) {}
}

/// Plays MP3 narration clips on the default cpal output device
pub struct SpeakerPlayer {
    config: StreamConfig,
    cancelled: Arc<AtomicBool>,
}

impl SpeakerPlayer {
    /// Probe the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device or suitable config exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() <= 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "speaker player initialized"
        );

        Ok(Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait]
impl ClipPlayer for SpeakerPlayer {
    async fn play(&self, clip: &NarrationClip) -> Result<()> {
        let samples = decode_mp3(&clip.audio)?;
        if samples.is_empty() {
            return Ok(());
        }

        self.cancelled.store(false, Ordering::SeqCst);

        let config = self.config.clone();
        let cancelled = Arc::clone(&self.cancelled);

        // cpal streams are not Send, so the whole stream lifecycle stays on
        // one blocking thread
        tokio::task::spawn_blocking(move || play_samples(&config, samples, &cancelled))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Play decoded samples, polling for completion or cancellation
fn play_samples(
    config: &StreamConfig,
    samples: Vec<f32>,
    cancelled: &Arc<AtomicBool>,
) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = config.channels as usize;
    let sample_count = samples.len();

    let shared = Arc::new(Mutex::new((samples, 0usize)));
    let finished = Arc::new(AtomicBool::new(false));

    let shared_cb = Arc::clone(&shared);
    let finished_cb = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut guard) = shared_cb.lock() else {
                    return;
                };
                let (samples, pos) = &mut *guard;

                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples.len() {
                        let s = samples[*pos];
                        *pos += 1;
                        s
                    } else {
                        finished_cb.store(true, Ordering::SeqCst);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::SeqCst) && !cancelled.load(Ordering::SeqCst) {
        if std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    drop(stream);
    tracing::debug!(
        samples = sample_count,
        cancelled = cancelled.load(Ordering::SeqCst),
        "clip playback done"
    );

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|pair| {
                        let left = f32::from(pair[0]) / 32768.0;
                        let right = f32::from(pair.get(1).copied().unwrap_or(pair[0])) / 32768.0;
                        (left + right) / 2.0
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
