//! Session mode state machine
//!
//! All session state is mutated here and only here, by one task draining an
//! event channel. Commands, capture results, and narration-completion
//! notifications are all events; ordering between them is whatever order
//! they entered the channel, never incidental interleaving.
//!
//! Capture results and instruction-done notifications carry the generation
//! they were issued under. Every transition bumps the generation, so a
//! response that was in flight when its mode ended is recognized as stale
//! and discarded instead of being applied.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::audio::Narrator;
use crate::camera::FrameSource;
use crate::config::Config;
use crate::service::{DetectionService, FeatureFrameOutcome, RotationFrameOutcome};

use super::{
    CaptureOutcome, CaptureScheduler, HoldGate, Language, Mode, RotationTracker, RotationUpdate,
    Session, SessionCommand,
};

/// Spoken once at startup and again after language selection
const START_PROMPT: &str = "Press F to start object detection";

/// Spoken after a successful detection, before feature mode
const FEATURE_PROMPT: &str = "Press T to start feature detection";

/// Touch guidelines spoken after the feature prompt
const GUIDELINE_PROMPT: &str = "Before we begin, please wear a glove on the hand that holds the \
     shape. Only use the index finger of your bare hand to touch the object's features. This \
     helps the system recognize your touch correctly.";

/// Spoken when feature detection starts
const FEATURE_START_PROMPT: &str =
    "Feature detection started. Touch a feature and hold your finger on it.";

/// Events drained by the controller task
#[derive(Debug)]
pub enum SessionEvent {
    /// A user command (keyboard E/S/F/T/Q)
    Command(SessionCommand),
    /// The rotation instruction clip finished playing
    InstructionsDone { generation: u64 },
    /// One capture-and-submit step completed
    Capture {
        generation: u64,
        outcome: CaptureOutcome,
    },
}

/// The top-level session controller
pub struct SessionController<S, F> {
    service: Arc<S>,
    frames: Arc<F>,
    narrator: Narrator,
    events: mpsc::UnboundedSender<SessionEvent>,

    session: Session,
    tracker: Option<RotationTracker>,
    gate: Option<HoldGate>,
    scheduler: CaptureScheduler,
    generation: u64,

    rotation_period: Duration,
    feature_period: Duration,
    hold_threshold: Duration,
    cooldown: Duration,
}

impl<S, F> SessionController<S, F>
where
    S: DetectionService + 'static,
    F: FrameSource + 'static,
{
    /// Create a controller in the initial idle state
    ///
    /// `events` must be the sender side of the channel whose receiver is
    /// passed to [`run`](Self::run); the controller sends itself capture
    /// results and narration notifications through it.
    #[must_use]
    pub fn new(
        service: Arc<S>,
        frames: Arc<F>,
        narrator: Narrator,
        config: &Config,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            service,
            frames,
            narrator,
            events,
            session: Session::new(),
            tracker: None,
            gate: None,
            scheduler: CaptureScheduler::new(),
            generation: 0,
            rotation_period: config.rotation_period(),
            feature_period: config.feature_period(),
            hold_threshold: config.hold_threshold(),
            cooldown: config.cooldown(),
        }
    }

    /// Current session state
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Rotation progress, when rotation detection is active
    #[must_use]
    pub fn rotation_progress(&self) -> Option<f32> {
        self.tracker.as_ref().map(RotationTracker::progress)
    }

    /// Current activity generation; events tagged with an older generation
    /// are stale and will be discarded
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Narrate the startup instruction once at launch
    pub async fn announce_startup(&self) {
        match self.service.narrate(START_PROMPT, "en").await {
            Ok(clip) => {
                let _ = self.narrator.enqueue(clip);
            }
            Err(e) => tracing::warn!(error = %e, "startup narration failed"),
        }
    }

    /// Drain events until the channel closes
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("session controller stopped");
    }

    /// Process one event
    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Command(command) => self.handle_command(command).await,
            SessionEvent::InstructionsDone { generation } => {
                if generation == self.generation && self.session.mode == Mode::RotationDetecting {
                    self.arm_rotation();
                } else {
                    tracing::debug!(generation, "stale instruction notification, ignoring");
                }
            }
            SessionEvent::Capture {
                generation,
                outcome,
            } => {
                if generation == self.generation {
                    self.handle_capture(outcome).await;
                } else {
                    tracing::trace!(generation, "stale capture result, discarding");
                }
            }
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectLanguage(language) => self.select_language(language).await,
            SessionCommand::StartDetection => self.start_detection().await,
            SessionCommand::StartFeatures => self.start_features().await,
            SessionCommand::Reset => self.reset(),
        }
    }

    async fn select_language(&mut self, language: Language) {
        if self.session.mode != Mode::Idle {
            tracing::debug!(?language, "language change ignored outside idle");
            return;
        }
        let Some(code) = language.code() else {
            return;
        };

        self.session.language = language;
        self.session.status = format!("Language selected. {START_PROMPT}.");
        tracing::info!(language = code, "language selected");

        match self.service.narrate(START_PROMPT, code).await {
            Ok(clip) => {
                let _ = self.narrator.enqueue(clip);
            }
            Err(e) => tracing::warn!(error = %e, "language confirmation narration failed"),
        }
    }

    async fn start_detection(&mut self) {
        if self.session.mode != Mode::Idle {
            tracing::debug!(mode = ?self.session.mode, "start-detection ignored");
            return;
        }
        let Some(language) = self.session.language.code() else {
            self.session.status = "Select a language first (E or S)".to_string();
            return;
        };
        if !self.frames.is_ready() {
            self.session.status = "Camera is not ready".to_string();
            tracing::error!("cannot start detection without an active capture device");
            return;
        }

        let token = uuid::Uuid::new_v4().to_string();
        match self.service.begin_rotation_session(&token, language).await {
            Ok(start) => {
                self.generation += 1;
                self.session.mode = Mode::RotationDetecting;
                self.session.status =
                    "Hold and slowly rotate the object for analysis".to_string();
                self.tracker = Some(RotationTracker::new(start.correlation_id));
                tracing::info!(token, "rotation detection started");

                // Instructions play to completion before capture starts
                if let Some(clip) = start.instructions {
                    let done = self.narrator.enqueue(clip);
                    let events = self.events.clone();
                    let generation = self.generation;
                    tokio::spawn(async move {
                        // A flushed clip drops the sender; never arm then
                        if done.await.is_ok() {
                            let _ = events.send(SessionEvent::InstructionsDone { generation });
                        }
                    });
                } else {
                    self.arm_rotation();
                }
            }
            Err(e) => {
                self.session.status = format!("Could not start detection: {e}");
                tracing::error!(error = %e, "rotation session rejected");
            }
        }
    }

    fn arm_rotation(&mut self) {
        let service = Arc::clone(&self.service);
        let frames = Arc::clone(&self.frames);
        let events = self.events.clone();
        let generation = self.generation;
        let language = self.language_code().to_string();

        self.scheduler.arm(self.rotation_period, move || {
            let service = Arc::clone(&service);
            let frames = Arc::clone(&frames);
            let events = events.clone();
            let language = language.clone();
            async move {
                let Some(frame) = frames.capture().await else {
                    return;
                };
                let outcome = match service.submit_rotation_frame(&frame.jpeg, &language).await {
                    Ok(outcome) => CaptureOutcome::Rotation(outcome),
                    Err(e) => CaptureOutcome::RotationError(e.to_string()),
                };
                let _ = events.send(SessionEvent::Capture {
                    generation,
                    outcome,
                });
            }
        });
        tracing::debug!(period_ms = self.rotation_period.as_millis() as u64, "rotation capture armed");
    }

    async fn start_features(&mut self) {
        if self.session.mode != Mode::Idle {
            tracing::debug!(mode = ?self.session.mode, "start-features ignored");
            return;
        }
        if !self.session.features_unlocked {
            // Guard failure leaves all state untouched
            self.session.status = "Please detect an object first".to_string();
            tracing::info!("feature detection refused: no object detected yet");
            return;
        }
        let Some(language) = self.session.language.code() else {
            self.session.status = "Select a language first (E or S)".to_string();
            return;
        };

        self.generation += 1;
        self.session.mode = Mode::FeatureDetecting;
        self.session.status = "Touch a feature and hold your finger on it".to_string();
        self.gate = Some(HoldGate::new(self.hold_threshold, self.cooldown));
        self.arm_features();
        tracing::info!("feature detection started");

        match self.service.narrate(FEATURE_START_PROMPT, language).await {
            Ok(clip) => {
                let _ = self.narrator.enqueue(clip);
            }
            Err(e) => tracing::warn!(error = %e, "feature start narration failed"),
        }
    }

    fn arm_features(&mut self) {
        let service = Arc::clone(&self.service);
        let frames = Arc::clone(&self.frames);
        let events = self.events.clone();
        let generation = self.generation;
        let language = self.language_code().to_string();

        self.scheduler.arm(self.feature_period, move || {
            let service = Arc::clone(&service);
            let frames = Arc::clone(&frames);
            let events = events.clone();
            let language = language.clone();
            async move {
                let Some(frame) = frames.capture().await else {
                    return;
                };
                // A failed submission is "nothing observed this tick"
                let outcome = service
                    .submit_feature_frame(&frame.jpeg, &language)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!(error = %e, "feature frame failed, treating as no observation");
                        FeatureFrameOutcome::default()
                    });
                let _ = events.send(SessionEvent::Capture {
                    generation,
                    outcome: CaptureOutcome::Feature(outcome),
                });
            }
        });
        tracing::debug!(period_ms = self.feature_period.as_millis() as u64, "feature capture armed");
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.scheduler.disarm();
        self.tracker = None;
        self.gate = None;
        self.session = Session::new();
        // Stale audio queued across a reset is a defect; drop it all
        self.narrator.flush();
        tracing::info!("session reset");
    }

    async fn handle_capture(&mut self, outcome: CaptureOutcome) {
        match outcome {
            CaptureOutcome::Rotation(frame) => self.handle_rotation_frame(frame).await,
            CaptureOutcome::RotationError(message) => {
                if self.session.mode != Mode::RotationDetecting {
                    return;
                }
                // Protocol-level failure aborts the mode
                self.generation += 1;
                self.scheduler.disarm();
                self.tracker = None;
                self.session.mode = Mode::Idle;
                self.session.status = format!("Detection failed: {message}");
                tracing::error!(error = %message, "rotation session aborted");
            }
            CaptureOutcome::Feature(frame) => self.handle_feature_frame(frame).await,
        }
    }

    async fn handle_rotation_frame(&mut self, frame: RotationFrameOutcome) {
        if self.session.mode != Mode::RotationDetecting {
            return;
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };

        match tracker.apply(frame) {
            RotationUpdate::NoDetection => {}
            RotationUpdate::Progress(progress) => {
                self.session.status = tracker.status_line();
                tracing::debug!(progress, "rotation analysis progressing");
            }
            RotationUpdate::Recognized { object, clip } => {
                self.generation += 1;
                self.scheduler.disarm();
                self.tracker = None;
                self.session.mode = Mode::Idle;
                self.session.detected_object = Some(object.clone());
                self.session.features_unlocked = true;
                self.session.status = format!(
                    "Detected: {}. {FEATURE_PROMPT}.",
                    object.replace('_', " ")
                );
                tracing::info!(object, "object recognized");

                if let Some(clip) = clip {
                    let _ = self.narrator.enqueue(clip);
                }
                let language = self.language_code();
                for prompt in [FEATURE_PROMPT, GUIDELINE_PROMPT] {
                    match self.service.narrate(prompt, language).await {
                        Ok(clip) => {
                            let _ = self.narrator.enqueue(clip);
                        }
                        Err(e) => tracing::warn!(error = %e, "follow-up narration failed"),
                    }
                }
            }
            RotationUpdate::Unrecognized { clip } => {
                self.generation += 1;
                self.scheduler.disarm();
                self.tracker = None;
                self.session.mode = Mode::Idle;
                self.session.status = "Detection failed. Please try again.".to_string();
                tracing::info!("rotation analysis ended without a recognized object");

                if let Some(clip) = clip {
                    let _ = self.narrator.enqueue(clip);
                }
            }
        }
    }

    async fn handle_feature_frame(&mut self, frame: FeatureFrameOutcome) {
        if self.session.mode != Mode::FeatureDetecting {
            return;
        }
        let Some(gate) = self.gate.as_mut() else {
            return;
        };

        // Ticks captured while the service suppresses detections for an
        // announcement carry no real observation; they must not disturb
        // the dwell or cooldown state
        if frame.is_processing {
            return;
        }

        let confirmed = gate.observe(frame.feature.as_deref(), Instant::now());
        if let Some(feature) = confirmed {
            let display = frame
                .feature_name
                .unwrap_or_else(|| feature.replace('_', " "));
            tracing::info!(feature, "feature hold confirmed");
            self.announce_feature(&feature, &display).await;
        }
    }

    /// Run the announcement bracket for a confirmed feature
    ///
    /// The end notification is sent on every path, including when synthesis
    /// of either clip failed.
    async fn announce_feature(&mut self, feature: &str, display: &str) {
        if let Err(e) = self.service.begin_announcement().await {
            tracing::warn!(error = %e, "announcement start notification failed");
        }

        let result = self.enqueue_feature_clips(feature).await;

        if let Err(e) = self.service.end_announcement().await {
            tracing::warn!(error = %e, "announcement end notification failed");
        }
        if let Err(e) = result {
            tracing::warn!(error = %e, feature, "feature narration failed");
        }

        self.session.status = format!("You touched the {display}");
    }

    async fn enqueue_feature_clips(&self, feature: &str) -> crate::Result<()> {
        let language = self.language_code();
        let name_clip = self
            .service
            .narrate_feature(Some(feature), false, language)
            .await?;
        let _ = self.narrator.enqueue(name_clip);

        let next_clip = self.service.narrate_feature(None, true, language).await?;
        let _ = self.narrator.enqueue(next_clip);
        Ok(())
    }

    fn language_code(&self) -> &'static str {
        self.session.language.code().unwrap_or("en")
    }
}
