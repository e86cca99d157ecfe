//! HTTP implementation of the detection service contract

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::audio::NarrationClip;
use crate::{Error, Result};

use super::{
    BoundingBox, DetectionService, FeatureFrameOutcome, RotationFrameOutcome, RotationStart,
    SingleDetection,
};

/// Talks to the detection/speech service over HTTP
///
/// Frame submissions are multipart uploads; audio payloads come back as
/// base64-encoded MP3 inside JSON. The service answers HTTP 400 on frames it
/// could not use, which is "no detection this frame", not an error.
pub struct HttpDetectionClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SpeakResponse {
    audio: Option<String>,
}

#[derive(Deserialize)]
struct StartRotationResponse {
    session_id: String,
    audio: Option<String>,
}

#[derive(Deserialize)]
struct RotationFrameResponse {
    #[serde(default)]
    detection_complete: bool,
    #[serde(default)]
    progress: Option<f32>,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    bounding_box: Option<BoundingBox>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct DetectOnceResponse {
    object: String,
    audio: Option<String>,
}

#[derive(Deserialize)]
struct FeatureFrameResponse {
    #[serde(default)]
    feature: Option<String>,
    #[serde(default)]
    feature_name: Option<String>,
    #[serde(default)]
    bounding_box: Option<BoundingBox>,
    #[serde(default)]
    is_processing: bool,
}

#[derive(Deserialize)]
struct FeatureSpeechResponse {
    audio: Option<String>,
}

impl HttpDetectionClient {
    /// Create a client for the service at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Build the multipart form for one captured frame
    fn frame_form(jpeg: &[u8], language: &str) -> multipart::Form {
        let part = multipart::Part::bytes(jpeg.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .unwrap_or_else(|_| multipart::Part::bytes(jpeg.to_vec()).file_name("frame.jpg"));

        multipart::Form::new()
            .part("file", part)
            .text("language", language.to_string())
    }

    fn decode_clip(audio: Option<String>) -> Option<NarrationClip> {
        let encoded = audio?;
        if encoded.is_empty() {
            return None;
        }
        match BASE64.decode(encoded.as_bytes()) {
            Ok(bytes) => Some(NarrationClip::new(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable audio payload, dropping clip");
                None
            }
        }
    }

    async fn check<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Detection(format!("{what} failed {status}: {body}")));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl DetectionService for HttpDetectionClient {
    async fn narrate(&self, text: &str, language: &str) -> Result<NarrationClip> {
        let response = self
            .client
            .post(self.url("speak/"))
            .json(&serde_json::json!({ "text": text, "language": language }))
            .send()
            .await?;

        let speak: SpeakResponse = Self::check(response, "narration").await?;
        Self::decode_clip(speak.audio)
            .ok_or_else(|| Error::Narration("service returned no audio".to_string()))
    }

    async fn begin_rotation_session(
        &self,
        session_token: &str,
        language: &str,
    ) -> Result<RotationStart> {
        let response = self
            .client
            .post(self.url("start-rotation-detection/"))
            .json(&serde_json::json!({ "session_id": session_token, "language": language }))
            .send()
            .await?;

        let start: StartRotationResponse = Self::check(response, "rotation start").await?;
        tracing::debug!(correlation_id = %start.session_id, "rotation session started");

        Ok(RotationStart {
            correlation_id: start.session_id,
            instructions: Self::decode_clip(start.audio),
        })
    }

    async fn submit_rotation_frame(
        &self,
        jpeg: &[u8],
        language: &str,
    ) -> Result<RotationFrameOutcome> {
        let response = self
            .client
            .post(self.url("detect-object-rotation/"))
            .multipart(Self::frame_form(jpeg, language))
            .send()
            .await?;

        // 400 means the service could not use this frame, not a failure
        if response.status() == StatusCode::BAD_REQUEST {
            return Ok(RotationFrameOutcome::NoDetection);
        }

        let frame: RotationFrameResponse = Self::check(response, "rotation frame").await?;

        // Terminal failure responses carry an error field instead of a
        // recognized object
        if frame.detection_complete || frame.error.is_some() {
            let terminal_object = if frame.error.is_some() {
                None
            } else {
                frame.object
            };
            return Ok(RotationFrameOutcome::Complete {
                object: terminal_object,
                clip: Self::decode_clip(frame.audio),
                bounding_box: frame.bounding_box,
            });
        }

        Ok(RotationFrameOutcome::Pending {
            progress: frame.progress.unwrap_or(0.0),
            bounding_box: frame.bounding_box,
        })
    }

    async fn detect_object_once(&self, jpeg: &[u8]) -> Result<SingleDetection> {
        let response = self
            .client
            .post(self.url("detect-object/"))
            .multipart(Self::frame_form(jpeg, "en"))
            .send()
            .await?;

        let detection: DetectOnceResponse = Self::check(response, "object detection").await?;

        Ok(SingleDetection {
            object: detection.object,
            clip: Self::decode_clip(detection.audio),
        })
    }

    async fn submit_feature_frame(
        &self,
        jpeg: &[u8],
        language: &str,
    ) -> Result<FeatureFrameOutcome> {
        let response = self
            .client
            .post(self.url("detect-feature/"))
            .multipart(Self::frame_form(jpeg, language))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Ok(FeatureFrameOutcome::default());
        }

        let frame: FeatureFrameResponse = Self::check(response, "feature frame").await?;

        Ok(FeatureFrameOutcome {
            feature: frame.feature,
            feature_name: frame.feature_name,
            bounding_box: frame.bounding_box,
            is_processing: frame.is_processing,
        })
    }

    async fn begin_announcement(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("start-feature-announcement/"))
            .send()
            .await?;
        Self::check::<serde_json::Value>(response, "announcement start").await?;
        Ok(())
    }

    async fn end_announcement(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("end-feature-announcement/"))
            .send()
            .await?;
        Self::check::<serde_json::Value>(response, "announcement end").await?;
        Ok(())
    }

    async fn narrate_feature(
        &self,
        feature: Option<&str>,
        is_next_instruction: bool,
        language: &str,
    ) -> Result<NarrationClip> {
        let response = self
            .client
            .post(self.url("speak-feature/"))
            .json(&serde_json::json!({
                "feature": feature.unwrap_or(""),
                "is_next_instruction": is_next_instruction,
                "language": language,
            }))
            .send()
            .await?;

        let speech: FeatureSpeechResponse = Self::check(response, "feature narration").await?;
        Self::decode_clip(speech.audio)
            .ok_or_else(|| Error::Narration("service returned no audio".to_string()))
    }
}
