//! Configuration for the tutor client
//!
//! Loaded from a TOML file (default location under the platform config dir),
//! with every field defaulting to the values the detection service was tuned
//! against.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::{Error, Result};

/// Tutor client configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Detection/speech service endpoint
    pub service: ServiceConfig,

    /// Frame capture settings
    pub capture: CaptureConfig,

    /// Feature hold/cooldown settings
    pub hold: HoldConfig,
}

/// Detection service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Base URL of the detection/speech service
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Frame capture settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Spool directory an external grabber drops JPEG frames into
    pub frames_dir: PathBuf,

    /// Capture period while rotation detection is active (milliseconds)
    pub rotation_period_ms: u64,

    /// Capture period while feature detection is active (milliseconds)
    pub feature_period_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("frames"),
            rotation_period_ms: 200,
            feature_period_ms: 500,
        }
    }
}

/// Feature hold gate settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoldConfig {
    /// Continuous dwell required to confirm a touched feature (milliseconds)
    pub hold_threshold_ms: u64,

    /// Suppression window after an announcement (milliseconds, 0 = none)
    pub cooldown_ms: u64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            hold_threshold_ms: 2000,
            cooldown_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the default
    /// location if `path` is `None`. A missing default file yields the
    /// built-in defaults; a missing explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if a value
    /// fails validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Default config file location (`<config dir>/tutor.toml`)
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "tactile", "tutor")
            .map(|dirs| dirs.config_dir().join("tutor.toml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.service.base_url.is_empty() {
            return Err(Error::Config("service.base_url must not be empty".into()));
        }
        if self.capture.rotation_period_ms == 0 || self.capture.feature_period_ms == 0 {
            return Err(Error::Config("capture periods must be non-zero".into()));
        }
        if self.hold.hold_threshold_ms == 0 {
            return Err(Error::Config(
                "hold.hold_threshold_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Capture period for rotation detection
    #[must_use]
    pub const fn rotation_period(&self) -> Duration {
        Duration::from_millis(self.capture.rotation_period_ms)
    }

    /// Capture period for feature detection
    #[must_use]
    pub const fn feature_period(&self) -> Duration {
        Duration::from_millis(self.capture.feature_period_ms)
    }

    /// Dwell required to confirm a feature hold
    #[must_use]
    pub const fn hold_threshold(&self) -> Duration {
        Duration::from_millis(self.hold.hold_threshold_ms)
    }

    /// Suppression window after a feature announcement
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.hold.cooldown_ms)
    }
}
