use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::domain::throttle_gate::{ThrottleGate, ThrottleScope};
use crate::monitoring::domain::violation_classifier::ViolationClassifier;
use crate::shared::constants::{
    GAZE_MARGIN_RATIO, MOVEMENT_RATIO, NO_FACE_FRAME_THRESHOLD, SETTINGS_DIR_NAME,
    SETTINGS_FILE_NAME, VIOLATION_COOLDOWN_MS,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunable thresholds for the violation engine.
///
/// Every field has a default, so a settings file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub no_face_frame_threshold: u32,
    pub gaze_margin_ratio: f64,
    pub movement_ratio: f64,
    pub cooldown_ms: u64,
    pub throttle_scope: ThrottleScope,
    /// Overrides the frame source's own cadence when set.
    pub frame_interval_ms: Option<u64>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            no_face_frame_threshold: NO_FACE_FRAME_THRESHOLD,
            gaze_margin_ratio: GAZE_MARGIN_RATIO,
            movement_ratio: MOVEMENT_RATIO,
            cooldown_ms: VIOLATION_COOLDOWN_MS,
            throttle_scope: ThrottleScope::Global,
            frame_interval_ms: None,
        }
    }
}

impl MonitorSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Loads settings from the user config directory, falling back to
    /// defaults when the file is missing or unusable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings file: {e}");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.no_face_frame_threshold == 0 {
            return Err(SettingsError::Invalid {
                field: "no_face_frame_threshold",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..0.5).contains(&self.gaze_margin_ratio) {
            return Err(SettingsError::Invalid {
                field: "gaze_margin_ratio",
                reason: format!("must be in [0.0, 0.5), got {}", self.gaze_margin_ratio),
            });
        }
        if !self.movement_ratio.is_finite() || self.movement_ratio <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "movement_ratio",
                reason: format!("must be a positive number, got {}", self.movement_ratio),
            });
        }
        if self.frame_interval_ms == Some(0) {
            return Err(SettingsError::Invalid {
                field: "frame_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn classifier(&self) -> ViolationClassifier {
        ViolationClassifier::new(
            self.no_face_frame_threshold,
            self.gaze_margin_ratio,
            self.movement_ratio,
        )
    }

    pub fn throttle_gate(&self) -> ThrottleGate {
        ThrottleGate::new(self.cooldown_ms, self.throttle_scope)
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval_ms.map(Duration::from_millis)
    }
}
