use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::DEFAULT_FRAME_INTERVAL_MS;
use crate::shared::face_box::FaceBox;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read trace {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse trace {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid trace: {0}")]
    Invalid(String),
}

/// Detector output recorded for one frame: either the faces found or the
/// error the detector raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub faces: Vec<FaceBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A recorded session of per-frame face detections, replayable through
/// the monitoring engine without a camera or a detection model.
///
/// ```json
/// {
///   "frame_width": 640,
///   "frame_height": 480,
///   "frame_interval_ms": 33,
///   "frames": [
///     { "timestamp_ms": 0, "faces": [{ "origin_x": 300, "origin_y": 220, "width": 40, "height": 40 }] },
///     { "timestamp_ms": 33, "error": "inference timeout" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTrace {
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    pub frames: Vec<TraceFrame>,
}

fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

impl RecordedTrace {
    pub fn load(path: &Path) -> Result<Self, TraceError> {
        let json = fs::read_to_string(path).map_err(|source| TraceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let trace: Self = serde_json::from_str(&json).map_err(|source| TraceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        trace.validate()?;
        Ok(trace)
    }

    /// Timestamps must never go backwards; the throttle relies on a monotonic clock.
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.frame_interval_ms == 0 {
            return Err(TraceError::Invalid("frame_interval_ms must be at least 1".into()));
        }
        for (i, pair) in self.frames.windows(2).enumerate() {
            if pair[1].timestamp_ms < pair[0].timestamp_ms {
                return Err(TraceError::Invalid(format!(
                    "timestamp of frame {} ({}ms) precedes frame {} ({}ms)",
                    i + 1,
                    pair[1].timestamp_ms,
                    i,
                    pair[0].timestamp_ms
                )));
            }
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
