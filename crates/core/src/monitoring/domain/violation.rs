use serde::{Deserialize, Serialize};

/// Kind of integrity concern raised from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    NoFace,
    MultipleFaces,
    LookingAway,
    SuspiciousMovement,
}

impl ViolationCategory {
    pub const ALL: &[ViolationCategory] = &[
        ViolationCategory::NoFace,
        ViolationCategory::MultipleFaces,
        ViolationCategory::LookingAway,
        ViolationCategory::SuspiciousMovement,
    ];
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationCategory::NoFace => write!(f, "No face"),
            ViolationCategory::MultipleFaces => write!(f, "Multiple faces"),
            ViolationCategory::LookingAway => write!(f, "Looking away"),
            ViolationCategory::SuspiciousMovement => write!(f, "Suspicious movement"),
        }
    }
}

/// A classifier decision that has not yet passed the throttle.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationCandidate {
    pub category: ViolationCategory,
    pub description: String,
}

impl ViolationCandidate {
    pub fn new(category: ViolationCategory, description: impl Into<String>) -> Self {
        Self {
            category,
            description: description.into(),
        }
    }

    /// Stamps the candidate with the frame time it was accepted at.
    pub fn into_violation(self, timestamp_ms: u64) -> Violation {
        Violation {
            category: self.category,
            timestamp_ms,
            description: self.description,
        }
    }
}

/// An accepted violation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub category: ViolationCategory,
    pub timestamp_ms: u64,
    pub description: String,
}
