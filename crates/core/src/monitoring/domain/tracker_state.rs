use std::collections::BTreeMap;

use crate::monitoring::domain::violation::ViolationCategory;
use crate::shared::face_box::Centroid;

/// Temporal state carried between frames by the detection loop.
///
/// `no_face_streak` returns to 0 on any frame with at least one face.
/// `last_face_centroid` changes only on single-face frames and survives
/// no-face frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub no_face_streak: u32,
    pub last_face_centroid: Option<Centroid>,
    /// Time of the most recently emitted violation, any category.
    pub last_accepted_violation_at: Option<u64>,
    /// Per-category acceptance times, consulted only by a per-category throttle.
    pub last_accepted_by_category: BTreeMap<ViolationCategory, u64>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }
}
