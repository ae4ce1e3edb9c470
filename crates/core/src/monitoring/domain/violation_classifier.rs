use crate::monitoring::domain::tracker_state::TrackerState;
use crate::monitoring::domain::violation::{ViolationCandidate, ViolationCategory};
use crate::shared::constants::{GAZE_MARGIN_RATIO, MOVEMENT_RATIO, NO_FACE_FRAME_THRESHOLD};
use crate::shared::face_box::FaceBox;

const NO_FACE_DESCRIPTION: &str = "No face detected in frame";
const LOOKING_AWAY_DESCRIPTION: &str = "Candidate appears to be looking away from camera";
const MOVEMENT_DESCRIPTION: &str = "Rapid or suspicious movement detected";

/// Maps one frame's detections plus prior tracker state to violation
/// candidates and the next tracker state.
///
/// Exactly one branch applies per frame, chosen by face count:
/// - zero faces: counts toward the no-face streak;
/// - several faces: raises `MultipleFaces` immediately;
/// - one face: gaze and movement checks, which may both fire.
///
/// Pure: throttling and acceptance bookkeeping happen downstream.
#[derive(Debug, Clone)]
pub struct ViolationClassifier {
    no_face_frame_threshold: u32,
    gaze_margin_ratio: f64,
    movement_ratio: f64,
}

impl ViolationClassifier {
    pub fn new(no_face_frame_threshold: u32, gaze_margin_ratio: f64, movement_ratio: f64) -> Self {
        Self {
            no_face_frame_threshold: no_face_frame_threshold.max(1),
            gaze_margin_ratio,
            movement_ratio,
        }
    }

    pub fn classify(
        &self,
        faces: &[FaceBox],
        frame_width: u32,
        frame_height: u32,
        state: &TrackerState,
    ) -> (Vec<ViolationCandidate>, TrackerState) {
        let mut next = state.clone();
        let candidates = match faces {
            [] => self.classify_absent(&mut next),
            [face] => self.classify_single(face, frame_width, frame_height, &mut next),
            many => {
                next.no_face_streak = 0;
                vec![ViolationCandidate::new(
                    ViolationCategory::MultipleFaces,
                    format!("{} faces detected", many.len()),
                )]
            }
        };
        (candidates, next)
    }

    fn classify_absent(&self, state: &mut TrackerState) -> Vec<ViolationCandidate> {
        state.no_face_streak += 1;
        if state.no_face_streak < self.no_face_frame_threshold {
            return Vec::new();
        }
        state.no_face_streak = 0;
        vec![ViolationCandidate::new(
            ViolationCategory::NoFace,
            NO_FACE_DESCRIPTION,
        )]
    }

    fn classify_single(
        &self,
        face: &FaceBox,
        frame_width: u32,
        frame_height: u32,
        state: &mut TrackerState,
    ) -> Vec<ViolationCandidate> {
        state.no_face_streak = 0;

        if face.is_degenerate() || frame_width == 0 || frame_height == 0 {
            log::debug!("Skipping geometry checks for degenerate face box {face:?}");
            return Vec::new();
        }

        let width = frame_width as f64;
        let height = frame_height as f64;
        let centroid = face.centroid();
        let mut candidates = Vec::new();

        if self.outside_safe_zone(centroid.x, width) || self.outside_safe_zone(centroid.y, height) {
            candidates.push(ViolationCandidate::new(
                ViolationCategory::LookingAway,
                LOOKING_AWAY_DESCRIPTION,
            ));
        }

        if let Some(previous) = state.last_face_centroid {
            if centroid.distance_to(&previous) > self.movement_ratio * width {
                candidates.push(ViolationCandidate::new(
                    ViolationCategory::SuspiciousMovement,
                    MOVEMENT_DESCRIPTION,
                ));
            }
        }

        state.last_face_centroid = Some(centroid);
        candidates
    }

    /// Boundaries belong to the safe zone.
    fn outside_safe_zone(&self, value: f64, extent: f64) -> bool {
        value < self.gaze_margin_ratio * extent || value > (1.0 - self.gaze_margin_ratio) * extent
    }
}

impl Default for ViolationClassifier {
    fn default() -> Self {
        Self::new(NO_FACE_FRAME_THRESHOLD, GAZE_MARGIN_RATIO, MOVEMENT_RATIO)
    }
}
