/// Consecutive zero-face frames that raise a no-face violation (~1 second at 30 fps).
pub const NO_FACE_FRAME_THRESHOLD: u32 = 30;

/// Fraction of each frame axis on either side that counts as "looking away".
/// 0.2 leaves the central 60% as the safe zone.
pub const GAZE_MARGIN_RATIO: f64 = 0.2;

/// Centroid shift between consecutive single-face frames, as a fraction of
/// frame width, above which movement is flagged.
pub const MOVEMENT_RATIO: f64 = 0.3;

/// Minimum time between two accepted violations.
pub const VIOLATION_COOLDOWN_MS: u64 = 5000;

/// Default source cadence (~30 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

pub const SETTINGS_DIR_NAME: &str = "ExamGuard";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
