use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns every face found in `frame`, in detector order. Implementations
/// may be stateful (e.g., video-mode models that track across frames),
/// hence `&mut self`. Failures are reported per call; callers decide
/// whether a failed frame is fatal.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        timestamp_ms: u64,
    ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
