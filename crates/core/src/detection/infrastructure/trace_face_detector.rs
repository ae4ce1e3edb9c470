use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::recorded_trace::RecordedTrace;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Replays recorded detection results by frame index.
///
/// Frames recorded with an error fail the same way on replay, so detector
/// outages in a session are reproduced exactly.
pub struct TraceFaceDetector {
    trace: Arc<RecordedTrace>,
}

impl TraceFaceDetector {
    pub fn new(trace: Arc<RecordedTrace>) -> Self {
        Self { trace }
    }
}

impl FaceDetector for TraceFaceDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        _timestamp_ms: u64,
    ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let Some(recorded) = self.trace.frames.get(frame.index()) else {
            return Ok(Vec::new());
        };
        match &recorded.error {
            Some(message) => Err(message.clone().into()),
            None => Ok(recorded.faces.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::recorded_trace::TraceFrame;

    fn frame(index: usize) -> Frame {
        Frame::without_pixels(640, 480, index, index as u64 * 33)
    }

    fn face(x: f64) -> FaceBox {
        FaceBox::new(x, 200.0, 40.0, 40.0)
    }

    fn detector(frames: Vec<TraceFrame>) -> TraceFaceDetector {
        TraceFaceDetector::new(Arc::new(RecordedTrace {
            frame_width: 640,
            frame_height: 480,
            frame_interval_ms: 33,
            frames,
        }))
    }

    fn recorded(faces: Vec<FaceBox>) -> TraceFrame {
        TraceFrame {
            timestamp_ms: 0,
            faces,
            error: None,
        }
    }

    #[test]
    fn test_returns_recorded_faces_for_frame() {
        let mut detector = detector(vec![
            recorded(vec![face(10.0)]),
            recorded(vec![face(20.0), face(300.0)]),
        ]);

        assert_eq!(detector.detect(&frame(0), 0).unwrap(), vec![face(10.0)]);
        assert_eq!(detector.detect(&frame(1), 33).unwrap().len(), 2);
    }

    #[test]
    fn test_recorded_error_is_replayed() {
        let mut detector = detector(vec![TraceFrame {
            timestamp_ms: 0,
            faces: Vec::new(),
            error: Some("gpu lost".into()),
        }]);

        let err = detector.detect(&frame(0), 0).unwrap_err();

        assert_eq!(err.to_string(), "gpu lost");
    }

    #[test]
    fn test_unknown_frame_has_no_faces() {
        let mut detector = detector(vec![recorded(vec![face(10.0)])]);

        assert!(detector.detect(&frame(9), 297).unwrap().is_empty());
    }
}
