use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const REQUEST_QUEUE_CAPACITY: usize = 4;

#[derive(Error, Debug)]
pub enum DeadlineError {
    #[error("face detection exceeded {0:?} deadline")]
    Timeout(Duration),
    #[error("detector worker has stopped")]
    WorkerStopped,
    #[error("{0}")]
    Detector(String),
}

struct Request {
    id: u64,
    frame: Frame,
    timestamp_ms: u64,
}

struct Response {
    id: u64,
    result: Result<Vec<FaceBox>, String>,
}

/// Decorator that bounds how long a single detection may take.
///
/// The wrapped detector runs on its own worker thread. A call that does not
/// answer within the deadline fails with `DeadlineError::Timeout`; its late
/// answer is dropped when the next call collects its own.
pub struct DeadlineFaceDetector {
    requests: Sender<Request>,
    responses: Receiver<Response>,
    deadline: Duration,
    next_id: u64,
}

impl DeadlineFaceDetector {
    pub fn new(inner: Box<dyn FaceDetector>, deadline: Duration) -> std::io::Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::bounded::<Request>(REQUEST_QUEUE_CAPACITY);
        let (response_tx, response_rx) = crossbeam_channel::unbounded::<Response>();

        // Detached: joining would block on a detector that never returns.
        std::thread::Builder::new()
            .name("examguard-detector".into())
            .spawn(move || run_worker(inner, request_rx, response_tx))?;

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            deadline,
            next_id: 0,
        })
    }
}

fn run_worker(
    mut inner: Box<dyn FaceDetector>,
    requests: Receiver<Request>,
    responses: Sender<Response>,
) {
    for request in requests {
        let result = inner
            .detect(&request.frame, request.timestamp_ms)
            .map_err(|e| e.to_string());
        if responses
            .send(Response {
                id: request.id,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}

impl FaceDetector for DeadlineFaceDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        timestamp_ms: u64,
    ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let deadline_at = Instant::now() + self.deadline;
        let id = self.next_id;
        self.next_id += 1;

        let request = Request {
            id,
            frame: frame.clone(),
            timestamp_ms,
        };
        self.requests
            .send_deadline(request, deadline_at)
            .map_err(|e| match e {
                crossbeam_channel::SendTimeoutError::Timeout(_) => {
                    DeadlineError::Timeout(self.deadline)
                }
                crossbeam_channel::SendTimeoutError::Disconnected(_) => {
                    DeadlineError::WorkerStopped
                }
            })?;

        loop {
            match self.responses.recv_deadline(deadline_at) {
                Ok(response) if response.id == id => {
                    return response
                        .result
                        .map_err(|message| DeadlineError::Detector(message).into());
                }
                Ok(stale) => {
                    log::debug!("Dropping late detection result for request {}", stale.id);
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("Face detection exceeded {:?} deadline", self.deadline);
                    return Err(DeadlineError::Timeout(self.deadline).into());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DeadlineError::WorkerStopped.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Sleeps for the scripted delay, then reports `n` faces where `n` is
    /// the call number (1-based).
    struct SlowDetector {
        delays: VecDeque<Duration>,
        calls: usize,
    }

    impl SlowDetector {
        fn new(delays_ms: &[u64]) -> Self {
            Self {
                delays: delays_ms.iter().map(|&ms| Duration::from_millis(ms)).collect(),
                calls: 0,
            }
        }
    }

    impl FaceDetector for SlowDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _timestamp_ms: u64,
        ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            self.calls += 1;
            if let Some(delay) = self.delays.pop_front() {
                std::thread::sleep(delay);
            }
            Ok(vec![FaceBox::new(0.0, 0.0, 10.0, 10.0); self.calls])
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _timestamp_ms: u64,
        ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            Err("model not loaded".into())
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::without_pixels(640, 480, index, index as u64 * 33)
    }

    #[test]
    fn test_fast_detector_passes_through() {
        let mut detector =
            DeadlineFaceDetector::new(Box::new(SlowDetector::new(&[])), Duration::from_secs(5))
                .unwrap();

        assert_eq!(detector.detect(&frame(0), 0).unwrap().len(), 1);
        assert_eq!(detector.detect(&frame(1), 33).unwrap().len(), 2);
    }

    #[test]
    fn test_slow_call_times_out() {
        let mut detector = DeadlineFaceDetector::new(
            Box::new(SlowDetector::new(&[300])),
            Duration::from_millis(30),
        )
        .unwrap();

        let err = detector.detect(&frame(0), 0).unwrap_err();

        assert!(err.to_string().contains("deadline"));
    }

    #[test]
    fn test_late_result_is_not_returned_to_next_call() {
        let mut detector = DeadlineFaceDetector::new(
            Box::new(SlowDetector::new(&[150])),
            Duration::from_millis(30),
        )
        .unwrap();

        assert!(detector.detect(&frame(0), 0).is_err());
        std::thread::sleep(Duration::from_millis(300));

        let faces = detector.detect(&frame(1), 33).unwrap();
        assert_eq!(faces.len(), 2);
    }

    #[test]
    fn test_inner_error_message_is_preserved() {
        let mut detector =
            DeadlineFaceDetector::new(Box::new(FailingDetector), Duration::from_secs(5)).unwrap();

        let err = detector.detect(&frame(0), 0).unwrap_err();

        assert_eq!(err.to_string(), "model not loaded");
    }
}
