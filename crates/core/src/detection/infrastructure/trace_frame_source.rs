use std::sync::Arc;
use std::time::Duration;

use crate::detection::domain::frame_source::FrameSource;
use crate::detection::infrastructure::recorded_trace::RecordedTrace;
use crate::shared::frame::Frame;

/// Replays a recorded trace as a stream of pixel-less frames carrying the
/// recorded geometry and timestamps. Always ready; exhausted after the
/// last recorded frame.
pub struct TraceFrameSource {
    trace: Arc<RecordedTrace>,
    next: usize,
}

impl TraceFrameSource {
    pub fn new(trace: Arc<RecordedTrace>) -> Self {
        Self { trace, next: 0 }
    }
}

impl FrameSource for TraceFrameSource {
    fn is_ready(&self) -> bool {
        true
    }

    fn current_frame(&mut self) -> Option<Frame> {
        let recorded = self.trace.frames.get(self.next)?;
        let frame = Frame::without_pixels(
            self.trace.frame_width,
            self.trace.frame_height,
            self.next,
            recorded.timestamp_ms,
        );
        self.next += 1;
        Some(frame)
    }

    fn frame_interval(&self) -> Duration {
        self.trace.frame_interval()
    }
}
