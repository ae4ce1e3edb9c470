use std::time::Duration;

use crate::shared::constants::DEFAULT_FRAME_INTERVAL_MS;
use crate::shared::frame::Frame;

/// Supplies frames to be analyzed, one per scheduling tick.
pub trait FrameSource: Send {
    /// False while the source is paused or still buffering.
    fn is_ready(&self) -> bool;

    /// Returns the frame to analyze now, or `None` once the source has
    /// no more frames to give.
    fn current_frame(&mut self) -> Option<Frame>;

    /// Cadence at which new frames become available.
    fn frame_interval(&self) -> Duration {
        Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS)
    }
}
