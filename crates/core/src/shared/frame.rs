/// A single video frame handed from a `FrameSource` to a `FaceDetector`.
///
/// Pixel data is opaque to the monitoring layer; only the dimensions and
/// the monotonic capture timestamp take part in violation decisions.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp_ms: u64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
        timestamp_ms: u64,
    ) -> Self {
        debug_assert!(
            data.is_empty()
                || data.len() == (width as usize) * (height as usize) * (channels as usize),
            "data length must be empty or equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp_ms,
        }
    }

    /// A frame that carries geometry and timing but no pixels.
    ///
    /// Used when detections are replayed from a recording.
    pub fn without_pixels(width: u32, height: u32, index: usize, timestamp_ms: u64) -> Self {
        Self::new(Vec::new(), width, height, 0, index, timestamp_ms)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}
