//! Frame-source seam.
//!
//! Cameras stay external to this crate; the inspection pipeline only ever
//! sees decoded raster buffers. A source implementation owns its
//! acquisition resources for its own lifetime and releases them on drop;
//! acquisition state is never process-global.

use image::RgbImage;

/// Frame acquisition failure, surfaced unchanged to the caller.
#[derive(Debug)]
pub enum CaptureError {
    /// The sensor reported non-success.
    Sensor(String),
    /// The source cannot produce more frames (stream ended, device gone).
    Exhausted,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sensor(msg) => write!(f, "sensor error: {msg}"),
            Self::Exhausted => write!(f, "frame source exhausted"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// A session-scoped supplier of candidate frames.
pub trait FrameSource {
    /// Capture a single frame.
    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Capture `count` distinct frames in order. The default
    /// implementation captures one at a time; hardware-backed sources can
    /// override to clear stale buffers between captures.
    fn capture_burst(&mut self, count: usize) -> Result<Vec<RgbImage>, CaptureError> {
        (0..count).map(|_| self.capture_frame()).collect()
    }
}

/// A source replaying a fixed list of frames; the file-backed CLI path
/// and tests use this.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: Vec<RgbImage>,
    next: usize,
}

impl ReplaySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self { frames, next: 0 }
    }
}

impl FrameSource for ReplaySource {
    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let frame = self
            .frames
            .get(self.next)
            .cloned()
            .ok_or(CaptureError::Exhausted)?;
        self.next += 1;
        Ok(frame)
    }
}
