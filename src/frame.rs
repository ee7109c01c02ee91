//! Captured frames and the capture capability.
//!
//! A `Frame` is an owned, interleaved RGB8 buffer together with the absolute
//! screen position of its top-left pixel and the instant it was captured.
//! Frames with a zero dimension are representable; the engines treat them as
//! "nothing to scan".

use std::fmt;
use std::time::SystemTime;

use crate::image::GrayImage;
use crate::util::{DetectError, DetectResult};

/// Identifier of the window a caller wants scanned.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WindowId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Owned RGB8 frame with its on-screen origin.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: usize,
    height: usize,
    origin: (i32, i32),
    captured_at: SystemTime,
}

impl Frame {
    /// Creates a frame from a tightly packed RGB8 buffer.
    ///
    /// The origin defaults to `(0, 0)` and the timestamp to now.
    pub fn from_rgb(data: Vec<u8>, width: usize, height: usize) -> DetectResult<Self> {
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or(DetectError::InvalidInput("frame dimensions overflow"))?;
        if data.len() != needed {
            return Err(DetectError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            origin: (0, 0),
            captured_at: SystemTime::now(),
        })
    }

    /// Creates a frame from an RGBA8 or BGRA8 buffer, dropping alpha.
    pub fn from_rgba(data: &[u8], width: usize, height: usize, bgra: bool) -> DetectResult<Self> {
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(4))
            .ok_or(DetectError::InvalidInput("frame dimensions overflow"))?;
        if data.len() < needed {
            return Err(DetectError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        let mut rgb = Vec::with_capacity(width * height * 3);
        for px in data[..needed].chunks_exact(4) {
            if bgra {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            } else {
                rgb.extend_from_slice(&px[..3]);
            }
        }
        Self::from_rgb(rgb, width, height)
    }

    /// Sets the absolute screen position of the frame's top-left pixel.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    /// Overrides the capture timestamp.
    pub fn with_timestamp(mut self, captured_at: SystemTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Absolute screen position of pixel `(0, 0)`.
    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Interleaved RGB8 pixel data, row-major, no padding.
    pub fn as_rgb(&self) -> &[u8] {
        &self.data
    }

    /// Returns the RGB triple at `(x, y)`.
    #[inline]
    pub(crate) fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Converts to grayscale using integer BT.601 luma weights.
    pub fn to_gray(&self) -> DetectResult<GrayImage> {
        let mut gray = Vec::with_capacity(self.width * self.height);
        for px in self.data.chunks_exact(3) {
            let luma = 299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
            gray.push(((luma + 500) / 1000) as u8);
        }
        GrayImage::new(gray, self.width, self.height)
    }
}

/// Capability that captures the current contents of a window.
pub trait FrameSource: Send + Sync {
    /// Captures a frame of `window`.
    ///
    /// Returns `Ok(None)` when the window is invalid or currently unavailable,
    /// and `Err(DetectError::PlatformUnsupported)` when capture cannot work
    /// on this host at all.
    fn capture(&self, window: &WindowId, allow_obscured: bool) -> DetectResult<Option<Frame>>;
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use crate::util::DetectError;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Frame::from_rgb(vec![0u8; 5], 2, 1).unwrap_err();
        assert_eq!(err, DetectError::BufferTooSmall { needed: 6, got: 5 });
    }

    #[test]
    fn zero_sized_frame_is_empty() {
        let frame = Frame::from_rgb(Vec::new(), 0, 10).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn bgra_is_swizzled_to_rgb() {
        let frame = Frame::from_rgba(&[1, 2, 3, 255], 1, 1, true).unwrap();
        assert_eq!(frame.pixel(0, 0), [3, 2, 1]);
    }

    #[test]
    fn gray_conversion_uses_luma_weights() {
        let frame = Frame::from_rgb(vec![255, 255, 255, 0, 0, 0], 2, 1).unwrap();
        let gray = frame.to_gray().unwrap();
        assert_eq!(gray.view().row(0).unwrap(), &[255u8, 0u8]);
    }
}
