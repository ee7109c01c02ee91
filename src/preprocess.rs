//! Letterbox preprocessing into a square, channel-first model input.
//!
//! The frame is scaled uniformly by `min(S / W, S / H)`, drawn centered on a
//! black `S x S` canvas, and normalized to `[0, 1]`. The returned `Letterbox`
//! records the scale and padding so model-space coordinates can be mapped
//! back onto the frame.

use crate::frame::Frame;

/// Default square model input size.
pub const DEFAULT_INPUT_SIZE: usize = 640;

/// Forward transform parameters of a letterbox resize.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    /// Uniform scale applied to the frame.
    pub scale: f32,
    /// Horizontal padding on the left edge, in model pixels.
    pub pad_x: f32,
    /// Vertical padding on the top edge, in model pixels.
    pub pad_y: f32,
    /// Width of the resized frame inside the canvas.
    pub resized_width: usize,
    /// Height of the resized frame inside the canvas.
    pub resized_height: usize,
    /// Original frame width.
    pub frame_width: usize,
    /// Original frame height.
    pub frame_height: usize,
}

impl Letterbox {
    /// Computes the letterbox for a `width x height` frame into a `size`
    /// square. Both frame dimensions must be non-zero.
    pub fn compute(width: usize, height: usize, size: usize) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let resized_width = ((width as f32 * scale).round() as usize).clamp(1, size.max(1));
        let resized_height = ((height as f32 * scale).round() as usize).clamp(1, size.max(1));
        let pad_x = ((size - resized_width) / 2) as f32;
        let pad_y = ((size - resized_height) / 2) as f32;
        Self {
            scale,
            pad_x,
            pad_y,
            resized_width,
            resized_height,
            frame_width: width,
            frame_height: height,
        }
    }

    /// Maps a model-space x coordinate to the frame, clamped to `[0, W]`.
    #[inline]
    pub fn unproject_x(&self, x: f32) -> f32 {
        ((x - self.pad_x) / self.scale).clamp(0.0, self.frame_width as f32)
    }

    /// Maps a model-space y coordinate to the frame, clamped to `[0, H]`.
    #[inline]
    pub fn unproject_y(&self, y: f32) -> f32 {
        ((y - self.pad_y) / self.scale).clamp(0.0, self.frame_height as f32)
    }
}

/// Normalized model input plus the transform that produced it.
#[derive(Clone, Debug)]
pub struct PreprocessResult {
    /// Channel-first `3 x S x S` values in `[0, 1]`.
    pub tensor: Vec<f32>,
    /// Canvas side length `S`.
    pub size: usize,
    pub letterbox: Letterbox,
}

impl PreprocessResult {
    /// NCHW shape of `tensor` with a batch of one.
    pub fn shape(&self) -> [usize; 4] {
        [1, 3, self.size, self.size]
    }
}

/// Converts frames into letterboxed model inputs of a fixed size.
#[derive(Clone, Copy, Debug)]
pub struct FramePreprocessor {
    size: usize,
}

impl Default for FramePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl FramePreprocessor {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Letterboxes `frame`. The frame must have non-zero dimensions.
    pub fn run(&self, frame: &Frame) -> PreprocessResult {
        let size = self.size;
        let letterbox = Letterbox::compute(frame.width(), frame.height(), size);
        let plane = size * size;
        let mut tensor = vec![0.0f32; 3 * plane];

        let off_x = letterbox.pad_x as usize;
        let off_y = letterbox.pad_y as usize;
        let sx = frame.width() as f32 / letterbox.resized_width as f32;
        let sy = frame.height() as f32 / letterbox.resized_height as f32;
        let max_x = frame.width() as f32 - 1.0;
        let max_y = frame.height() as f32 - 1.0;

        for dy in 0..letterbox.resized_height {
            let src_y = ((dy as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
            let y0 = src_y.floor() as usize;
            let y1 = (y0 + 1).min(frame.height() - 1);
            let fy = src_y - y0 as f32;
            for dx in 0..letterbox.resized_width {
                let src_x = ((dx as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
                let x0 = src_x.floor() as usize;
                let x1 = (x0 + 1).min(frame.width() - 1);
                let fx = src_x - x0 as f32;

                let a = frame.pixel(x0, y0);
                let b = frame.pixel(x1, y0);
                let c = frame.pixel(x0, y1);
                let d = frame.pixel(x1, y1);
                let w00 = (1.0 - fx) * (1.0 - fy);
                let w10 = fx * (1.0 - fy);
                let w01 = (1.0 - fx) * fy;
                let w11 = fx * fy;

                let idx = (off_y + dy) * size + off_x + dx;
                for ch in 0..3 {
                    let value = f32::from(a[ch]) * w00
                        + f32::from(b[ch]) * w10
                        + f32::from(c[ch]) * w01
                        + f32::from(d[ch]) * w11;
                    tensor[ch * plane + idx] = (value / 255.0).clamp(0.0, 1.0);
                }
            }
        }

        PreprocessResult {
            tensor,
            size,
            letterbox,
        }
    }
}
