//! Loading frames and templates via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use std::path::{Path, PathBuf};

use crate::frame::{Frame, FrameSource, WindowId};
use crate::image::GrayImage;
use crate::trace::trace_warn;
use crate::util::{DetectError, DetectResult};

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> DetectResult<GrayImage> {
    let img = ::image::open(path.as_ref()).map_err(|err| DetectError::ImageIo {
        reason: format!("{}: {err}", path.as_ref().display()),
    })?;
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();
    GrayImage::new(gray.into_raw(), width as usize, height as usize)
}

/// Loads an image from disk as an RGB frame.
pub fn load_frame<P: AsRef<Path>>(path: P) -> DetectResult<Frame> {
    let img = ::image::open(path.as_ref()).map_err(|err| DetectError::ImageIo {
        reason: format!("{}: {err}", path.as_ref().display()),
    })?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::from_rgb(rgb.into_raw(), width as usize, height as usize)
}

/// Frame source that reads screenshots from disk.
///
/// The window identifier is interpreted as an image path, relative to `root`
/// when one is set. Missing or undecodable files count as unavailable windows.
#[derive(Clone, Debug, Default)]
pub struct ImageFileSource {
    root: Option<PathBuf>,
    origin: (i32, i32),
}

impl ImageFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves window identifiers relative to `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Screen position reported for every loaded frame.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    fn resolve(&self, window: &WindowId) -> PathBuf {
        match &self.root {
            Some(root) => root.join(window.as_str()),
            None => PathBuf::from(window.as_str()),
        }
    }
}

impl FrameSource for ImageFileSource {
    fn capture(&self, window: &WindowId, _allow_obscured: bool) -> DetectResult<Option<Frame>> {
        let path = self.resolve(window);
        if !path.is_file() {
            return Ok(None);
        }
        match load_frame(&path) {
            Ok(frame) => Ok(Some(frame.with_origin(self.origin.0, self.origin.1))),
            Err(err) => {
                trace_warn!("frame_unavailable", reason = err.to_string().as_str());
                Ok(None)
            }
        }
    }
}
