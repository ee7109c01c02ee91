//! Locating a reference image inside a captured frame.
//!
//! The template engine only depends on the [`ImageSearch`] trait. The
//! built-in implementation is a grayscale ZNCC pyramid search.

use std::path::Path;
use std::time::SystemTime;

use crate::frame::Frame;
use crate::geometry::Rect;
use crate::util::DetectResult;

pub mod topk;
pub mod zncc;

pub use topk::Peak;
pub use zncc::{find_best, TemplatePlan, ZnccConfig};

/// Best match of one template in one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchMatch {
    /// Bounds in frame pixels.
    pub bounds: Rect,
    /// Raw match score; callers clamp it to `[0, 1]`.
    pub confidence: f32,
    /// Capture time of the searched frame.
    pub captured_at: SystemTime,
}

/// Capability that finds a template image inside a frame.
pub trait ImageSearch: Send + Sync {
    /// Returns the best match scoring at least `min_confidence`, or `None`.
    ///
    /// Errors are reserved for templates that cannot be probed at all, for
    /// example an unreadable file.
    fn find(
        &self,
        template: &Path,
        frame: &Frame,
        min_confidence: f32,
    ) -> DetectResult<Option<SearchMatch>>;
}

/// [`ImageSearch`] backed by [`find_best`], loading templates with `image`.
#[cfg(feature = "image-io")]
#[derive(Clone, Debug, Default)]
pub struct ZnccImageSearch {
    config: ZnccConfig,
}

#[cfg(feature = "image-io")]
impl ZnccImageSearch {
    pub fn new(config: ZnccConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ZnccConfig {
        &self.config
    }
}

#[cfg(feature = "image-io")]
impl ImageSearch for ZnccImageSearch {
    fn find(
        &self,
        template: &Path,
        frame: &Frame,
        min_confidence: f32,
    ) -> DetectResult<Option<SearchMatch>> {
        let tpl = crate::image::io::load_gray_image(template)?;
        if frame.is_empty() {
            return Ok(None);
        }
        let gray = frame.to_gray()?;
        let best = find_best(gray.view(), tpl.view(), &self.config, min_confidence)?;

        Ok(best.map(|peak| SearchMatch {
            bounds: Rect::new(
                peak.x as i32,
                peak.y as i32,
                tpl.width() as i32,
                tpl.height() as i32,
            ),
            confidence: peak.score,
            captured_at: frame.captured_at(),
        }))
    }
}
