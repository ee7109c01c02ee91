//! Grayscale pyramids for coarse-to-fine search.
//!
//! Each level halves the previous one with a 2x2 box filter and integer
//! rounding: `dst = ((a + b + c + d) + 2) / 4`.

use crate::image::{GrayImage, ImageView};
use crate::util::DetectResult;

/// Owned pyramid; level 0 is the base resolution.
pub struct ImagePyramid {
    levels: Vec<GrayImage>,
}

impl ImagePyramid {
    /// Builds up to `max_levels` levels (at least one), stopping early once a
    /// level would drop below `min_side` pixels on either axis.
    pub fn build(base: ImageView<'_, u8>, max_levels: usize, min_side: usize) -> DetectResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = vec![copy_view(base)?];

        while levels.len() < max_levels {
            let src = match levels.last() {
                Some(level) => level.view(),
                None => break,
            };
            let dst_width = src.width() / 2;
            let dst_height = src.height() / 2;
            if dst_width < min_side.max(1) || dst_height < min_side.max(1) {
                break;
            }
            levels.push(downsample(src, dst_width, dst_height)?);
        }

        Ok(Self { levels })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).map(GrayImage::view)
    }
}

fn copy_view(view: ImageView<'_, u8>) -> DetectResult<GrayImage> {
    let mut data = Vec::with_capacity(view.width() * view.height());
    for y in 0..view.height() {
        if let Some(row) = view.row(y) {
            data.extend_from_slice(row);
        }
    }
    GrayImage::new(data, view.width(), view.height())
}

fn downsample(src: ImageView<'_, u8>, dst_width: usize, dst_height: usize) -> DetectResult<GrayImage> {
    let mut dst = vec![0u8; dst_width * dst_height];
    for y in 0..dst_height {
        let (Some(row0), Some(row1)) = (src.row(y * 2), src.row(y * 2 + 1)) else {
            continue;
        };
        for x in 0..dst_width {
            let sum = u16::from(row0[2 * x])
                + u16::from(row0[2 * x + 1])
                + u16::from(row1[2 * x])
                + u16::from(row1[2 * x + 1]);
            dst[y * dst_width + x] = ((sum + 2) / 4) as u8;
        }
    }
    GrayImage::new(dst, dst_width, dst_height)
}
