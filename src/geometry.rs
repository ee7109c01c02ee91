//! Integer pixel rectangles shared by both engines.

use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle in TLWH form.
///
/// The same type is used for frame-local and screen coordinates; which space a
/// value lives in is determined by the owning type (`Candidate` vs `Detection`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area in square pixels; zero for degenerate rectangles.
    #[inline]
    pub fn area(&self) -> f64 {
        if self.width <= 0 || self.height <= 0 {
            return 0.0;
        }
        f64::from(self.width) * f64::from(self.height)
    }

    /// Returns the rectangle shifted by `(dx, dy)`.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Intersection over union with another rectangle.
    ///
    /// Returns 0 when the rectangles do not overlap or the union is not positive.
    pub fn iou(&self, other: &Rect) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = f64::from(x2 - x1) * f64::from(y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::Rect;

    #[test]
    fn iou_of_partial_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        // 25 / (100 + 100 - 25)
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-9);
    }

    #[test]
    fn iou_is_zero_for_touching_edges() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = Rect::new(3, 4, 7, 9);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_rect_has_zero_iou() {
        let a = Rect::new(0, 0, 0, 10);
        let b = Rect::new(0, 0, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn offset_moves_origin_only() {
        let r = Rect::new(1, 2, 3, 4).offset(100, -50);
        assert_eq!(r, Rect::new(101, -48, 3, 4));
    }
}
