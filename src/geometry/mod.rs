//! Geometric primitives for entity positions.
//!
//! Entity boxes use a bottom-left page origin (y grows upward), the convention of
//! PDF user space. Document backends report geometry with a top-left origin;
//! [`BoundingBox::flip_y`] converts between the two.

use serde::{Deserialize, Serialize};

/// A 2D point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle on a page.
///
/// `x`/`y` is the bottom-left corner. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of the left edge
    pub x: f32,
    /// Y coordinate of the bottom edge
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl BoundingBox {
    /// Create a new box from position and dimensions.
    ///
    /// Negative dimensions are clamped to zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::geometry::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(bbox.width, 100.0);
    /// assert_eq!(BoundingBox::new(0.0, 0.0, -3.0, 5.0).width, 0.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Create a box from two corner points, in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::geometry::BoundingBox;
    ///
    /// let bbox = BoundingBox::from_points(110.0, 70.0, 10.0, 20.0);
    /// assert_eq!(bbox.x, 10.0);
    /// assert_eq!(bbox.y, 20.0);
    /// assert_eq!(bbox.width, 100.0);
    /// assert_eq!(bbox.height, 50.0);
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (min_x, max_x) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (min_y, max_y) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Compute the area of the box.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Compute the overlapping region of two boxes, if any.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let x0 = self.left().max(other.left());
        let y0 = self.bottom().max(other.bottom());
        let x1 = self.right().min(other.right());
        let y1 = self.top().min(other.top());
        if x1 > x0 && y1 > y0 {
            Some(BoundingBox::from_points(x0, y0, x1, y1))
        } else {
            None
        }
    }

    /// Compute the union of this box with another.
    ///
    /// Returns the smallest box that contains both boxes.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::geometry::BoundingBox;
    ///
    /// let b1 = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
    /// let b2 = BoundingBox::new(25.0, 25.0, 50.0, 50.0);
    /// let union = b1.union(&b2);
    ///
    /// assert_eq!(union.right(), 75.0);
    /// assert_eq!(union.top(), 75.0);
    /// ```
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_points(
            self.left().min(other.left()),
            self.bottom().min(other.bottom()),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// Intersection-over-union of two boxes.
    ///
    /// Returns 0.0 when the boxes do not overlap or both are empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::geometry::BoundingBox;
    ///
    /// let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    /// let b = BoundingBox::new(0.0, 0.0, 8.0, 10.0);
    /// assert_eq!(a.iou(&b), 0.8);
    /// ```
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = match self.intersection(other) {
            Some(rect) => rect.area(),
            None => return 0.0,
        };
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f32) -> BoundingBox {
        BoundingBox::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Restrict the box to `bounds`. Returns an empty box when they do not overlap.
    pub fn clip_to(&self, bounds: &BoundingBox) -> BoundingBox {
        self.intersection(bounds)
            .unwrap_or_else(|| BoundingBox::new(self.x, self.y, 0.0, 0.0))
    }

    /// Mirror the box vertically within a page of height `page_height`.
    ///
    /// Converts a bottom-left origin box into top-left coordinates and back.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::geometry::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(10.0, 700.0, 50.0, 12.0);
    /// let flipped = bbox.flip_y(792.0);
    /// assert_eq!(flipped.y, 80.0);
    /// assert_eq!(flipped.flip_y(792.0), bbox);
    /// ```
    pub fn flip_y(&self, page_height: f32) -> BoundingBox {
        BoundingBox::new(self.x, page_height - self.top(), self.width, self.height)
    }

    /// Whether all four values differ from `other` by less than `tolerance`.
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f32) -> bool {
        (self.x - other.x).abs() < tolerance
            && (self.y - other.y).abs() < tolerance
            && (self.width - other.width).abs() < tolerance
            && (self.height - other.height).abs() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_edges() {
        let b = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.left(), 10.0);
        assert_eq!(b.right(), 110.0);
        assert_eq!(b.bottom(), 20.0);
        assert_eq!(b.top(), 70.0);
        assert_eq!(b.center(), Point::new(60.0, 45.0));
    }

    #[test]
    fn test_negative_dimensions_clamped() {
        let b = BoundingBox::new(0.0, 0.0, -1.0, -2.0);
        assert_eq!(b.width, 0.0);
        assert_eq!(b.height, 0.0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 50.0, 100.0, 100.0);
        let c = BoundingBox::new(200.0, 200.0, 10.0, 10.0);

        assert_eq!(a.intersection(&b), Some(BoundingBox::new(50.0, 50.0, 50.0, 50.0)));
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersection(&b).is_none());
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(3.0, 4.0, 20.0, 10.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_empty_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_expand_and_clip() {
        let page = BoundingBox::new(0.0, 0.0, 612.0, 792.0);
        let b = BoundingBox::new(0.5, 10.0, 20.0, 10.0).expand(1.0);
        assert_eq!(b, BoundingBox::new(-0.5, 9.0, 22.0, 12.0));
        let clipped = b.clip_to(&page);
        assert_eq!(clipped.x, 0.0);
        assert_eq!(clipped.width, 21.5);
    }

    #[test]
    fn test_flip_y_roundtrip() {
        let b = BoundingBox::new(72.0, 100.0, 40.0, 12.0);
        let top_left = b.flip_y(792.0);
        assert_eq!(top_left.y, 680.0);
        assert_eq!(top_left.flip_y(792.0), b);
    }

    #[test]
    fn test_approx_eq_is_strict() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.approx_eq(&BoundingBox::new(4.9, 0.0, 10.0, 10.0), 5.0));
        assert!(!a.approx_eq(&BoundingBox::new(5.0, 0.0, 10.0, 10.0), 5.0));
    }
}
