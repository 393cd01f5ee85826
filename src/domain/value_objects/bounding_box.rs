//! Bounding Box Value Object
//!
//! Represents a rectangular region in frame coordinates.

use serde::{Deserialize, Serialize};

/// A bounding box defining a rectangular region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a bounding box from corner coordinates.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Returns the area of the bounding box.
    pub fn area(&self) -> i32 {
        self.width * self.height
    }

    /// Returns the aspect ratio (width / height). Zero-height boxes return 0.0.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    /// Returns the right edge x coordinate.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Returns the bottom edge y coordinate.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Checks if this bounding box intersects with another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Returns true if `self` is fully contained within `other`.
    pub fn is_inside(&self, other: &BoundingBox) -> bool {
        self.x >= other.x
            && self.y >= other.y
            && self.right() <= other.right()
            && self.bottom() <= other.bottom()
    }

    /// Area of the geometric intersection with another box (0 if disjoint).
    pub fn intersection_area(&self, other: &BoundingBox) -> i32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0;
        }
        (x2 - x1) * (y2 - y1)
    }

    /// Returns true if at least `fraction` of this box's area overlaps `other`
    /// (spec.md §4.5 step 9: drop a box ~90% contained in a bigger one).
    pub fn is_mostly_inside(&self, other: &BoundingBox, fraction: f32) -> bool {
        if self.area() == 0 {
            return false;
        }
        let overlap = self.intersection_area(other) as f32;
        overlap / self.area() as f32 >= fraction
    }

    /// Calculates the intersection over union (IoU) with another bounding box.
    ///
    /// Reference: https://en.wikipedia.org/wiki/Jaccard_index
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let intersection = self.intersection_area(other);
        if intersection == 0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0 {
            return 0.0;
        }

        intersection as f32 / union as f32
    }

    /// The axis-aligned union (bounding) box of a set of boxes.
    pub fn union_all(boxes: &[BoundingBox]) -> Option<BoundingBox> {
        let mut iter = boxes.iter();
        let first = iter.next()?;
        let mut x1 = first.x;
        let mut y1 = first.y;
        let mut x2 = first.right();
        let mut y2 = first.bottom();

        for b in iter {
            x1 = x1.min(b.x);
            y1 = y1.min(b.y);
            x2 = x2.max(b.right());
            y2 = y2.max(b.bottom());
        }

        Some(BoundingBox::from_corners(x1, y1, x2, y2))
    }

    /// Scales the bounding box by a factor, keeping its center fixed.
    pub fn scale(&self, factor: f32) -> Self {
        let center = self.center();
        let new_width = (self.width as f32 * factor) as i32;
        let new_height = (self.height as f32 * factor) as i32;

        Self {
            x: center.0 - new_width / 2,
            y: center.1 - new_height / 2,
            width: new_width,
            height: new_height,
        }
    }

    /// Clamps this box into `[0, max_x] x [0, max_y]`, per spec.md §8:
    /// "a box exactly on the frame edge is clamped, not dropped, unless both
    /// its min-corner coordinates equal the frame extent."
    pub fn clamp_to(&self, max_x: i32, max_y: i32) -> Self {
        let x1 = self.x.clamp(0, max_x);
        let y1 = self.y.clamp(0, max_y);
        let x2 = self.right().clamp(0, max_x);
        let y2 = self.bottom().clamp(0, max_y);
        BoundingBox::from_corners(x1, y1, x2.max(x1), y2.max(y1))
    }

    /// Returns true if this box's min corner lies at or beyond the given
    /// frame extent on both axes (out-of-bounds per spec.md §4.5 step 6).
    pub fn min_corner_exceeds(&self, max_x: i32, max_y: i32) -> bool {
        self.x >= max_x && self.y >= max_y
    }

    /// Converts to a JSON-compatible array format [x, y, width, height].
    pub fn to_array(&self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Creates from a JSON array [x, y, width, height].
    pub fn from_array(arr: [i32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }
}
