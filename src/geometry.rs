// =============================================================================
// GEOMETRY.RS: axis-aligned rectangles in world pixels
//
// Object geometry is kept in f64 (Tiled stores fractional positions);
// rendering converts to macroquad's f32 `Rect` at the edge.
// =============================================================================

use macroquad::prelude::Rect;

/// Axis-aligned bounding box, `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Aabb {
    /// Builds a box from its top-left corner and size.
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Strict overlap test: boxes that only share an edge do not intersect,
    /// and empty boxes intersect nothing.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        if self.w <= 0.0 || self.h <= 0.0 || other.w <= 0.0 || other.h <= 0.0 {
            return false;
        }
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    /// Box of the same centre whose sides are divided by `factor`.
    /// A factor of 1 or less returns the box unchanged.
    pub fn shrunk(&self, factor: f64) -> Aabb {
        if factor <= 1.0 {
            return *self;
        }
        let w = self.w / factor;
        let h = self.h / factor;
        Aabb {
            x: self.x + (self.w - w) / 2.0,
            y: self.y + (self.h - h) / 2.0,
            w,
            h,
        }
    }

    /// Converts to a macroquad rectangle.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }

    /// Converts from a macroquad rectangle.
    pub fn from_rect(r: Rect) -> Self {
        Self::new(r.x as f64, r.y as f64, r.w as f64, r.h as f64)
    }
}
