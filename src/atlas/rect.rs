/// Axis-aligned rectangle in integer pixel coordinates.
///
/// Unlike `macroquad::math::Rect` this is integral and hashable, so it can
/// key placement maps on atlas pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub w: i32,
    /// Height in pixels
    pub h: i32,
}

impl PixelRect {
    /// Builds a rectangle from its top-left corner and extent.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        PixelRect { x, y, w, h }
    }

    /// One past the right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// One past the bottom edge.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// True when the rectangle covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Pixel area.
    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.w as i64 * self.h as i64
        }
    }

    /// True when the rectangles overlap or share an edge or corner.
    /// Edge-adjacent rectangles count as connected for cluster merging.
    pub fn touches(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// True when the rectangles share at least one pixel.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
            && !self.is_empty()
            && !other.is_empty()
    }

    /// Smallest rectangle covering both inputs.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        PixelRect {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Shared region of both inputs; empty when they do not intersect.
    pub fn intersection(&self, other: &PixelRect) -> PixelRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let w = self.right().min(other.right()) - x;
        let h = self.bottom().min(other.bottom()) - y;
        if w <= 0 || h <= 0 {
            PixelRect::default()
        } else {
            PixelRect { x, y, w, h }
        }
    }

    /// True when `other` lies fully inside `self`.
    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The same rectangle moved by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> PixelRect {
        PixelRect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}
