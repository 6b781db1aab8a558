//! One fixed-size square atlas page with a shelf allocator: horizontal rows
//! stacked downward, rectangles packed left-to-right inside the best-fitting
//! row with 2px padding on both axes. Pages only grow during one load; there
//! is no deallocation, the whole atlas is rebuilt on the next load.

use std::collections::HashMap;

use super::rect::PixelRect;

/// Stable handle to a decoded source image, assigned by the atlas build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

#[derive(Debug, Clone, Copy)]
struct ShelfRow {
    top: u32,
    height: u32,
    right_edge: u32,
}

/// A single atlas page: shelf rows plus the map of regions placed on it.
#[derive(Debug)]
pub struct AtlasPage {
    size: u32,
    rows: Vec<ShelfRow>,
    row_start: u32,
    placed: HashMap<(ImageId, PixelRect), PixelRect>,
    full: bool,
}

impl AtlasPage {
    /// Creates an empty page of `size`x`size` pixels.
    pub fn new(size: u32) -> Self {
        AtlasPage {
            size,
            rows: Vec::new(),
            row_start: 0,
            placed: HashMap::new(),
            full: false,
        }
    }

    /// Page side length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    fn free_width(&self, row: &ShelfRow) -> u32 {
        self.size.saturating_sub(row.right_edge)
    }

    /// Reserves a `w`x`h` region.
    ///
    /// Picks the existing row with the tightest vertical fit; if none fits, or
    /// the best fit would waste more than 30% of the row height, opens a new
    /// row of height `h + 2` instead. Returns `None` when nothing usable is
    /// left: an expected "does not fit here" signal, not an error.
    pub fn allocate(&mut self, w: u32, h: u32) -> Option<PixelRect> {
        if self.full || w == 0 || h == 0 {
            return None;
        }

        let mut best: Option<usize> = None;
        for (i, row) in self.rows.iter().enumerate() {
            if self.free_width(row) > w && h + 1 < row.height {
                if best.map_or(true, |b| row.height < self.rows[b].height) {
                    best = Some(i);
                }
            }
        }

        let wasteful = match best {
            Some(b) => h * 10 < self.rows[b].height * 7,
            None => true,
        };
        if wasteful && self.row_start + h < self.size && w < self.size {
            self.rows.push(ShelfRow {
                top: self.row_start,
                height: h + 2,
                right_edge: 0,
            });
            self.row_start += h + 2;
            best = Some(self.rows.len() - 1);
        }

        let row = &mut self.rows[best?];
        let rect = PixelRect::new(row.right_edge as i32, row.top as i32, w as i32, h as i32);
        row.right_edge += w + 2;
        Some(rect)
    }

    /// Hands the whole page to one oversized fragment, placed at the origin.
    /// The page accepts no further allocations.
    pub fn claim_full(&mut self, image: ImageId, source: PixelRect, w: u32, h: u32) -> PixelRect {
        let dest = PixelRect::new(0, 0, w as i32, h as i32);
        self.full = true;
        self.row_start = self.size;
        self.placed.insert((image, source), dest);
        dest
    }

    /// Records where a source-image region ended up on this page.
    pub fn record(&mut self, image: ImageId, source: PixelRect, dest: PixelRect) {
        self.placed.insert((image, source), dest);
    }

    /// Looks up a previously recorded region.
    pub fn find(&self, image: ImageId, source: &PixelRect) -> Option<PixelRect> {
        self.placed.get(&(image, *source)).copied()
    }

    /// All `(image, source rect) -> dest rect` placements on this page.
    pub fn placements(&self) -> impl Iterator<Item = (ImageId, PixelRect, PixelRect)> + '_ {
        self.placed
            .iter()
            .map(|(&(image, source), &dest)| (image, source, dest))
    }
}
