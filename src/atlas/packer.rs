//! Distribution of enclosing rectangles across a growing list of atlas pages.
//!
//! Small rectangles belonging to multi-tile groups are deduplicated against
//! the current page only, so a group's tiles land together even if that copies
//! a region that already exists on an earlier page: co-location minimizes
//! texture switches when the group is drawn. Solitary and large rectangles are
//! deduplicated against every page to bound the page count. Rectangles too big
//! for any page are split on a page-size grid, one fresh page per piece.

use std::collections::HashMap;

use log::debug;

use super::page::{AtlasPage, ImageId};
use super::rect::PixelRect;
use super::TextureId;

/// Rectangles up to this size placed for a multi-tile group skip the global
/// dedup check and may be duplicated across pages for locality.
const GROUP_LOCAL_MAX: i32 = 256;

/// One piece of a fragmented enclosing rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentPiece {
    /// Page texture holding this piece
    pub texture: TextureId,
    /// Sub-rectangle in source-image pixels
    pub source: PixelRect,
    /// Destination on the piece's page
    pub dest: PixelRect,
}

/// Where an enclosing rectangle ended up.
#[derive(Debug, Clone)]
pub enum Placed {
    /// The whole rectangle fit on one page.
    Whole {
        /// Page texture holding the rectangle
        texture: TextureId,
        /// Destination rectangle on that page
        dest: PixelRect,
    },
    /// The rectangle was split across dedicated pages.
    Split(Vec<FragmentPiece>),
}

/// Owns the page list and decides reuse vs. new page vs. fragmentation.
pub struct AtlasPacker {
    texture_size: u32,
    pages: Vec<AtlasPage>,
    current: usize,
    fragments: HashMap<(ImageId, PixelRect), Vec<FragmentPiece>>,
}

impl AtlasPacker {
    /// Creates a packer with one empty page of `texture_size`.
    pub fn new(texture_size: u32) -> Self {
        AtlasPacker {
            texture_size,
            pages: vec![AtlasPage::new(texture_size)],
            current: 0,
            fragments: HashMap::new(),
        }
    }

    /// All pages created so far, in texture-id order.
    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    /// Page side length in pixels.
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Places one enclosing rectangle of `image`, reusing an existing
    /// placement where the dedup policy allows it.
    ///
    /// `grouped` marks rectangles whose owning tile group has more than one
    /// member; combined with a small size it restricts dedup to the current
    /// page.
    pub fn place(&mut self, image: ImageId, rect: PixelRect, grouped: bool) -> Placed {
        if let Some(pieces) = self.fragments.get(&(image, rect)) {
            return Placed::Split(pieces.clone());
        }

        let local = grouped && rect.w <= GROUP_LOCAL_MAX && rect.h <= GROUP_LOCAL_MAX;
        if local {
            if let Some(dest) = self.pages[self.current].find(image, &rect) {
                return Placed::Whole {
                    texture: TextureId(self.current as u16),
                    dest,
                };
            }
        } else {
            for (i, page) in self.pages.iter().enumerate() {
                if let Some(dest) = page.find(image, &rect) {
                    return Placed::Whole {
                        texture: TextureId(i as u16),
                        dest,
                    };
                }
            }
        }

        let (w, h) = (rect.w as u32, rect.h as u32);
        if let Some(dest) = self.pages[self.current].allocate(w, h) {
            self.pages[self.current].record(image, rect, dest);
            return Placed::Whole {
                texture: TextureId(self.current as u16),
                dest,
            };
        }

        debug!(
            "atlas page {} exhausted, opening page {}",
            self.current,
            self.pages.len()
        );
        self.pages.push(AtlasPage::new(self.texture_size));
        self.current = self.pages.len() - 1;
        if let Some(dest) = self.pages[self.current].allocate(w, h) {
            self.pages[self.current].record(image, rect, dest);
            return Placed::Whole {
                texture: TextureId(self.current as u16),
                dest,
            };
        }

        // Even an empty page refused: the rectangle exceeds page capacity.
        let pieces = self.fragment(image, rect);
        self.fragments.insert((image, rect), pieces.clone());
        Placed::Split(pieces)
    }

    /// Splits `rect` on a page-size grid (right/bottom pieces smaller), each
    /// piece claiming a page of its own. The empty page left behind by the
    /// failed retry takes the first piece.
    fn fragment(&mut self, image: ImageId, rect: PixelRect) -> Vec<FragmentPiece> {
        let step = self.texture_size as i32;
        let mut pieces = Vec::new();
        let mut first = true;
        let mut y = 0;
        while y < rect.h {
            let ph = (rect.h - y).min(step);
            let mut x = 0;
            while x < rect.w {
                let pw = (rect.w - x).min(step);
                if !first {
                    self.pages.push(AtlasPage::new(self.texture_size));
                    self.current = self.pages.len() - 1;
                }
                first = false;
                let source = PixelRect::new(rect.x + x, rect.y + y, pw, ph);
                let dest = self.pages[self.current].claim_full(image, source, pw as u32, ph as u32);
                pieces.push(FragmentPiece {
                    texture: TextureId(self.current as u16),
                    source,
                    dest,
                });
                x += pw;
            }
            y += ph;
        }
        debug!(
            "fragmented {}x{} region across {} dedicated pages",
            rect.w,
            rect.h,
            pieces.len()
        );
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMG: ImageId = ImageId(0);

    #[test]
    fn repeated_solitary_rect_is_deduplicated_globally() {
        let mut packer = AtlasPacker::new(64);
        let rect = PixelRect::new(0, 0, 16, 16);
        let first = packer.place(IMG, rect, false);
        let second = packer.place(IMG, rect, false);
        match (&first, &second) {
            (
                Placed::Whole { texture: t1, dest: d1 },
                Placed::Whole { texture: t2, dest: d2 },
            ) => {
                assert_eq!(t1, t2);
                assert_eq!(d1, d2);
            }
            other => panic!("expected whole placements, got {other:?}"),
        }
        assert_eq!(packer.pages().len(), 1);
    }

    #[test]
    fn grouped_rect_is_duplicated_onto_the_current_page() {
        let mut packer = AtlasPacker::new(64);
        let rect = PixelRect::new(0, 0, 16, 16);
        let Placed::Whole { texture: first, .. } = packer.place(IMG, rect, true) else {
            panic!("expected whole placement");
        };

        // exhaust page 0 so the current page moves on
        let mut filler = 0;
        loop {
            let r = PixelRect::new(100 + filler, 0, 30, 30);
            filler += 1;
            match packer.place(IMG, r, false) {
                Placed::Whole { texture, .. } if texture != first => break,
                _ => {}
            }
            assert!(filler < 64, "page never filled");
        }

        // grouped+small: only the current page is consulted, so the region
        // is copied again even though page 0 still holds it
        let Placed::Whole { texture, .. } = packer.place(IMG, rect, true) else {
            panic!("expected whole placement");
        };
        assert_ne!(texture, first);

        // a solitary placement of the same rect still finds the original
        let Placed::Whole { texture, .. } = packer.place(IMG, rect, false) else {
            panic!("expected whole placement");
        };
        assert_eq!(texture, first);
    }

    #[test]
    fn oversized_rect_fragments_onto_dedicated_pages() {
        let mut packer = AtlasPacker::new(64);
        let rect = PixelRect::new(0, 0, 150, 70);
        let Placed::Split(pieces) = packer.place(IMG, rect, false) else {
            panic!("expected fragmentation");
        };
        // 3 columns (64, 64, 22) x 2 rows (64, 6)
        assert_eq!(pieces.len(), 6);
        let mut textures: Vec<u16> = pieces.iter().map(|p| p.texture.0).collect();
        textures.dedup();
        assert_eq!(textures.len(), 6, "each piece gets its own page");
        let area: i64 = pieces.iter().map(|p| p.source.area()).sum();
        assert_eq!(area, rect.area());
        for pair in pieces.windows(2) {
            assert!(!pair[0].source.intersects(&pair[1].source));
        }

        // the split is remembered and reused
        let Placed::Split(again) = packer.place(IMG, rect, false) else {
            panic!("expected cached fragmentation");
        };
        assert_eq!(again, pieces);
    }

    #[test]
    fn fragment_sources_translate_back_to_the_full_rect() {
        let mut packer = AtlasPacker::new(64);
        let rect = PixelRect::new(10, 20, 100, 100);
        let Placed::Split(pieces) = packer.place(IMG, rect, false) else {
            panic!("expected fragmentation");
        };
        let mut cover = PixelRect::default();
        for p in &pieces {
            assert!(rect.contains_rect(&p.source));
            assert_eq!((p.source.w, p.source.h), (p.dest.w, p.dest.h));
            cover = cover.union(&p.source);
        }
        assert_eq!(cover, rect);
    }
}
