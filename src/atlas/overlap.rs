//! Merging of per-image tile source rectangles into minimal non-overlapping
//! enclosing rectangles. Tiles that overlap or touch in their source image are
//! copied to the atlas as one region, so every tile cut from that region keeps
//! its neighbors' pixels at the seams.

use super::rect::PixelRect;

/// Collapses `rects` into the minimal set of pairwise non-overlapping
/// enclosing rectangles.
///
/// Each input rectangle is unioned with every existing cluster it overlaps or
/// touches, transitively, until no cluster intersects it. The result is
/// independent of insertion order: overlap connectivity over integer pixels
/// partitions the inputs into fixed clusters, and each output rectangle is the
/// bounding box of one cluster.
pub fn merge_rects(rects: &[PixelRect]) -> Vec<PixelRect> {
    let mut merged: Vec<PixelRect> = Vec::new();
    for &rect in rects {
        if rect.is_empty() {
            continue;
        }
        let mut cluster = rect;
        // Absorbing one cluster can bridge to another; loop to closure.
        while let Some(i) = merged.iter().position(|m| m.touches(&cluster)) {
            cluster = cluster.union(&merged.swap_remove(i));
        }
        merged.push(cluster);
    }
    merged
}

/// Finds the enclosing rectangle that fully contains `rect`, if any.
pub fn enclosing_for(merged: &[PixelRect], rect: &PixelRect) -> Option<PixelRect> {
    merged.iter().copied().find(|m| m.contains_rect(rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::rand::{gen_range, srand};

    #[test]
    fn disjoint_rects_stay_separate() {
        let rects = [
            PixelRect::new(0, 0, 16, 16),
            PixelRect::new(32, 0, 16, 16),
            PixelRect::new(0, 32, 16, 16),
        ];
        let merged = merge_rects(&rects);
        assert_eq!(merged.len(), 3);
        for r in &rects {
            assert_eq!(enclosing_for(&merged, r), Some(*r));
        }
    }

    #[test]
    fn overlapping_chain_merges_transitively() {
        // a overlaps b, b overlaps c; a and c are disjoint
        let a = PixelRect::new(0, 0, 12, 12);
        let b = PixelRect::new(10, 0, 12, 12);
        let c = PixelRect::new(20, 0, 12, 12);
        let merged = merge_rects(&[a, c, b]);
        assert_eq!(merged, vec![PixelRect::new(0, 0, 32, 12)]);
    }

    #[test]
    fn touching_rects_merge() {
        let a = PixelRect::new(0, 0, 16, 16);
        let b = PixelRect::new(16, 0, 16, 16);
        assert_eq!(merge_rects(&[a, b]), vec![PixelRect::new(0, 0, 32, 16)]);
    }

    #[test]
    fn late_rect_can_bridge_two_clusters() {
        let left = PixelRect::new(0, 0, 10, 10);
        let right = PixelRect::new(30, 0, 10, 10);
        let bridge = PixelRect::new(8, 0, 24, 10);
        let merged = merge_rects(&[left, right, bridge]);
        assert_eq!(merged, vec![PixelRect::new(0, 0, 40, 10)]);
    }

    #[test]
    fn merged_rects_are_pairwise_disjoint_and_cover_inputs() {
        srand(11);
        let rects: Vec<PixelRect> = (0..40)
            .map(|_| {
                PixelRect::new(
                    gen_range(0, 200),
                    gen_range(0, 200),
                    gen_range(1, 40),
                    gen_range(1, 40),
                )
            })
            .collect();
        let merged = merge_rects(&rects);
        for (i, a) in merged.iter().enumerate() {
            for b in merged.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
        for r in &rects {
            assert!(
                enclosing_for(&merged, r).is_some(),
                "{r:?} not covered by any cluster"
            );
        }
    }

    #[test]
    fn result_is_insertion_order_independent() {
        srand(23);
        let mut rects: Vec<PixelRect> = (0..30)
            .map(|_| {
                PixelRect::new(
                    gen_range(0, 120),
                    gen_range(0, 120),
                    gen_range(1, 30),
                    gen_range(1, 30),
                )
            })
            .collect();

        let mut reference = merge_rects(&rects);
        reference.sort_by_key(|r| (r.y, r.x));

        for _ in 0..20 {
            // Fisher-Yates with the deterministic RNG
            for i in (1..rects.len()).rev() {
                let j = gen_range(0, i as i32 + 1) as usize;
                rects.swap(i, j);
            }
            let mut merged = merge_rects(&rects);
            merged.sort_by_key(|r| (r.y, r.x));
            assert_eq!(merged, reference);
        }
    }
}
