//! Turns a track into display layers: expands each layer's items, looks up
//! every placed tile in the atlas and feeds quad vertices through the
//! layers' append path in tile order.

use macroquad::prelude::*;

use crate::atlas::{PixelRect, TextureId, TileAtlas, TileRecords};
use crate::library::TileLibrary;
use crate::track::{expand_layer, PlacedTile, Track};

use super::layer::{DisplayLayer, DisplayLayerMap, TileVertex};

/// Builds the display layers for a whole track.
///
/// Runs on the loading path, after `TileAtlas::build`. The previous tile's
/// texture is passed to `find_tile` as a hint so runs of duplicated tiles
/// stay on one texture. `progress` is invoked after each placed tile with
/// `(done, total)` for coarse load reporting.
pub fn build_track_display(
    track: &Track,
    library: &TileLibrary,
    atlas: &TileAtlas,
    mut progress: impl FnMut(usize, usize),
) -> DisplayLayerMap {
    let expanded: Vec<(&crate::track::TrackLayer, Vec<PlacedTile>)> = track
        .layers
        .iter()
        .map(|layer| (layer, expand_layer(layer, library)))
        .collect();
    let total: usize = expanded.iter().map(|(_, tiles)| tiles.len()).sum();

    let mut map = DisplayLayerMap::new();
    let mut done = 0;
    for (track_layer, tiles) in expanded {
        let mut layer = DisplayLayer::new(track_layer.visible);
        let mut hint: Option<TextureId> = None;
        for (index, placed) in tiles.iter().enumerate() {
            match atlas.find_tile(placed.tile, hint) {
                TileRecords::Placement(p) => {
                    let local = PixelRect::new(0, 0, p.dest.w, p.dest.h);
                    let quad = quad_vertices(placed, local, p.dest, atlas.texture_size());
                    layer.append_tile_vertices(index, &quad, p.texture);
                    hint = Some(p.texture);
                }
                TileRecords::Fragments(frags) => {
                    for f in frags {
                        let quad = quad_vertices(placed, f.local, f.dest, atlas.texture_size());
                        layer.append_tile_vertices(index, &quad, f.texture);
                    }
                    hint = frags.last().map(|f| f.texture);
                }
                // unknown tile: keep the slot so indices track the layer model
                TileRecords::Missing => layer.insert_tile(index),
            }
            done += 1;
            progress(done, total);
        }
        map.insert(track_layer.id, layer);
    }
    map
}

/// The four corners of one destination record, rotated about the tile origin.
pub fn quad_vertices(
    placed: &PlacedTile,
    local: PixelRect,
    dest: PixelRect,
    texture_size: u32,
) -> [TileVertex; 4] {
    let rot = Vec2::from_angle(placed.angle);
    let scale = 1.0 / texture_size as f32;
    let corner = |lx: i32, ly: i32, u: i32, v: i32| TileVertex {
        pos: placed.pos + rot.rotate(vec2(lx as f32, ly as f32)),
        uv: vec2(u as f32 * scale, v as f32 * scale),
    };
    [
        corner(local.x, local.y, dest.x, dest.y),
        corner(local.right(), local.y, dest.right(), dest.y),
        corner(local.right(), local.bottom(), dest.right(), dest.bottom()),
        corner(local.x, local.bottom(), dest.x, dest.bottom()),
    ]
}
