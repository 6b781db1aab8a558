//! Minimal track model consumed by the display builder: ordered layers of
//! placed tiles and group stamps, already resolved to world transforms. The
//! on-disk track format and its parser live elsewhere.

use macroquad::prelude::*;

use crate::display::LayerId;
use crate::library::{GroupId, TileId, TileLibrary};

/// What one track item places.
#[derive(Debug, Clone, Copy)]
pub enum TrackItemKind {
    /// A single tile
    Tile(TileId),
    /// A group stamp, expanded via the library
    Group(GroupId),
}

/// One placed item with its world transform.
#[derive(Debug, Clone, Copy)]
pub struct TrackItem {
    /// Tile or group reference
    pub kind: TrackItemKind,
    /// World position of the item origin
    pub pos: Vec2,
    /// Rotation in radians
    pub angle: f32,
}

/// One track layer in draw order.
#[derive(Debug, Clone)]
pub struct TrackLayer {
    /// Layer id; layers draw in ascending id order
    pub id: LayerId,
    /// Hidden layers build their display data but skip drawing
    pub visible: bool,
    /// Placed items in edit order
    pub items: Vec<TrackItem>,
}

/// A whole track.
#[derive(Debug, Clone, Default)]
pub struct Track {
    /// Layers in draw order
    pub layers: Vec<TrackLayer>,
}

/// A concrete tile after group expansion.
#[derive(Debug, Clone, Copy)]
pub struct PlacedTile {
    /// The tile to draw
    pub tile: TileId,
    /// World position of the tile origin
    pub pos: Vec2,
    /// Rotation in radians
    pub angle: f32,
}

/// Flattens a layer's items into concrete placed tiles.
///
/// Group stamps expand member by member: offsets rotate with the stamp and
/// angles add up. Unknown group ids expand to nothing.
pub fn expand_layer(layer: &TrackLayer, library: &TileLibrary) -> Vec<PlacedTile> {
    let mut placed = Vec::new();
    for item in &layer.items {
        match item.kind {
            TrackItemKind::Tile(id) => placed.push(PlacedTile {
                tile: id,
                pos: item.pos,
                angle: item.angle,
            }),
            TrackItemKind::Group(id) => {
                let Some(group) = library.group(id) else {
                    continue;
                };
                let rot = Vec2::from_angle(item.angle);
                for sub in &group.tiles {
                    placed.push(PlacedTile {
                        tile: sub.tile,
                        pos: item.pos + rot.rotate(sub.offset),
                        angle: item.angle + sub.angle,
                    });
                }
            }
        }
    }
    placed
}
