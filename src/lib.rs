#![warn(missing_docs)]

//! Atlas-packed, texture-batched tile track renderer for Macroquad.
//!
//! Many small per-tile source images are packed into a few large atlas pages
//! at load time; each track layer then keeps a mutable vertex buffer whose
//! draw calls are grouped by texture and stay grouped under single-tile
//! insert/move/delete edits.

pub mod atlas;
pub mod display;
mod error;
mod images;
mod library;
mod track;

pub use atlas::{
    AtlasPacker, FragmentPiece, PixelRect, Placed, TextureId, TileAtlas, TileEntry, TileFragment,
    TileMapping, TilePlacement, TileRecords, ATLAS_SIZE,
};
pub use display::{
    build_track_display, quad_vertices, Component, DisplayLayer, DisplayLayerMap, LayerId,
    TileSpan, TileVertex, VertexRun,
};
pub use error::TrackError;
pub use images::ImageLoader;
pub use library::{
    GroupId, SubTile, TileDefinition, TileGroupDefinition, TileId, TileLibrary,
};
pub use track::{expand_layer, PlacedTile, Track, TrackItem, TrackItemKind, TrackLayer};
