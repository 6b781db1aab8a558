//! Atlas construction: overlap clustering, shelf packing, page partitioning
//! and the tile-id record table.

pub mod mapping;
pub mod overlap;
mod packer;
mod page;
mod rect;

pub use mapping::{
    TileAtlas, TileEntry, TileFragment, TileMapping, TilePlacement, TileRecords, ATLAS_SIZE,
};
pub use packer::{AtlasPacker, FragmentPiece, Placed};
pub use page::{AtlasPage, ImageId};
pub use rect::PixelRect;

/// Stable opaque handle to one atlas page texture.
///
/// Atlas textures are long-lived and shared read-only; an index into the
/// mapping's texture table avoids identity comparisons on texture objects
/// across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u16);
