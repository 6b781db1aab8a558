//! Interactive display data: per-layer texture-batched vertex buffers and the
//! track-to-vertices builder.

mod builder;
mod layer;

pub use builder::{build_track_display, quad_vertices};
pub use layer::{
    Component, DisplayLayer, DisplayLayerMap, LayerId, TileSpan, TileVertex, VertexRun,
};
