//! Texture-batched mutable vertex buffers, one per track layer.
//!
//! A layer keeps a flat quad-vertex array plus two parallel tables: per-tile
//! vertex ranges (ordered by tile index) and per-texture "component" runs
//! that exactly partition the array. Drawing issues one mesh per component,
//! so the draw-call count stays at the number of texture switches rather than
//! the number of tiles. Edits touch only the affected range, which matters
//! because layers hold thousands of tiles and drags mutate them on every
//! mouse move.

use std::collections::BTreeMap;

use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;

use crate::atlas::TextureId;

/// Track layer identifier; layers draw in ascending id order.
pub type LayerId = u16;

/// One vertex of a tile quad: world position plus normalized atlas UV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileVertex {
    /// World-space position
    pub pos: Vec2,
    /// Texture coordinate in the owning atlas page
    pub uv: Vec2,
}

/// A tile's range in the layer's vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpan {
    /// First vertex
    pub offset: usize,
    /// Vertex count; zero for a tile with nothing to draw
    pub count: usize,
}

/// A maximal contiguous vertex run sharing one texture, drawn with one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// First vertex
    pub offset: usize,
    /// Vertex count, always positive
    pub count: usize,
    /// Texture bound for this run
    pub texture: TextureId,
}

/// One texture's worth of replacement vertices for a tile.
#[derive(Debug, Clone)]
pub struct VertexRun {
    /// Texture the vertices sample from
    pub texture: TextureId,
    /// The vertices
    pub vertices: Vec<TileVertex>,
}

/// Largest quad batch whose indices fit a `u16` mesh index buffer.
const MAX_QUADS_PER_MESH: usize = u16::MAX as usize / 4;

/// A texture-batched, mutable vertex buffer for one track layer.
pub struct DisplayLayer {
    /// Hidden layers skip drawing entirely
    pub visible: bool,
    vertices: Vec<TileVertex>,
    tiles: Vec<TileSpan>,
    components: Vec<Component>,
}

impl DisplayLayer {
    /// Creates an empty layer.
    pub fn new(visible: bool) -> Self {
        DisplayLayer {
            visible,
            vertices: Vec::new(),
            tiles: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Total vertex count.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of tile slots, including empty ones.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// The vertex range owned by a tile.
    pub fn tile_span(&self, tile_index: usize) -> TileSpan {
        self.tiles[tile_index]
    }

    /// The per-texture draw runs, sorted by offset.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The raw vertex array.
    pub fn vertices(&self) -> &[TileVertex] {
        &self.vertices
    }

    /// Appends vertices for `tile_index` at the end of the buffer, extending
    /// the trailing component when its texture matches.
    ///
    /// `tile_index` may be one past the last tile (a new slot is created) or
    /// an existing slot whose range ends at the buffer's end; repeated
    /// appends for one tile must be consecutive.
    pub fn append_tile_vertices(
        &mut self,
        tile_index: usize,
        vertices: &[TileVertex],
        texture: TextureId,
    ) {
        let offset = self.vertices.len();
        if tile_index == self.tiles.len() {
            self.tiles.push(TileSpan { offset, count: 0 });
        }
        if vertices.is_empty() {
            return;
        }
        let span = &mut self.tiles[tile_index];
        if span.count == 0 {
            span.offset = offset;
        }
        debug_assert!(
            span.offset + span.count == offset,
            "tile {tile_index} range must end at the buffer tail before appending"
        );
        span.count += vertices.len();
        self.vertices.extend_from_slice(vertices);
        match self.components.last_mut() {
            Some(last) if last.texture == texture => last.count += vertices.len(),
            _ => self.components.push(Component {
                offset,
                count: vertices.len(),
                texture,
            }),
        }
    }

    /// Inserts an empty tile slot at `tile_index`, shifting later tile
    /// indices up by one. The vertex array is untouched; the slot is
    /// populated by a later `append_tile_vertices`.
    pub fn insert_tile(&mut self, tile_index: usize) {
        let offset = self.vertices.len();
        self.tiles.insert(tile_index, TileSpan { offset, count: 0 });
    }

    /// Removes a tile's vertices, leaving its (now empty) slot in place.
    pub fn erase_tile_vertices(&mut self, tile_index: usize) {
        let span = self.tiles[tile_index];
        if span.count == 0 {
            return;
        }
        let start = span.offset;
        let end = span.offset + span.count;
        self.vertices.drain(start..end);

        for c in &mut self.components {
            let a = collapse(c.offset, start, end);
            let b = collapse(c.offset + c.count, start, end);
            c.offset = a;
            c.count = b - a;
        }
        self.components.retain(|c| c.count > 0);
        // removing a run can leave equal-texture neighbors; restore maximality
        let mut i = 1;
        while i < self.components.len() {
            if self.components[i].texture == self.components[i - 1].texture {
                self.components[i - 1].count += self.components[i].count;
                self.components.remove(i);
            } else {
                i += 1;
            }
        }

        for (i, tile) in self.tiles.iter_mut().enumerate() {
            if i != tile_index {
                tile.offset = collapse(tile.offset, start, end);
            }
        }
        self.tiles[tile_index] = TileSpan {
            offset: start,
            count: 0,
        };
    }

    /// Removes a tile's vertices and its slot, renumbering later tiles.
    pub fn erase_tile(&mut self, tile_index: usize) {
        self.erase_tile_vertices(tile_index);
        self.tiles.remove(tile_index);
    }

    /// Replaces a tile's vertices.
    ///
    /// When the replacement is a single run of the same length whose texture
    /// matches the component owning the tile's range, the vertices are
    /// overwritten in place; otherwise the old range is erased and the runs
    /// re-appended at the buffer's end.
    pub fn replace_tile_vertices(&mut self, tile_index: usize, runs: &[VertexRun]) {
        let span = self.tiles[tile_index];
        if let [run] = runs {
            if span.count > 0 && run.vertices.len() == span.count {
                if let Some(owner) = self.component_at(span.offset) {
                    if owner.texture == run.texture
                        && span.offset + span.count <= owner.offset + owner.count
                    {
                        self.vertices[span.offset..span.offset + span.count]
                            .copy_from_slice(&run.vertices);
                        return;
                    }
                }
            }
        }
        self.erase_tile_vertices(tile_index);
        for run in runs {
            self.append_tile_vertices(tile_index, &run.vertices, run.texture);
        }
    }

    /// Adds a constant offset to every vertex position. No structural change.
    pub fn translate_vertices(&mut self, offset: Vec2) {
        for v in &mut self.vertices {
            v.pos += offset;
        }
    }

    fn component_at(&self, offset: usize) -> Option<Component> {
        self.components
            .iter()
            .copied()
            .find(|c| c.offset <= offset && offset < c.offset + c.count)
    }

    /// Draws the layer: one mesh per component, bound to that component's
    /// texture. Hidden layers draw nothing.
    pub fn draw(&self, textures: &[Texture2D]) {
        if !self.visible {
            return;
        }
        for component in &self.components {
            let texture = &textures[component.texture.0 as usize];
            let mut start = component.offset;
            let end = component.offset + component.count;
            while start < end {
                let quads = ((end - start) / 4).min(MAX_QUADS_PER_MESH);
                if quads == 0 {
                    break;
                }
                let count = quads * 4;
                let vertices = self.vertices[start..start + count]
                    .iter()
                    .map(|v| Vertex::new(v.pos.x, v.pos.y, 0.0, v.uv.x, v.uv.y, WHITE))
                    .collect();
                let mut indices = Vec::with_capacity(quads * 6);
                for q in 0..quads {
                    let b = (q * 4) as u16;
                    indices.extend_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
                }
                draw_mesh(&Mesh {
                    vertices,
                    indices,
                    texture: Some(texture.clone()),
                });
                start += count;
            }
        }
    }
}

/// Maps a vertex coordinate across the removal of `[start, end)`.
fn collapse(p: usize, start: usize, end: usize) -> usize {
    if p <= start {
        p
    } else if p >= end {
        p - (end - start)
    } else {
        start
    }
}

/// Display layers keyed by track layer id, drawn in ascending order.
#[derive(Default)]
pub struct DisplayLayerMap {
    layers: BTreeMap<LayerId, DisplayLayer>,
}

impl DisplayLayerMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a layer.
    pub fn insert(&mut self, id: LayerId, layer: DisplayLayer) {
        self.layers.insert(id, layer);
    }

    /// Borrows a layer.
    pub fn get(&self, id: LayerId) -> Option<&DisplayLayer> {
        self.layers.get(&id)
    }

    /// Mutably borrows a layer for interactive edits.
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut DisplayLayer> {
        self.layers.get_mut(&id)
    }

    /// Layers in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &DisplayLayer)> {
        self.layers.iter().map(|(&id, layer)| (id, layer))
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when no layers exist.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Draws every visible layer in track layer order.
    pub fn draw(&self, textures: &[Texture2D]) {
        for layer in self.layers.values() {
            layer.draw(textures);
        }
    }
}
