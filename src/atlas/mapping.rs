//! Tile mapping: packs every tile's source region onto atlas pages,
//! composites the pages, and answers `find_tile` lookups with placement or
//! fragment records.
//!
//! The build is split in two stages. `TileAtlas::build` is pure CPU work
//! (packing, pixel compositing, record tables) and runs on the loading path;
//! `TileMapping::upload` turns the composites into textures and needs a
//! rendering context. Both the pages and the records are immutable once built
//! and are discarded wholesale on the next load.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use log::info;
use macroquad::prelude::*;

use super::overlap;
use super::packer::{AtlasPacker, Placed};
use super::page::ImageId;
use super::rect::PixelRect;
use super::TextureId;
use crate::error::TrackError;
use crate::images::ImageLoader;
use crate::library::{TileDefinition, TileId, TileLibrary};

/// Default atlas page side. The effective size is the smaller of this and the
/// platform texture cap; pass a smaller `texture_size` to the build functions
/// on platforms that cannot take 2048.
pub const ATLAS_SIZE: u32 = 2048;

/// One whole-tile destination on an atlas page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlacement {
    /// Page texture holding the tile
    pub texture: TextureId,
    /// Destination rectangle on that page
    pub dest: PixelRect,
}

/// One piece of a tile that was split across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFragment {
    /// Page texture holding this piece
    pub texture: TextureId,
    /// Piece rectangle relative to the tile's own origin
    pub local: PixelRect,
    /// Destination rectangle on the piece's page
    pub dest: PixelRect,
}

/// Every record owned by one tile id: either whole-tile placements (possibly
/// duplicated across pages) or a run of fragments that retile the tile.
#[derive(Debug, Clone)]
pub enum TileEntry {
    /// One or more whole-tile placements
    Placed(Vec<TilePlacement>),
    /// Two or more fragments; their `local` rects tile the tile losslessly
    Fragmented(Vec<TileFragment>),
}

/// Result of a `find_tile` lookup.
#[derive(Debug, Clone, Copy)]
pub enum TileRecords<'a> {
    /// Draw this single placement.
    Placement(&'a TilePlacement),
    /// Draw every fragment to reconstruct the tile.
    Fragments(&'a [TileFragment]),
    /// Unknown tile id: draw nothing.
    Missing,
}

/// Composited atlas pages plus the tile-id record table. GPU-free.
pub struct TileAtlas {
    texture_size: u32,
    pages: Vec<Image>,
    entries: BTreeMap<TileId, TileEntry>,
}

impl TileAtlas {
    /// Packs and composites every tile of `library` into atlas pages.
    ///
    /// `images` must hold a decoded image for every `image_file` the library
    /// references. Groups are processed in ascending id order with their
    /// members in listed order, then remaining tiles in ascending id order,
    /// so group members cluster on the same pages.
    pub fn build(
        library: &TileLibrary,
        images: &HashMap<String, Image>,
        texture_size: u32,
    ) -> Result<TileAtlas, TrackError> {
        let mut files: Vec<&str> = library.tiles().map(|t| t.image_file.as_str()).collect();
        files.sort_unstable();
        files.dedup();

        let mut file_ids: HashMap<&str, ImageId> = HashMap::new();
        for (i, file) in files.iter().enumerate() {
            if !images.contains_key(*file) {
                return Err(TrackError::MissingImage((*file).to_owned()));
            }
            file_ids.insert(file, ImageId(i));
        }

        let mut by_image: Vec<Vec<PixelRect>> = vec![Vec::new(); files.len()];
        for tile in library.tiles() {
            by_image[file_ids[tile.image_file.as_str()].0].push(tile.image_rect);
        }
        let clusters: Vec<Vec<PixelRect>> =
            by_image.iter().map(|r| overlap::merge_rects(r)).collect();

        let mut packer = AtlasPacker::new(texture_size);
        let mut entries: BTreeMap<TileId, TileEntry> = BTreeMap::new();

        for group in library.groups() {
            let grouped = group.tiles.len() > 1;
            for sub in &group.tiles {
                if let Some(tile) = library.tile(sub.tile) {
                    place_tile(&mut packer, &mut entries, &file_ids, &clusters, tile, grouped);
                }
            }
        }
        for tile in library.tiles() {
            if !entries.contains_key(&tile.id) {
                place_tile(&mut packer, &mut entries, &file_ids, &clusters, tile, false);
            }
        }

        let side = texture_size as u16;
        let mut pages = Vec::with_capacity(packer.pages().len());
        for page in packer.pages() {
            let mut composite = Image::gen_image_color(side, side, BLANK);
            for (image, source, dest) in page.placements() {
                blit(&mut composite, &images[files[image.0]], source, dest);
            }
            pages.push(composite);
        }

        info!(
            "tile atlas: {} tiles on {} page(s) of {}px",
            entries.len(),
            pages.len(),
            texture_size
        );
        Ok(TileAtlas {
            texture_size,
            pages,
            entries,
        })
    }

    /// Page side length in pixels.
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Composited page images, in texture-id order.
    pub fn pages(&self) -> &[Image] {
        &self.pages
    }

    /// The raw record entry for a tile id.
    pub fn entry(&self, id: TileId) -> Option<&TileEntry> {
        self.entries.get(&id)
    }

    /// Looks up the records needed to draw `id`.
    ///
    /// For duplicated tiles the placement on `hint`'s texture wins when
    /// present, keeping consecutive tiles on one texture; otherwise any
    /// placement is visually equivalent and the first is returned.
    pub fn find_tile(&self, id: TileId, hint: Option<TextureId>) -> TileRecords<'_> {
        match self.entries.get(&id) {
            None => TileRecords::Missing,
            Some(TileEntry::Placed(list)) => {
                let preferred = hint
                    .and_then(|h| list.iter().find(|p| p.texture == h))
                    .or_else(|| list.first());
                match preferred {
                    Some(p) => TileRecords::Placement(p),
                    None => TileRecords::Missing,
                }
            }
            Some(TileEntry::Fragmented(list)) => TileRecords::Fragments(list),
        }
    }
}

fn place_tile(
    packer: &mut AtlasPacker,
    entries: &mut BTreeMap<TileId, TileEntry>,
    file_ids: &HashMap<&str, ImageId>,
    clusters: &[Vec<PixelRect>],
    tile: &TileDefinition,
    grouped: bool,
) {
    let image = file_ids[tile.image_file.as_str()];
    let rect = tile.image_rect;
    let Some(encl) = overlap::enclosing_for(&clusters[image.0], &rect) else {
        // every non-empty tile rect lies in exactly one cluster by construction
        return;
    };

    match packer.place(image, encl, grouped) {
        Placed::Whole { texture, dest } => {
            let tile_dest = PixelRect::new(
                dest.x + (rect.x - encl.x),
                dest.y + (rect.y - encl.y),
                rect.w,
                rect.h,
            );
            push_placement(
                entries,
                tile.id,
                TilePlacement {
                    texture,
                    dest: tile_dest,
                },
            );
        }
        Placed::Split(pieces) => {
            let mut frags = Vec::new();
            for piece in &pieces {
                let inter = piece.source.intersection(&rect);
                if inter.is_empty() {
                    continue;
                }
                frags.push(TileFragment {
                    texture: piece.texture,
                    local: inter.translate(-rect.x, -rect.y),
                    dest: PixelRect::new(
                        piece.dest.x + (inter.x - piece.source.x),
                        piece.dest.y + (inter.y - piece.source.y),
                        inter.w,
                        inter.h,
                    ),
                });
            }
            frags.sort_by_key(|f| (f.local.y, f.local.x));

            if let [only] = frags.as_slice() {
                if only.local == PixelRect::new(0, 0, rect.w, rect.h) {
                    // the tile fits inside a single piece: a plain placement
                    let record = TilePlacement {
                        texture: only.texture,
                        dest: only.dest,
                    };
                    push_placement(entries, tile.id, record);
                    return;
                }
            }
            entries.entry(tile.id).or_insert(TileEntry::Fragmented(frags));
        }
    }
}

fn push_placement(entries: &mut BTreeMap<TileId, TileEntry>, id: TileId, placement: TilePlacement) {
    match entries
        .entry(id)
        .or_insert_with(|| TileEntry::Placed(Vec::new()))
    {
        TileEntry::Placed(list) => {
            if !list.iter().any(|p| p.texture == placement.texture) {
                list.push(placement);
            }
        }
        TileEntry::Fragmented(_) => {}
    }
}

/// Copies `source` of `src` onto `dst` at `dest`, clamped to both images.
fn blit(dst: &mut Image, src: &Image, source: PixelRect, dest: PixelRect) {
    let sw = src.width as i32;
    let dw = dst.width as i32;
    let w = source.w.min(sw - source.x).min(dw - dest.x);
    let rows = source
        .h
        .min(src.height as i32 - source.y)
        .min(dst.height as i32 - dest.y);
    if w <= 0 || rows <= 0 || source.x < 0 || source.y < 0 || dest.x < 0 || dest.y < 0 {
        return;
    }
    let span = (w * 4) as usize;
    for row in 0..rows {
        let s = (((source.y + row) * sw + source.x) * 4) as usize;
        let d = (((dest.y + row) * dw + dest.x) * 4) as usize;
        dst.bytes[d..d + span].copy_from_slice(&src.bytes[s..s + span]);
    }
}

/// A finished tile mapping: the atlas records plus one texture per page.
pub struct TileMapping {
    atlas: TileAtlas,
    textures: Vec<Texture2D>,
}

impl TileMapping {
    /// Converts every composited page into a texture.
    ///
    /// A page with invalid dimensions raises `TrackError::TextureCreation`,
    /// aborting the whole build; no partial mapping is returned.
    pub fn upload(atlas: TileAtlas) -> Result<TileMapping, TrackError> {
        let mut textures = Vec::with_capacity(atlas.pages.len());
        for (i, page) in atlas.pages.iter().enumerate() {
            let (w, h) = (page.width as u32, page.height as u32);
            if w == 0 || h == 0 || w != atlas.texture_size || h != atlas.texture_size {
                return Err(TrackError::TextureCreation {
                    page: i,
                    width: w,
                    height: h,
                });
            }
            let texture = Texture2D::from_image(page);
            texture.set_filter(FilterMode::Nearest);
            textures.push(texture);
        }
        Ok(TileMapping { atlas, textures })
    }

    /// Loads every referenced image, builds the atlas and uploads it.
    pub async fn load(
        library: &TileLibrary,
        loader: &mut ImageLoader,
        texture_size: u32,
    ) -> anyhow::Result<TileMapping> {
        for tile in library.tiles() {
            loader.load(&tile.image_file).await?;
        }
        let atlas = TileAtlas::build(library, loader.images(), texture_size)
            .context("Building tile atlas")?;
        let mapping = Self::upload(atlas).context("Creating atlas textures")?;
        Ok(mapping)
    }

    /// The GPU-free atlas records (packing, composites, lookups).
    pub fn atlas(&self) -> &TileAtlas {
        &self.atlas
    }

    /// Looks up the records needed to draw `id`.
    pub fn find_tile(&self, id: TileId, hint: Option<TextureId>) -> TileRecords<'_> {
        self.atlas.find_tile(id, hint)
    }

    /// Page textures in texture-id order, for `DisplayLayer::draw`.
    pub fn textures(&self) -> &[Texture2D] {
        &self.textures
    }

    /// The texture behind a handle.
    pub fn texture(&self, id: TextureId) -> &Texture2D {
        &self.textures[id.0 as usize]
    }

    /// Page side length in pixels.
    pub fn texture_size(&self) -> u32 {
        self.atlas.texture_size
    }
}
