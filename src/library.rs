//! Tile and tile-group definitions: what the track editor can place.
//!
//! A tile definition names a source image and a rectangle inside it; many
//! tiles usually share one image. A group is an ordered stamp of tiles with
//! relative offsets and rotations, expanded into concrete tiles before
//! rendering.

use std::collections::BTreeMap;
use std::path::Path;

use macroquad::prelude::*;
use serde::Deserialize;

use crate::atlas::PixelRect;
use crate::error::TrackError;

/// Identifier of one tile definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

/// Identifier of one tile group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u32);

/// One placeable tile: a rectangle cut from a source image.
#[derive(Debug, Clone)]
pub struct TileDefinition {
    /// Tile id, unique within the library
    pub id: TileId,
    /// Source image file, relative to the library's base directory
    pub image_file: String,
    /// Source rectangle within that image, in integer pixels
    pub image_rect: PixelRect,
}

/// One member of a group stamp.
#[derive(Debug, Clone, Copy)]
pub struct SubTile {
    /// The referenced tile
    pub tile: TileId,
    /// Offset relative to the stamp origin, in world units
    pub offset: Vec2,
    /// Rotation relative to the stamp, in radians
    pub angle: f32,
}

/// An ordered bundle of tiles placed together as one stamp.
#[derive(Debug, Clone)]
pub struct TileGroupDefinition {
    /// Group id, unique within the library
    pub id: GroupId,
    /// Members in draw order
    pub tiles: Vec<SubTile>,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    image: String,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Deserialize)]
struct JsonSubTile {
    id: u32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default)]
    rotation: f32,
}

#[derive(Deserialize)]
struct JsonGroup {
    id: u32,
    #[serde(default)]
    tiles: Vec<JsonSubTile>,
}

#[derive(Deserialize)]
struct JsonLibrary {
    tiles: Vec<JsonTile>,
    #[serde(default)]
    groups: Vec<JsonGroup>,
}

/// All tile and group definitions, enumerable in ascending id order.
#[derive(Debug)]
pub struct TileLibrary {
    tiles: BTreeMap<TileId, TileDefinition>,
    groups: BTreeMap<GroupId, TileGroupDefinition>,
}

impl TileLibrary {
    /// Builds a library from already-constructed definitions, validating ids
    /// and group references.
    pub fn from_parts(
        tiles: Vec<TileDefinition>,
        groups: Vec<TileGroupDefinition>,
    ) -> Result<Self, TrackError> {
        let mut tile_map = BTreeMap::new();
        for tile in tiles {
            let id = tile.id;
            if tile_map.insert(id, tile).is_some() {
                return Err(TrackError::DuplicateTile(id));
            }
        }
        let mut group_map = BTreeMap::new();
        for group in groups {
            for sub in &group.tiles {
                if !tile_map.contains_key(&sub.tile) {
                    return Err(TrackError::UnknownGroupTile {
                        group: group.id,
                        tile: sub.tile,
                    });
                }
            }
            let id = group.id;
            if group_map.insert(id, group).is_some() {
                return Err(TrackError::DuplicateGroup(id));
            }
        }
        Ok(TileLibrary {
            tiles: tile_map,
            groups: group_map,
        })
    }

    /// Decodes a library from JSON text.
    pub fn load_from_str(json: &str) -> Result<Self, TrackError> {
        let j: JsonLibrary = serde_json::from_str(json)?;
        Self::from_json(j)
    }

    /// Decodes a library from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(TrackError::UnsupportedFormat(
                path.display().to_string(),
            ));
        }
        let txt = std::fs::read_to_string(path).map_err(|source| TrackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let j: JsonLibrary = serde_json::from_str(&txt).map_err(|source| TrackError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(j)
    }

    fn from_json(j: JsonLibrary) -> Result<Self, TrackError> {
        let tiles = j
            .tiles
            .into_iter()
            .map(|t| TileDefinition {
                id: TileId(t.id),
                image_file: t.image,
                image_rect: PixelRect::new(t.x, t.y, t.width, t.height),
            })
            .collect();
        let groups = j
            .groups
            .into_iter()
            .map(|g| TileGroupDefinition {
                id: GroupId(g.id),
                tiles: g
                    .tiles
                    .into_iter()
                    .map(|s| SubTile {
                        tile: TileId(s.id),
                        offset: vec2(s.offsetx, s.offsety),
                        angle: s.rotation,
                    })
                    .collect(),
            })
            .collect();
        Self::from_parts(tiles, groups)
    }

    /// Looks up one tile definition.
    pub fn tile(&self, id: TileId) -> Option<&TileDefinition> {
        self.tiles.get(&id)
    }

    /// Looks up one group definition.
    pub fn group(&self, id: GroupId) -> Option<&TileGroupDefinition> {
        self.groups.get(&id)
    }

    /// All tiles in ascending id order.
    pub fn tiles(&self) -> impl Iterator<Item = &TileDefinition> {
        self.tiles.values()
    }

    /// All groups in ascending id order.
    pub fn groups(&self) -> impl Iterator<Item = &TileGroupDefinition> {
        self.groups.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("track_display_lib_{nanos}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    const LIBRARY_JSON: &str = r#"{
      "tiles": [
        {"id": 1, "image": "road.png", "x": 0, "y": 0, "width": 16, "height": 16},
        {"id": 2, "image": "road.png", "x": 16, "y": 0, "width": 16, "height": 16}
      ],
      "groups": [
        {"id": 1, "tiles": [
          {"id": 1},
          {"id": 2, "offsetx": 16.0, "rotation": 1.5707964}
        ]}
      ]
    }"#;

    #[test]
    fn parses_tiles_and_groups() {
        let lib = TileLibrary::load_from_str(LIBRARY_JSON).expect("decode");
        let t = lib.tile(TileId(2)).expect("tile 2");
        assert_eq!(t.image_file, "road.png");
        assert_eq!(t.image_rect, PixelRect::new(16, 0, 16, 16));

        let g = lib.group(GroupId(1)).expect("group 1");
        assert_eq!(g.tiles.len(), 2);
        assert_eq!(g.tiles[0].offset, vec2(0.0, 0.0));
        assert_eq!(g.tiles[1].tile, TileId(2));
        assert!((g.tiles[1].angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn tiles_enumerate_in_ascending_id_order() {
        let json = r#"{
          "tiles": [
            {"id": 9, "image": "a.png", "width": 8, "height": 8},
            {"id": 3, "image": "a.png", "width": 8, "height": 8},
            {"id": 7, "image": "a.png", "width": 8, "height": 8}
          ]
        }"#;
        let lib = TileLibrary::load_from_str(json).unwrap();
        let ids: Vec<u32> = lib.tiles().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![3, 7, 9]);
    }

    #[test]
    fn duplicate_tile_id_is_a_typed_error() {
        let json = r#"{
          "tiles": [
            {"id": 1, "image": "a.png", "width": 8, "height": 8},
            {"id": 1, "image": "b.png", "width": 8, "height": 8}
          ]
        }"#;
        let err = TileLibrary::load_from_str(json).unwrap_err();
        assert!(matches!(err, TrackError::DuplicateTile(TileId(1))));
    }

    #[test]
    fn dangling_group_reference_is_a_typed_error() {
        let json = r#"{
          "tiles": [{"id": 1, "image": "a.png", "width": 8, "height": 8}],
          "groups": [{"id": 4, "tiles": [{"id": 99}]}]
        }"#;
        let err = TileLibrary::load_from_str(json).unwrap_err();
        assert!(matches!(
            err,
            TrackError::UnknownGroupTile {
                group: GroupId(4),
                tile: TileId(99)
            }
        ));
    }

    #[test]
    fn returns_typed_error_for_malformed_json() {
        let err = TileLibrary::load_from_str("{ not json").unwrap_err();
        assert!(matches!(err, TrackError::Parse(_)));
    }

    #[test]
    fn load_from_file_reports_io_and_format_errors() {
        let dir = temp_dir();
        let err = TileLibrary::load_from_file(dir.join("missing.json")).unwrap_err();
        assert!(matches!(err, TrackError::Io { .. }));

        let err = TileLibrary::load_from_file(dir.join("library.xml")).unwrap_err();
        assert!(matches!(err, TrackError::UnsupportedFormat(_)));

        let path = dir.join("library.json");
        fs::write(&path, LIBRARY_JSON).expect("failed to write library");
        let lib = TileLibrary::load_from_file(&path).expect("decode");
        assert!(lib.tile(TileId(1)).is_some());
    }
}
