use std::path::PathBuf;
use std::{error, fmt, io};

use serde_json::Error as JsonError;

use crate::library::{GroupId, TileId};

/// Error type for tile-library loading and atlas construction.
#[derive(Debug)]
pub enum TrackError {
    /// JSON parse error with no file context (string input)
    Parse(JsonError),
    /// JSON parse error for a library file
    Json {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying serde error
        source: JsonError,
    },
    /// File I/O error
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// Unsupported file format (non-JSON)
    UnsupportedFormat(String),
    /// Two tile definitions share one id
    DuplicateTile(TileId),
    /// Two group definitions share one id
    DuplicateGroup(GroupId),
    /// A group references a tile id the library does not define
    UnknownGroupTile {
        /// Group holding the dangling reference
        group: GroupId,
        /// The missing tile id
        tile: TileId,
    },
    /// A tile definition names an image that was never decoded
    MissingImage(String),
    /// An atlas composite could not be turned into a texture
    TextureCreation {
        /// Index of the failing atlas page
        page: usize,
        /// Composite width in pixels
        width: u32,
        /// Composite height in pixels
        height: u32,
    },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::Parse(err) => write!(f, "JSON parse error: {}", err),
            TrackError::Json { path, source } => {
                write!(f, "Failed to parse {}: {}", path.display(), source)
            }
            TrackError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            TrackError::UnsupportedFormat(path) => {
                write!(f, "Unsupported file format: {}", path)
            }
            TrackError::DuplicateTile(id) => write!(f, "Duplicate tile id {}", id.0),
            TrackError::DuplicateGroup(id) => write!(f, "Duplicate group id {}", id.0),
            TrackError::UnknownGroupTile { group, tile } => {
                write!(f, "Group {} references unknown tile {}", group.0, tile.0)
            }
            TrackError::MissingImage(file) => {
                write!(f, "No decoded image for {}", file)
            }
            TrackError::TextureCreation {
                page,
                width,
                height,
            } => write!(
                f,
                "Cannot create texture for atlas page {} ({}x{})",
                page, width, height
            ),
        }
    }
}

impl From<JsonError> for TrackError {
    fn from(err: JsonError) -> Self {
        TrackError::Parse(err)
    }
}

impl error::Error for TrackError {}
