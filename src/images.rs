//! Decoded source images, memoized by file name.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use macroquad::prelude::*;

/// Loads and caches the source images tile definitions reference. Decoding
/// happens once per file; the atlas build reads the cached buffers.
pub struct ImageLoader {
    base_dir: PathBuf,
    cache: HashMap<String, Image>,
}

impl ImageLoader {
    /// Creates a loader resolving file names against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ImageLoader {
            base_dir: base_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Loads and decodes `file`, or returns the cached copy.
    pub async fn load(&mut self, file: &str) -> anyhow::Result<&Image> {
        if !self.cache.contains_key(file) {
            let path = self.base_dir.join(file);
            let path = path.to_str().context("Non-UTF-8 image path")?;
            let image = load_image(path)
                .await
                .with_context(|| format!("Loading image {}", file))?;
            self.cache.insert(file.to_owned(), image);
        }
        Ok(&self.cache[file])
    }

    /// Registers an already-decoded image under `file`.
    pub fn insert(&mut self, file: impl Into<String>, image: Image) {
        self.cache.insert(file.into(), image);
    }

    /// The cached image for `file`, if already loaded.
    pub fn get(&self, file: &str) -> Option<&Image> {
        self.cache.get(file)
    }

    /// Every decoded image, keyed by file name.
    pub fn images(&self) -> &HashMap<String, Image> {
        &self.cache
    }
}
