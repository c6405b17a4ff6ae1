use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use thiserror::Error;

use super::gesture_image::{gesture_key, GestureImage};

#[derive(Error, Debug)]
pub enum RegistryLoadError {
    #[error("sign image directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("failed to read sign image directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no usable sign images found in {0}")]
    Empty(PathBuf),
}

/// Immutable index of gesture images keyed by lowercase letter or digit.
///
/// Built once at startup and shared read-only between concurrent requests.
#[derive(Debug)]
pub struct SignImageRegistry {
    images: HashMap<char, GestureImage>,
    source: PathBuf,
}

impl SignImageRegistry {
    /// Builds a registry from already-decoded images. Later images replace
    /// earlier ones with the same key.
    pub fn from_images(
        images: impl IntoIterator<Item = GestureImage>,
        source: PathBuf,
    ) -> Result<Self, RegistryLoadError> {
        let images: HashMap<char, GestureImage> =
            images.into_iter().map(|img| (img.key(), img)).collect();
        if images.is_empty() {
            return Err(RegistryLoadError::Empty(source));
        }
        Ok(Self { images, source })
    }

    /// Case-insensitive lookup. Anything other than an ASCII letter or digit
    /// is never found.
    pub fn lookup(&self, c: char) -> Option<&GestureImage> {
        gesture_key(c).and_then(|key| self.images.get(&key))
    }

    pub fn contains(&self, c: char) -> bool {
        self.lookup(c).is_some()
    }

    pub fn supported_characters(&self) -> BTreeSet<char> {
        self.images.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Directory (or other origin) the images were loaded from.
    pub fn source(&self) -> &std::path::Path {
        &self.source
    }
}
