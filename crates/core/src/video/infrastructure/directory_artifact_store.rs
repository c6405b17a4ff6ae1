use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::video::domain::artifact_store::{is_valid_artifact_name, ArtifactStore};

/// Stores artifacts as files in a single output directory.
///
/// Bytes are written to a hidden temporary file and renamed into place, so a
/// failed write never leaves a file under the artifact's name.
pub struct DirectoryArtifactStore {
    root: PathBuf,
}

impl DirectoryArtifactStore {
    /// Creates the directory if it does not exist yet.
    pub fn new(root: &Path) -> Result<Self, std::io::Error> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for DirectoryArtifactStore {
    fn store(&self, bytes: &[u8], name: &str) -> Result<String, Box<dyn std::error::Error>> {
        if !is_valid_artifact_name(name) {
            return Err(format!("invalid artifact name: {name:?}").into());
        }
        let dest = self.root.join(name);

        let mut staged = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(&self.root)?;
        staged.write_all(bytes)?;
        staged.flush()?;
        staged.persist_noclobber(&dest).map_err(|e| e.error)?;

        Ok(dest.display().to_string())
    }

    fn locate(&self, name: &str) -> Option<String> {
        if !is_valid_artifact_name(name) {
            return None;
        }
        let path = self.root.join(name);
        path.is_file().then(|| path.display().to_string())
    }
}
