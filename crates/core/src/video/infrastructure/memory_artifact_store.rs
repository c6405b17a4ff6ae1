use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::video::domain::artifact_store::{is_valid_artifact_name, ArtifactStore};

/// Keeps artifacts in memory under `memory://<name>` locations.
#[derive(Clone, Default)]
pub struct MemoryArtifactStore {
    artifacts: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.artifacts.lock().ok()?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn store(&self, bytes: &[u8], name: &str) -> Result<String, Box<dyn std::error::Error>> {
        if !is_valid_artifact_name(name) {
            return Err(format!("invalid artifact name: {name:?}").into());
        }
        let mut artifacts = self
            .artifacts
            .lock()
            .map_err(|_| "artifact store lock poisoned")?;
        if artifacts.contains_key(name) {
            return Err(format!("artifact already exists: {name}").into());
        }
        artifacts.insert(name.to_string(), bytes.to_vec());
        Ok(format!("memory://{name}"))
    }

    fn locate(&self, name: &str) -> Option<String> {
        let artifacts = self.artifacts.lock().ok()?;
        artifacts
            .contains_key(name)
            .then(|| format!("memory://{name}"))
    }
}
