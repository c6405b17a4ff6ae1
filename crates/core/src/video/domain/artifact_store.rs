/// Persistence boundary for finished videos.
///
/// A stored artifact must be retrievable by the exact name it was stored
/// under. Implementations must be safe for concurrent use.
pub trait ArtifactStore: Send + Sync {
    /// Persists `bytes` under `name` and returns its location (path or URI).
    fn store(&self, bytes: &[u8], name: &str) -> Result<String, Box<dyn std::error::Error>>;

    /// Location of a previously stored artifact, or `None` if unknown.
    fn locate(&self, name: &str) -> Option<String>;
}

/// True when `name` is a bare file name: no separators, no parent
/// references, not empty.
pub fn is_valid_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !name.starts_with('.')
}
