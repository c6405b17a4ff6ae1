use chrono::{DateTime, Local};

use crate::shared::constants::{ARTIFACT_EXTENSION, ARTIFACT_PREFIX};
use crate::shared::video_metadata::VideoMetadata;

/// A finished, stored sign video and what produced it.
#[derive(Clone, Debug)]
pub struct VideoArtifact {
    pub name: String,
    pub location: String,
    pub transcript: String,
    pub created_at: DateTime<Local>,
    pub metadata: VideoMetadata,
}

/// `sign_video_<YYYYmmdd_HHMMSS>_<16 hex digits>.mp4`
///
/// The random suffix keeps names unique across concurrent requests that
/// share a timestamp.
pub fn artifact_name(created_at: &DateTime<Local>, suffix: u64) -> String {
    format!(
        "{ARTIFACT_PREFIX}_{}_{suffix:016x}.{ARTIFACT_EXTENSION}",
        created_at.format("%Y%m%d_%H%M%S")
    )
}
