use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_BASE_FRAMES_PER_CHAR, DEFAULT_FADE_FRAMES, DEFAULT_FPS, DEFAULT_OUTPUT_HEIGHT,
    DEFAULT_OUTPUT_WIDTH, MAX_FRAMES_PER_CHAR,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine the user config directory")]
    NoConfigDir,
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Preferred output encoder. The writer falls back to MPEG-4 when the
/// preferred one is not linked into ffmpeg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Mpeg4,
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoCodec::H264 => write!(f, "h264"),
            VideoCodec::Mpeg4 => write!(f, "mpeg4"),
        }
    }
}

/// Output video parameters shared by the scheduler and the assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub base_frames_per_char: u32,
    pub fade_frames: u32,
    pub codec: VideoCodec,
    /// Draw the uppercase letter under each gesture.
    pub caption_letters: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_OUTPUT_WIDTH,
            height: DEFAULT_OUTPUT_HEIGHT,
            fps: DEFAULT_FPS,
            base_frames_per_char: DEFAULT_BASE_FRAMES_PER_CHAR,
            fade_frames: DEFAULT_FADE_FRAMES,
            codec: VideoCodec::H264,
            caption_letters: true,
        }
    }
}

impl RenderSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("SignVideo").join("settings.json"))
    }

    /// Reads and validates settings from a JSON file. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads the per-user settings file, falling back to defaults when it is
    /// absent or unreadable.
    pub fn load_or_default() -> Self {
        Self::config_path()
            .filter(|path| path.exists())
            .and_then(|path| match Self::load(&path) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::warn!("Ignoring user settings: {e}");
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Writes the settings to the per-user settings file and returns its path.
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes the settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        let write_err = |source: std::io::Error| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width == 0 || self.height == 0 {
            return Err(SettingsError::Invalid(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        // YUV 4:2:0 subsampling needs even dimensions.
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(SettingsError::Invalid(format!(
                "resolution must be even, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(SettingsError::Invalid("fps must be positive".into()));
        }
        if self.base_frames_per_char == 0 || self.base_frames_per_char > MAX_FRAMES_PER_CHAR {
            return Err(SettingsError::Invalid(format!(
                "base_frames_per_char must be between 1 and {MAX_FRAMES_PER_CHAR}, got {}",
                self.base_frames_per_char
            )));
        }
        Ok(())
    }
}
