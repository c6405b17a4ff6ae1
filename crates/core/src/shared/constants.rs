/// Characters that can carry a gesture image: lowercase ASCII letters and digits.
pub const SUPPORTED_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const DEFAULT_OUTPUT_WIDTH: u32 = 480;
pub const DEFAULT_OUTPUT_HEIGHT: u32 = 640;
pub const DEFAULT_FPS: u32 = 20;

/// Screen time for one character at speed 1.0 (1.5 seconds at 20 fps).
pub const DEFAULT_BASE_FRAMES_PER_CHAR: u32 = 30;

/// Longest a single character may be held: ten minutes at 20 fps.
pub const MAX_FRAMES_PER_CHAR: u32 = 12_000;

pub const DEFAULT_FADE_FRAMES: u32 = 2;

pub const ARTIFACT_PREFIX: &str = "sign_video";
pub const ARTIFACT_EXTENSION: &str = "mp4";

pub const SPEECH_SAMPLE_RATE: u32 = 16000;

pub const WHISPER_MODEL_NAME: &str = "ggml-tiny.en.bin";
pub const WHISPER_MODEL_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.en.bin";
