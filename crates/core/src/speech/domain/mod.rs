pub mod audio_decoder;
pub mod audio_segment;
pub mod speech_recognizer;
pub mod transcriber;
pub mod transcript;
