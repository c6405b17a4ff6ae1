pub mod ffmpeg_audio_decoder;
pub mod whisper_recognizer;
