use std::borrow::Cow;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use thiserror::Error;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::ARTIFACT_EXTENSION;
use crate::shared::frame::Frame;
use crate::shared::render_settings::RenderSettings;
use crate::shared::video_metadata::VideoMetadata;
use crate::signs::domain::frame_scheduler::{total_frames, FrameSource, FrameSpec};
use crate::signs::domain::sign_registry::SignImageRegistry;
use crate::signs::infrastructure::letter_caption::LetterCaption;
use crate::video::domain::artifact_store::ArtifactStore;
use crate::video::domain::video_artifact::{artifact_name, VideoArtifact};
use crate::video::domain::video_writer::{VideoWriter, WriterFactory};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("frame plan produces no frames")]
    EmptyPlan,
    #[error("failed to create staging file: {0}")]
    Staging(String),
    #[error("failed to open video output: {0}")]
    Open(String),
    #[error("gesture image for {key:?} cannot be rendered: {message}")]
    Render { key: char, message: String },
    #[error("failed to write frame {frame}: {message}")]
    Write { frame: usize, message: String },
    #[error("failed to finalize video: {0}")]
    Finalize(String),
    #[error("failed to store artifact {name}: {message}")]
    Store { name: String, message: String },
}

/// Opacity of frame `position` within a segment of `duration` frames:
/// ramps up over the first `fade_frames`, and down over the last
/// `fade_frames` when `fade_out` is set. Fades never exceed half the segment.
pub fn fade_alpha(position: u32, duration: u32, fade_frames: u32, fade_out: bool) -> f32 {
    let fade = fade_frames.min(duration / 2);
    if fade == 0 {
        return 1.0;
    }
    if position < fade {
        return position as f32 / fade as f32;
    }
    if fade_out && position >= duration - fade {
        return (duration - position) as f32 / fade as f32;
    }
    1.0
}

/// Expands a frame plan into an encoded video and hands it to the artifact
/// store.
///
/// Encoding goes to a private staging file; only a fully written and
/// finalized video is ever stored, so an error never leaves an artifact
/// behind under the generated name.
pub struct VideoAssembler {
    settings: RenderSettings,
    writer_factory: WriterFactory,
    store: Arc<dyn ArtifactStore>,
    caption: Option<LetterCaption>,
}

impl VideoAssembler {
    pub fn new(
        settings: RenderSettings,
        writer_factory: WriterFactory,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let caption = if settings.caption_letters {
            match LetterCaption::new() {
                Ok(caption) => Some(caption),
                Err(e) => {
                    log::warn!("Letter captions disabled, font failed to load: {e}");
                    None
                }
            }
        } else {
            None
        };
        Self {
            settings,
            writer_factory,
            store,
            caption,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    pub fn assemble(
        &self,
        plan: &[FrameSpec],
        registry: &SignImageRegistry,
        transcript: &str,
        logger: &mut dyn PipelineLogger,
    ) -> Result<VideoArtifact, EncodingError> {
        let total = total_frames(plan);
        if total == 0 {
            return Err(EncodingError::EmptyPlan);
        }

        let created_at = Local::now();
        let name = artifact_name(&created_at, rand::random());

        let staging = tempfile::Builder::new()
            .prefix("sign-video-")
            .suffix(&format!(".{ARTIFACT_EXTENSION}"))
            .tempfile()
            .map_err(|e| EncodingError::Staging(e.to_string()))?;

        let mut metadata = VideoMetadata {
            width: self.settings.width,
            height: self.settings.height,
            fps: f64::from(self.settings.fps),
            total_frames: total,
            codec: self.settings.codec.to_string(),
        };

        let encode_start = Instant::now();
        let mut writer = (self.writer_factory)();
        metadata.codec = writer
            .open(staging.path(), &metadata)
            .map_err(|e| EncodingError::Open(e.to_string()))?;

        let written = self.write_plan(writer.as_mut(), plan, registry, total, logger);
        let closed = writer.close();
        written?;
        closed.map_err(|e| EncodingError::Finalize(e.to_string()))?;
        logger.timing("encode", encode_start.elapsed().as_secs_f64() * 1000.0);
        logger.metric("frames", total as f64);

        let store_start = Instant::now();
        let bytes =
            fs::read(staging.path()).map_err(|e| EncodingError::Finalize(e.to_string()))?;
        let location = self
            .store
            .store(&bytes, &name)
            .map_err(|e| EncodingError::Store {
                name: name.clone(),
                message: e.to_string(),
            })?;
        logger.timing("store", store_start.elapsed().as_secs_f64() * 1000.0);

        Ok(VideoArtifact {
            name,
            location,
            transcript: transcript.to_string(),
            created_at,
            metadata,
        })
    }

    fn write_plan(
        &self,
        writer: &mut dyn VideoWriter,
        plan: &[FrameSpec],
        registry: &SignImageRegistry,
        total: usize,
        logger: &mut dyn PipelineLogger,
    ) -> Result<(), EncodingError> {
        let (width, height) = (self.settings.width, self.settings.height);
        let blank = Frame::solid(width, height, 0);
        let last_segment = plan.len().saturating_sub(1);
        let mut index = 0usize;

        for (segment, spec) in plan.iter().enumerate() {
            // A gesture missing from the registry renders like a placeholder.
            let image = match spec.source {
                FrameSource::Gesture(key) => match registry.lookup(key) {
                    Some(gesture) => Some(
                        self.render_gesture(gesture.frame(), key, width, height)
                            .map_err(|message| EncodingError::Render { key, message })?,
                    ),
                    None => None,
                },
                FrameSource::Placeholder => None,
            };

            for position in 0..spec.duration {
                let frame = match &image {
                    Some(img) => {
                        let alpha = fade_alpha(
                            position,
                            spec.duration,
                            self.settings.fade_frames,
                            segment != last_segment,
                        );
                        if alpha < 1.0 {
                            img.faded(alpha, index)
                        } else {
                            img.with_index(index)
                        }
                    }
                    None => blank.with_index(index),
                };
                writer
                    .write(&frame)
                    .map_err(|e| EncodingError::Write {
                        frame: index,
                        message: e.to_string(),
                    })?;
                index += 1;
                logger.progress(index, total);
            }
        }
        Ok(())
    }

    /// The gesture at output size, captioned when enabled. Captions are
    /// burned in before fading so they fade with the image.
    fn render_gesture<'a>(
        &self,
        frame: &'a Frame,
        key: char,
        width: u32,
        height: u32,
    ) -> Result<Cow<'a, Frame>, String> {
        let fitted = fit_to(frame, width, height)?;
        match &self.caption {
            Some(caption) => Ok(Cow::Owned(caption.render(&fitted, key)?)),
            None => Ok(fitted),
        }
    }
}

/// Returns `frame` at exactly `width`x`height`, resizing when needed.
fn fit_to(frame: &Frame, width: u32, height: u32) -> Result<Cow<'_, Frame>, String> {
    if frame.channels() != 3 {
        return Err(format!("expected RGB, got {} channels", frame.channels()));
    }
    if frame.width() == width && frame.height() == height {
        return Ok(Cow::Borrowed(frame));
    }
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("frame data does not match its dimensions")?;
    let resized =
        image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
    Ok(Cow::Owned(Frame::new(resized.into_raw(), width, height, 3, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::signs::domain::gesture_image::GestureImage;
    use crate::video::infrastructure::memory_artifact_store::MemoryArtifactStore;
    use rstest::rstest;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    // --- Stubs ---

    #[derive(Default)]
    struct Recording {
        opened: usize,
        closed: usize,
        frames: Vec<(u32, u32, u8)>, // width, height, first byte
        last_frame: Option<Frame>,
        metadata: Option<VideoMetadata>,
    }

    struct RecordingWriter {
        log: Arc<Mutex<Recording>>,
        path: Option<PathBuf>,
        fail_open: bool,
        fail_at_frame: Option<usize>,
    }

    impl VideoWriter for RecordingWriter {
        fn open(
            &mut self,
            path: &Path,
            metadata: &VideoMetadata,
        ) -> Result<String, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("destination not writable".into());
            }
            let mut log = self.log.lock().unwrap();
            log.opened += 1;
            log.metadata = Some(metadata.clone());
            self.path = Some(path.to_path_buf());
            Ok("stubcodec".to_string())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            let mut log = self.log.lock().unwrap();
            if Some(log.frames.len()) == self.fail_at_frame {
                return Err("disk full".into());
            }
            log.frames
                .push((frame.width(), frame.height(), frame.data()[0]));
            log.last_frame = Some(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().closed += 1;
            if let Some(path) = self.path.take() {
                std::fs::write(path, b"fake video")?;
            }
            Ok(())
        }
    }

    fn factory(
        log: &Arc<Mutex<Recording>>,
        fail_open: bool,
        fail_at_frame: Option<usize>,
    ) -> WriterFactory {
        let log = log.clone();
        Box::new(move || -> Box<dyn VideoWriter> {
            Box::new(RecordingWriter {
                log: log.clone(),
                path: None,
                fail_open,
                fail_at_frame,
            })
        })
    }

    // --- Helpers ---

    fn settings(fade_frames: u32) -> RenderSettings {
        RenderSettings {
            width: 8,
            height: 6,
            fps: 20,
            base_frames_per_char: 3,
            fade_frames,
            caption_letters: false,
            ..RenderSettings::default()
        }
    }

    fn registry(entries: &[(char, u8)]) -> SignImageRegistry {
        SignImageRegistry::from_images(
            entries
                .iter()
                .map(|&(k, v)| GestureImage::new(k, Frame::solid(8, 6, v)).unwrap()),
            PathBuf::from("mem"),
        )
        .unwrap()
    }

    fn gesture(key: char, duration: u32) -> FrameSpec {
        FrameSpec {
            source: FrameSource::Gesture(key),
            duration,
        }
    }

    fn placeholder(duration: u32) -> FrameSpec {
        FrameSpec {
            source: FrameSource::Placeholder,
            duration,
        }
    }

    fn assembler(
        fade_frames: u32,
        log: &Arc<Mutex<Recording>>,
        store: &MemoryArtifactStore,
    ) -> VideoAssembler {
        VideoAssembler::new(
            settings(fade_frames),
            factory(log, false, None),
            Arc::new(store.clone()),
        )
    }

    // --- fade_alpha ---

    #[rstest]
    #[case::no_fade(0, 6, 0, true, 1.0)]
    #[case::fade_in_start(0, 6, 2, true, 0.0)]
    #[case::fade_in_mid(1, 6, 2, true, 0.5)]
    #[case::hold(2, 6, 2, true, 1.0)]
    #[case::fade_out_start(4, 6, 2, true, 1.0)]
    #[case::fade_out_end(5, 6, 2, true, 0.5)]
    #[case::last_segment_holds(5, 6, 2, false, 1.0)]
    #[case::clamped_to_half(0, 1, 2, true, 1.0)]
    fn test_fade_alpha(
        #[case] position: u32,
        #[case] duration: u32,
        #[case] fade: u32,
        #[case] fade_out: bool,
        #[case] expected: f32,
    ) {
        assert_eq!(fade_alpha(position, duration, fade, fade_out), expected);
    }

    // --- assemble ---

    #[test]
    fn test_empty_plan_is_encoding_error_without_side_effects() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);

        let result = asm.assemble(&[], &registry(&[('h', 1)]), "", &mut NullPipelineLogger);
        assert_eq!(result.unwrap_err(), EncodingError::EmptyPlan);
        assert_eq!(log.lock().unwrap().opened, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_two_glyphs_write_sum_of_durations() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);

        let artifact = asm
            .assemble(
                &[gesture('h', 3), gesture('i', 3)],
                &registry(&[('h', 10), ('i', 20)]),
                "hi",
                &mut NullPipelineLogger,
            )
            .unwrap();

        let log = log.lock().unwrap();
        let firsts: Vec<u8> = log.frames.iter().map(|f| f.2).collect();
        assert_eq!(firsts, vec![10, 10, 10, 20, 20, 20]);
        assert_eq!(log.closed, 1);
        assert_eq!(artifact.transcript, "hi");
        assert_eq!(artifact.metadata.total_frames, 6);
        assert_eq!(artifact.metadata.codec, "stubcodec");
        assert_eq!(store.get(&artifact.name).unwrap(), b"fake video");
        assert_eq!(artifact.location, format!("memory://{}", artifact.name));
    }

    #[test]
    fn test_metadata_uses_configured_resolution_and_fps() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);

        asm.assemble(&[gesture('h', 1)], &registry(&[('h', 1)]), "h", &mut NullPipelineLogger)
            .unwrap();

        let meta = log.lock().unwrap().metadata.clone().unwrap();
        assert_eq!((meta.width, meta.height), (8, 6));
        assert_eq!(meta.fps, 20.0);
        assert_eq!(meta.codec, "h264");
    }

    #[test]
    fn test_placeholder_renders_black_frames() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(2, &log, &store);

        asm.assemble(
            &[gesture('h', 3), placeholder(3)],
            &registry(&[('h', 200)]),
            "h!",
            &mut NullPipelineLogger,
        )
        .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.frames.len(), 6);
        assert!(log.frames[3..].iter().all(|f| f.2 == 0));
    }

    #[test]
    fn test_gesture_missing_from_registry_renders_as_placeholder() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);

        asm.assemble(&[gesture('z', 2)], &registry(&[('h', 9)]), "z", &mut NullPipelineLogger)
            .unwrap();

        let firsts: Vec<u8> = log.lock().unwrap().frames.iter().map(|f| f.2).collect();
        assert_eq!(firsts, vec![0, 0]);
    }

    #[test]
    fn test_fades_stay_inside_segment_duration() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(2, &log, &store);

        asm.assemble(
            &[gesture('a', 6), gesture('b', 6)],
            &registry(&[('a', 200), ('b', 100)]),
            "ab",
            &mut NullPipelineLogger,
        )
        .unwrap();

        let firsts: Vec<u8> = log.lock().unwrap().frames.iter().map(|f| f.2).collect();
        assert_eq!(
            firsts,
            vec![0, 100, 200, 200, 200, 100, 0, 50, 100, 100, 100, 100]
        );
    }

    #[test]
    fn test_images_resized_to_output_resolution() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);
        let reg = SignImageRegistry::from_images(
            vec![GestureImage::new('q', Frame::solid(16, 12, 77)).unwrap()],
            PathBuf::from("mem"),
        )
        .unwrap();

        asm.assemble(&[gesture('q', 1)], &reg, "q", &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(log.lock().unwrap().frames, vec![(8, 6, 77)]);
    }

    #[test]
    fn test_open_failure_stores_nothing() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = VideoAssembler::new(
            settings(0),
            factory(&log, true, None),
            Arc::new(store.clone()),
        );

        let reg = registry(&[('h', 1)]);
        let result = asm.assemble(&[gesture('h', 2)], &reg, "h", &mut NullPipelineLogger);
        assert!(matches!(result, Err(EncodingError::Open(msg)) if msg.contains("not writable")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_failure_closes_writer_and_stores_nothing() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = VideoAssembler::new(
            settings(0),
            factory(&log, false, Some(2)),
            Arc::new(store.clone()),
        );

        let reg = registry(&[('h', 1)]);
        let result = asm.assemble(&[gesture('h', 5)], &reg, "h", &mut NullPipelineLogger);
        assert!(matches!(result, Err(EncodingError::Write { frame: 2, .. })));
        assert_eq!(log.lock().unwrap().closed, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_each_assembly_gets_a_distinct_name() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);
        let reg = registry(&[('h', 1)]);

        let a = asm.assemble(&[gesture('h', 1)], &reg, "h", &mut NullPipelineLogger).unwrap();
        let b = asm.assemble(&[gesture('h', 1)], &reg, "h", &mut NullPipelineLogger).unwrap();
        assert_ne!(a.name, b.name);
        assert!(a.name.starts_with("sign_video_"));
        assert!(a.name.ends_with(".mp4"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reports_stage_timings_and_frame_count() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let store = MemoryArtifactStore::new();
        let asm = assembler(0, &log, &store);
        let mut logger = StdoutPipelineLogger::new(1);

        asm.assemble(&[gesture('h', 4)], &registry(&[('h', 1)]), "h", &mut logger)
            .unwrap();

        assert!(logger.timing_for("encode").is_some());
        assert!(logger.timing_for("store").is_some());
        assert_eq!(logger.metric_for("frames"), Some(4.0));
    }

    // --- captions ---

    fn captioned_assembler(log: &Arc<Mutex<Recording>>, caption_letters: bool) -> VideoAssembler {
        let settings = RenderSettings {
            width: 96,
            height: 128,
            base_frames_per_char: 1,
            fade_frames: 0,
            caption_letters,
            ..RenderSettings::default()
        };
        VideoAssembler::new(
            settings,
            factory(log, false, None),
            Arc::new(MemoryArtifactStore::new()),
        )
    }

    fn gray_registry(key: char) -> SignImageRegistry {
        SignImageRegistry::from_images(
            vec![GestureImage::new(key, Frame::solid(96, 128, 120)).unwrap()],
            PathBuf::from("mem"),
        )
        .unwrap()
    }

    #[test]
    fn test_caption_burned_into_gesture_frames() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let asm = captioned_assembler(&log, true);

        asm.assemble(&[gesture('a', 1)], &gray_registry('a'), "a", &mut NullPipelineLogger)
            .unwrap();

        let written = log.lock().unwrap().last_frame.clone().unwrap();
        let source = Frame::solid(96, 128, 120);
        assert_ne!(written.data(), source.data());
        // Top half untouched; the label sits near the bottom edge.
        let half = written.data().len() / 2;
        assert_eq!(&written.data()[..half], &source.data()[..half]);
    }

    #[test]
    fn test_caption_disabled_leaves_image_untouched() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let asm = captioned_assembler(&log, false);

        asm.assemble(&[gesture('a', 1)], &gray_registry('a'), "a", &mut NullPipelineLogger)
            .unwrap();

        let written = log.lock().unwrap().last_frame.clone().unwrap();
        assert_eq!(written.data(), Frame::solid(96, 128, 120).data());
    }

    #[test]
    fn test_placeholders_stay_black_with_captions_on() {
        let log = Arc::new(Mutex::new(Recording::default()));
        let asm = captioned_assembler(&log, true);

        asm.assemble(&[placeholder(1)], &gray_registry('a'), " ", &mut NullPipelineLogger)
            .unwrap();

        let written = log.lock().unwrap().last_frame.clone().unwrap();
        assert!(written.data().iter().all(|&b| b == 0));
    }
}
