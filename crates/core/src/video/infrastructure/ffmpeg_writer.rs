use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Encodes RGB frames into a video file via ffmpeg-next.
///
/// Tries H.264 first when asked for it and falls back to MPEG-4 Part 2,
/// which every ffmpeg build ships.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
    next_pts: i64,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: 0,
            frame_count: 0,
            next_pts: 0,
            video_stream_index: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("FfmpegWriter: not opened")?;
        let octx = self.octx.as_mut().ok_or("FfmpegWriter: not opened")?;
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: missing output stream")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn candidate_codecs(preferred: &str) -> Vec<ffmpeg_next::codec::Id> {
    match preferred {
        "h264" => vec![ffmpeg_next::codec::Id::H264, ffmpeg_next::codec::Id::MPEG4],
        _ => vec![ffmpeg_next::codec::Id::MPEG4],
    }
}

fn open_encoder(
    codec: ffmpeg_next::Codec,
    width: u32,
    height: u32,
    fps: i32,
    global_header: bool,
) -> Result<ffmpeg_next::codec::encoder::video::Encoder, ffmpeg_next::Error> {
    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()?;

    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
    encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));

    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }

    encoder_ctx.open_with(ffmpeg_next::Dictionary::new())
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<String, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        self.width = metadata.width;
        self.height = metadata.height;
        let fps = metadata.fps.round() as i32;
        self.fps = if fps <= 0 { 20 } else { fps };

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mut selected = None;
        for id in candidate_codecs(&metadata.codec) {
            let Some(codec) = ffmpeg_next::encoder::find(id) else {
                log::info!("No encoder linked for {id:?}");
                continue;
            };
            match open_encoder(codec, self.width, self.height, self.fps, global_header) {
                Ok(encoder) => {
                    selected = Some((codec, encoder));
                    break;
                }
                Err(e) => log::warn!("Encoder {} failed to open: {e}", codec.name()),
            }
        }
        let (codec, encoder) = selected.ok_or("no usable video encoder found")?;
        let codec_name = codec.name().to_string();
        log::info!("Using codec: {codec_name}");

        let mut ost = octx.add_stream(Some(codec))?;
        ost.set_parameters(&encoder);
        self.video_stream_index = ost.index();

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
            ffmpeg_next::format::Pixel::YUV420P,
            self.width,
            self.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;
        self.next_pts = 0;

        Ok(codec_name)
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3
        {
            return Err(format!(
                "frame is {}x{}x{}, writer expects {}x{}x3",
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }
        let pts = frame.index() as i64;
        if pts < self.next_pts {
            return Err(format!(
                "frame {pts} arrived after frame {}",
                self.next_pts - 1
            )
            .into());
        }
        let scaler = self.scaler.as_mut().ok_or("FfmpegWriter: not opened")?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        let src = frame.data();

        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(pts));

        self.encoder
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        self.next_pts = pts + 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(w: u32, h: u32, fps: f64, codec: &str) -> VideoMetadata {
        VideoMetadata {
            width: w,
            height: h,
            fps,
            total_frames: 0,
            codec: codec.to_string(),
        }
    }

    fn solid_frame(index: usize, w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h * 3) as usize], w, h, 3, index)
    }

    fn count_frames(path: &Path) -> (u32, u32, usize) {
        ffmpeg_next::init().unwrap();
        let mut ictx = ffmpeg_next::format::input(&path).unwrap();
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .unwrap();
        let index = stream.index();
        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters()).unwrap();
        let mut decoder = codec_ctx.decoder().video().unwrap();
        let (w, h) = (decoder.width(), decoder.height());

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        let mut count = 0;
        for (stream, packet) in ictx.packets() {
            if stream.index() != index {
                continue;
            }
            decoder.send_packet(&packet).unwrap();
            while decoder.receive_frame(&mut decoded).is_ok() {
                count += 1;
            }
        }
        decoder.send_eof().unwrap();
        while decoder.receive_frame(&mut decoded).is_ok() {
            count += 1;
        }
        (w, h, count)
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 20.0, "mpeg4")).unwrap();
        for i in 0..3 {
            writer.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        writer.close().unwrap();

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(writer.frame_count(), 3);
    }

    #[test]
    fn test_written_video_has_resolution_and_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 20.0, "mpeg4")).unwrap();
        for i in 0..5 {
            writer.write(&solid_frame(i, 160, 120, 60)).unwrap();
        }
        writer.close().unwrap();

        assert_eq!(count_frames(&path), (160, 120, 5));
    }

    #[test]
    fn test_h264_preference_falls_back_to_available_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        let codec = writer.open(&path, &metadata(160, 120, 20.0, "h264")).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.close().unwrap();

        assert!(!codec.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_write_rejects_frames_out_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 20.0, "mpeg4")).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.write(&solid_frame(1, 160, 120, 128)).unwrap();

        assert!(writer.write(&solid_frame(1, 160, 120, 128)).is_err());
        assert!(writer.write(&solid_frame(0, 160, 120, 128)).is_err());
        assert_eq!(writer.frame_count(), 2);
        writer.close().unwrap();
    }

    #[test]
    fn test_reopen_restarts_frame_numbering() {
        let dir = tempfile::tempdir().unwrap();

        let mut writer = FfmpegWriter::new();
        for name in ["a.mp4", "b.mp4"] {
            let path = dir.path().join(name);
            writer.open(&path, &metadata(160, 120, 20.0, "mpeg4")).unwrap();
            for i in 0..2 {
                writer.write(&solid_frame(i, 160, 120, 90)).unwrap();
            }
            writer.close().unwrap();
            assert_eq!(count_frames(&path), (160, 120, 2));
        }
    }

    #[test]
    fn test_write_without_open_returns_error() {
        let mut writer = FfmpegWriter::new();
        assert!(writer.write(&solid_frame(0, 160, 120, 128)).is_err());
    }

    #[test]
    fn test_write_rejects_mismatched_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 20.0, "mpeg4")).unwrap();
        assert!(writer.write(&solid_frame(0, 80, 60, 128)).is_err());
        writer.close().unwrap();
    }

    #[test]
    fn test_open_unwritable_destination_fails() {
        let mut writer = FfmpegWriter::new();
        let result = writer.open(
            Path::new("/nonexistent/dir/out.mp4"),
            &metadata(160, 120, 20.0, "mpeg4"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 20.0, "mpeg4")).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }
}
