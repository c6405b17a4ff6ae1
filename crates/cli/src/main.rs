use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use sign_video_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use sign_video_core::pipeline::sign_pipeline::{SignOutcome, SignPipeline};
use sign_video_core::pipeline::video_assembler::VideoAssembler;
use sign_video_core::shared::constants::{WHISPER_MODEL_NAME, WHISPER_MODEL_URL};
use sign_video_core::shared::model_resolver;
use sign_video_core::shared::render_settings::RenderSettings;
use sign_video_core::signs::infrastructure::directory_loader::load_registry;
use sign_video_core::speech::domain::transcriber::DecodingTranscriber;
use sign_video_core::speech::infrastructure::ffmpeg_audio_decoder::FfmpegAudioDecoder;
use sign_video_core::speech::infrastructure::whisper_recognizer::WhisperRecognizer;
use sign_video_core::video::domain::artifact_store::ArtifactStore;
use sign_video_core::video::domain::video_writer::VideoWriter;
use sign_video_core::video::infrastructure::directory_artifact_store::DirectoryArtifactStore;
use sign_video_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Convert text or speech into Indian Sign Language videos.
#[derive(Parser)]
#[command(name = "sign-video")]
struct Cli {
    /// Directory of gesture images named by character (a.jpg, 7.png, ...).
    #[arg(long, global = true, default_value = "sign_images")]
    signs_dir: PathBuf,

    /// Directory generated videos are written to.
    #[arg(long, global = true, default_value = "output_videos")]
    output_dir: PathBuf,

    /// Render settings JSON (defaults to the per-user settings file).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign a piece of text.
    Text {
        text: String,

        /// Playback speed multiplier (> 0; 2.0 is twice as fast).
        #[arg(long, default_value = "1.0")]
        speed: f64,
    },
    /// Transcribe an audio file and sign the transcript.
    Speech {
        audio_file: PathBuf,

        /// Playback speed multiplier (> 0; 2.0 is twice as fast).
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Whisper ggml model file (downloaded to the cache if omitted).
        #[arg(long)]
        whisper_model: Option<PathBuf>,
    },
    /// Print readiness and supported characters as JSON.
    Stats,
    /// Print the location of a previously generated video.
    Locate { name: String },
    /// Print the effective render settings as JSON.
    Config {
        /// Also write them to the per-user settings file.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Serialize)]
struct SignResponse<'a> {
    video_file: &'a str,
    text: &'a str,
    location: &'a str,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Locate { ref name } => {
            let store = DirectoryArtifactStore::new(&cli.output_dir)?;
            match store.locate(name) {
                Some(location) => println!("{location}"),
                None => return Err(format!("Video not found: {name}").into()),
            }
        }
        Command::Config { save } => {
            let settings = load_settings(&cli)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if save {
                let path = settings.save()?;
                log::info!("Saved settings to {}", path.display());
                eprintln!("Saved to {}", path.display());
            }
        }
        Command::Stats => {
            let pipeline = build_pipeline(&cli)?;
            println!("{}", serde_json::to_string_pretty(&pipeline.health())?);
        }
        Command::Text { ref text, speed } => {
            let pipeline = build_pipeline(&cli)?;
            let mut logger = StdoutPipelineLogger::default();
            let outcome = pipeline.text_to_sign_logged(text, speed, &mut logger)?;
            logger.summary();
            print_outcome(&outcome)?;
        }
        Command::Speech {
            ref audio_file,
            speed,
            ref whisper_model,
        } => {
            let audio = std::fs::read(audio_file)
                .map_err(|e| format!("Cannot read {}: {e}", audio_file.display()))?;
            let pipeline = build_pipeline(&cli)?
                .with_transcriber(build_transcriber(whisper_model.as_deref())?);
            let mut logger = StdoutPipelineLogger::default();
            let outcome = pipeline.speech_to_sign_logged(&audio, speed, &mut logger)?;
            logger.summary();
            print_outcome(&outcome)?;
        }
    }

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<RenderSettings, Box<dyn std::error::Error>> {
    Ok(match &cli.config {
        Some(path) => RenderSettings::load(path)?,
        None => RenderSettings::load_or_default(),
    })
}

fn build_pipeline(cli: &Cli) -> Result<SignPipeline, Box<dyn std::error::Error>> {
    let settings = load_settings(cli)?;

    let registry = load_registry(&cli.signs_dir, settings.width, settings.height)?;

    let store = DirectoryArtifactStore::new(&cli.output_dir)?;
    let assembler = VideoAssembler::new(
        settings,
        Box::new(|| -> Box<dyn VideoWriter> { Box::new(FfmpegWriter::new()) }),
        Arc::new(store),
    );
    Ok(SignPipeline::new(Arc::new(registry), assembler))
}

fn build_transcriber(
    whisper_model: Option<&Path>,
) -> Result<Box<DecodingTranscriber>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {WHISPER_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        WHISPER_MODEL_NAME,
        WHISPER_MODEL_URL,
        whisper_model,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    let recognizer = WhisperRecognizer::new(&model_path)?;
    Ok(Box::new(DecodingTranscriber::new(
        Box::new(FfmpegAudioDecoder),
        Box::new(recognizer),
    )))
}

fn print_outcome(outcome: &SignOutcome) -> Result<(), Box<dyn std::error::Error>> {
    let response = SignResponse {
        video_file: &outcome.artifact.name,
        text: &outcome.transcript,
        location: &outcome.artifact.location,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading speech model... {pct}%");
    } else {
        eprint!("\rDownloading speech model... {downloaded} bytes");
    }
}
