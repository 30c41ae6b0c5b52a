mod config;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use rainbow_smooth_core::derainbow::domain::frame_processor::FrameProcessor;
use rainbow_smooth_core::derainbow::domain::rainbow_smooth::RainbowSmoothParams;
use rainbow_smooth_core::derainbow::infrastructure::rainbow_smooth_processor::RainbowSmoothProcessor;
use rainbow_smooth_core::filtering::infrastructure::native_host::NativeFilterHost;
use rainbow_smooth_core::pipeline::derainbow_image_use_case::DerainbowImageUseCase;
use rainbow_smooth_core::pipeline::derainbow_video_use_case::DerainbowVideoUseCase;
use rainbow_smooth_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use rainbow_smooth_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use rainbow_smooth_core::shared::constants::IMAGE_EXTENSIONS;
use rainbow_smooth_core::video::domain::image_writer::ImageWriter;
use rainbow_smooth_core::video::domain::video_reader::VideoReader;
use rainbow_smooth_core::video::domain::video_writer::VideoWriter;
use rainbow_smooth_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use rainbow_smooth_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use rainbow_smooth_core::video::infrastructure::image_file_reader::ImageFileReader;
use rainbow_smooth_core::video::infrastructure::image_file_writer::ImageFileWriter;

use config::{load_preset, resolve_params, save_preset, ParamOverrides};

const MAX_CRF: u8 = 51;

/// Removes rainbow (cross-colour) artifacts from videos and images.
#[derive(Parser)]
#[command(name = "rainbow-smooth", version)]
struct Cli {
    /// Input video or image file.
    input: PathBuf,

    /// Output file.
    output: PathBuf,

    /// Chroma smoothing radius (1-7) [default: 3].
    #[arg(long)]
    radius: Option<i32>,

    /// Threshold applied everywhere; 0 leaves flat areas untouched [default: 0].
    #[arg(long)]
    lthresh: Option<i32>,

    /// Threshold applied near luma edges [default: 220].
    #[arg(long)]
    hthresh: Option<i32>,

    /// JSON preset with radius/lthresh/hthresh; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective parameters to this JSON file.
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// H.264 CRF quality (0=lossless, 51=worst). MPEG-4 is used when unset.
    #[arg(long)]
    quality: Option<u8>,
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
    validate(&cli)?;

    let params = effective_params(&cli)?;
    if let Some(path) = &cli.save_config {
        save_preset(path, &params)?;
        log::info!("Saved parameters to {}", path.display());
    }
    log::info!(
        "RainbowSmooth radius={} lthresh={} hthresh={}",
        params.radius,
        params.lthresh,
        params.hthresh
    );

    let processor: Box<dyn FrameProcessor> = Box::new(RainbowSmoothProcessor::new(
        Arc::new(NativeFilterHost::new()),
        params,
    ));

    if is_image(&cli.input) {
        run_image(&cli.input, &cli.output, processor)
    } else {
        run_video(&cli.input, &cli.output, processor, cli.quality)
    }
}

fn effective_params(cli: &Cli) -> Result<RainbowSmoothParams, Box<dyn std::error::Error>> {
    let preset = cli.config.as_deref().map(load_preset).transpose()?;
    Ok(resolve_params(
        preset,
        ParamOverrides {
            radius: cli.radius,
            lthresh: cli.lthresh,
            hthresh: cli.hthresh,
        },
    ))
}

fn run_image(
    input: &Path,
    output: &Path,
    processor: Box<dyn FrameProcessor>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader: Box<dyn VideoReader> = Box::new(ImageFileReader::new());
    let image_writer: Box<dyn ImageWriter> = Box::new(ImageFileWriter::new());

    let mut use_case = DerainbowImageUseCase::new(reader, image_writer, processor);
    use_case.execute(input, output)?;
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn run_video(
    input: &Path,
    output: &Path,
    processor: Box<dyn FrameProcessor>,
    quality: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let metadata = reader.open(input)?;
    let writer: Box<dyn VideoWriter> = Box::new(match quality {
        Some(crf) => FfmpegWriter::new().with_crf(crf),
        None => FfmpegWriter::new(),
    });

    let mut use_case = DerainbowVideoUseCase::new(
        reader,
        writer,
        processor,
        Box::new(ThreadedPipelineExecutor::new()),
        None,
        None,
    )
    // Progress is reported through the logger only.
    .with_logger(Box::new(StdoutPipelineLogger::default()));
    use_case.execute(&metadata, output)?;
    log::info!("Output written to {}", output.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.input == cli.output {
        return Err("Output must differ from input".into());
    }
    if let Some(q) = cli.quality {
        if q > MAX_CRF {
            return Err(format!("Quality must be between 0 and {MAX_CRF}, got {q}").into());
        }
    }
    if is_image(&cli.input) && cli.quality.is_some() {
        log::warn!("--quality has no effect on image output");
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
