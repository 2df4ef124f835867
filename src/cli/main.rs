//! Background subtraction CLI
//!
//! Runs a sorted sequence of frame images through the background model and
//! optionally writes the filtered masks and background snapshots as PNG files.

use super::config::{CliConfigBuilder, RunConfig};
use super::frames::{collect_frames, load_frame, output_path, DecodedFrame};
use crate::pipeline::SubtractionPipeline;
use crate::tracing_config::{init_cli_tracing, spans, TracingFormat};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use instant::Instant;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Gaussian mixture background subtraction over a frame sequence
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgmodel")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Frame images, directories of frames, or glob patterns
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// JSON parameter file (learningRate, initialVariance, initialWeight, foregroundThreshold, medianFilterSize, morphFilterSize)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving mask_NNNNNN.png files
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Also write background_NNNNNN.png snapshots (requires --output)
    #[arg(long)]
    pub save_background: bool,

    /// Number of worker threads (0 = hardware concurrency)
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,

    /// Mixture update kernel
    #[arg(short, long, value_enum, default_value_t = CliKernel::Vectorized)]
    pub kernel: CliKernel,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// Only measure throughput; nothing is written
    #[arg(long)]
    pub benchmark: bool,

    /// Walk input directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// File name pattern applied inside input directories (e.g. "frame_*.png")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Override the learning rate from the parameter file
    #[arg(long)]
    pub learning_rate: Option<f32>,

    /// Override the foreground threshold from the parameter file
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Override the median filter size (0 disables)
    #[arg(long)]
    pub median_filter_size: Option<u32>,

    /// Override the erosion kernel size (0 disables)
    #[arg(long)]
    pub morph_filter_size: Option<u32>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliKernel {
    Scalar,
    Vectorized,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose, cli.log_format.into())
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let mut frames = collect_frames(&cli.input, cli.recursive, cli.pattern.as_deref())?;
    if let Some(limit) = cli.max_frames {
        frames.truncate(limit);
    }
    if frames.is_empty() {
        anyhow::bail!("No frame images found in the provided inputs");
    }

    let _session = spans::session(&session_id, frames.len(), &config.engine.strategy.to_string())
        .entered();
    info!(
        frames = frames.len(),
        strategy = %config.engine.strategy,
        learning_rate = config.pipeline.model.learning_rate,
        foreground_threshold = config.pipeline.model.foreground_threshold,
        "Starting background subtraction"
    );

    let output_dir = match &cli.output {
        Some(dir) if !cli.benchmark => Some(prepare_output_dir(dir)?),
        _ => None,
    };

    let start_time = Instant::now();
    let processed = run(&cli, &config, &frames, output_dir.as_deref())?;
    let total_time = start_time.elapsed();

    info!(
        "Processed {} frame(s) in {:.2}s",
        processed,
        total_time.as_secs_f64()
    );
    if cli.benchmark {
        let fps = processed as f64 / total_time.as_secs_f64().max(f64::EPSILON);
        println!("{} frames, {:.1} frames/s ({})", processed, fps, config.engine.strategy);
    }
    Ok(())
}

fn prepare_output_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            dir.display()
        );
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn run(cli: &Cli, config: &RunConfig, frames: &[PathBuf], output_dir: Option<&Path>) -> Result<usize> {
    let first_path = frames
        .first()
        .context("No frame images found in the provided inputs")?;
    let first = load_frame(first_path)?;
    let (width, height) = (first.width, first.height);

    let mut pipeline = SubtractionPipeline::new(width, height, &config.pipeline, config.engine)
        .context("Failed to create background engine")?;
    debug!(
        width,
        height,
        workers = pipeline.engine().worker_count(),
        "Engine ready"
    );

    let progress = (frames.len() > 1).then(|| {
        let pb = ProgressBar::new(frames.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {per_sec} {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    });

    let mut pending = Some(first);
    for (index, path) in frames.iter().enumerate() {
        let _span = spans::frame_file(path, index).entered();

        let frame = match pending.take() {
            Some(frame) => frame,
            None => load_frame(path)?,
        };
        check_dimensions(&frame, width, height, path)?;

        let output = pipeline
            .process(&frame.pixels)
            .with_context(|| format!("Background model failed on {}", path.display()))?;

        if let Some(dir) = output_dir {
            let mask_path = output_path(dir, "mask", index);
            output
                .mask_image()?
                .save(&mask_path)
                .with_context(|| format!("Failed to write {}", mask_path.display()))?;
            if cli.save_background {
                let bg_path = output_path(dir, "background", index);
                output
                    .background_image()?
                    .save(&bg_path)
                    .with_context(|| format!("Failed to write {}", bg_path.display()))?;
            }
        }

        if let Some(pb) = &progress {
            pb.set_message(format!("{:.1}% fg", output.foreground_ratio() * 100.0));
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    let stats = pipeline.stats();
    info!(
        frames = stats.frames_processed,
        average_ms = stats.average_frame_time.as_secs_f64() * 1000.0,
        fps = stats.processing_fps(),
        "Run statistics"
    );
    Ok(frames.len())
}

fn check_dimensions(frame: &DecodedFrame, width: u32, height: u32, path: &Path) -> Result<()> {
    if (frame.width, frame.height) != (width, height) {
        anyhow::bail!(
            "Frame {} is {}x{}, but the sequence started at {}x{}",
            path.display(),
            frame.width,
            frame.height,
            width,
            height
        );
    }
    Ok(())
}
