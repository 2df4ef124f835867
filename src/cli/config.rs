//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliKernel};
use crate::config::{EngineConfig, KernelStrategy, ModelParameters, PipelineConfig};
use crate::validation::NumericValidator;
use anyhow::{Context, Result};

/// Everything a run needs, resolved from the parameter file and flag overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RunConfig {
    pub(crate) pipeline: PipelineConfig,
    pub(crate) engine: EngineConfig,
}

/// Convert CLI arguments to pipeline and engine configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Load `--config` (or defaults), apply flag overrides and validate the result
    pub(crate) fn from_cli(cli: &Cli) -> Result<RunConfig> {
        let mut pipeline = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load parameter file {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        pipeline.model = Self::apply_overrides(pipeline.model, cli);
        if let Some(size) = cli.median_filter_size {
            pipeline.filter.median_filter_size = size;
        }
        if let Some(size) = cli.morph_filter_size {
            pipeline.filter.morph_filter_size = size;
        }
        pipeline
            .validate()
            .context("Invalid model or filter parameters")?;

        let engine = EngineConfig::new(cli.workers, Self::strategy(cli.kernel));
        engine.validate().context("Invalid worker count")?;

        Ok(RunConfig { pipeline, engine })
    }

    fn apply_overrides(mut params: ModelParameters, cli: &Cli) -> ModelParameters {
        if let Some(value) = cli.learning_rate {
            params.learning_rate = value;
        }
        if let Some(value) = cli.threshold {
            params.foreground_threshold = value;
        }
        params
    }

    pub(crate) fn strategy(kernel: CliKernel) -> KernelStrategy {
        match kernel {
            CliKernel::Scalar => KernelStrategy::Scalar,
            CliKernel::Vectorized => KernelStrategy::Vectorized,
        }
    }

    /// Reject flag combinations that cannot work before any frame is decoded
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.save_background && cli.output.is_none() {
            anyhow::bail!("--save-background requires --output");
        }
        if cli.benchmark && cli.output.is_some() {
            anyhow::bail!("--benchmark does not write output; drop --output");
        }
        if cli.max_frames == Some(0) {
            anyhow::bail!("--max-frames must be at least 1");
        }
        NumericValidator::validate_thread_count(cli.workers).context("Invalid --workers")?;
        Ok(())
    }
}
