//! Configuration types for the background model, its engine and the mask post-filter

use crate::error::{BgModelError, Result};
use crate::model::VARIANCE_FLOOR;
use crate::validation::NumericValidator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Immutable parameter snapshot read by every kernel call of a frame
///
/// Field names serialise in camelCase so parameter files written for the live
/// tuning editor (`{"learningRate": 0.01, ...}`) load unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelParameters {
    /// Adaptation speed of means, variances and weights, in (0, 1)
    pub learning_rate: f32,
    /// Variance given to new or replaced components
    pub initial_variance: f32,
    /// Weight given to a replaced component before renormalisation, in (0, 1)
    pub initial_weight: f32,
    /// Cutoff on the background log-likelihood statistic; higher tolerates more deviation
    pub foreground_threshold: f32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            initial_variance: 36.0,
            initial_weight: 0.05,
            foreground_threshold: 16.0,
        }
    }
}

impl ModelParameters {
    /// Create a new parameter builder starting from the defaults
    #[must_use]
    pub fn builder() -> ModelParametersBuilder {
        ModelParametersBuilder::default()
    }

    /// Parse a snapshot from a JSON document; unknown keys are ignored
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Validate all parameters
    ///
    /// # Validation Rules
    ///
    /// - learning rate: (0, 1)
    /// - initial variance: finite, at least [`VARIANCE_FLOOR`]
    /// - initial weight: (0, 1)
    /// - foreground threshold: finite, > 0
    pub fn validate(&self) -> Result<()> {
        let defaults = Self::default();
        NumericValidator::validate_open_unit(
            self.learning_rate,
            "learningRate",
            defaults.learning_rate,
        )?;
        NumericValidator::validate_at_least(
            self.initial_variance,
            VARIANCE_FLOOR,
            "initialVariance",
            defaults.initial_variance,
        )?;
        NumericValidator::validate_open_unit(
            self.initial_weight,
            "initialWeight",
            defaults.initial_weight,
        )?;
        NumericValidator::validate_positive(
            self.foreground_threshold,
            "foregroundThreshold",
            defaults.foreground_threshold,
        )?;
        Ok(())
    }
}

/// Builder for `ModelParameters`
#[derive(Debug, Default)]
pub struct ModelParametersBuilder {
    params: ModelParameters,
}

impl ModelParametersBuilder {
    /// Set learning rate
    #[must_use]
    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.params.learning_rate = learning_rate;
        self
    }

    /// Set initial variance
    #[must_use]
    pub fn initial_variance(mut self, variance: f32) -> Self {
        self.params.initial_variance = variance;
        self
    }

    /// Set initial weight
    #[must_use]
    pub fn initial_weight(mut self, weight: f32) -> Self {
        self.params.initial_weight = weight;
        self
    }

    /// Set foreground threshold
    #[must_use]
    pub fn foreground_threshold(mut self, threshold: f32) -> Self {
        self.params.foreground_threshold = threshold;
        self
    }

    /// Build the snapshot, rejecting out-of-range values
    pub fn build(self) -> Result<ModelParameters> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// Sizes for the median and erosion passes applied to the mask after the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// Median window edge length (0 = disabled)
    pub median_filter_size: u32,
    /// Elliptical erosion kernel edge length (0 = disabled)
    #[serde(alias = "morphKernel")]
    pub morph_filter_size: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            median_filter_size: 3,
            morph_filter_size: 0,
        }
    }
}

impl FilterConfig {
    /// Configuration with both passes switched off
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            median_filter_size: 0,
            morph_filter_size: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_kernel_size(self.median_filter_size, "medianFilterSize")?;
        NumericValidator::validate_kernel_size(self.morph_filter_size, "morphFilterSize")?;
        Ok(())
    }
}

/// Everything a parameter file carries: the model snapshot plus the filter sizes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub model: ModelParameters,
    #[serde(flatten)]
    pub filter: FilterConfig,
}

impl PipelineConfig {
    /// Parse and validate a flat JSON parameter document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a parameter file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BgModelError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read parameter file '{}': {}",
                    path.as_ref().display(),
                    e
                ),
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.filter.validate()
    }
}

/// Which implementation of the mixture update the engine dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelStrategy {
    /// One pixel at a time (reference path)
    Scalar,
    /// Four adjacent pixels per call using lane-parallel arithmetic
    #[default]
    Vectorized,
}

impl std::fmt::Display for KernelStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Vectorized => write!(f, "vectorized"),
        }
    }
}

impl FromStr for KernelStrategy {
    type Err = BgModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Self::Scalar),
            "vectorized" | "simd" => Ok(Self::Vectorized),
            other => Err(BgModelError::invalid_config(format!(
                "Unknown kernel strategy '{}' (expected 'scalar' or 'vectorized')",
                other
            ))),
        }
    }
}

/// Engine construction options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker thread count (0 = hardware concurrency)
    pub workers: usize,
    /// Kernel used for every chunk
    pub strategy: KernelStrategy,
}

impl EngineConfig {
    #[must_use]
    pub fn new(workers: usize, strategy: KernelStrategy) -> Self {
        Self { workers, strategy }
    }

    /// Worker count with 0 resolved to the available parallelism
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }

    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_thread_count(self.workers)?;
        Ok(())
    }
}
