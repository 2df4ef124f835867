#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bgmodel
//!
//! Per-pixel Gaussian mixture background subtraction for live video.
//!
//! Every pixel keeps three weighted Gaussian hypotheses about its stationary
//! colour. Each frame pulls the matching hypothesis toward the observation,
//! decays the others, replaces the weakest one when nothing matches, and flags
//! the pixel as foreground when it is unlikely under the heaviest hypothesis.
//!
//! ## Features
//!
//! - **Two kernels, one result**: a scalar reference update and a four-lane
//!   vectorized update that leave identical model state
//! - **Fork-join dispatch**: each frame is split into one contiguous range per
//!   worker on a fixed rayon pool
//! - **Live retuning**: parameters are swapped atomically between frames through
//!   a [`ParameterStore`]
//! - **Mask post-filter**: median denoise and elliptical erosion
//! - **CLI Integration**: frame-sequence runner (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgmodel::{BackgroundEngine, EngineConfig, KernelStrategy, ModelParameters, ParameterStore};
//!
//! # fn example(frames: Vec<Vec<u8>>) -> bgmodel::Result<()> {
//! let params = ParameterStore::new(ModelParameters::builder().learning_rate(0.02).build()?)?;
//! let mut engine = BackgroundEngine::new(
//!     640,
//!     480,
//!     params.clone(),
//!     EngineConfig::new(0, KernelStrategy::Vectorized),
//! )?;
//!
//! for frame in &frames {
//!     let mask = engine.process_frame(frame)?;
//!     let moving = mask.iter().filter(|&&m| m != 0).count();
//!     println!("{} foreground pixels", moving);
//! }
//!
//! // from another thread: takes effect on the next frame
//! params.publish_json(r#"{"learningRate": 0.05, "foregroundThreshold": 12.0}"#)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and tracing subscribers
//! - `tracing-json`: JSON log output for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod postfilter;
pub mod reconfig;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod validation;

pub use config::{
    EngineConfig, FilterConfig, KernelStrategy, ModelParameters, ModelParametersBuilder,
    PipelineConfig,
};
pub use engine::BackgroundEngine;
pub use error::{BgModelError, Result};
pub use kernel::{update_group, update_pixel, MixtureKernel, PixelOutcome, PixelSpan};
pub use model::{GaussianComponent, MixtureArena, PixelMixture, COMPONENTS_PER_PIXEL};
pub use partition::FramePartitioner;
pub use pipeline::{FrameOutput, FrameStats, SubtractionPipeline};
pub use postfilter::MaskPostFilter;
pub use reconfig::ParameterStore;
