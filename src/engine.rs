//! Whole-frame background subtraction engine
//!
//! [`BackgroundEngine`] owns the per-pixel model and the three per-frame outputs
//! (mask, background colour, deviation). Each frame is cut into one contiguous
//! range per worker, the ranges are updated in parallel on a fixed rayon pool,
//! and the call returns only after every range has finished.

use crate::config::{EngineConfig, KernelStrategy, ModelParameters};
use crate::error::{BgModelError, Result};
use crate::kernel::kernel_for;
use crate::model::{MixtureArena, PixelMixture};
use crate::partition::FramePartitioner;
use crate::reconfig::ParameterStore;
use crate::validation::NumericValidator;
use image::{GrayImage, RgbImage};
use instant::Instant;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Per-pixel Gaussian mixture background model for a fixed frame size
pub struct BackgroundEngine {
    width: u32,
    height: u32,
    pixel_count: usize,
    arena: MixtureArena,
    mask: Vec<u8>,
    background: Vec<u8>,
    deviation: Vec<f32>,
    params: ParameterStore,
    active: Arc<ModelParameters>,
    strategy: KernelStrategy,
    partitioner: FramePartitioner,
    pool: ThreadPool,
    seeded: bool,
    frames_processed: u64,
    halted: Option<String>,
}

impl std::fmt::Debug for BackgroundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundEngine")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("strategy", &self.strategy)
            .field("workers", &self.partitioner.workers())
            .field("frames_processed", &self.frames_processed)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl BackgroundEngine {
    /// Allocate the model for `width`×`height` frames and start the worker pool.
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::InvalidConfig` for zero dimensions or an out-of-range
    /// worker count, and `BgModelError::Internal` if the thread pool cannot be built.
    pub fn new(
        width: u32,
        height: u32,
        params: ParameterStore,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let pixel_count = NumericValidator::validate_dimensions(width, height)?;
        let workers = config.resolved_workers();

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("bgmodel-worker-{}", i))
            .build()
            .map_err(|e| BgModelError::internal(format!("Failed to build worker pool: {}", e)))?;

        let active = params.snapshot();
        info!(
            width,
            height,
            workers,
            strategy = %config.strategy,
            learning_rate = active.learning_rate,
            foreground_threshold = active.foreground_threshold,
            "Background engine created"
        );

        Ok(Self {
            width,
            height,
            pixel_count,
            arena: MixtureArena::new(pixel_count),
            mask: vec![0; pixel_count],
            background: vec![0; pixel_count * 3],
            deviation: vec![0.0; pixel_count],
            params,
            active,
            strategy: config.strategy,
            partitioner: FramePartitioner::new(workers),
            pool,
            seeded: false,
            frames_processed: 0,
            halted: None,
        })
    }

    /// Run one frame through the model and return the foreground mask (0/1 per pixel).
    ///
    /// `frame` is packed, row-major, three bytes per pixel. The parameter snapshot is
    /// read once at the start of the call; a publish that lands mid-frame takes
    /// effect on the next one. The very first frame after construction or
    /// [`reset`](Self::reset) seeds every pixel's model before it is updated.
    ///
    /// # Errors
    ///
    /// - `BgModelError::DimensionMismatch` if `frame` has the wrong length
    /// - `BgModelError::NumericDegeneracy` if a pixel's mixture degenerates; the
    ///   engine is halted from then on
    /// - `BgModelError::EngineHalted` for every call after a degeneracy, until `reset`
    #[instrument(
        level = "debug",
        skip_all,
        fields(frame = self.frames_processed, strategy = %self.strategy)
    )]
    pub fn process_frame(&mut self, frame: &[u8]) -> Result<&[u8]> {
        if let Some(cause) = &self.halted {
            return Err(BgModelError::EngineHalted(cause.clone()));
        }
        if frame.len() != self.pixel_count * 3 {
            return Err(BgModelError::dimension_mismatch(
                "frame",
                self.pixel_count * 3,
                frame.len(),
            ));
        }

        let start = Instant::now();
        self.active = self.params.snapshot();
        let params: &ModelParameters = &self.active;

        if !self.seeded {
            self.arena.seed_from_frame(frame, params)?;
            self.seeded = true;
            debug!(pixels = self.pixel_count, "Seeded model from first frame");
        }

        let kernel = kernel_for(self.strategy);
        let spans = self.partitioner.split(
            frame,
            self.arena.as_mut_slice(),
            &mut self.mask,
            &mut self.background,
            &mut self.deviation,
        )?;

        let mut results: Vec<Result<usize>> = spans.iter().map(|_| Ok(0)).collect();
        self.pool.scope(|scope| {
            for (span, slot) in spans.into_iter().zip(results.iter_mut()) {
                scope.spawn(move |_| {
                    *slot = kernel.process_span(span, params);
                });
            }
        });

        let mut foreground = 0;
        for result in results {
            match result {
                Ok(count) => foreground += count,
                Err(e) => return Err(self.halt(e)),
            }
        }

        self.frames_processed += 1;
        debug!(
            frame = self.frames_processed,
            foreground_ratio = foreground as f64 / self.pixel_count as f64,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            kernel = kernel.name(),
            "Frame processed"
        );
        Ok(&self.mask)
    }

    fn halt(&mut self, cause: BgModelError) -> BgModelError {
        if cause.is_fatal() {
            let message = cause.to_string();
            error!(
                frame = self.frames_processed + 1,
                cause = %message,
                "Background engine halted"
            );
            self.halted = Some(message);
        }
        cause
    }

    /// Drop the learned model and clear a halt; the next frame seeds afresh
    pub fn reset(&mut self) {
        self.arena.clear();
        self.mask.fill(0);
        self.background.fill(0);
        self.deviation.fill(0.0);
        self.seeded = false;
        self.frames_processed = 0;
        self.halted = None;
        info!(width = self.width, height = self.height, "Background engine reset");
    }

    /// Switch kernels between frames; both produce the same model state
    pub fn set_strategy(&mut self, strategy: KernelStrategy) {
        if strategy != self.strategy {
            debug!(from = %self.strategy, to = %strategy, "Kernel strategy changed");
            self.strategy = strategy;
        }
    }

    #[must_use]
    pub fn strategy(&self) -> KernelStrategy {
        self.strategy
    }

    /// Mask of the last processed frame, 0 = background, 1 = foreground
    #[must_use]
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Dominant-component mean colour per pixel, in the channel order of the input frames
    #[must_use]
    pub fn background_snapshot(&self) -> &[u8] {
        &self.background
    }

    /// Dominant-component standard deviation per pixel
    #[must_use]
    pub fn deviation_snapshot(&self) -> &[f32] {
        &self.deviation
    }

    #[must_use]
    pub fn mixtures(&self) -> &[PixelMixture] {
        self.arena.as_slice()
    }

    /// Mask as an 8-bit image with foreground at 255
    pub fn mask_image(&self) -> Result<GrayImage> {
        let pixels = self.mask.iter().map(|&m| m * 255).collect();
        GrayImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| BgModelError::internal("Mask buffer does not match frame size"))
    }

    /// Background snapshot as a three-channel image
    pub fn background_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.background.clone())
            .ok_or_else(|| BgModelError::internal("Background buffer does not match frame size"))
    }

    /// Handle through which new parameters can be published
    #[must_use]
    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    /// Snapshot used by the most recent frame
    #[must_use]
    pub fn active_parameters(&self) -> &ModelParameters {
        &self.active
    }

    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.partitioner.workers()
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }
}
