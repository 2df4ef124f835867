//! Frame-by-frame subtraction: engine update, mask post-filter and running statistics

use crate::config::{EngineConfig, FilterConfig, PipelineConfig};
use crate::engine::BackgroundEngine;
use crate::error::{BgModelError, Result};
use crate::postfilter::MaskPostFilter;
use crate::reconfig::ParameterStore;
use image::{GrayImage, RgbImage};
use instant::Instant;
use std::time::Duration;
use tracing::{info, warn};

/// Running counters over every frame a pipeline has seen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Total number of frames processed
    pub frames_processed: u64,
    /// Total processing time for all frames
    pub total_processing_time: Duration,
    /// Average processing time per frame
    pub average_frame_time: Duration,
    /// Number of frames the engine rejected
    pub failed_frames: u64,
    /// Foreground share of the most recent filtered mask, in [0, 1]
    pub last_foreground_ratio: f64,
}

impl FrameStats {
    /// Create new empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed frame
    pub fn add_frame(&mut self, processing_time: Duration, foreground_ratio: f64) {
        self.frames_processed += 1;
        self.total_processing_time += processing_time;
        self.average_frame_time = self.total_processing_time
            / u32::try_from(self.frames_processed).unwrap_or(u32::MAX);
        self.last_foreground_ratio = foreground_ratio;
    }

    pub fn mark_frame_failed(&mut self) {
        self.failed_frames += 1;
    }

    /// Get success rate as percentage
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.frames_processed + self.failed_frames;
        if total > 0 {
            (self.frames_processed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Get processing speed in frames per second
    #[must_use]
    pub fn processing_fps(&self) -> f64 {
        if self.total_processing_time.as_secs_f64() > 0.0 {
            self.frames_processed as f64 / self.total_processing_time.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Borrowed view of one frame's results
#[derive(Debug, Clone, Copy)]
pub struct FrameOutput<'a> {
    /// 1-based index of the frame within the current model lifetime
    pub frame_number: u64,
    pub width: u32,
    pub height: u32,
    /// Post-filtered mask, 0/1 per pixel
    pub mask: &'a [u8],
    /// Dominant mean colour per pixel, packed like the input frame
    pub background: &'a [u8],
    /// Dominant standard deviation per pixel
    pub deviation: &'a [f32],
    pub foreground_pixels: usize,
}

impl FrameOutput<'_> {
    #[must_use]
    pub fn foreground_ratio(&self) -> f64 {
        if self.mask.is_empty() {
            0.0
        } else {
            self.foreground_pixels as f64 / self.mask.len() as f64
        }
    }

    /// Mask scaled to 0/255
    pub fn mask_image(&self) -> Result<GrayImage> {
        GrayImage::from_raw(
            self.width,
            self.height,
            self.mask.iter().map(|&m| m * 255).collect(),
        )
        .ok_or_else(|| BgModelError::internal("Mask buffer does not match frame size"))
    }

    pub fn background_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.background.to_vec())
            .ok_or_else(|| BgModelError::internal("Background buffer does not match frame size"))
    }
}

/// Background engine followed by the mask post-filter
#[derive(Debug)]
pub struct SubtractionPipeline {
    engine: BackgroundEngine,
    filter: MaskPostFilter,
    mask: Vec<u8>,
    stats: FrameStats,
}

impl SubtractionPipeline {
    /// Build an engine and filter from a parameter file's contents
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::InvalidConfig` for invalid parameters, filter sizes,
    /// dimensions or worker counts.
    pub fn new(
        width: u32,
        height: u32,
        config: &PipelineConfig,
        engine_config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = ParameterStore::new(config.model)?;
        Self::with_store(width, height, store, &config.filter, engine_config)
    }

    /// Build a pipeline whose model parameters are read from an existing store
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_store(
        width: u32,
        height: u32,
        store: ParameterStore,
        filter: &FilterConfig,
        engine_config: EngineConfig,
    ) -> Result<Self> {
        let filter = MaskPostFilter::from_config(filter)?;
        let engine = BackgroundEngine::new(width, height, store, engine_config)?;
        info!(
            width,
            height,
            post_filter = filter.is_enabled(),
            "Subtraction pipeline ready"
        );
        Ok(Self {
            mask: vec![0; engine.pixel_count()],
            engine,
            filter,
            stats: FrameStats::new(),
        })
    }

    /// Update the model with `frame` and return the filtered results
    ///
    /// # Errors
    ///
    /// Propagates every engine error; failed frames are counted in [`FrameStats`].
    pub fn process(&mut self, frame: &[u8]) -> Result<FrameOutput<'_>> {
        let start = Instant::now();
        match self.engine.process_frame(frame) {
            Ok(raw) => self.mask.copy_from_slice(raw),
            Err(e) => {
                self.stats.mark_frame_failed();
                warn!(error = %e, "Frame rejected");
                return Err(e);
            },
        }

        let (width, height) = self.engine.dimensions();
        self.filter
            .apply(&mut self.mask, width as usize, height as usize)?;

        let foreground_pixels = self.mask.iter().filter(|&&m| m != 0).count();
        let output = FrameOutput {
            frame_number: self.engine.frames_processed(),
            width,
            height,
            mask: &self.mask,
            background: self.engine.background_snapshot(),
            deviation: self.engine.deviation_snapshot(),
            foreground_pixels,
        };
        self.stats.add_frame(start.elapsed(), output.foreground_ratio());
        Ok(output)
    }

    /// Swap the post-filter sizes; the model is untouched
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::InvalidConfig` and keeps the old filter for invalid sizes.
    pub fn set_filter(&mut self, config: &FilterConfig) -> Result<()> {
        self.filter = MaskPostFilter::from_config(config)?;
        Ok(())
    }

    /// Forget the learned model; statistics keep accumulating
    pub fn reset(&mut self) {
        self.engine.reset();
        self.mask.fill(0);
    }

    #[must_use]
    pub fn engine(&self) -> &BackgroundEngine {
        &self.engine
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterStore {
        self.engine.parameters()
    }

    #[must_use]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}
