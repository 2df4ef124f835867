//! Mixture update kernels.
//!
//! Two implementations of the same per-pixel rule live here: [`scalar`] updates one
//! pixel per call and is the reference; [`vectorized`] updates four horizontally
//! adjacent pixels per call on [`lanes::F32x4`] values. Both keep first-match,
//! first-minimum and first-maximum tie breaking so they agree lane for lane.

pub mod lanes;
pub mod scalar;
pub mod vectorized;


use crate::config::{KernelStrategy, ModelParameters};
use crate::error::{BgModelError, Result};
use crate::model::PixelMixture;

pub use scalar::{update_pixel, PixelOutcome};
pub use vectorized::update_group;

/// A component matches when the colour distance is below this many standard deviations
pub const MATCH_SIGMAS: f32 = 2.5;

/// (2π)^1.5, normaliser of a 3-D isotropic Gaussian density
pub const ETA_NORMALIZER: f32 = 15.749_61;

/// 2·ln(2π), constant term of the background log-likelihood statistic
pub const LOG_LIKELIHOOD_BASE: f32 = 3.675_754_1;

/// Pixels processed per vectorized call
pub const LANES: usize = 4;

/// Convert a model mean to an 8-bit channel value
#[inline]
#[must_use]
pub fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// A contiguous run of pixels together with every buffer the kernel writes for them.
///
/// All slices are indexed relative to `start`; `frame` and `background` hold three
/// bytes per pixel, the others one element per pixel.
#[derive(Debug)]
pub struct PixelSpan<'a> {
    /// Index of the first pixel of the span within the frame
    pub start: usize,
    pub frame: &'a [u8],
    pub mixtures: &'a mut [PixelMixture],
    pub mask: &'a mut [u8],
    pub background: &'a mut [u8],
    pub deviation: &'a mut [f32],
}

impl<'a> PixelSpan<'a> {
    /// Build a span, checking that every buffer covers the same pixel count
    pub fn new(
        start: usize,
        frame: &'a [u8],
        mixtures: &'a mut [PixelMixture],
        mask: &'a mut [u8],
        background: &'a mut [u8],
        deviation: &'a mut [f32],
    ) -> Result<Self> {
        let pixels = mixtures.len();
        if frame.len() != pixels * 3 {
            return Err(BgModelError::dimension_mismatch("frame span", pixels * 3, frame.len()));
        }
        if mask.len() != pixels {
            return Err(BgModelError::dimension_mismatch("mask span", pixels, mask.len()));
        }
        if background.len() != pixels * 3 {
            return Err(BgModelError::dimension_mismatch(
                "background span",
                pixels * 3,
                background.len(),
            ));
        }
        if deviation.len() != pixels {
            return Err(BgModelError::dimension_mismatch(
                "deviation span",
                pixels,
                deviation.len(),
            ));
        }
        Ok(Self {
            start,
            frame,
            mixtures,
            mask,
            background,
            deviation,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mixtures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mixtures.is_empty()
    }

    /// Split into `[0, mid)` and `[mid, len)`; `mid` is clamped to the span length
    #[must_use]
    pub fn split_at(self, mid: usize) -> (PixelSpan<'a>, PixelSpan<'a>) {
        let mid = mid.min(self.len());
        let (frame_a, frame_b) = self.frame.split_at(mid * 3);
        let (mix_a, mix_b) = self.mixtures.split_at_mut(mid);
        let (mask_a, mask_b) = self.mask.split_at_mut(mid);
        let (bg_a, bg_b) = self.background.split_at_mut(mid * 3);
        let (dev_a, dev_b) = self.deviation.split_at_mut(mid);
        (
            PixelSpan {
                start: self.start,
                frame: frame_a,
                mixtures: mix_a,
                mask: mask_a,
                background: bg_a,
                deviation: dev_a,
            },
            PixelSpan {
                start: self.start + mid,
                frame: frame_b,
                mixtures: mix_b,
                mask: mask_b,
                background: bg_b,
                deviation: dev_b,
            },
        )
    }
}

/// Applies the mixture update to every pixel of a span
pub trait MixtureKernel: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Update every pixel of `span`, returning how many were classified foreground
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::NumericDegeneracy` when a mixture cannot be renormalised.
    fn process_span(&self, span: PixelSpan<'_>, params: &ModelParameters) -> Result<usize>;
}

/// Reference kernel: one pixel per call
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;

impl MixtureKernel for ScalarKernel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn process_span(&self, span: PixelSpan<'_>, params: &ModelParameters) -> Result<usize> {
        let mut foreground = 0;
        let pixels = span
            .frame
            .chunks_exact(3)
            .zip(span.mixtures.iter_mut())
            .zip(span.mask.iter_mut())
            .zip(span.background.chunks_exact_mut(3))
            .zip(span.deviation.iter_mut());

        for (offset, ((((px, mixture), mask), bg), dev)) in pixels.enumerate() {
            let observed = [px[0], px[1], px[2]];
            let outcome = update_pixel(observed, mixture, params).map_err(|e| match e {
                BgModelError::NumericDegeneracy(msg) => BgModelError::NumericDegeneracy(
                    format!("pixel {}: {}", span.start + offset, msg),
                ),
                other => other,
            })?;
            *mask = u8::from(outcome.foreground);
            bg.copy_from_slice(&outcome.background);
            *dev = outcome.std_dev;
            foreground += usize::from(outcome.foreground);
        }
        Ok(foreground)
    }
}

/// Fast kernel: groups of four pixels, with the scalar kernel covering a tail shorter than a group
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorizedKernel;

impl MixtureKernel for VectorizedKernel {
    fn name(&self) -> &'static str {
        "vectorized"
    }

    fn process_span(&self, span: PixelSpan<'_>, params: &ModelParameters) -> Result<usize> {
        let whole = span.len() / LANES * LANES;
        let (head, tail) = span.split_at(whole);
        let mut foreground = 0;

        let groups = head
            .frame
            .chunks_exact(3 * LANES)
            .zip(head.mixtures.chunks_exact_mut(LANES))
            .zip(head.mask.chunks_exact_mut(LANES))
            .zip(head.background.chunks_exact_mut(3 * LANES))
            .zip(head.deviation.chunks_exact_mut(LANES));

        for (group, ((((px, mixtures), mask), bg), dev)) in groups.enumerate() {
            let first_pixel = head.start + group * LANES;
            let bits = update_group(
                lane_array(px)?,
                lane_array_mut(mixtures)?,
                lane_array_mut(bg)?,
                lane_array_mut(dev)?,
                params,
            )
            .map_err(|e| match e {
                BgModelError::NumericDegeneracy(msg) => BgModelError::NumericDegeneracy(
                    format!("group at pixel {}: {}", first_pixel, msg),
                ),
                other => other,
            })?;

            for (lane, m) in mask.iter_mut().enumerate() {
                *m = (bits >> lane) & 1;
            }
            foreground += bits.count_ones() as usize;
        }

        if !tail.is_empty() {
            foreground += ScalarKernel.process_span(tail, params)?;
        }
        Ok(foreground)
    }
}

/// Kernel instance for a strategy
#[must_use]
pub fn kernel_for(strategy: KernelStrategy) -> &'static dyn MixtureKernel {
    match strategy {
        KernelStrategy::Scalar => &ScalarKernel,
        KernelStrategy::Vectorized => &VectorizedKernel,
    }
}

fn lane_array<T, const N: usize>(chunk: &[T]) -> Result<&[T; N]> {
    chunk.try_into().map_err(|_| {
        BgModelError::internal(format!("expected {} elements, got {}", N, chunk.len()))
    })
}

fn lane_array_mut<T, const N: usize>(chunk: &mut [T]) -> Result<&mut [T; N]> {
    let len = chunk.len();
    chunk
        .try_into()
        .map_err(|_| BgModelError::internal(format!("expected {} elements, got {}", N, len)))
}
