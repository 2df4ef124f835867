//! Mask clean-up applied after the engine: median denoise, then elliptical erosion
//!
//! Both passes work on binary masks (0 = background, anything else = foreground)
//! and write 0/1 back. A size of 0 switches a pass off. The filtering itself is
//! done by `imageproc` on a `GrayImage` view of the mask.

use crate::config::FilterConfig;
use crate::error::{BgModelError, Result};
use image::{GrayImage, Luma};
use imageproc::filter::median_filter;
use imageproc::morphology::{grayscale_erode, Mask};

/// Median and erosion sizes applied to every mask, in that order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPostFilter {
    median_size: u32,
    erosion: Option<StructuringElement>,
}

impl MaskPostFilter {
    /// Build the filter, validating both sizes
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::InvalidConfig` for even or oversized kernels.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            median_size: config.median_filter_size,
            erosion: (config.morph_filter_size > 0)
                .then(|| StructuringElement::ellipse(config.morph_filter_size)),
        })
    }

    /// Filter that leaves masks untouched
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            median_size: 0,
            erosion: None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.median_size > 0 || self.erosion.is_some()
    }

    /// Filter `mask` (`width`×`height`, row-major) in place
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::DimensionMismatch` if the mask length is not `width * height`.
    pub fn apply(&mut self, mask: &mut [u8], width: usize, height: usize) -> Result<()> {
        if mask.len() != width * height {
            return Err(BgModelError::dimension_mismatch(
                "mask",
                width * height,
                mask.len(),
            ));
        }
        if mask.is_empty() || !self.is_enabled() {
            return Ok(());
        }

        let binary = mask.iter().map(|&m| u8::from(m != 0)).collect();
        let mut image = to_image(binary, width, height)?;

        // for a 0/1 image the k×k median is a majority vote; imageproc replicates borders
        if self.median_size > 0 {
            let radius = self.median_size / 2;
            image = median_filter(&image, radius, radius);
        }
        // out-of-frame pixels under the element are ignored
        if let Some(element) = &self.erosion {
            image = grayscale_erode(&image, &element.to_mask()?);
        }

        mask.copy_from_slice(image.as_raw());
        Ok(())
    }
}

fn to_image(pixels: Vec<u8>, width: usize, height: usize) -> Result<GrayImage> {
    let (w, h) = (
        u32::try_from(width).map_err(|_| BgModelError::internal("Mask width overflows u32"))?,
        u32::try_from(height).map_err(|_| BgModelError::internal("Mask height overflows u32"))?,
    );
    GrayImage::from_raw(w, h, pixels)
        .ok_or_else(|| BgModelError::internal("Mask buffer does not match its dimensions"))
}

/// Boolean footprint of a square kernel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
struct StructuringElement {
    size: u32,
    taps: Vec<bool>,
}

impl StructuringElement {
    /// Ellipse inscribed in a `size`×`size` square, rows spanning `c ± round(sqrt(r² - dy²))`
    fn ellipse(size: u32) -> Self {
        let n = size as usize;
        let r = f64::from(size / 2);
        let mut taps = vec![false; n * n];
        for (i, row) in taps.chunks_exact_mut(n).enumerate() {
            let dy = i as f64 - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (r * r - dy * dy).max(0.0).sqrt().round() as usize;
            let center = n / 2;
            let from = center.saturating_sub(dx);
            let to = (center + dx + 1).min(n);
            row[from..to].fill(true);
        }
        Self { size, taps }
    }

    fn to_mask(&self) -> Result<Mask> {
        let center = u8::try_from(self.size / 2).map_err(|_| {
            BgModelError::invalid_config(format!("Erosion kernel {} is too large", self.size))
        })?;
        let image = GrayImage::from_fn(self.size, self.size, |x, y| {
            let on = self
                .taps
                .get((y * self.size + x) as usize)
                .copied()
                .unwrap_or(false);
            Luma([if on { 255 } else { 0 }])
        });
        Ok(Mask::from_image(&image, center, center))
    }
}
