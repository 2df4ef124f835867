//! Per-pixel mixture records and the arena that holds one per pixel

use crate::config::ModelParameters;
use crate::error::{BgModelError, Result};
use std::ops::Range;

/// Number of Gaussian components kept per pixel
pub const COMPONENTS_PER_PIXEL: usize = 3;

/// Smallest variance a component may hold
pub const VARIANCE_FLOOR: f32 = 1.0e-2;

/// One hypothesis about a pixel's stationary colour
///
/// The variance is isotropic: the same value applies to all three channels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GaussianComponent {
    pub mean_b: f32,
    pub mean_g: f32,
    pub mean_r: f32,
    pub variance: f32,
    pub weight: f32,
}

impl GaussianComponent {
    #[must_use]
    pub fn new(mean: [f32; 3], variance: f32, weight: f32) -> Self {
        Self {
            mean_b: mean[0],
            mean_g: mean[1],
            mean_r: mean[2],
            variance,
            weight,
        }
    }

    #[must_use]
    pub fn mean(&self) -> [f32; 3] {
        [self.mean_b, self.mean_g, self.mean_r]
    }

    #[must_use]
    pub fn std_dev(&self) -> f32 {
        self.variance.sqrt()
    }

    /// Squared Euclidean distance between the mean and an observed colour
    #[inline]
    #[must_use]
    pub fn squared_distance(&self, observed: [f32; 3]) -> f32 {
        let db = self.mean_b - observed[0];
        let dg = self.mean_g - observed[1];
        let dr = self.mean_r - observed[2];
        db * db + dg * dg + dr * dr
    }
}

impl std::fmt::Display for GaussianComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(B, G, R): ({:.2}, {:.2}, {:.2})\t(variance, weight): ({:.4}, {:.4})",
            self.mean_b, self.mean_g, self.mean_r, self.variance, self.weight
        )
    }
}

/// Fixed-size set of competing components for one pixel
///
/// Slot order carries no meaning; the dominant and least-probable slots are
/// found by scanning weights when needed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelMixture {
    pub components: [GaussianComponent; COMPONENTS_PER_PIXEL],
}

impl PixelMixture {
    /// Mixture holding a single hypothesis at `observed`
    ///
    /// Every slot gets the observed mean and the initial variance; slot 0 carries
    /// all the weight.
    #[must_use]
    pub fn seeded(observed: [f32; 3], params: &ModelParameters) -> Self {
        let variance = params.initial_variance.max(VARIANCE_FLOOR);
        let mut components = [GaussianComponent::new(observed, variance, 0.0); COMPONENTS_PER_PIXEL];
        components[0].weight = 1.0;
        Self { components }
    }

    #[must_use]
    pub fn weight_sum(&self) -> f32 {
        self.components.iter().map(|c| c.weight).sum()
    }

    /// Slot with the largest weight; ties go to the lowest slot
    #[must_use]
    pub fn dominant_index(&self) -> usize {
        let mut best = 0;
        for (i, c) in self.components.iter().enumerate().skip(1) {
            if c.weight > self.components[best].weight {
                best = i;
            }
        }
        best
    }

    /// Slot with the smallest weight; ties go to the lowest slot
    #[must_use]
    pub fn least_probable_index(&self) -> usize {
        let mut worst = 0;
        for (i, c) in self.components.iter().enumerate().skip(1) {
            if c.weight < self.components[worst].weight {
                worst = i;
            }
        }
        worst
    }

    #[must_use]
    pub fn dominant(&self) -> &GaussianComponent {
        &self.components[self.dominant_index()]
    }
}

/// Contiguous store of one `PixelMixture` per pixel, indexed row-major
#[derive(Debug, Clone)]
pub struct MixtureArena {
    mixtures: Vec<PixelMixture>,
}

impl MixtureArena {
    /// Allocate `pixel_count` zeroed mixtures
    #[must_use]
    pub fn new(pixel_count: usize) -> Self {
        Self {
            mixtures: vec![PixelMixture::default(); pixel_count],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mixtures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mixtures.is_empty()
    }

    /// Mixture at `index`, if in range
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PixelMixture> {
        self.mixtures.get(index)
    }

    /// Mutable mixture at `index`
    pub fn get_mut(&mut self, index: usize) -> Result<&mut PixelMixture> {
        let len = self.mixtures.len();
        self.mixtures.get_mut(index).ok_or_else(|| {
            BgModelError::internal(format!(
                "Pixel index {} out of range for arena of {}",
                index, len
            ))
        })
    }

    /// Mixtures for a contiguous range of pixels
    pub fn range_mut(&mut self, range: Range<usize>) -> Result<&mut [PixelMixture]> {
        let len = self.mixtures.len();
        self.mixtures.get_mut(range.clone()).ok_or_else(|| {
            BgModelError::internal(format!(
                "Pixel range {:?} out of range for arena of {}",
                range, len
            ))
        })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PixelMixture] {
        &self.mixtures
    }

    pub fn as_mut_slice(&mut self) -> &mut [PixelMixture] {
        &mut self.mixtures
    }

    /// Replace every mixture with one seeded from the packed 3-byte frame
    pub fn seed_from_frame(&mut self, frame: &[u8], params: &ModelParameters) -> Result<()> {
        if frame.len() != self.mixtures.len() * 3 {
            return Err(BgModelError::dimension_mismatch(
                "frame",
                self.mixtures.len() * 3,
                frame.len(),
            ));
        }
        for (mixture, px) in self.mixtures.iter_mut().zip(frame.chunks_exact(3)) {
            let observed = [f32::from(px[0]), f32::from(px[1]), f32::from(px[2])];
            *mixture = PixelMixture::seeded(observed, params);
        }
        Ok(())
    }

    /// Zero every record
    pub fn clear(&mut self) {
        self.mixtures.fill(PixelMixture::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixture_with_weights(weights: [f32; 3]) -> PixelMixture {
        let mut m = PixelMixture::default();
        for (c, w) in m.components.iter_mut().zip(weights) {
            c.weight = w;
            c.variance = 4.0;
        }
        m
    }

    #[test]
    fn test_dominant_and_least_probable_ties_pick_lowest_slot() {
        let m = mixture_with_weights([0.2, 0.4, 0.4]);
        assert_eq!(m.dominant_index(), 1);
        assert_eq!(m.least_probable_index(), 0);

        let m = mixture_with_weights([0.5, 0.25, 0.25]);
        assert_eq!(m.dominant_index(), 0);
        assert_eq!(m.least_probable_index(), 1);
    }

    #[test]
    fn test_seeded_mixture() {
        let params = ModelParameters::default();
        let m = PixelMixture::seeded([10.0, 20.0, 30.0], &params);
        assert!((m.weight_sum() - 1.0).abs() < 1e-6);
        assert_eq!(m.dominant_index(), 0);
        for c in &m.components {
            assert_eq!(c.mean(), [10.0, 20.0, 30.0]);
            assert!(c.variance > 0.0);
        }
    }

    #[test]
    fn test_squared_distance() {
        let c = GaussianComponent::new([1.0, 2.0, 3.0], 1.0, 1.0);
        assert!((c.squared_distance([2.0, 4.0, 6.0]) - 14.0).abs() < 1e-6);
    }

    #[test]
    fn test_arena_seed_and_bounds() {
        let params = ModelParameters::default();
        let mut arena = MixtureArena::new(2);
        assert!(arena.seed_from_frame(&[1, 2, 3], &params).is_err());
        arena.seed_from_frame(&[1, 2, 3, 4, 5, 6], &params).unwrap();
        assert_eq!(arena.get(1).unwrap().components[0].mean(), [4.0, 5.0, 6.0]);
        assert!(arena.get(2).is_none());
        assert!(arena.get_mut(2).is_err());
        assert!(arena.range_mut(1..3).is_err());
        assert_eq!(arena.range_mut(0..2).unwrap().len(), 2);

        arena.clear();
        assert_eq!(arena.get(0).unwrap().weight_sum(), 0.0);
    }
}
