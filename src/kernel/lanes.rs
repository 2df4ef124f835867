//! Four-lane value types and the packed/planar conversions used by the vectorized kernel.
//!
//! `F32x4` is a plain `[f32; 4]` whose operators are element-wise loops over a
//! fixed-width array; the optimiser lowers them to SSE/NEON without any
//! platform-specific code. Lane `i` always corresponds to pixel `i` of the group.

#![allow(clippy::indexing_slicing)]

use super::{to_channel, LANES};
use crate::model::{GaussianComponent, PixelMixture, COMPONENTS_PER_PIXEL};
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Not, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct F32x4(pub [f32; LANES]);

impl F32x4 {
    #[inline]
    #[must_use]
    pub fn splat(value: f32) -> Self {
        Self([value; LANES])
    }

    #[inline]
    #[must_use]
    pub fn to_array(self) -> [f32; LANES] {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self(self.0.map(f))
    }

    #[inline]
    #[must_use]
    pub fn sqrt(self) -> Self {
        self.map(f32::sqrt)
    }

    #[inline]
    #[must_use]
    pub fn exp(self) -> Self {
        self.map(f32::exp)
    }

    #[inline]
    #[must_use]
    pub fn ln(self) -> Self {
        self.map(f32::ln)
    }

    /// Lane-wise `min(self, value)`
    #[inline]
    #[must_use]
    pub fn min_scalar(self, value: f32) -> Self {
        self.map(|v| v.min(value))
    }

    /// Lane-wise `max(self, value)`
    #[inline]
    #[must_use]
    pub fn max_scalar(self, value: f32) -> Self {
        self.map(|v| v.max(value))
    }

    #[inline]
    #[must_use]
    pub fn lt(self, rhs: Self) -> Mask4 {
        Mask4(std::array::from_fn(|i| self.0[i] < rhs.0[i]))
    }

    #[inline]
    #[must_use]
    pub fn gt(self, rhs: Self) -> Mask4 {
        Mask4(std::array::from_fn(|i| self.0[i] > rhs.0[i]))
    }

    /// Per-lane choice: `if_true` where `mask` is set, `if_false` elsewhere
    #[inline]
    #[must_use]
    pub fn select(mask: Mask4, if_true: Self, if_false: Self) -> Self {
        Self(std::array::from_fn(|i| {
            if mask.0[i] {
                if_true.0[i]
            } else {
                if_false.0[i]
            }
        }))
    }

    /// Mask of lanes that are NaN
    #[inline]
    #[must_use]
    pub fn is_nan(self) -> Mask4 {
        Mask4(self.0.map(f32::is_nan))
    }
}

macro_rules! lane_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for F32x4 {
            type Output = Self;

            #[inline]
            fn $method(self, rhs: Self) -> Self {
                Self(std::array::from_fn(|i| self.0[i] $op rhs.0[i]))
            }
        }
    };
}

lane_binop!(Add, add, +);
lane_binop!(Sub, sub, -);
lane_binop!(Mul, mul, *);
lane_binop!(Div, div, /);

/// Per-lane booleans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mask4(pub [bool; LANES]);

impl Mask4 {
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self([false; LANES])
    }

    /// `self & !other`
    #[inline]
    #[must_use]
    pub fn and_not(self, other: Self) -> Self {
        self & !other
    }

    #[inline]
    #[must_use]
    pub fn any(self) -> bool {
        self.0.iter().any(|&b| b)
    }

    /// Bit `i` set when lane `i` is set
    #[inline]
    #[must_use]
    pub fn bitmask(self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &b)| acc | (u8::from(b) << i))
    }

    /// Index of the first set lane
    #[must_use]
    pub fn first(self) -> Option<usize> {
        self.0.iter().position(|&b| b)
    }
}

impl BitAnd for Mask4 {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(std::array::from_fn(|i| self.0[i] && rhs.0[i]))
    }
}

impl BitOr for Mask4 {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(std::array::from_fn(|i| self.0[i] || rhs.0[i]))
    }
}

impl Not for Mask4 {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(self.0.map(|b| !b))
    }
}

/// Packed `c0 c1 c2` bytes of four pixels to three planar channel lanes
#[inline]
#[must_use]
pub fn deinterleave(packed: &[u8; 3 * LANES]) -> [F32x4; 3] {
    std::array::from_fn(|c| F32x4(std::array::from_fn(|i| f32::from(packed[3 * i + c]))))
}

/// Planar channel lanes back to packed bytes, rounding and clamping each value
#[inline]
pub fn interleave(planes: [F32x4; 3], packed: &mut [u8; 3 * LANES]) {
    for (i, px) in packed.chunks_exact_mut(3).enumerate() {
        for (c, byte) in px.iter_mut().enumerate() {
            *byte = to_channel(planes[c].0[i]);
        }
    }
}

/// Planar view of four pixels' mixtures: `field[k]` holds component `k` of every lane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixtureLanes {
    pub mean_b: [F32x4; COMPONENTS_PER_PIXEL],
    pub mean_g: [F32x4; COMPONENTS_PER_PIXEL],
    pub mean_r: [F32x4; COMPONENTS_PER_PIXEL],
    pub variance: [F32x4; COMPONENTS_PER_PIXEL],
    pub weight: [F32x4; COMPONENTS_PER_PIXEL],
}

impl MixtureLanes {
    /// Gather four per-pixel records into planar lanes
    #[must_use]
    pub fn load(mixtures: &[PixelMixture; LANES]) -> Self {
        Self {
            mean_b: gather(mixtures, |c| c.mean_b),
            mean_g: gather(mixtures, |c| c.mean_g),
            mean_r: gather(mixtures, |c| c.mean_r),
            variance: gather(mixtures, |c| c.variance),
            weight: gather(mixtures, |c| c.weight),
        }
    }

    /// Scatter planar lanes back into the per-pixel records
    pub fn store(&self, mixtures: &mut [PixelMixture; LANES]) {
        for (i, mixture) in mixtures.iter_mut().enumerate() {
            for (k, gauss) in mixture.components.iter_mut().enumerate() {
                gauss.mean_b = self.mean_b[k].0[i];
                gauss.mean_g = self.mean_g[k].0[i];
                gauss.mean_r = self.mean_r[k].0[i];
                gauss.variance = self.variance[k].0[i];
                gauss.weight = self.weight[k].0[i];
            }
        }
    }
}

fn gather(
    mixtures: &[PixelMixture; LANES],
    get: impl Fn(&GaussianComponent) -> f32,
) -> [F32x4; COMPONENTS_PER_PIXEL] {
    std::array::from_fn(|k| F32x4(std::array::from_fn(|i| get(&mixtures[i].components[k]))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_is_lane_wise() {
        let a = F32x4([1.0, 2.0, 3.0, 4.0]);
        let b = F32x4::splat(2.0);
        assert_eq!((a + b).to_array(), [3.0, 4.0, 5.0, 6.0]);
        assert_eq!((a - b).to_array(), [-1.0, 0.0, 1.0, 2.0]);
        assert_eq!((a * b).to_array(), [2.0, 4.0, 6.0, 8.0]);
        assert_eq!((a / b).to_array(), [0.5, 1.0, 1.5, 2.0]);
        assert_eq!(a.min_scalar(2.5).to_array(), [1.0, 2.0, 2.5, 2.5]);
    }

    #[test]
    fn test_masks() {
        let a = F32x4([1.0, 5.0, 3.0, 7.0]);
        let m = a.lt(F32x4::splat(4.0));
        assert_eq!(m, Mask4([true, false, true, false]));
        assert_eq!(m.bitmask(), 0b0101);
        assert_eq!((!m).bitmask(), 0b1010);
        assert_eq!(m.and_not(Mask4([true, false, false, false])).bitmask(), 0b0100);
        assert_eq!((m | !m).bitmask(), 0b1111);
        assert!(!Mask4::none().any());
        assert_eq!(m.first(), Some(0));

        let picked = F32x4::select(m, a, F32x4::splat(0.0));
        assert_eq!(picked.to_array(), [1.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_deinterleave_then_interleave_restores_bytes() {
        let packed: [u8; 12] = [10, 20, 30, 11, 21, 31, 12, 22, 32, 13, 23, 33];
        let planes = deinterleave(&packed);
        assert_eq!(planes[0].to_array(), [10.0, 11.0, 12.0, 13.0]);
        assert_eq!(planes[1].to_array(), [20.0, 21.0, 22.0, 23.0]);
        assert_eq!(planes[2].to_array(), [30.0, 31.0, 32.0, 33.0]);

        let mut out = [0u8; 12];
        interleave(planes, &mut out);
        assert_eq!(out, packed);
    }

    #[test]
    fn test_interleave_rounds_and_clamps() {
        let planes = [
            F32x4([-3.0, 0.4, 0.5, 300.0]),
            F32x4::splat(254.6),
            F32x4::splat(1.49),
        ];
        let mut out = [0u8; 12];
        interleave(planes, &mut out);
        assert_eq!(&out[0..3], &[0, 255, 1]);
        assert_eq!(&out[3..6], &[0, 255, 1]);
        assert_eq!(&out[6..9], &[1, 255, 1]);
        assert_eq!(&out[9..12], &[255, 255, 1]);
    }

    #[test]
    fn test_mixture_lanes_load_store() {
        let mut mixtures = [PixelMixture::default(); 4];
        for (i, m) in mixtures.iter_mut().enumerate() {
            for (k, c) in m.components.iter_mut().enumerate() {
                let v = (i * 10 + k) as f32;
                *c = GaussianComponent::new([v, v + 1.0, v + 2.0], v + 3.0, v + 4.0);
            }
        }
        let lanes = MixtureLanes::load(&mixtures);
        assert_eq!(lanes.mean_b[1].to_array(), [1.0, 11.0, 21.0, 31.0]);
        assert_eq!(lanes.weight[2].to_array(), [6.0, 16.0, 26.0, 36.0]);

        let mut restored = [PixelMixture::default(); 4];
        lanes.store(&mut restored);
        assert_eq!(restored, mixtures);
    }
}
