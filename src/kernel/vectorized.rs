//! Four-pixel mixture update.
//!
//! Every step of [`super::scalar::update_pixel`] is repeated here on whole lanes,
//! in the same order and with the same tie breaking, so a group of four pixels
//! ends in exactly the state four scalar calls would leave behind.

#![allow(clippy::indexing_slicing)]

use super::lanes::{deinterleave, interleave, F32x4, Mask4, MixtureLanes};
use super::{ETA_NORMALIZER, LANES, LOG_LIKELIHOOD_BASE, MATCH_SIGMAS};
use crate::config::ModelParameters;
use crate::error::{BgModelError, Result};
use crate::model::{PixelMixture, COMPONENTS_PER_PIXEL, VARIANCE_FLOOR};

/// Update four adjacent pixels and classify them.
///
/// `frame` and `out_background` hold the packed 3-byte colours of the group.
/// Returns the foreground mask with bit `i` set for lane `i`.
///
/// # Errors
///
/// Returns `BgModelError::NumericDegeneracy` naming the first lane whose weights
/// cannot be renormalised or whose likelihood statistic is NaN. Mixtures are left
/// untouched in that case.
pub fn update_group(
    frame: &[u8; 3 * LANES],
    mixtures: &mut [PixelMixture; LANES],
    out_background: &mut [u8; 3 * LANES],
    out_deviation: &mut [f32; LANES],
    params: &ModelParameters,
) -> Result<u8> {
    let [x_b, x_g, x_r] = deinterleave(frame);
    let mut m = MixtureLanes::load(mixtures);

    let learning_rate = F32x4::splat(params.learning_rate);
    let decay = F32x4::splat(1.0 - params.learning_rate);
    let one = F32x4::splat(1.0);

    let mut matched = Mask4::none();
    let mut hits = [Mask4::none(); COMPONENTS_PER_PIXEL];

    for k in 0..COMPONENTS_PER_PIXEL {
        let db = m.mean_b[k] - x_b;
        let dg = m.mean_g[k] - x_g;
        let dr = m.mean_r[k] - x_r;
        let distance = db * db + dg * dg + dr * dr;
        let variance = m.variance[k];
        let std_dev = variance.sqrt();

        let hit = distance
            .sqrt()
            .lt(F32x4::splat(MATCH_SIGMAS) * std_dev)
            .and_not(matched);
        hits[k] = hit;
        matched = matched | hit;

        if !hit.any() {
            continue;
        }

        let eta = (F32x4::splat(-0.5) * distance / variance).exp()
            / (F32x4::splat(ETA_NORMALIZER) * std_dev * std_dev * std_dev);
        let rho = (learning_rate * eta).min_scalar(1.0);
        let keep = one - rho;

        m.mean_b[k] = F32x4::select(hit, keep * m.mean_b[k] + rho * x_b, m.mean_b[k]);
        m.mean_g[k] = F32x4::select(hit, keep * m.mean_g[k] + rho * x_g, m.mean_g[k]);
        m.mean_r[k] = F32x4::select(hit, keep * m.mean_r[k] + rho * x_r, m.mean_r[k]);
        m.variance[k] = F32x4::select(
            hit,
            (keep * variance + rho * distance).max_scalar(VARIANCE_FLOOR),
            variance,
        );
    }

    for (weight, hit) in m.weight.iter_mut().zip(hits) {
        *weight = F32x4::select(hit, decay * *weight + learning_rate, *weight * decay);
    }

    let unmatched = !matched;
    if unmatched.any() {
        let [w0, w1, w2] = m.weight;
        let pick1 = w1.lt(w0);
        let pick2 = w2.lt(F32x4::select(pick1, w1, w0));
        let slots = [
            unmatched.and_not(pick1 | pick2),
            unmatched & pick1.and_not(pick2),
            unmatched & pick2,
        ];

        let fresh_variance = F32x4::splat(params.initial_variance.max(VARIANCE_FLOOR));
        let fresh_weight = F32x4::splat(params.initial_weight);
        for (k, slot) in slots.into_iter().enumerate() {
            m.mean_b[k] = F32x4::select(slot, x_b, m.mean_b[k]);
            m.mean_g[k] = F32x4::select(slot, x_g, m.mean_g[k]);
            m.mean_r[k] = F32x4::select(slot, x_r, m.mean_r[k]);
            m.variance[k] = F32x4::select(slot, fresh_variance, m.variance[k]);
            m.weight[k] = F32x4::select(slot, fresh_weight, m.weight[k]);
        }
    }

    let weight_sum = m.weight[0] + m.weight[1] + m.weight[2];
    let sums = weight_sum.to_array();
    if let Some(lane) = sums.iter().position(|s| !(*s > 0.0 && s.is_finite())) {
        return Err(BgModelError::numeric(format!(
            "lane {}: mixture weight sum is {}",
            lane, sums[lane]
        )));
    }
    for weight in &mut m.weight {
        *weight = *weight / weight_sum;
    }

    let [w0, w1, w2] = m.weight;
    let pick1 = w1.gt(w0);
    let pick2 = w2.gt(F32x4::select(pick1, w1, w0));
    let dominant = |field: &[F32x4; COMPONENTS_PER_PIXEL]| {
        F32x4::select(pick2, field[2], F32x4::select(pick1, field[1], field[0]))
    };
    let mean_b = dominant(&m.mean_b);
    let mean_g = dominant(&m.mean_g);
    let mean_r = dominant(&m.mean_r);
    let variance = dominant(&m.variance);
    let std_dev = variance.sqrt();

    let half = F32x4::splat(0.5);
    let db = x_b - mean_b;
    let dg = x_g - mean_g;
    let dr = x_r - mean_r;
    let mut epsilon = F32x4::splat(LOG_LIKELIHOOD_BASE) + F32x4::splat(3.0) * std_dev.ln();
    epsilon = epsilon + half * (db * db) / variance;
    epsilon = epsilon + half * (dg * dg) / variance;
    epsilon = epsilon + half * (dr * dr) / variance;

    if let Some(lane) = epsilon.is_nan().first() {
        return Err(BgModelError::numeric(format!(
            "lane {}: likelihood statistic is NaN (variance {})",
            lane,
            variance.to_array()[lane]
        )));
    }

    interleave([mean_b, mean_g, mean_r], out_background);
    *out_deviation = std_dev.to_array();
    m.store(mixtures);

    Ok(epsilon
        .gt(F32x4::splat(params.foreground_threshold))
        .bitmask())
}
