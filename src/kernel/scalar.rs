//! Scalar (one pixel per call) mixture update.

use super::{to_channel, ETA_NORMALIZER, LOG_LIKELIHOOD_BASE, MATCH_SIGMAS};
use crate::config::ModelParameters;
use crate::error::{BgModelError, Result};
use crate::model::{GaussianComponent, PixelMixture, VARIANCE_FLOOR};

/// Classification and snapshot values produced for one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelOutcome {
    pub foreground: bool,
    /// Dominant component mean, rounded to 8 bits
    pub background: [u8; 3],
    /// Dominant component standard deviation
    pub std_dev: f32,
}

/// Update `mixture` with one observed colour and classify the pixel.
///
/// The first component within [`MATCH_SIGMAS`] standard deviations is pulled
/// toward the observation and its weight moves toward one
/// (`w = (1 - lr) * w + lr`); every other component's weight decays by the
/// learning rate. Without a match the least-probable component is replaced by a fresh one
/// at the observed colour. Weights are then renormalised and the pixel is compared
/// against the heaviest component.
///
/// # Errors
///
/// Returns `BgModelError::NumericDegeneracy` if the weights cannot be renormalised
/// or the likelihood statistic is NaN.
pub fn update_pixel(
    observed: [u8; 3],
    mixture: &mut PixelMixture,
    params: &ModelParameters,
) -> Result<PixelOutcome> {
    let x = [
        f32::from(observed[0]),
        f32::from(observed[1]),
        f32::from(observed[2]),
    ];
    let learning_rate = params.learning_rate;
    let decay = 1.0 - learning_rate;
    let mut matched = false;

    for gauss in &mut mixture.components {
        let distance = gauss.squared_distance(x);
        let std_dev = gauss.std_dev();

        if !matched && distance.sqrt() < MATCH_SIGMAS * std_dev {
            matched = true;

            let eta = (-0.5 * distance / gauss.variance).exp()
                / (ETA_NORMALIZER * std_dev * std_dev * std_dev);
            let rho = (learning_rate * eta).min(1.0);
            let keep = 1.0 - rho;

            gauss.mean_b = keep * gauss.mean_b + rho * x[0];
            gauss.mean_g = keep * gauss.mean_g + rho * x[1];
            gauss.mean_r = keep * gauss.mean_r + rho * x[2];
            gauss.variance = (keep * gauss.variance + rho * distance).max(VARIANCE_FLOOR);
            gauss.weight = decay * gauss.weight + learning_rate;
        } else {
            gauss.weight *= decay;
        }
    }

    if !matched {
        let slot = mixture.least_probable_index();
        mixture.components[slot] = GaussianComponent::new(
            x,
            params.initial_variance.max(VARIANCE_FLOOR),
            params.initial_weight,
        );
    }

    let weight_sum = mixture.weight_sum();
    if !(weight_sum > 0.0 && weight_sum.is_finite()) {
        return Err(BgModelError::numeric(format!(
            "mixture weight sum is {}",
            weight_sum
        )));
    }
    for gauss in &mut mixture.components {
        gauss.weight /= weight_sum;
    }

    let dominant = mixture.dominant();
    let std_dev = dominant.std_dev();
    let epsilon = background_statistic(x, dominant, std_dev);
    if epsilon.is_nan() {
        return Err(BgModelError::numeric(format!(
            "likelihood statistic is NaN for component {}",
            dominant
        )));
    }

    Ok(PixelOutcome {
        foreground: epsilon > params.foreground_threshold,
        background: [
            to_channel(dominant.mean_b),
            to_channel(dominant.mean_g),
            to_channel(dominant.mean_r),
        ],
        std_dev,
    })
}

/// Negative log-likelihood style statistic of `x` under `gauss`; larger means less background-like
#[inline]
fn background_statistic(x: [f32; 3], gauss: &GaussianComponent, std_dev: f32) -> f32 {
    let db = x[0] - gauss.mean_b;
    let dg = x[1] - gauss.mean_g;
    let dr = x[2] - gauss.mean_r;

    let mut epsilon = LOG_LIKELIHOOD_BASE + 3.0 * std_dev.ln();
    epsilon += 0.5 * (db * db) / gauss.variance;
    epsilon += 0.5 * (dg * dg) / gauss.variance;
    epsilon += 0.5 * (dr * dr) / gauss.variance;
    epsilon
}
