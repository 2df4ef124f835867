//! Numeric validation utilities
//!
//! Range checks shared by the parameter snapshot, the post-filter configuration
//! and the engine constructor. Every check rejects NaN and infinities first so a
//! non-finite value can never slip into the per-pixel model.

use crate::error::{BgModelError, Result};

/// Validator for numeric configuration values
pub struct NumericValidator;

impl NumericValidator {
    /// Validate a value in the open unit interval (0, 1)
    pub fn validate_open_unit(value: f32, name: &str, recommended: f32) -> Result<f32> {
        if !value.is_finite() || value <= 0.0 || value >= 1.0 {
            return Err(BgModelError::config_value_error(
                name,
                value,
                "(0, 1)",
                Some(recommended),
            ));
        }
        Ok(value)
    }

    /// Validate a finite value that is at least `min`
    pub fn validate_at_least(value: f32, min: f32, name: &str, recommended: f32) -> Result<f32> {
        if !value.is_finite() || value < min {
            return Err(BgModelError::config_value_error(
                name,
                value,
                &format!("[{}, inf)", min),
                Some(recommended),
            ));
        }
        Ok(value)
    }

    /// Validate a finite, strictly positive value
    pub fn validate_positive(value: f32, name: &str, recommended: f32) -> Result<f32> {
        if !value.is_finite() || value <= 0.0 {
            return Err(BgModelError::config_value_error(
                name,
                value,
                "(0, inf)",
                Some(recommended),
            ));
        }
        Ok(value)
    }

    /// Validate a filter kernel size: 0 disables the stage, otherwise odd and >= 3
    pub fn validate_kernel_size(value: u32, name: &str) -> Result<u32> {
        const MAX_KERNEL: u32 = 31;

        if value == 0 {
            return Ok(value);
        }
        if value < 3 || value % 2 == 0 || value > MAX_KERNEL {
            return Err(BgModelError::config_value_error(
                name,
                value,
                "0 (disabled) or odd in 3..=31",
                Some(3),
            ));
        }
        Ok(value)
    }

    /// Validate thread count
    pub fn validate_thread_count(value: usize) -> Result<usize> {
        const MAX_THREADS: usize = 256; // Reasonable upper limit

        if value > MAX_THREADS {
            return Err(BgModelError::invalid_config(format!(
                "Thread count {} exceeds maximum allowed ({})",
                value, MAX_THREADS
            )));
        }

        Ok(value)
    }

    /// Validate frame dimensions and return the pixel count
    pub fn validate_dimensions(width: u32, height: u32) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(BgModelError::invalid_config(format!(
                "Invalid frame dimensions: {}x{}",
                width, height
            )));
        }
        let pixels = u64::from(width) * u64::from(height);
        usize::try_from(pixels)
            .ok()
            .and_then(|p| p.checked_mul(3).map(|_| p))
            .ok_or_else(|| {
                BgModelError::invalid_config(format!(
                    "Frame dimensions too large: {}x{}",
                    width, height
                ))
            })
    }
}
