//! Live parameter handle shared between the engine and whoever retunes it
//!
//! A publish swaps the whole snapshot under a write lock, so a reader either sees
//! the previous parameters or the new ones, never a mix of both.

use crate::config::ModelParameters;
use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct Slot {
    params: Arc<ModelParameters>,
    generation: u64,
}

/// Cloneable handle to the current [`ModelParameters`] snapshot
#[derive(Debug, Clone)]
pub struct ParameterStore(Arc<RwLock<Slot>>);

impl Default for ParameterStore {
    fn default() -> Self {
        Self::from_valid(ModelParameters::default())
    }
}

impl ParameterStore {
    /// Store holding `params` as generation 0
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::InvalidConfig` if `params` fails validation.
    pub fn new(params: ModelParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self::from_valid(params))
    }

    fn from_valid(params: ModelParameters) -> Self {
        Self(Arc::new(RwLock::new(Slot {
            params: Arc::new(params),
            generation: 0,
        })))
    }

    /// The snapshot currently in force
    #[must_use]
    pub fn snapshot(&self) -> Arc<ModelParameters> {
        Arc::clone(&self.0.read().params)
    }

    /// Number of accepted publishes since construction
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.0.read().generation
    }

    /// Replace the snapshot; the next frame started after this returns sees it.
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::InvalidConfig` and keeps the previous snapshot if
    /// `params` fails validation.
    pub fn publish(&self, params: ModelParameters) -> Result<u64> {
        if let Err(e) = params.validate() {
            warn!(error = %e, "Rejected parameter snapshot");
            return Err(e);
        }
        let mut slot = self.0.write();
        slot.params = Arc::new(params);
        slot.generation += 1;
        debug!(
            generation = slot.generation,
            learning_rate = params.learning_rate,
            foreground_threshold = params.foreground_threshold,
            "Published parameter snapshot"
        );
        Ok(slot.generation)
    }

    /// Parse a JSON parameter message and publish it
    ///
    /// Keys missing from the message take their default values, not the values of the
    /// current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::Json` for malformed JSON and `BgModelError::InvalidConfig`
    /// for out-of-range values; the previous snapshot stays live in both cases.
    pub fn publish_json(&self, json: &str) -> Result<u64> {
        let params: ModelParameters = serde_json::from_str(json).map_err(|e| {
            warn!(error = %e, "Rejected malformed parameter message");
            e
        })?;
        self.publish(params)
    }
}
