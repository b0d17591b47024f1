//! Run configuration.
//!
//! Stored as JSON; every field is optional in the file and falls back to
//! `RunConfig::default()`.
//!
//! ```json
//! { "width": 16, "height": 12, "seed": 7, "propagation": "fixpoint" }
//! ```

use crate::error::{CollapseError, LoadError};
use crate::propagation::PropagationMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameters of one collapse run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub width: usize,
    pub height: usize,
    /// Fixed RNG seed. `None` seeds from OS entropy once per run.
    pub seed: Option<u64>,
    pub propagation: PropagationMode,
    /// Maximum rounds before the run stops. `None` means `width * height`.
    pub round_cap: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            seed: None,
            propagation: PropagationMode::SinglePass,
            round_cap: None,
        }
    }
}

impl RunConfig {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_propagation(mut self, propagation: PropagationMode) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_round_cap(mut self, round_cap: usize) -> Self {
        self.round_cap = Some(round_cap);
        self
    }

    /// Round cap in force for this config.
    pub fn effective_round_cap(&self) -> usize {
        self.round_cap
            .unwrap_or_else(|| self.width.saturating_mul(self.height))
    }

    /// Check dimensions and round cap.
    pub fn validate(&self) -> Result<(), CollapseError> {
        if self.width == 0 || self.height == 0 {
            return Err(CollapseError::InvalidConfiguration(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.effective_round_cap() == 0 {
            return Err(CollapseError::InvalidConfiguration(
                "round cap must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
