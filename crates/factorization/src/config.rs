//! Trainer hyperparameters.

use crate::error::{FactorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stop when validation RMSE hasn't improved by more than `min_delta`
/// for `patience` consecutive epochs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub patience: usize,
    #[serde(default)]
    pub min_delta: f64,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            min_delta: 0.0,
        }
    }

    pub fn with_min_delta(mut self, min_delta: f64) -> Self {
        self.min_delta = min_delta;
        self
    }
}

/// Hyperparameters for [`Trainer`](crate::Trainer).
///
/// Defaults follow the MovieLens setup this project started from:
/// rank 100, 20 epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Latent dimensionality of every embedding
    pub rank: usize,
    /// Number of passes over the training set
    pub iterations: usize,
    pub learning_rate: f32,
    /// L2 weight applied to embeddings and biases
    pub regularization: f32,
    /// Embeddings start uniform in `[-init_scale, init_scale]`
    pub init_scale: f32,
    /// Learn global/user/item bias terms alongside the embeddings
    pub use_biases: bool,
    /// Seeds initialization and per-epoch shuffling
    pub seed: u64,
    pub early_stopping: Option<EarlyStopping>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            rank: 100,
            iterations: 20,
            learning_rate: 0.01,
            regularization: 0.05,
            init_scale: 0.1,
            use_biases: true,
            seed: 42,
            early_stopping: None,
        }
    }
}

impl TrainerConfig {
    /// Read a (possibly partial) config from a JSON file; missing keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_init_scale(mut self, init_scale: f32) -> Self {
        self.init_scale = init_scale;
        self
    }

    pub fn with_biases(mut self, use_biases: bool) -> Self {
        self.use_biases = use_biases;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_early_stopping(mut self, early_stopping: EarlyStopping) -> Self {
        self.early_stopping = Some(early_stopping);
        self
    }

    /// Reject settings that can't produce a model.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FactorError::InvalidConfig(msg));

        if self.rank == 0 {
            return invalid("rank must be at least 1".to_string());
        }
        if self.iterations == 0 {
            return invalid("iterations must be at least 1".to_string());
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return invalid(format!(
                "regularization must be non-negative, got {}",
                self.regularization
            ));
        }
        if !self.init_scale.is_finite() || self.init_scale <= 0.0 {
            return invalid(format!("init_scale must be positive, got {}", self.init_scale));
        }
        if let Some(stopping) = &self.early_stopping {
            if stopping.patience == 0 {
                return invalid("early stopping patience must be at least 1".to_string());
            }
            if !stopping.min_delta.is_finite() || stopping.min_delta < 0.0 {
                return invalid(format!("min_delta must be non-negative, got {}", stopping.min_delta));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrainerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rank, 100);
        assert_eq!(config.iterations, 20);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let bad = [
            TrainerConfig::default().with_rank(0),
            TrainerConfig::default().with_iterations(0),
            TrainerConfig::default().with_learning_rate(0.0),
            TrainerConfig::default().with_learning_rate(f32::NAN),
            TrainerConfig::default().with_regularization(-0.1),
            TrainerConfig::default().with_early_stopping(EarlyStopping::new(0)),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(FactorError::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: TrainerConfig =
            serde_json::from_str(r#"{"rank": 8, "early_stopping": {"patience": 3}}"#).unwrap();

        assert_eq!(config.rank, 8);
        assert_eq!(config.iterations, 20);
        assert_eq!(config.early_stopping, Some(EarlyStopping::new(3)));
    }
}
