//! Error types for training, inference and model persistence.

use data_loader::{MovieId, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactorError {
    /// Inference was requested on a model that has no embeddings yet
    #[error("Model has not been trained")]
    NotTrained,

    #[error("Unknown user id {0}: no embedding was learned for it")]
    UnknownUser(UserId),

    #[error("Unknown item id {0}: no embedding was learned for it")]
    UnknownItem(MovieId),

    /// A dense index outside the embedding table
    #[error("{kind} index {index} out of range (table has {len} rows)")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Training set contains no ratings")]
    EmptyDataset,

    #[error("Invalid trainer configuration: {0}")]
    InvalidConfig(String),

    /// Loss went non-finite; the partially trained model is discarded
    #[error("Training diverged at epoch {epoch} (last finite loss: {})", fmt_loss(.last_finite_loss))]
    Divergence {
        epoch: usize,
        last_finite_loss: Option<f64>,
    },

    /// Every rating in an evaluation set referenced an unknown id
    #[error("No rating could be scored ({skipped} skipped for unknown ids)")]
    NoScorableRatings { skipped: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("Corrupt model: {0}")]
    CorruptModel(String),
}

fn fmt_loss(loss: &Option<f64>) -> String {
    match loss {
        Some(loss) => format!("{loss:.6}"),
        None => "none".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, FactorError>;
