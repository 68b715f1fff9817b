//! # Factorization Crate
//!
//! Matrix factorization for explicit ratings: a bilinear factor model, an
//! SGD trainer, regression metrics, and JSON persistence.
//!
//! ## Example Usage
//!
//! ```ignore
//! use factorization::{evaluate, FactorModel, Trainer, TrainerConfig};
//!
//! let trainer = Trainer::new(TrainerConfig::default().with_rank(32));
//! let (model, report) = trainer.fit(&store.train)?;
//! let metrics = evaluate(&model, &store.test)?;
//! println!("RMSE {:.4} after {} epochs", metrics.rmse, report.epochs_run);
//!
//! model.save(Path::new("Data/MovieRecommenderModel.json"))?;
//! let reloaded = FactorModel::load(Path::new("Data/MovieRecommenderModel.json"))?;
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod persist;
pub mod trainer;

pub use config::{EarlyStopping, TrainerConfig};
pub use encoding::IdEncoding;
pub use error::{FactorError, Result};
pub use evaluation::{EvaluationMetrics, evaluate};
pub use model::FactorModel;
pub use persist::{load_model, save_model};
pub use trainer::{Trainer, TrainingReport};
