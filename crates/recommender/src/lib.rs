//! # Recommender Crate
//!
//! Serves top-K movie recommendations from a trained
//! [`FactorModel`](factorization::FactorModel).
//!
//! The item catalog is injected through the [`ItemCatalog`] trait and both
//! the model and the catalog are shared read-only behind `Arc`, so a
//! `Recommender` can be cloned freely across threads.
//!
//! ## Example Usage
//!
//! ```ignore
//! use recommender::Recommender;
//! use std::sync::Arc;
//!
//! let recommender = Recommender::new(Arc::new(model), Arc::new(catalog));
//! for rec in recommender.recommend(user_id, 5)? {
//!     println!("{:.2}  {}", rec.score, rec.title.unwrap_or_default());
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod recommender;

pub use catalog::ItemCatalog;
pub use error::{RecommendError, Result};
pub use recommender::{Recommendation, Recommender, ScoredItem};
