//! # Data Loader Crate
//!
//! Loads the rating splits and the movie catalog used by the recommender.
//!
//! ## Main Components
//!
//! - **types**: `Rating`, `Movie`, `RatingStore`, `MovieCatalog`
//! - **parser**: CSV parsing with per-line error reporting
//! - **loader**: file-level entry points
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{MovieCatalog, RatingStore};
//! use std::path::Path;
//!
//! let store = RatingStore::load(
//!     Path::new("Data/recommendation-ratings-train.csv"),
//!     Path::new("Data/recommendation-ratings-test.csv"),
//! )?;
//! let catalog = MovieCatalog::load(Path::new("Data/recommendation-movies.csv"))?;
//!
//! println!("{} training ratings, {} movies", store.train.len(), catalog.len());
//! ```

pub mod error;
pub mod loader;
pub mod parser;
pub mod types;

pub use error::{DataLoadError, Result};
pub use types::{Movie, MovieCatalog, MovieId, Rating, RatingStore, SplitStats, UserId};
