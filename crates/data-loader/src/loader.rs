//! Loading entry points for the rating splits and the movie catalog.

use crate::error::Result;
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{info, instrument};

impl RatingStore {
    /// Load the train and test splits.
    ///
    /// Both files are parsed in parallel with `rayon::join`; if either fails
    /// the error is returned and neither split is kept.
    #[instrument(skip_all, fields(train = %train_path.display(), test = %test_path.display()))]
    pub fn load(train_path: &Path, test_path: &Path) -> Result<Self> {
        let (train, test) = rayon::join(
            || parser::parse_ratings(train_path),
            || parser::parse_ratings(test_path),
        );
        let store = Self::new(train?, test?);

        let (train_stats, test_stats) = store.stats();
        info!(
            "Loaded {} train ratings ({} users, {} movies) and {} test ratings",
            train_stats.ratings, train_stats.users, train_stats.movies, test_stats.ratings
        );
        Ok(store)
    }

    /// Load a single ratings file, e.g. a held-out split on its own.
    pub fn load_split(path: &Path) -> Result<Vec<Rating>> {
        parser::parse_ratings(path)
    }
}

impl MovieCatalog {
    /// Load the catalog from a `movieId,title,genres` file
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let catalog = Self::from_movies(parser::parse_movies(path)?);
        info!("Loaded {} movies into the catalog", catalog.len());
        Ok(catalog)
    }
}
