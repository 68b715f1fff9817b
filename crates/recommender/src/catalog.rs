//! Read-only item metadata consumed by the recommender.

use data_loader::{MovieCatalog, MovieId};

/// Lookup of item titles, handed to the [`Recommender`](crate::Recommender)
/// explicitly. The recommender never mutates it.
///
/// `Send + Sync` so candidates can be scored from rayon workers.
pub trait ItemCatalog: Send + Sync {
    /// Title for `movie_id`, `None` if the catalog doesn't know it
    fn title(&self, movie_id: MovieId) -> Option<&str>;

    /// Every item the catalog can offer, in a stable order
    fn item_ids(&self) -> &[MovieId];
}

impl ItemCatalog for MovieCatalog {
    fn title(&self, movie_id: MovieId) -> Option<&str> {
        MovieCatalog::title(self, movie_id)
    }

    fn item_ids(&self) -> &[MovieId] {
        MovieCatalog::item_ids(self)
    }
}
