//! Core domain types for rating data and the movie catalog.
//!
//! Ratings are plain copyable triples. The catalog is a read-only lookup
//! table that downstream crates receive explicitly, never through globals.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Raw identifier for a user, as found in the ratings file
pub type UserId = u32;

/// Raw identifier for a movie, as found in the ratings and movies files
pub type MovieId = u32;

// =============================================================================
// Rating Type
// =============================================================================

/// A single (user, movie, label) observation
///
/// Duplicate (user, movie) pairs are legal; each one is kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Observed rating value (1.0 - 5.0 in MovieLens, but any finite real is accepted)
    pub label: f32,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, label: f32) -> Self {
        Self {
            user_id,
            movie_id,
            label,
        }
    }
}

// =============================================================================
// Movie Type
// =============================================================================

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from title (e.g., "Toy Story (1995)")
    pub year: Option<u16>,
    /// Pipe-separated genres as they appear in the file
    pub genres: Vec<String>,
}

// =============================================================================
// RatingStore - train/test splits
// =============================================================================

/// Holds the two externally-provided splits.
///
/// Partitioning is someone else's job: the store only loads what it's given.
#[derive(Debug, Clone, Default)]
pub struct RatingStore {
    pub train: Vec<Rating>,
    pub test: Vec<Rating>,
}

/// Summary of one split, used for logging and the CLI banner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitStats {
    pub ratings: usize,
    pub users: usize,
    pub movies: usize,
    /// Mean label, `None` for an empty split
    pub mean_label: Option<f64>,
}

impl SplitStats {
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        let users: HashSet<UserId> = ratings.iter().map(|r| r.user_id).collect();
        let movies: HashSet<MovieId> = ratings.iter().map(|r| r.movie_id).collect();
        let mean_label = if ratings.is_empty() {
            None
        } else {
            let total: f64 = ratings.iter().map(|r| r.label as f64).sum();
            Some(total / ratings.len() as f64)
        };

        Self {
            ratings: ratings.len(),
            users: users.len(),
            movies: movies.len(),
            mean_label,
        }
    }
}

impl RatingStore {
    pub fn new(train: Vec<Rating>, test: Vec<Rating>) -> Self {
        Self { train, test }
    }

    /// Stats for (train, test)
    pub fn stats(&self) -> (SplitStats, SplitStats) {
        (
            SplitStats::from_ratings(&self.train),
            SplitStats::from_ratings(&self.test),
        )
    }
}

// =============================================================================
// MovieCatalog - read-only title lookup
// =============================================================================

/// Movie metadata keyed by id, remembering file order for iteration.
#[derive(Debug, Clone, Default)]
pub struct MovieCatalog {
    pub(crate) movies: HashMap<MovieId, Movie>,
    pub(crate) order: Vec<MovieId>,
}

impl MovieCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from parsed movies.
    ///
    /// If an id repeats, the last entry wins but the id keeps its first position.
    pub fn from_movies(movies: impl IntoIterator<Item = Movie>) -> Self {
        let mut catalog = Self::new();
        for movie in movies {
            catalog.insert_movie(movie);
        }
        catalog
    }

    pub fn insert_movie(&mut self, movie: Movie) {
        if !self.movies.contains_key(&movie.id) {
            self.order.push(movie.id);
        }
        self.movies.insert(movie.id, movie);
    }

    /// Get a movie by ID
    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Title lookup; `None` when the id isn't in the catalog
    pub fn title(&self, id: MovieId) -> Option<&str> {
        self.movies.get(&id).map(|m| m.title.as_str())
    }

    /// All movie ids in the order they were loaded
    pub fn item_ids(&self) -> &[MovieId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
