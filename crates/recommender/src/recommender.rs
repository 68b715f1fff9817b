//! Top-K recommendation from a trained factor model.
//!
//! ## Algorithm
//! 1. Resolve the user's embedding (unknown user is an error)
//! 2. Score every distinct candidate individually against that user
//! 3. Drop candidates the model has never seen
//! 4. Stable sort by score descending, so ties keep candidate order
//! 5. Keep the first `k`

use crate::catalog::ItemCatalog;
use crate::error::{RecommendError, Result};
use data_loader::{MovieId, UserId};
use factorization::{FactorError, FactorModel};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// A candidate and its predicted rating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub movie_id: MovieId,
    pub score: f32,
}

/// A scored item with its catalog title attached
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub score: f32,
    /// `None` when the catalog has no entry for this id
    pub title: Option<String>,
}

/// Serves recommendations from a shared, read-only model.
pub struct Recommender<C: ItemCatalog> {
    model: Arc<FactorModel>,
    catalog: Arc<C>,
}

impl<C: ItemCatalog> Clone for Recommender<C> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<C: ItemCatalog> Recommender<C> {
    pub fn new(model: Arc<FactorModel>, catalog: Arc<C>) -> Self {
        Self { model, catalog }
    }

    pub fn model(&self) -> &FactorModel {
        &self.model
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Best `k` of `candidates` for `user_id`, highest score first.
    ///
    /// Repeated candidates are scored once, at their first position.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub fn top_k(
        &self,
        user_id: UserId,
        candidates: &[MovieId],
        k: usize,
    ) -> Result<Vec<ScoredItem>> {
        let start = Instant::now();
        let user = self.model.encode_user(user_id).map_err(|e| match e {
            FactorError::UnknownUser(id) => RecommendError::UnknownUser(id),
            other => RecommendError::Model(other),
        })?;

        let mut seen = HashSet::with_capacity(candidates.len());
        let unique: Vec<MovieId> = candidates
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        // collect() on an indexed parallel iterator keeps input order
        let scored: Vec<Option<ScoredItem>> = unique
            .par_iter()
            .map(|&movie_id| {
                let item = self.model.encode_item(movie_id).ok()?;
                let score = self.model.predict(user, item).ok()?;
                Some(ScoredItem { movie_id, score })
            })
            .collect();

        let mut ranked: Vec<ScoredItem> = scored.into_iter().flatten().collect();
        let skipped = unique.len() - ranked.len();
        if skipped > 0 {
            debug!("Skipped {} candidates unknown to the model", skipped);
        }

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(k);

        debug!(
            "Ranked {} candidates for user {} in {:?}",
            unique.len(),
            user_id,
            start.elapsed()
        );
        Ok(ranked)
    }

    /// Top `k` over the whole catalog, with titles attached.
    pub fn recommend(&self, user_id: UserId, k: usize) -> Result<Vec<Recommendation>> {
        let top = self.top_k(user_id, self.catalog.item_ids(), k)?;

        Ok(top
            .into_iter()
            .map(|item| Recommendation {
                movie_id: item.movie_id,
                score: item.score,
                title: self.catalog.title(item.movie_id).map(str::to_string),
            })
            .collect())
    }
}
