//! The bilinear factor model.
//!
//! `score(u, i) = dot(U[u], I[i]) + b_u + b_i + global_bias`
//!
//! A `FactorModel` starts out untrained (no tables). The trainer fills the
//! tables in; after that the model is only ever read.

use crate::config::TrainerConfig;
use crate::encoding::IdEncoding;
use crate::error::{FactorError, Result};
use data_loader::{MovieId, UserId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Learned parameters. Factor tables are row-major, `rank` floats per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Embeddings {
    pub(crate) users: IdEncoding,
    pub(crate) items: IdEncoding,
    pub(crate) user_factors: Vec<f32>,
    pub(crate) item_factors: Vec<f32>,
    pub(crate) user_bias: Vec<f32>,
    pub(crate) item_bias: Vec<f32>,
    pub(crate) global_bias: f32,
}

impl Embeddings {
    /// Random factors, zero biases.
    pub(crate) fn init<R: Rng>(
        users: IdEncoding,
        items: IdEncoding,
        rank: usize,
        init_scale: f32,
        global_bias: f32,
        rng: &mut R,
    ) -> Self {
        let mut table = |rows: usize| -> Vec<f32> {
            (0..rows * rank)
                .map(|_| rng.random_range(-init_scale..=init_scale))
                .collect()
        };
        let user_factors = table(users.len());
        let item_factors = table(items.len());

        Self {
            user_bias: vec![0.0; users.len()],
            item_bias: vec![0.0; items.len()],
            users,
            items,
            user_factors,
            item_factors,
            global_bias,
        }
    }

    #[inline]
    pub(crate) fn user_row(&self, user: usize, rank: usize) -> &[f32] {
        &self.user_factors[user * rank..(user + 1) * rank]
    }

    #[inline]
    pub(crate) fn item_row(&self, item: usize, rank: usize) -> &[f32] {
        &self.item_factors[item * rank..(item + 1) * rank]
    }

    /// Unchecked score; callers guarantee both indices are in range.
    #[inline]
    pub(crate) fn score(&self, user: usize, item: usize, rank: usize) -> f32 {
        dot(self.user_row(user, rank), self.item_row(item, rank))
            + self.user_bias[user]
            + self.item_bias[item]
            + self.global_bias
    }

    pub(crate) fn all_finite(&self) -> bool {
        self.global_bias.is_finite()
            && self
                .user_factors
                .iter()
                .chain(&self.item_factors)
                .chain(&self.user_bias)
                .chain(&self.item_bias)
                .all(|v| v.is_finite())
    }

    /// Table sizes must agree with the encodings and rank.
    fn check_layout(&self, rank: usize) -> Result<()> {
        let checks = [
            ("user factors", self.user_factors.len(), self.users.len() * rank),
            ("item factors", self.item_factors.len(), self.items.len() * rank),
            ("user biases", self.user_bias.len(), self.users.len()),
            ("item biases", self.item_bias.len(), self.items.len()),
        ];
        for (name, found, expected) in checks {
            if found != expected {
                return Err(FactorError::CorruptModel(format!(
                    "{name}: expected {expected} values, found {found}"
                )));
            }
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Matrix factorization model: embeddings, id encodings and the
/// hyperparameters it was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorModel {
    rank: usize,
    embeddings: Option<Embeddings>,
    trained_with: Option<TrainerConfig>,
}

impl FactorModel {
    /// An untrained model; every inference call fails with `NotTrained`.
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            embeddings: None,
            trained_with: None,
        }
    }

    pub(crate) fn from_embeddings(embeddings: Embeddings, config: TrainerConfig) -> Self {
        Self {
            rank: config.rank,
            embeddings: Some(embeddings),
            trained_with: Some(config),
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_trained(&self) -> bool {
        self.embeddings.is_some()
    }

    /// Hyperparameters used to train this model
    pub fn config(&self) -> Option<&TrainerConfig> {
        self.trained_with.as_ref()
    }

    pub fn num_users(&self) -> usize {
        self.embeddings.as_ref().map_or(0, |e| e.users.len())
    }

    pub fn num_items(&self) -> usize {
        self.embeddings.as_ref().map_or(0, |e| e.items.len())
    }

    /// Raw item ids with an embedding, in dense-index order
    pub fn item_ids(&self) -> &[MovieId] {
        match &self.embeddings {
            Some(embeddings) => embeddings.items.raw_ids(),
            None => &[],
        }
    }

    pub(crate) fn embeddings(&self) -> Result<&Embeddings> {
        self.embeddings.as_ref().ok_or(FactorError::NotTrained)
    }

    pub(crate) fn embeddings_mut(&mut self) -> Result<&mut Embeddings> {
        self.embeddings.as_mut().ok_or(FactorError::NotTrained)
    }

    pub fn encode_user(&self, raw_id: UserId) -> Result<usize> {
        self.embeddings()?
            .users
            .encode(raw_id)
            .ok_or(FactorError::UnknownUser(raw_id))
    }

    pub fn encode_item(&self, raw_id: MovieId) -> Result<usize> {
        self.embeddings()?
            .items
            .encode(raw_id)
            .ok_or(FactorError::UnknownItem(raw_id))
    }

    /// Predicted rating for dense indices.
    pub fn predict(&self, user: usize, item: usize) -> Result<f32> {
        let embeddings = self.embeddings()?;
        if user >= embeddings.users.len() {
            return Err(FactorError::IndexOutOfRange {
                kind: "user",
                index: user,
                len: embeddings.users.len(),
            });
        }
        if item >= embeddings.items.len() {
            return Err(FactorError::IndexOutOfRange {
                kind: "item",
                index: item,
                len: embeddings.items.len(),
            });
        }
        Ok(embeddings.score(user, item, self.rank))
    }

    /// Predicted rating for raw ids.
    pub fn predict_raw(&self, user_id: UserId, movie_id: MovieId) -> Result<f32> {
        let user = self.encode_user(user_id)?;
        let item = self.encode_item(movie_id)?;
        self.predict(user, item)
    }

    /// Structural check used after deserialization.
    pub(crate) fn check_layout(&self) -> Result<()> {
        let embeddings = self.embeddings()?;
        if self.rank == 0 {
            return Err(FactorError::CorruptModel("rank is zero".to_string()));
        }
        if let Some(config) = &self.trained_with
            && config.rank != self.rank
        {
            return Err(FactorError::CorruptModel(format!(
                "rank {} disagrees with trained config rank {}",
                self.rank, config.rank
            )));
        }
        embeddings.check_layout(self.rank)
    }
}
