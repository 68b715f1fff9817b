//! Error types for serving recommendations.

use data_loader::UserId;
use factorization::FactorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// The user has no embedding, so there is nothing to score against
    #[error("Cannot recommend for user {0}: user is unknown to the model")]
    UnknownUser(UserId),

    #[error(transparent)]
    Model(#[from] FactorError),
}

pub type Result<T> = std::result::Result<T, RecommendError>;
