//! SGD trainer for the factor model.
//!
//! ## Algorithm
//! Minimizes `sum (r - predict(u,i))^2 + lambda * (|U[u]|^2 + |I[i]|^2)`:
//! 1. Encode raw ids and initialize the tables with small random values
//! 2. Each epoch, shuffle the triples
//! 3. For each triple, take a symmetric gradient step on `U[u]` and `I[i]`
//!    (both computed from the pre-update vectors), plus the bias terms
//! 4. Stop after `iterations` epochs, or earlier if validation RMSE stalls
//!
//! Divergence (a non-finite loss or parameter) aborts the run; a corrupt
//! model is never handed back.

use crate::config::TrainerConfig;
use crate::encoding::IdEncoding;
use crate::error::{FactorError, Result};
use crate::evaluation::evaluate;
use crate::model::{Embeddings, FactorModel};
use data_loader::Rating;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument, warn};

/// A rating with both ids already mapped to dense indices
#[derive(Debug, Clone, Copy)]
struct DenseRating {
    user: usize,
    item: usize,
    label: f32,
}

/// What happened during a training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub epochs_run: usize,
    /// Mean squared training error seen during each epoch
    pub epoch_losses: Vec<f64>,
    /// Validation RMSE after each epoch (empty without a validation set)
    pub validation_rmse: Vec<f64>,
    /// 1-based epoch with the lowest validation RMSE
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// Tracks the best validation score and decides when to stop
struct ValidationTracker {
    best_rmse: f64,
    best_epoch: usize,
    best_model: Option<FactorModel>,
    stale_epochs: usize,
}

impl ValidationTracker {
    fn new() -> Self {
        Self {
            best_rmse: f64::INFINITY,
            best_epoch: 0,
            best_model: None,
            stale_epochs: 0,
        }
    }
}

/// Stochastic gradient descent trainer
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train on `train` for the configured number of epochs.
    pub fn fit(&self, train: &[Rating]) -> Result<(FactorModel, TrainingReport)> {
        self.fit_observed(train, None, |_, _| {})
    }

    /// Train, tracking RMSE on `validation` after every epoch.
    ///
    /// With early stopping configured, the best-scoring epoch's model is returned.
    pub fn fit_with_validation(
        &self,
        train: &[Rating],
        validation: &[Rating],
    ) -> Result<(FactorModel, TrainingReport)> {
        self.fit_observed(train, Some(validation), |_, _| {})
    }

    /// Full training entry point. `observer` runs after every completed
    /// epoch with the 1-based epoch number and the current model.
    #[instrument(skip_all, fields(ratings = train.len(), rank = self.config.rank))]
    pub fn fit_observed<F>(
        &self,
        train: &[Rating],
        validation: Option<&[Rating]>,
        mut observer: F,
    ) -> Result<(FactorModel, TrainingReport)>
    where
        F: FnMut(usize, &FactorModel),
    {
        self.config.validate()?;
        if train.is_empty() {
            return Err(FactorError::EmptyDataset);
        }

        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let users = IdEncoding::from_ids(train.iter().map(|r| r.user_id));
        let items = IdEncoding::from_ids(train.iter().map(|r| r.movie_id));
        let mut triples: Vec<DenseRating> = train
            .iter()
            .map(|r| DenseRating {
                // Both encodings were built from these same ratings
                user: users.encode(r.user_id).unwrap_or_default(),
                item: items.encode(r.movie_id).unwrap_or_default(),
                label: r.label,
            })
            .collect();

        let global_bias = if config.use_biases {
            let total: f64 = train.iter().map(|r| r.label as f64).sum();
            (total / train.len() as f64) as f32
        } else {
            0.0
        };

        info!(
            "Training rank-{} model on {} ratings ({} users, {} items) for up to {} epochs",
            config.rank,
            train.len(),
            users.len(),
            items.len(),
            config.iterations
        );

        let embeddings = Embeddings::init(
            users,
            items,
            config.rank,
            config.init_scale,
            global_bias,
            &mut rng,
        );
        let mut model = FactorModel::from_embeddings(embeddings, config.clone());

        let mut report = TrainingReport::default();
        let mut tracker = ValidationTracker::new();
        let mut validation = validation;

        for epoch in 1..=config.iterations {
            triples.shuffle(&mut rng);

            let embeddings = model.embeddings_mut()?;
            let loss = sgd_epoch(embeddings, &triples, config);
            if !loss.is_finite() || !embeddings.all_finite() {
                warn!("Loss became non-finite at epoch {}", epoch);
                return Err(FactorError::Divergence {
                    epoch,
                    last_finite_loss: report.final_loss(),
                });
            }

            report.epoch_losses.push(loss);
            report.epochs_run = epoch;
            debug!(epoch, loss, "Finished epoch");
            observer(epoch, &model);

            let Some(held_out) = validation else {
                continue;
            };
            let rmse = match evaluate(&model, held_out) {
                Ok(metrics) => metrics.rmse,
                Err(FactorError::NoScorableRatings { skipped }) => {
                    warn!(
                        "Validation set has no ratings for known ids ({} skipped), ignoring it",
                        skipped
                    );
                    validation = None;
                    continue;
                }
                Err(e) => return Err(e),
            };
            report.validation_rmse.push(rmse);
            debug!(epoch, rmse, "Validation");

            let min_delta = config.early_stopping.map_or(0.0, |s| s.min_delta);
            if rmse < tracker.best_rmse - min_delta {
                tracker.best_rmse = rmse;
                tracker.best_epoch = epoch;
                tracker.stale_epochs = 0;
                if config.early_stopping.is_some() {
                    tracker.best_model = Some(model.clone());
                }
            } else {
                tracker.stale_epochs += 1;
            }
            report.best_epoch = Some(tracker.best_epoch);

            if let Some(stopping) = config.early_stopping
                && tracker.stale_epochs >= stopping.patience
            {
                info!(
                    "Validation RMSE stalled for {} epochs, stopping at epoch {} (best epoch {})",
                    tracker.stale_epochs, epoch, tracker.best_epoch
                );
                report.stopped_early = true;
                break;
            }
        }

        if let Some(best) = tracker.best_model.take() {
            model = best;
        }

        info!(
            "Training finished after {} epochs, final loss {:.6}",
            report.epochs_run,
            report.final_loss().unwrap_or(f64::NAN)
        );
        Ok((model, report))
    }
}

/// One pass over `triples`. Returns the mean squared error observed
/// before each update.
fn sgd_epoch(embeddings: &mut Embeddings, triples: &[DenseRating], config: &TrainerConfig) -> f64 {
    let rank = config.rank;
    let lr = config.learning_rate;
    let reg = config.regularization;
    let mut squared_error = 0.0f64;

    for t in triples {
        let error = t.label - embeddings.score(t.user, t.item, rank);
        squared_error += (error as f64) * (error as f64);

        let user_row = &mut embeddings.user_factors[t.user * rank..(t.user + 1) * rank];
        let item_row = &mut embeddings.item_factors[t.item * rank..(t.item + 1) * rank];
        for (u, i) in user_row.iter_mut().zip(item_row.iter_mut()) {
            let (u_old, i_old) = (*u, *i);
            *u += lr * (error * i_old - reg * u_old);
            *i += lr * (error * u_old - reg * i_old);
        }

        if config.use_biases {
            let user_bias = &mut embeddings.user_bias[t.user];
            *user_bias += lr * (error - reg * *user_bias);
            let item_bias = &mut embeddings.item_bias[t.item];
            *item_bias += lr * (error - reg * *item_bias);
        }
    }

    squared_error / triples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EarlyStopping;

    fn preference_ratings() -> Vec<Rating> {
        vec![
            Rating::new(1, 1, 5.0),
            Rating::new(1, 2, 3.0),
            Rating::new(2, 1, 4.0),
            Rating::new(2, 2, 2.0),
        ]
    }

    #[test]
    fn test_empty_dataset() {
        let trainer = Trainer::default();
        assert!(matches!(trainer.fit(&[]), Err(FactorError::EmptyDataset)));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_training() {
        let trainer = Trainer::new(TrainerConfig::default().with_rank(0));
        assert!(matches!(
            trainer.fit(&preference_ratings()),
            Err(FactorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_model_differentiates_preferences() {
        let config = TrainerConfig::default()
            .with_rank(2)
            .with_iterations(100)
            .with_learning_rate(0.01)
            .with_regularization(0.01);
        let (model, report) = Trainer::new(config).fit(&preference_ratings()).unwrap();

        assert_eq!(report.epochs_run, 100);
        let liked = model.predict_raw(1, 1).unwrap();
        let less_liked = model.predict_raw(1, 2).unwrap();
        assert!((5.0 - liked).abs() < (5.0 - less_liked).abs());
    }

    #[test]
    fn test_single_triple_converges_without_regularization() {
        let config = TrainerConfig::default()
            .with_rank(4)
            .with_iterations(1000)
            .with_learning_rate(0.05)
            .with_regularization(0.0)
            .with_biases(false);
        let (model, _) = Trainer::new(config).fit(&[Rating::new(3, 9, 4.0)]).unwrap();

        let prediction = model.predict_raw(3, 9).unwrap();
        assert!((prediction - 4.0).abs() < 1e-3, "prediction {prediction}");
    }

    #[test]
    fn test_training_is_seeded() {
        let config = TrainerConfig::default().with_rank(3).with_iterations(5);
        let (a, _) = Trainer::new(config.clone()).fit(&preference_ratings()).unwrap();
        let (b, _) = Trainer::new(config).fit(&preference_ratings()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_divergence_is_reported() {
        let config = TrainerConfig::default()
            .with_rank(10)
            .with_iterations(50)
            .with_learning_rate(10.0)
            .with_init_scale(1.0);
        let result = Trainer::new(config).fit(&preference_ratings());

        assert!(
            matches!(result, Err(FactorError::Divergence { .. })),
            "expected divergence, got {result:?}"
        );
    }

    #[test]
    fn test_observer_sees_every_epoch() {
        let config = TrainerConfig::default().with_rank(2).with_iterations(7);
        let mut seen = Vec::new();
        Trainer::new(config)
            .fit_observed(&preference_ratings(), None, |epoch, model| {
                assert!(model.is_trained());
                seen.push(epoch);
            })
            .unwrap();
        assert_eq!(seen, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_early_stopping_keeps_best_epoch() {
        // Validation disagrees with training, so it gets worse as training fits
        let validation = vec![Rating::new(1, 1, 1.0), Rating::new(2, 2, 5.0)];
        let config = TrainerConfig::default()
            .with_rank(2)
            .with_iterations(500)
            .with_learning_rate(0.05)
            .with_early_stopping(EarlyStopping::new(3));
        let trainer = Trainer::new(config);
        let (model, report) = trainer
            .fit_with_validation(&preference_ratings(), &validation)
            .unwrap();

        assert!(report.stopped_early);
        assert!(report.epochs_run < 500);
        let best_epoch = report.best_epoch.unwrap();
        assert_eq!(report.epochs_run, best_epoch + 3);

        let best_rmse = report.validation_rmse[best_epoch - 1];
        let rmse = evaluate(&model, &validation).unwrap().rmse;
        assert!((rmse - best_rmse).abs() < 1e-9);
    }

    #[test]
    fn test_unusable_validation_set_is_ignored() {
        let validation = vec![Rating::new(99, 99, 3.0)];
        let config = TrainerConfig::default().with_rank(2).with_iterations(4);
        let (_, report) = Trainer::new(config)
            .fit_with_validation(&preference_ratings(), &validation)
            .unwrap();

        assert_eq!(report.epochs_run, 4);
        assert!(report.validation_rmse.is_empty());
    }
}
