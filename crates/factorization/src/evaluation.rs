//! Regression metrics for a trained model against held-out ratings.
//!
//! Ratings whose user or item has no embedding are skipped and counted
//! rather than scored against some stand-in vector.

use crate::error::{FactorError, Result};
use crate::model::FactorModel;
use data_loader::Rating;
use rayon::prelude::*;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    pub rmse: f64,
    pub mse: f64,
    pub mae: f64,
    /// `None` when every scored label is identical (zero total variance)
    pub r_squared: Option<f64>,
    /// Ratings that contributed to the metrics
    pub scored: usize,
    /// Ratings dropped because their user or item is unknown to the model
    pub skipped: usize,
}

/// Score `test` with `model` and aggregate the errors.
#[instrument(skip_all, fields(ratings = test.len()))]
pub fn evaluate(model: &FactorModel, test: &[Rating]) -> Result<EvaluationMetrics> {
    if !model.is_trained() {
        return Err(FactorError::NotTrained);
    }

    // Order is preserved, so the sums below don't depend on thread scheduling
    let pairs: Vec<(f64, f64)> = test
        .par_iter()
        .filter_map(|r| {
            model
                .predict_raw(r.user_id, r.movie_id)
                .ok()
                .map(|prediction| (r.label as f64, prediction as f64))
        })
        .collect();

    let scored = pairs.len();
    let skipped = test.len() - scored;
    if skipped > 0 {
        debug!("Skipped {} of {} ratings with unknown ids", skipped, test.len());
    }
    if scored == 0 {
        return Err(FactorError::NoScorableRatings { skipped });
    }

    let n = scored as f64;
    let mean_label = pairs.iter().map(|(label, _)| label).sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut abs_err = 0.0;
    for (label, prediction) in &pairs {
        let residual = label - prediction;
        ss_res += residual * residual;
        abs_err += residual.abs();
        ss_tot += (label - mean_label) * (label - mean_label);
    }

    let mse = ss_res / n;
    let r_squared = if ss_tot > 0.0 {
        Some(1.0 - ss_res / ss_tot)
    } else {
        None
    };

    let metrics = EvaluationMetrics {
        rmse: mse.sqrt(),
        mse,
        mae: abs_err / n,
        r_squared,
        scored,
        skipped,
    };
    debug!(?metrics, "Evaluation complete");
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Trainer, TrainerConfig};

    fn trained_model() -> FactorModel {
        let train = vec![
            Rating::new(1, 1, 5.0),
            Rating::new(1, 2, 3.0),
            Rating::new(2, 1, 4.0),
            Rating::new(2, 2, 2.0),
        ];
        let config = TrainerConfig::default().with_rank(2).with_iterations(50);
        Trainer::new(config).fit(&train).unwrap().0
    }

    #[test]
    fn test_untrained_model() {
        let model = FactorModel::new(4);
        assert!(matches!(
            evaluate(&model, &[Rating::new(1, 1, 3.0)]),
            Err(FactorError::NotTrained)
        ));
    }

    #[test]
    fn test_metrics_match_manual_computation() {
        let model = trained_model();
        let test = vec![Rating::new(1, 1, 4.0), Rating::new(2, 2, 3.0)];
        let metrics = evaluate(&model, &test).unwrap();

        let e1 = 4.0 - model.predict_raw(1, 1).unwrap() as f64;
        let e2 = 3.0 - model.predict_raw(2, 2).unwrap() as f64;
        let mse = (e1 * e1 + e2 * e2) / 2.0;

        assert_eq!(metrics.scored, 2);
        assert_eq!(metrics.skipped, 0);
        assert!((metrics.mse - mse).abs() < 1e-9);
        assert!((metrics.rmse - mse.sqrt()).abs() < 1e-9);
        assert!((metrics.mae - (e1.abs() + e2.abs()) / 2.0).abs() < 1e-9);
        // labels 4 and 3 around mean 3.5 -> SS_tot = 0.5
        let r2 = metrics.r_squared.unwrap();
        assert!((r2 - (1.0 - 2.0 * mse / 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_identical_labels_leave_r_squared_undefined() {
        let model = trained_model();
        let test = vec![Rating::new(1, 1, 3.0), Rating::new(2, 2, 3.0)];
        let metrics = evaluate(&model, &test).unwrap();

        assert_eq!(metrics.r_squared, None);
        assert!(metrics.rmse.is_finite());
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let model = trained_model();
        let test = vec![
            Rating::new(1, 1, 5.0),
            Rating::new(77, 1, 5.0),
            Rating::new(1, 77, 5.0),
        ];
        let metrics = evaluate(&model, &test).unwrap();

        assert_eq!(metrics.scored, 1);
        assert_eq!(metrics.skipped, 2);
    }

    #[test]
    fn test_nothing_scorable() {
        let model = trained_model();
        assert!(matches!(
            evaluate(&model, &[Rating::new(77, 77, 1.0)]),
            Err(FactorError::NoScorableRatings { skipped: 1 })
        ));
        assert!(matches!(
            evaluate(&model, &[]),
            Err(FactorError::NoScorableRatings { skipped: 0 })
        ));
    }
}
