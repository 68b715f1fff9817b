//! End-to-end properties of training and evaluation.

use data_loader::Rating;
use factorization::{FactorModel, Trainer, TrainerConfig, evaluate};

fn small_dataset() -> Vec<Rating> {
    vec![
        Rating::new(1, 1, 5.0),
        Rating::new(1, 2, 3.0),
        Rating::new(1, 3, 4.0),
        Rating::new(2, 1, 4.0),
        Rating::new(2, 2, 2.0),
        Rating::new(3, 2, 1.0),
        Rating::new(3, 3, 5.0),
        Rating::new(4, 1, 3.0),
        Rating::new(4, 3, 4.5),
    ]
}

#[test]
fn training_rmse_does_not_increase_across_epochs() {
    let train = small_dataset();
    let config = TrainerConfig::default()
        .with_rank(4)
        .with_iterations(60)
        .with_learning_rate(0.005)
        .with_regularization(0.0);

    let mut rmse_by_epoch = Vec::new();
    Trainer::new(config)
        .fit_observed(&train, None, |_, model| {
            rmse_by_epoch.push(evaluate(model, &train).unwrap().rmse);
        })
        .unwrap();

    assert_eq!(rmse_by_epoch.len(), 60);
    for pair in rmse_by_epoch.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "rmse went up: {:?}", pair);
    }
    assert!(rmse_by_epoch[59] < rmse_by_epoch[0]);
}

#[test]
fn predictions_are_stable_between_calls() {
    let config = TrainerConfig::default().with_rank(4).with_iterations(10);
    let (model, _) = Trainer::new(config).fit(&small_dataset()).unwrap();

    for rating in small_dataset() {
        let first = model.predict_raw(rating.user_id, rating.movie_id).unwrap();
        let second = model.predict_raw(rating.user_id, rating.movie_id).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }
}

#[test]
fn training_reduces_loss() {
    let config = TrainerConfig::default().with_rank(8).with_iterations(40);
    let (model, report) = Trainer::new(config).fit(&small_dataset()).unwrap();

    assert_eq!(report.epoch_losses.len(), 40);
    assert!(report.final_loss().unwrap() < report.epoch_losses[0]);
    assert_eq!(model.num_users(), 4);
    assert_eq!(model.num_items(), 3);
    assert_eq!(model.item_ids(), &[1, 2, 3]);
}

#[test]
fn duplicate_ratings_all_contribute() {
    // Two conflicting ratings for one pair: the fit lands between them
    let train = vec![Rating::new(1, 1, 1.0), Rating::new(1, 1, 5.0)];
    let config = TrainerConfig::default()
        .with_rank(2)
        .with_iterations(200)
        .with_learning_rate(0.02)
        .with_regularization(0.0);
    let (model, _) = Trainer::new(config).fit(&train).unwrap();

    let prediction = model.predict_raw(1, 1).unwrap();
    assert!(prediction > 2.0 && prediction < 4.0, "prediction {prediction}");
}

#[test]
fn untrained_model_has_no_predictions() {
    let model = FactorModel::new(16);
    assert!(model.predict_raw(1, 1).is_err());
    assert!(evaluate(&model, &small_dataset()).is_err());
}
