use latentrec::services::serving::ModelHandle;
use latentrec::services::storage::{self, ModelStore};
use latentrec::services::training::TrainingService;
use latentrec::utils::metrics;
use latentrec::*;
use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use uuid::Uuid;

fn sample_matrix() -> Array2<f64> {
    array![
        [5.0, 3.0, 0.0, 1.0],
        [4.0, 0.0, 0.0, 1.0],
        [1.0, 1.0, 0.0, 5.0],
        [1.0, 0.0, 0.0, 4.0],
        [0.0, 1.0, 5.0, 4.0],
    ]
}

fn trained(matrix: &Array2<f64>, hyper: Hyperparameters, epochs: usize) -> LatentFactorModel {
    let store = RatingStore::from_matrix(matrix).unwrap();
    let mut model =
        LatentFactorModel::from_ratings(hyper, &store, &mut StdRng::seed_from_u64(100)).unwrap();
    Trainer::new(StdRng::seed_from_u64(101))
        .train(&mut model, store.observations(), epochs)
        .unwrap();
    model
}

#[test]
fn test_training_flow() {
    let matrix = sample_matrix();
    let store = RatingStore::from_matrix(&matrix).unwrap();
    let mut model = LatentFactorModel::from_ratings(
        Hyperparameters::new(3, 0.02, 0.02),
        &store,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    let initial_rmse = metrics::rmse(&model, store.observations()).unwrap();

    let history = Trainer::new(StdRng::seed_from_u64(2))
        .train(&mut model, store.observations(), 100)
        .unwrap();

    assert_eq!(history.len(), 100);
    assert!(history.iter().all(|record| record.rmse >= 0.0));
    assert!(history.last().unwrap().rmse < initial_rmse);

    let full = model.reconstruct();
    for user in 0..model.num_users() {
        for item in 0..model.num_items() {
            assert_eq!(full[[user, item]], model.predict(user, item).unwrap());
        }
    }
}

#[test]
fn test_single_entry_matrix_one_epoch() {
    let mut matrix = Array2::zeros((4, 4));
    matrix[[0, 0]] = 5.0;
    let store = RatingStore::from_matrix(&matrix).unwrap();
    assert_eq!(store.len(), 1);

    let mut model = LatentFactorModel::initialize(
        Hyperparameters::new(8, 0.1, 0.01),
        4,
        4,
        0.0,
        &mut StdRng::seed_from_u64(3),
    )
    .unwrap();
    let initial = model.predict(0, 0).unwrap();

    Trainer::new(StdRng::seed_from_u64(4))
        .train(&mut model, store.observations(), 1)
        .unwrap();

    assert!((5.0 - model.predict(0, 0).unwrap()).abs() < (5.0 - initial).abs());
}

#[test]
fn test_cold_start_on_two_item_model() {
    let matrix = array![[2.5, 1.5], [3.0, 1.0], [2.0, 2.0], [3.5, 1.5]];
    let model = trained(&matrix, Hyperparameters::new(2, 0.02, 0.02), 50);
    let before = model.clone();

    let ratings = [NewUserRating::new(0, 2.5), NewUserRating::new(1, 1.5)];
    let outcome = ColdStartInferencer::new(&model, ColdStartParams::default())
        .infer(&ratings, &mut StdRng::seed_from_u64(5))
        .unwrap();

    assert_eq!(outcome.predictions.len(), 2);
    assert!(outcome.history.len() <= 40);
    if outcome.converged {
        assert!(outcome.history.len() < 40);
        assert!(outcome.history.last().unwrap().rmse < 0.7);
    }
    assert_eq!(model, before);
}

#[test]
fn test_cold_start_rejects_unknown_item() {
    let model = trained(&sample_matrix(), Hyperparameters::new(3, 0.02, 0.02), 10);
    let before = model.clone();

    let err = ColdStartInferencer::new(&model, ColdStartParams::default())
        .infer(
            &[NewUserRating::new(1, 4.0), NewUserRating::new(model.num_items(), 3.0)],
            &mut StdRng::seed_from_u64(6),
        )
        .unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(model, before);
}

#[test]
fn test_snapshot_serialization_round_trip() {
    let model = trained(&sample_matrix(), Hyperparameters::new(4, 0.02, 0.02), 15);
    let snapshot = model.snapshot();

    let json = serde_json::to_string(&snapshot).unwrap();
    let decoded: ModelSnapshot = serde_json::from_str(&json).unwrap();
    let restored = LatentFactorModel::from_snapshot(decoded).unwrap();

    assert_eq!(restored.hyperparameters(), model.hyperparameters());
    assert_eq!(restored.global_bias(), model.global_bias());
    for (a, b) in restored.user_factors().iter().zip(model.user_factors().iter()) {
        assert!((a - b).abs() <= f64::EPSILON * b.abs().max(1.0));
    }
    for (a, b) in restored.item_bias().iter().zip(model.item_bias().iter()) {
        assert!((a - b).abs() <= f64::EPSILON * b.abs().max(1.0));
    }
    assert_eq!(restored.reconstruct().dim(), (5, 4));
}

#[test]
fn test_persisted_model_drives_recommendations() {
    let dir = std::env::temp_dir().join(format!("latentrec-it-{}", Uuid::new_v4()));
    let mut config = Config::default();
    config.model.latent_factors = 3;
    config.training.epochs = 30;
    config.training.seed = Some(9);
    config.cold_start.seed = Some(10);
    config.serving.workers = 2;
    config.storage.model_dir = dir.clone();

    let state = AppState::new(config).unwrap();
    assert!(state.restore_model().unwrap().is_none());

    let report = state
        .training_service
        .fit_and_publish(&sample_matrix(), &state.model_handle)
        .unwrap();
    state.model_store.save(&report.model, &report.history).unwrap();

    let reloaded = AppState::new((*state.config).clone()).unwrap();
    let persisted = reloaded.restore_model().unwrap().unwrap();
    assert_eq!(persisted.epochs_trained, 30);
    assert_eq!(*reloaded.model_handle.current().unwrap(), *report.model);

    // raw ratings on a 10-point scale
    let request = RecommendationRequest::new(vec![
        NewUserRating::new(0, 9.0),
        NewUserRating::new(3, 2.0),
    ]);
    let response = reloaded.serving_service.serve(&request, 10).unwrap();
    let items: Vec<usize> = response.items.iter().map(|s| s.item).collect();
    assert_eq!(items.len(), 2);
    assert!(items.contains(&1) && items.contains(&2));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_concurrent_cold_start_against_shared_model() {
    let model = Arc::new(trained(&sample_matrix(), Hyperparameters::new(3, 0.02, 0.02), 20));
    let handle = ModelHandle::new();
    handle.publish(model.clone());

    let threads: Vec<_> = (0..4)
        .map(|i| {
            let snapshot = handle.current().unwrap();
            std::thread::spawn(move || {
                ColdStartInferencer::new(&snapshot, ColdStartParams::default())
                    .infer(
                        &[NewUserRating::new(i % 4, 4.0)],
                        &mut StdRng::seed_from_u64(i as u64),
                    )
                    .unwrap()
                    .predictions
                    .len()
            })
        })
        .collect();

    for thread in threads {
        assert_eq!(thread.join().unwrap(), 4);
    }
    assert_eq!(*handle.current().unwrap(), *model);
}

#[test]
fn test_persisted_bytes_round_trip() {
    let model = trained(&sample_matrix(), Hyperparameters::new(2, 0.02, 0.02), 5);
    let persisted = PersistedModel::new(model.snapshot());

    let bytes = storage::to_bytes(&persisted).unwrap();
    let decoded = storage::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.model_id, persisted.model_id);
    assert_eq!(decoded.snapshot, persisted.snapshot);
}

#[test]
fn test_training_service_rejects_invalid_matrix() {
    let service = TrainingService::new(Arc::new(Config::default()));
    let matrix = array![[1.0, f64::NAN], [0.0, 2.0]];
    assert!(service.fit(&matrix).unwrap_err().is_precondition());

    let store = ModelStore::new(std::env::temp_dir().join(format!("latentrec-none-{}", Uuid::new_v4())));
    assert!(store.load().is_err());
}
