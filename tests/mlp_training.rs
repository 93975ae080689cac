use rand::rngs::StdRng;
use rand::SeedableRng;

use numlearn::{
    accuracy, make_blobs, Activation, Error, Loss, Matrix, MlpBuilder, MlpState, Optimizer,
    Shuffle, TrainingLog,
};

/// Four points labeled by the sign of the first feature, one-hot encoded.
fn toy() -> (Matrix, Matrix) {
    let x = Matrix::new(4, 2, vec![-1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0]).unwrap();
    let y = Matrix::new(4, 2, vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
    (x, y)
}

fn one_hot(labels: &Matrix, classes: usize) -> Matrix {
    let mut y = Matrix::zeros(labels.rows(), classes).unwrap();
    for r in 0..labels.rows() {
        y.set(r, labels.get(r, 0) as usize, 1.0);
    }
    y
}

#[test]
fn toy_classifier_reaches_full_training_accuracy() {
    let (x, y) = toy();
    let mut mlp = MlpBuilder::new(&[2, 8, 2])
        .activation(Activation::Tanh)
        .momentum(0.9)
        .learning_rate(0.1)
        .batch_size(4)
        .epochs(1000)
        .seed(0)
        .build()
        .unwrap();

    let report = mlp.train(&x, &y, None).unwrap();
    assert_eq!(mlp.state(), MlpState::Fitted);
    assert!(report.final_accuracy().unwrap() > 0.9);

    let h = mlp.predict(&x).unwrap();
    assert_eq!(accuracy(&y, &h).unwrap(), 1.0);
    let first = report.epochs[0].train.loss;
    assert!(report.final_loss().unwrap() < first);
}

#[test]
fn full_batch_sgd_never_increases_loss() {
    let (x, y) = toy();
    let mut mlp = MlpBuilder::new(&[2, 4, 2])
        .activation(Activation::Sigmoid)
        .optimizer(Optimizer::Sgd)
        .learning_rate(0.05)
        .batch_size(4)
        .epochs(100)
        .seed(11)
        .build()
        .unwrap();

    let report = mlp.train(&x, &y, None).unwrap();
    let losses: Vec<f64> = report.epochs.iter().map(|e| e.train.loss).collect();
    for pair in losses.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12, "loss rose: {pair:?}");
    }
}

#[test]
fn blobs_are_separated_with_shuffled_mini_batches() {
    let centers = Matrix::new(3, 2, vec![-5.0, 0.0, 5.0, 0.0, 0.0, 6.0]).unwrap();
    let mut rng = StdRng::seed_from_u64(21);
    let train = make_blobs(150, &centers, 0.5, &mut rng).unwrap();
    let test = make_blobs(60, &centers, 0.5, &mut rng).unwrap();
    let (y_train, y_test) = (one_hot(train.y(), 3), one_hot(test.y(), 3));

    let mut mlp = MlpBuilder::new(&[2, 16, 3])
        .learning_rate(0.05)
        .batch_size(16)
        .epochs(60)
        .shuffle(Shuffle::Seeded(5))
        .seed(3)
        .build()
        .unwrap();

    let report = mlp
        .train(train.x(), &y_train, Some((test.x(), &y_test)))
        .unwrap();
    let last = report.last().unwrap();
    assert!(last.train.accuracy.unwrap() > 0.95);
    assert!(last.test.unwrap().accuracy.unwrap() > 0.95);
}

#[test]
fn regressor_fits_a_plane() {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for i in 0..5 {
        for j in 0..5 {
            let (a, b) = (i as f64 / 4.0 - 0.5, j as f64 / 4.0 - 0.5);
            xs.extend_from_slice(&[a, b]);
            ys.push(a - 0.5 * b);
        }
    }
    let x = Matrix::new(25, 2, xs).unwrap();
    let y = Matrix::column(ys).unwrap();

    let mut mlp = MlpBuilder::new(&[2, 1])
        .classifier(false)
        .loss(Loss::Mse)
        .optimizer(Optimizer::Sgd)
        .learning_rate(0.5)
        .batch_size(25)
        .epochs(500)
        .seed(1)
        .parallel(false)
        .build()
        .unwrap();

    let report = mlp.train(&x, &y, None).unwrap();
    assert!(report.final_loss().unwrap() < 1e-6);
    assert!(report.final_accuracy().is_none());

    let w = &mlp.weights()[0];
    assert!((w.get(0, 0) - 1.0).abs() < 1e-2);
    assert!((w.get(1, 0) + 0.5).abs() < 1e-2);
}

#[test]
fn training_log_gets_one_line_per_epoch_plus_summary() {
    let (x, y) = toy();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.jsonl");

    let mut mlp = MlpBuilder::new(&[2, 3, 2]).epochs(5).seed(2).build().unwrap();
    {
        let mut log = TrainingLog::to_file(&path).unwrap();
        mlp.train_with_log(&x, &y, Some((&x, &y)), &mut log).unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0]["event"], "epoch");
    assert_eq!(events[0]["data"]["epoch"], 1);
    assert!(events[0]["data"]["test"]["loss"].is_number());
    assert_eq!(events[5]["event"], "fit");
    assert_eq!(events[5]["data"]["epochs"], 5);
}

#[test]
fn continued_training_keeps_parameters_and_velocity() {
    let (x, y) = toy();
    let mut mlp = MlpBuilder::new(&[2, 3, 2]).epochs(3).seed(4).build().unwrap();
    mlp.train(&x, &y, None).unwrap();
    let weights = mlp.weights().to_vec();
    assert!(mlp.velocity().is_some());

    let report = mlp.train(&x, &y, None).unwrap();
    assert_eq!(report.epochs.len(), 3);
    assert_ne!(mlp.weights(), weights.as_slice());
}

#[test]
fn predict_rejects_wrong_width() {
    let (x, y) = toy();
    let mut mlp = MlpBuilder::new(&[2, 2]).epochs(1).seed(0).build().unwrap();
    mlp.train(&x, &y, None).unwrap();
    let wide = Matrix::zeros(1, 3).unwrap();
    assert!(matches!(mlp.predict(&wide), Err(Error::InvalidShape(_))));
}
