//! Integration tests for the structsvm library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use approx::assert_abs_diff_eq;
use structsvm::persistence::{load_model, save_model, SerializableModel};
use structsvm::{
    from_fn, BundleConfig, BundleMethod, Constraints, CostFunction, FeatureMatrix, HammingCosts,
    LinearConstraint, LossOracle, LossSum, Relation, SoftMarginLoss, StructSVMError,
    StructuredSVM, Termination, TrainingExample,
};
use tempfile::NamedTempFile;

/// Exactly one active component among `variables`
fn exactly_one(variables: &[usize]) -> LinearConstraint {
    LinearConstraint::with_terms(
        variables.iter().map(|&v| (v, 1.0)).collect(),
        Relation::Equal,
        1.0,
    )
}

fn one_of_each_pair() -> Constraints {
    vec![exactly_one(&[0, 1]), exactly_one(&[2, 3])]
        .into_iter()
        .collect()
}

fn identity(n: usize) -> FeatureMatrix {
    let mut features = FeatureMatrix::zeros(n, n);
    for i in 0..n {
        features.set(i, i, 1.0);
    }
    features
}

const CLASSES: usize = 3;

/// Joint feature map of a 2-D input: output component k sees the input in
/// feature block k
fn joint_features(x: [f64; 2]) -> FeatureMatrix {
    let mut features = FeatureMatrix::zeros(2 * CLASSES, CLASSES);
    for k in 0..CLASSES {
        features.set(2 * k, k, x[0]);
        features.set(2 * k + 1, k, x[1]);
    }
    features
}

/// Three well separated clusters, three points each
fn multiclass_examples() -> Vec<TrainingExample> {
    let centers = [[2.0, 0.0], [0.0, 2.0], [-2.0, -2.0]];
    let offsets = [[0.0, 0.0], [0.5, 0.3], [-0.3, 0.4]];
    let all_classes: Vec<usize> = (0..CLASSES).collect();

    let mut examples = Vec::new();
    for (class, center) in centers.iter().enumerate() {
        for offset in &offsets {
            let x = [center[0] + offset[0], center[1] + offset[1]];
            let mut label = vec![0.0; CLASSES];
            label[class] = 1.0;
            examples.push(TrainingExample::new(
                joint_features(x),
                label,
                vec![exactly_one(&all_classes)].into_iter().collect(),
            ));
        }
    }
    examples
}

/// Analytic quadratic scenario: f(x) = (x - 1)²
#[test]
fn test_quadratic_oracle_scenario() {
    let oracle = from_fn(|x: &[f64]| ((x[0] - 1.0).powi(2), vec![2.0 * (x[0] - 1.0)]));
    let mut method = BundleMethod::new(oracle, 1, 1e-4, 1e-5).expect("valid parameters");

    let w = method.optimize(100).expect("Optimization should succeed");
    assert_eq!((w[0] * 1e4).round() / 1e4, 0.9990);
}

#[test]
fn test_zero_iterations_skip_oracle() {
    let mut calls = 0;
    let w = {
        let oracle = from_fn(|_: &[f64]| {
            calls += 1;
            (0.0, vec![0.0; 5])
        });
        let mut method = BundleMethod::new(oracle, 5, 1e-4, 1e-5).expect("valid parameters");
        method.optimize(0).expect("Optimization should succeed")
    };

    assert_eq!(w, vec![0.0; 5]);
    assert_eq!(calls, 0);
}

#[test]
fn test_hamming_decomposition_scenario() {
    let costs = HammingCosts::new(&[1.0, 0.0, 1.0]);
    assert_eq!(costs.coefficients(), &[-1.0, 1.0, -1.0]);
    assert_eq!(costs.offset(), 2.0);
    assert_eq!(costs.evaluate(&[1.0, 1.0, 1.0]), 1.0);
}

/// Soft margin loss driven directly by the bundle method
#[test]
fn test_soft_margin_loss_with_bundle_method() {
    let loss = SoftMarginLoss::new(
        &one_of_each_pair(),
        identity(4),
        vec![1.0, 0.0, 0.0, 1.0],
        None,
    )
    .expect("valid example");

    let mut method = BundleMethod::new(loss, 4, 1e-2, 1e-6).expect("valid parameters");
    let outcome = method.run(100).expect("Optimization should succeed");

    assert_eq!(outcome.termination, Termination::Converged);
    assert_eq!(outcome.iterations, 3);
    for (w, expected) in outcome.weights.iter().zip([-1.0, 1.0, 1.0, -1.0]) {
        assert_abs_diff_eq!(*w, expected, epsilon = 1e-6);
    }
    // λ/2‖w‖² at the minimizer, where the loss vanishes
    assert_abs_diff_eq!(outcome.lower_bound, 0.02, epsilon = 1e-6);
    assert_abs_diff_eq!(outcome.best_value, 0.02, epsilon = 1e-6);

    // The ground truth is now the most violating output with zero loss
    let mut loss = method.into_oracle();
    let (value, _) = loss
        .value_and_gradient(&outcome.weights)
        .expect("Evaluation should succeed");
    assert_abs_diff_eq!(value, 0.0, epsilon = 1e-6);
}

/// Test complete workflow: examples -> training -> prediction -> persistence
#[test]
fn test_complete_workflow() {
    let examples = multiclass_examples();

    let model = StructuredSVM::new()
        .with_regularizer_weight(1e-2)
        .with_epsilon(1e-4)
        .with_max_iterations(500)
        .train_examples(&examples)
        .expect("Training should succeed");

    assert!(model.converged(), "Separable data should converge");
    let summary = model.summary();
    assert!(summary.gap.expect("bounds after training") <= 1e-4);

    let metrics = model.evaluate(&examples).expect("Evaluation should succeed");
    assert_eq!(metrics.n_examples, 9);
    assert_eq!(
        metrics.accuracy(),
        1.0,
        "All training points should be classified correctly"
    );

    // Unseen points near the cluster centers
    let constraints: Constraints = vec![exactly_one(&[0, 1, 2])].into_iter().collect();
    let queries = [([2.2, -0.1], 0), ([0.1, 2.3], 1), ([-1.8, -2.1], 2)];
    for (x, class) in queries {
        let prediction = model
            .predict(&joint_features(x), &constraints)
            .expect("Prediction should succeed");
        let mut expected = vec![0.0; CLASSES];
        expected[class] = 1.0;
        assert_eq!(prediction, expected, "query {x:?}");
    }

    // Save, reload and predict again
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    save_model(&model, temp_file.path()).expect("Saving should succeed");

    let stored = SerializableModel::load_from_file(temp_file.path()).expect("Loading should succeed");
    assert_eq!(stored.metadata.dims, 2 * CLASSES);
    assert_eq!(stored.summary.iterations, summary.iterations);

    let restored = load_model(temp_file.path()).expect("Loading should succeed");
    assert_eq!(restored.weights(), model.weights());
    assert_eq!(
        restored.evaluate(&examples).expect("Evaluation should succeed"),
        metrics
    );
}

/// Bound bookkeeping over a real structured risk
#[test]
fn test_bounds_on_structured_risk() {
    let mut risk = LossSum::new(2 * CLASSES).with_averaging(true);
    for example in multiclass_examples() {
        risk.push(example.loss().expect("valid example"));
    }

    let mut method = BundleMethod::new(risk, 2 * CLASSES, 1e-2, 1e-4).expect("valid parameters");
    let outcome = method.run(500).expect("Optimization should succeed");

    assert!(outcome.converged());
    assert!(outcome.iterations <= 500);
    assert_eq!(outcome.history.len(), outcome.iterations);
    for pair in outcome.history.windows(2) {
        assert!(pair[1].upper_bound <= pair[0].upper_bound);
        assert!(pair[1].lower_bound >= pair[0].lower_bound);
    }
    for record in &outcome.history {
        assert!(record.gap >= -1e-9, "negative gap {}", record.gap);
    }
    assert!(outcome.lower_bound <= outcome.best_value + 1e-9);
}

/// Configuration loaded from a file drives training
#[test]
fn test_config_file_workflow() {
    let config = BundleConfig {
        regularizer_weight: 1e-2,
        eps: 1e-6,
        max_iterations: 50,
        ..BundleConfig::default()
    };

    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    config
        .save_json_file(temp_file.path())
        .expect("Saving should succeed");
    let loaded = BundleConfig::from_json_file(temp_file.path()).expect("Loading should succeed");
    assert_eq!(loaded, config);

    let example = TrainingExample::new(identity(4), vec![1.0, 0.0, 0.0, 1.0], one_of_each_pair());
    let model = StructuredSVM::new()
        .with_config(loaded)
        .train_examples(&[example.clone()])
        .expect("Training should succeed");

    assert_eq!(model.config(), &config);
    assert_eq!(
        model
            .predict(&example.features, &example.constraints)
            .expect("Prediction should succeed"),
        example.ground_truth
    );
}

/// Test error handling for invalid inputs
#[test]
fn test_error_handling() {
    // Ground truth outside {0, 1}
    let result = SoftMarginLoss::new(&one_of_each_pair(), identity(4), vec![1.0, 0.0, 2.0, 0.0], None);
    assert!(matches!(
        result,
        Err(StructSVMError::NonBinaryGroundTruth { index: 2, .. })
    ));

    // No output satisfies both constraints
    let impossible: Constraints = vec![
        exactly_one(&[0, 1]),
        LinearConstraint::with_terms(vec![(0, 1.0), (1, 1.0)], Relation::GreaterEqual, 2.0),
    ]
    .into_iter()
    .collect();
    let example = TrainingExample::new(identity(2), vec![1.0, 0.0], impossible);
    assert!(matches!(
        StructuredSVM::new().train_examples(&[example]),
        Err(StructSVMError::Infeasible(_))
    ));

    // Invalid regularizer weight
    assert!(matches!(
        BundleMethod::new(from_fn(|_: &[f64]| (0.0, vec![0.0])), 1, -1.0, 1e-5),
        Err(StructSVMError::InvalidParameter(_))
    ));

    // Missing config file
    assert!(matches!(
        BundleConfig::from_json_file("/nonexistent/config.json"),
        Err(StructSVMError::IoError(_))
    ));
}
