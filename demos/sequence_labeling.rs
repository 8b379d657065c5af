//! Sequence Labeling Demonstration
//!
//! Trains a structured SVM that assigns one of three labels to every
//! position of a sequence. Each position is a one-hot group of binary
//! output components, and the label of a position depends on its input
//! features.
//!
//! Run with: RUST_LOG=info cargo run --example sequence_labeling

use structsvm::persistence::{load_model, save_model};
use structsvm::{Constraints, FeatureMatrix, LinearConstraint, Relation, StructuredSVM, TrainingExample};

const LABELS: usize = 3;
const INPUT_FEATURES: usize = 2;
const LENGTH: usize = 5;

/// One label per position
fn one_label_per_position() -> Constraints {
    (0..LENGTH)
        .map(|position| {
            LinearConstraint::with_terms(
                (0..LABELS).map(|l| (position * LABELS + l, 1.0)).collect(),
                Relation::Equal,
                1.0,
            )
        })
        .collect()
}

/// Label rule the model has to learn: the quadrant of the input
fn true_label(x: [f64; 2]) -> usize {
    if x[0] > 0.0 {
        0
    } else if x[1] > 0.0 {
        1
    } else {
        2
    }
}

/// Feature row (label, input feature) sees the input of every position
/// under that label
fn sequence_example(inputs: &[[f64; 2]]) -> TrainingExample {
    let mut features = FeatureMatrix::zeros(LABELS * INPUT_FEATURES, LENGTH * LABELS);
    let mut ground_truth = vec![0.0; LENGTH * LABELS];

    for (position, x) in inputs.iter().enumerate() {
        for label in 0..LABELS {
            for (f, value) in x.iter().enumerate() {
                features.set(label * INPUT_FEATURES + f, position * LABELS + label, *value);
            }
        }
        ground_truth[position * LABELS + true_label(*x)] = 1.0;
    }

    TrainingExample::new(features, ground_truth, one_label_per_position())
}

fn generate_sequences(count: usize, seed: u64) -> Vec<TrainingExample> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 4.0 - 2.0
    };

    (0..count)
        .map(|_| {
            let inputs: Vec<[f64; 2]> = (0..LENGTH).map(|_| [next(), next()]).collect();
            sequence_example(&inputs)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Sequence Labeling Demonstration ===");
    println!();

    let train = generate_sequences(20, 1);
    let test = generate_sequences(10, 2);
    println!("  Generated {} training and {} test sequences", train.len(), test.len());

    let model = StructuredSVM::new()
        .with_regularizer_weight(1e-2)
        .with_epsilon(1e-3)
        .with_max_iterations(500)
        .train_examples(&train)?;

    let summary = model.summary();
    println!(
        "  Training finished after {} iterations ({:?})",
        summary.iterations, summary.termination
    );
    if let Some(gap) = summary.gap {
        println!("  Final duality gap: {gap:.3e}");
    }

    for (name, examples) in [("train", &train), ("test", &test)] {
        let metrics = model.evaluate(examples)?;
        println!(
            "  {name:>5}: {:.1}% sequences exact, {:.1}% labels wrong",
            metrics.accuracy() * 100.0,
            metrics.hamming_loss() * 100.0 * LABELS as f64 / 2.0
        );
    }

    let path = std::env::temp_dir().join("structsvm_sequence_model.json");
    save_model(&model, &path)?;
    let restored = load_model(&path)?;
    println!();
    println!("  Model saved to {path:?} and reloaded");
    println!(
        "  Reloaded model agrees: {}",
        restored.evaluate(&test)? == model.evaluate(&test)?
    );

    Ok(())
}
