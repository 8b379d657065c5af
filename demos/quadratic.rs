//! Bundle Method on an Analytic Function
//!
//! Minimizes (x - 1)² + λ/2 x² with the bundle method and prints the upper
//! and lower bounds of every iteration.
//!
//! Run with: RUST_LOG=debug cargo run --example quadratic

use structsvm::{from_fn, BundleMethod};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== Bundle Method Demonstration ===");
    println!();

    let oracle = from_fn(|x: &[f64]| {
        let d = x[0] - 1.0;
        (d * d, vec![2.0 * d])
    });

    let mut method = BundleMethod::new(oracle, 1, 1e-4, 1e-5)?;
    let outcome = method.run(100)?;

    println!(
        "  {:>4}  {:>14}  {:>14}  {:>14}  {:>12}",
        "iter", "value", "upper", "lower", "gap"
    );
    for record in &outcome.history {
        println!(
            "  {:>4}  {:>14.8}  {:>14.8}  {:>14.8}  {:>12.3e}",
            record.iteration, record.value, record.upper_bound, record.lower_bound, record.gap
        );
    }
    println!();

    println!("  Termination: {:?}", outcome.termination);
    println!("  Final weights: {:.4}", outcome.weights[0]);
    println!("  Best evaluated weights: {:.4}", outcome.best_weights[0]);
    println!("  Exact minimizer: {:.4}", 2.0 / (2.0 + 1e-4));

    Ok(())
}
