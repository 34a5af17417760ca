//! Shared type aliases and default parameters.

use ndarray::Ix2;

/// Training data container: an `(n, d)` feature matrix paired with an
/// `(n, k)` target matrix.
pub type RegressionData = linfa::Dataset<f64, f64, Ix2>;

/// Figure size as (width, height) in pixels.
pub type FigSize = (u32, u32);

/// Default figure size for the plotting helpers.
pub const DEFAULT_FIG_SIZE: FigSize = (700, 400);

/// Default Adam learning rate.
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Default mini-batch size.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default number of training iterations.
pub const DEFAULT_ITERS: usize = 1000;
