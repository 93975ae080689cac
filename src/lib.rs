//! A small from-scratch numerical machine learning crate.
//!
//! `numlearn` builds everything on one dense, row-major [`Matrix`] type:
//!
//! - a multi-layer perceptron trained with mini-batch SGD or momentum ([`Mlp`])
//! - closed-form least squares ([`LinearRegression`])
//! - gradient-descent linear regression with L1/L2 penalties and early stopping
//!   ([`GdLinearRegression`])
//! - k-means clustering ([`KMeans`])
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - Samples are rows. Features (and one-hot targets) are columns.
//! - Layer `l` of an MLP has weights `(arch[l], arch[l + 1])` and biases
//!   `(1, arch[l + 1])`.
//!
//! Shapes are validated at every public entry point and reported as
//! [`Error::InvalidShape`]. Hyperparameters are validated when a model is built
//! ([`Error::InvalidConfig`]).
//!
//! # Quick start
//!
//! ```rust
//! use numlearn::{Activation, Matrix, MlpBuilder, Optimizer};
//!
//! # fn main() -> numlearn::Result<()> {
//! // Class 0 when x0 < 0, class 1 otherwise (one-hot targets).
//! let x = Matrix::new(4, 2, vec![-1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0])?;
//! let y = Matrix::new(4, 2, vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0])?;
//!
//! let mut mlp = MlpBuilder::new(&[2, 8, 2])
//!     .activation(Activation::Tanh)
//!     .optimizer(Optimizer::SgdMomentum { momentum: 0.9 })
//!     .learning_rate(0.1)
//!     .batch_size(4)
//!     .epochs(200)
//!     .seed(0)
//!     .build()?;
//!
//! let report = mlp.train(&x, &y, None)?;
//! assert_eq!(report.epochs.len(), 200);
//! let probabilities = mlp.predict(&x)?;
//! assert_eq!(probabilities.shape(), (4, 2));
//! # Ok(())
//! # }
//! ```
//!
//! # Linear models
//!
//! ```rust
//! use numlearn::{LinearRegression, Matrix};
//!
//! # fn main() -> numlearn::Result<()> {
//! let x = Matrix::new(4, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 10.0, 5.0])?;
//! let y = Matrix::column(vec![5.0, 11.0, 17.0, 26.0])?;
//!
//! let mut lr = LinearRegression::new();
//! lr.fit(&x, &y)?;
//! let beta = lr.coefficients().unwrap_or_default();
//! assert!((beta[0] - 1.0).abs() < 1e-8);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration and logging
//!
//! Every model has a serde config ([`MlpConfig`], [`GdConfig`], [`KMeansConfig`])
//! that can be loaded from JSON with [`JsonConfig::load_from_file`]. Training
//! progress can be written as JSON lines through a [`TrainingLog`].

pub mod activation;
pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod gd_linear;
pub mod kmeans;
pub mod linear;
pub mod logging;
pub mod loss;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod mlp;
pub mod optim;
pub mod train;

pub use activation::Activation;
pub use builder::MlpBuilder;
pub use config::{GdConfig, JsonConfig, KMeansConfig, MlpConfig};
pub use data::{make_blobs, Batches, Dataset};
pub use error::{Error, Result};
pub use gd_linear::{Descent, GdLinearRegression, Regularization};
pub use kmeans::KMeans;
pub use linear::LinearRegression;
pub use logging::TrainingLog;
pub use loss::Loss;
pub use matrix::{euclidean, shuffle_rows, Matrix, MatrixView};
pub use metrics::{accuracy, mean_squared_error, r_squared, Regressor};
pub use mlp::{ForwardPass, Gradients, Mlp, MlpState};
pub use optim::{Optimizer, Velocity};
pub use train::{EpochReport, EvalReport, FitReport, Shuffle};
