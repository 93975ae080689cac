//! Model builder.
//!
//! `MlpBuilder` is the in-code alternative to a JSON [`MlpConfig`]: start from the
//! defaults and override what you need.
//!
//! ```rust
//! use numlearn::{Activation, MlpBuilder, Optimizer};
//!
//! # fn main() -> numlearn::Result<()> {
//! let mlp = MlpBuilder::new(&[2, 8, 2])
//!     .activation(Activation::Tanh)
//!     .optimizer(Optimizer::Sgd)
//!     .learning_rate(0.1)
//!     .seed(0)
//!     .build()?;
//! assert_eq!(mlp.num_layers(), 2);
//! # Ok(())
//! # }
//! ```

use crate::{Activation, Loss, Mlp, MlpConfig, Optimizer, Result, Shuffle};

#[derive(Debug, Clone)]
/// Builder for an `Mlp`.
pub struct MlpBuilder {
    architecture: Vec<usize>,
    config: MlpConfig,
}

impl MlpBuilder {
    /// Start from `architecture` (input, hidden..., output) and default hyperparameters.
    pub fn new(architecture: &[usize]) -> Self {
        Self {
            architecture: architecture.to_vec(),
            config: MlpConfig::default(),
        }
    }

    /// Replace all hyperparameters at once.
    pub fn config(mut self, config: MlpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.config.epochs = epochs;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.config.learning_rate = lr;
        self
    }

    pub fn optimizer(mut self, optimizer: Optimizer) -> Self {
        self.config.optimizer = optimizer;
        self
    }

    /// Shorthand for `optimizer(Optimizer::SgdMomentum { momentum })`.
    pub fn momentum(self, momentum: f64) -> Self {
        self.optimizer(Optimizer::SgdMomentum { momentum })
    }

    /// Hidden-layer activation.
    pub fn activation(mut self, activation: Activation) -> Self {
        self.config.activation = activation;
        self
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.config.loss = loss;
        self
    }

    /// Softmax output (`true`) or identity output (`false`).
    pub fn classifier(mut self, classifier: bool) -> Self {
        self.config.classifier = classifier;
        self
    }

    pub fn init_scale(mut self, scale: f64) -> Self {
        self.config.init_scale = scale;
        self
    }

    pub fn shuffle(mut self, shuffle: Shuffle) -> Self {
        self.config.shuffle = shuffle;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Validate and build an uninitialized model.
    pub fn build(self) -> Result<Mlp> {
        Mlp::new(&self.architecture, self.config)
    }

    /// Validate, build, and draw the initial weights.
    pub fn build_initialized(self) -> Result<Mlp> {
        let mut mlp = self.build()?;
        mlp.init_weights()?;
        Ok(mlp)
    }
}
