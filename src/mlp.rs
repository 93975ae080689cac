use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::JsonConfig;
use crate::optim::Velocity;
use crate::{Activation, Error, Matrix, MlpConfig, Result};

/// Lifecycle of an [`Mlp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlpState {
    /// No parameters yet.
    Uninitialized,
    /// Weights drawn, not trained.
    Initialized,
    /// Inside `train`.
    Training,
    /// `train` completed at least once.
    Fitted,
}

/// Dense feed-forward network trained with mini-batch gradient descent.
///
/// Layer `l` maps `architecture[l]` inputs to `architecture[l + 1]` outputs with
/// `weights[l]` of shape `(in, out)` and `biases[l]` of shape `(1, out)`.
#[derive(Debug, Clone)]
pub struct Mlp {
    architecture: Vec<usize>,
    config: MlpConfig,
    weights: Vec<Matrix>,
    biases: Vec<Matrix>,
    velocity: Option<Velocity>,
    state: MlpState,
}

/// Everything a forward pass computed.
///
/// `activations[0]` is the input; `activations[l + 1] = act(zs[l])`.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    pub activations: Vec<Matrix>,
    pub zs: Vec<Matrix>,
}

impl ForwardPass {
    /// Output of the last layer.
    pub fn output(&self) -> &Matrix {
        // `activations` always holds the input plus one entry per layer.
        &self.activations[self.activations.len() - 1]
    }

    pub fn into_output(mut self) -> Matrix {
        let last = self.activations.len() - 1;
        self.activations.swap_remove(last)
    }
}

/// Parameter updates for one step, already scaled by `lr / batch_size`.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub(crate) weights: Vec<Matrix>,
    pub(crate) biases: Vec<Matrix>,
}

impl Gradients {
    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Matrix] {
        &self.biases
    }
}

impl Mlp {
    /// Create an uninitialized network.
    ///
    /// `architecture` lists every layer width including input and output.
    pub fn new(architecture: &[usize], config: MlpConfig) -> Result<Self> {
        if architecture.len() < 2 {
            return Err(Error::InvalidConfig(
                "architecture must include input and output sizes".to_owned(),
            ));
        }
        if architecture.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }
        config.validate()?;

        Ok(Self {
            architecture: architecture.to_vec(),
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            velocity: None,
            state: MlpState::Uninitialized,
        })
    }

    #[inline]
    pub fn architecture(&self) -> &[usize] {
        &self.architecture
    }

    #[inline]
    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.architecture[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.architecture[self.architecture.len() - 1]
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.architecture.len() - 1
    }

    #[inline]
    pub fn state(&self) -> MlpState {
        self.state
    }

    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Matrix] {
        &self.biases
    }

    /// Momentum state, present once a momentum update has run.
    pub fn velocity(&self) -> Option<&Velocity> {
        self.velocity.as_ref()
    }

    /// Softmax for classifiers, identity for regressors.
    #[inline]
    pub fn output_activation(&self) -> Activation {
        if self.config.classifier {
            Activation::Softmax
        } else {
            Activation::Identity
        }
    }

    /// Draw fresh weights and biases from `N(0, init_scale^2)`.
    ///
    /// Uses `config.seed` when set. Resets momentum state.
    pub fn init_weights(&mut self) -> Result<()> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let scale = self.config.init_scale;

        let mut weights = Vec::with_capacity(self.num_layers());
        let mut biases = Vec::with_capacity(self.num_layers());
        for w in self.architecture.windows(2) {
            weights.push(Matrix::random_normal(w[0], w[1], scale, &mut rng)?);
            biases.push(Matrix::random_normal(1, w[1], scale, &mut rng)?);
        }

        self.weights = weights;
        self.biases = biases;
        self.velocity = None;
        self.state = MlpState::Initialized;
        Ok(())
    }

    /// Replace the parameters with explicit values.
    ///
    /// Shapes must match the architecture. Resets momentum state.
    pub fn set_parameters(&mut self, weights: Vec<Matrix>, biases: Vec<Matrix>) -> Result<()> {
        if weights.len() != self.num_layers() || biases.len() != self.num_layers() {
            return Err(Error::InvalidShape(format!(
                "expected {} weight and bias matrices, got {} and {}",
                self.num_layers(),
                weights.len(),
                biases.len()
            )));
        }
        for (l, w) in self.architecture.windows(2).enumerate() {
            if weights[l].shape() != (w[0], w[1]) || biases[l].shape() != (1, w[1]) {
                return Err(Error::InvalidShape(format!(
                    "layer {l}: expected weights {:?} and biases {:?}, got {:?} and {:?}",
                    (w[0], w[1]),
                    (1, w[1]),
                    weights[l].shape(),
                    biases[l].shape()
                )));
            }
        }

        self.weights = weights;
        self.biases = biases;
        self.velocity = None;
        if self.state == MlpState::Uninitialized {
            self.state = MlpState::Initialized;
        }
        Ok(())
    }

    fn product(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        if self.config.parallel {
            a.matmul_par(b)
        } else {
            a.matmul(b)
        }
    }

    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        if self.state == MlpState::Uninitialized {
            return Err(Error::NotFitted(
                "mlp weights are not initialized".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_inputs(&self, x: &Matrix) -> Result<()> {
        if x.cols() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "input has {} columns, model expects {}",
                x.cols(),
                self.input_dim()
            )));
        }
        Ok(())
    }

    pub(crate) fn check_targets(&self, x: &Matrix, y: &Matrix) -> Result<()> {
        self.check_inputs(x)?;
        if y.cols() != self.output_dim() {
            return Err(Error::InvalidShape(format!(
                "target has {} columns, model outputs {}",
                y.cols(),
                self.output_dim()
            )));
        }
        if x.rows() != y.rows() {
            return Err(Error::InvalidShape(format!(
                "{} input rows but {} target rows",
                x.rows(),
                y.rows()
            )));
        }
        Ok(())
    }

    /// Full forward pass, keeping every activation and pre-activation.
    pub fn forward(&self, x: &Matrix) -> Result<ForwardPass> {
        self.ensure_initialized()?;
        self.check_inputs(x)?;

        let last = self.num_layers() - 1;
        let mut activations = Vec::with_capacity(self.num_layers() + 1);
        let mut zs = Vec::with_capacity(self.num_layers());
        activations.push(x.clone());

        for (l, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = self.product(&activations[l], w)?.add_broadcast(b)?;
            let act = if l == last {
                self.output_activation()
            } else {
                self.config.activation
            };
            activations.push(act.apply(&z));
            zs.push(z);
        }

        Ok(ForwardPass { activations, zs })
    }

    /// Compute the scaled parameter updates for one batch.
    ///
    /// The output error is `A - y` when the output activation and loss form a
    /// matched pair (softmax with cross-entropy, identity with MSE). Any other
    /// pairing goes through the loss gradient and the activation's backward map.
    pub fn backprop(&self, x: &Matrix, y: &Matrix) -> Result<Gradients> {
        self.check_targets(x, y)?;
        let pass = self.forward(x)?;

        let loss = self.config.loss;
        let out_act = self.output_activation();
        let n = self.num_layers();
        let step = self.config.learning_rate / x.rows() as f64;

        let output = pass.output();
        let mut delta = if loss.pairs_with(out_act) {
            output.sub(y)?
        } else {
            let upstream = loss.gradient(y, output)?;
            out_act.backward(&pass.zs[n - 1], output, &upstream)?
        };

        let mut d_weights = Vec::with_capacity(n);
        let mut d_biases = Vec::with_capacity(n);
        for l in (0..n).rev() {
            let a_prev_t = pass.activations[l].transposed();
            let mut dw = self.product(&a_prev_t, &delta)?;
            dw.scale(step);
            let mut db = delta.column_means();
            db.scale(step);
            d_weights.push(dw);
            d_biases.push(db);

            if l > 0 {
                let upstream = self.product(&delta, &self.weights[l].transposed())?;
                delta = self
                    .config
                    .activation
                    .backward(&pass.zs[l - 1], &pass.activations[l], &upstream)?;
            }
        }
        d_weights.reverse();
        d_biases.reverse();

        Ok(Gradients {
            weights: d_weights,
            biases: d_biases,
        })
    }

    /// Apply one optimizer update.
    pub fn update_params(&mut self, grads: &Gradients) -> Result<()> {
        self.ensure_initialized()?;
        let optimizer = self.config.optimizer;
        optimizer.step(&mut self.weights, &mut self.biases, grads, &mut self.velocity)
    }

    /// One gradient step on a single batch.
    pub fn train_step(&mut self, x: &Matrix, y: &Matrix) -> Result<()> {
        let grads = self.backprop(x, y)?;
        self.update_params(&grads)
    }

    /// Forward pass on a trained model, returning only the output.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        if self.state != MlpState::Fitted {
            return Err(Error::NotFitted(
                "mlp must be trained before predict".to_owned(),
            ));
        }
        Ok(self.forward(x)?.into_output())
    }

    pub(crate) fn set_state(&mut self, state: MlpState) {
        self.state = state;
    }
}
