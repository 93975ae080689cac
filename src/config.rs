//! Hyperparameter configs.
//!
//! Each model has one plain config struct. Every field has a default, so a JSON
//! file only needs to name what it overrides:
//!
//! ```json
//! { "epochs": 300, "activation": "tanh", "optimizer": { "kind": "sgd" } }
//! ```
//!
//! Configs are validated when loaded and again when a model is built from them.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Activation, Descent, Error, Loss, Optimizer, Regularization, Result, Shuffle};

/// JSON loading and saving shared by all configs.
pub trait JsonConfig: Serialize + DeserializeOwned {
    /// Check hyperparameter ranges.
    fn validate(&self) -> Result<()>;

    /// Parse and validate a config from a JSON string.
    fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the config as pretty JSON.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Training hyperparameters for [`crate::Mlp`].
pub struct MlpConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimizer: Optimizer,
    /// Activation of the hidden layers.
    pub activation: Activation,
    pub loss: Loss,
    /// Softmax output when true, identity output otherwise.
    pub classifier: bool,
    /// Standard deviation of the initial weights.
    pub init_scale: f64,
    /// Per-epoch row shuffling.
    pub shuffle: Shuffle,
    /// Seed for weight initialization. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Use the parallel matrix product in forward and backward passes.
    pub parallel: bool,
    /// Log per-epoch metrics to stderr when no log is supplied.
    pub verbose: bool,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            learning_rate: 1e-2,
            optimizer: Optimizer::default(),
            activation: Activation::ReLU,
            loss: Loss::CrossEntropy,
            classifier: true,
            init_scale: 0.1,
            shuffle: Shuffle::None,
            seed: None,
            parallel: true,
            verbose: false,
        }
    }
}

impl JsonConfig for MlpConfig {
    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        validate_learning_rate(self.learning_rate)?;
        if !(self.init_scale.is_finite() && self.init_scale > 0.0) {
            return Err(Error::InvalidConfig(
                "init_scale must be finite and > 0".to_owned(),
            ));
        }
        self.optimizer.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Hyperparameters for [`crate::GdLinearRegression`].
pub struct GdConfig {
    pub regularization: Regularization,
    /// Regularization strength.
    pub alpha: f64,
    pub descent: Descent,
    /// Rows per update for mini-batch descent.
    pub batch_size: usize,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub early_stopping: bool,
    /// Minimum loss improvement that resets the early-stopping counter.
    pub tol: f64,
    /// Iterations without improvement before stopping.
    pub n_iter_no_change: usize,
    /// Seed for row shuffling. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub verbose: bool,
}

impl Default for GdConfig {
    fn default() -> Self {
        Self {
            regularization: Regularization::L2,
            alpha: 1e-4,
            descent: Descent::Stochastic,
            batch_size: 32,
            max_iter: 1000,
            learning_rate: 1e-3,
            early_stopping: true,
            tol: 1e-3,
            n_iter_no_change: 5,
            seed: None,
            verbose: false,
        }
    }
}

impl JsonConfig for GdConfig {
    fn validate(&self) -> Result<()> {
        validate_learning_rate(self.learning_rate)?;
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be > 0".to_owned()));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(Error::InvalidConfig(
                "alpha must be finite and >= 0".to_owned(),
            ));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(Error::InvalidConfig("tol must be finite and >= 0".to_owned()));
        }
        if self.early_stopping && self.n_iter_no_change == 0 {
            return Err(Error::InvalidConfig(
                "n_iter_no_change must be > 0 when early stopping is enabled".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Hyperparameters for [`crate::KMeans`].
pub struct KMeansConfig {
    pub n_clusters: usize,
    pub max_iterations: usize,
    /// Stop once no center moves farther than this. `None` always runs
    /// `max_iterations` iterations.
    pub tol: Option<f64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iterations: 300,
            tol: None,
        }
    }
}

impl JsonConfig for KMeansConfig {
    fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(Error::InvalidConfig("n_clusters must be > 0".to_owned()));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be > 0".to_owned(),
            ));
        }
        if let Some(tol) = self.tol {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(Error::InvalidConfig("tol must be finite and >= 0".to_owned()));
            }
        }
        Ok(())
    }
}

fn validate_learning_rate(lr: f64) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning_rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        MlpConfig::default().validate().unwrap();
        GdConfig::default().validate().unwrap();
        KMeansConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = MlpConfig::from_json_str(
            r#"{ "epochs": 5, "activation": "tanh", "optimizer": { "kind": "sgd" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.activation, Activation::Tanh);
        assert_eq!(cfg.optimizer, Optimizer::Sgd);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.loss, Loss::CrossEntropy);
    }

    #[test]
    fn unknown_names_are_config_errors() {
        assert!(matches!(
            MlpConfig::from_json_str(r#"{ "activation": "swish" }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            MlpConfig::from_json_str(r#"{ "loss": "hinge" }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GdConfig::from_json_str(r#"{ "regularization": "elastic" }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GdConfig::from_json_str(r#"{ "descent": "newton" }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            KMeansConfig::from_json_str(r#"{ "clusters": 3 }"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(MlpConfig::from_json_str(r#"{ "learning_rate": 0.0 }"#).is_err());
        assert!(MlpConfig::from_json_str(r#"{ "batch_size": 0 }"#).is_err());
        assert!(
            MlpConfig::from_json_str(r#"{ "optimizer": { "kind": "sgd_momentum", "momentum": 1.5 } }"#)
                .is_err()
        );
        assert!(GdConfig::from_json_str(r#"{ "learning_rate": -1.0 }"#).is_err());
        assert!(GdConfig::from_json_str(r#"{ "alpha": -0.5 }"#).is_err());
        assert!(KMeansConfig::from_json_str(r#"{ "n_clusters": 0 }"#).is_err());
        assert!(KMeansConfig::from_json_str(r#"{ "tol": -1.0 }"#).is_err());
    }

    #[test]
    fn json_string_round_trip() {
        let cfg = GdConfig {
            descent: Descent::MiniBatch,
            regularization: Regularization::L1,
            seed: Some(7),
            ..GdConfig::default()
        };
        let text = cfg.to_json_string().unwrap();
        assert_eq!(GdConfig::from_json_str(&text).unwrap(), cfg);
    }
}
