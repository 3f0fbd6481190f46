use std::{io::Read, path::Path};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use strict_num::FiniteF64;
use thiserror::Error;

use crate::activation::Activation;

/// Dimensions and defaults of a layered, fully connected topology
///
/// ```ron
/// (
///     input_count: 2,
///     output_count: 1,
///     hidden_layer_count: 1,
///     hidden_layer_width: 2,
///     initial_weight: Constant(1.0),
///     activation: Identity,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_count: usize,
    pub output_count: usize,
    #[serde(default)]
    pub hidden_layer_count: usize,
    #[serde(default)]
    pub hidden_layer_width: usize,
    /// Applied to every constructed edge
    pub initial_weight: WeightInit,
    /// Applied to every constructed node
    #[serde(default)]
    pub activation: Activation,
}
impl NetworkConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut file = std::fs::File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Self::from_ron_str(&buf)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default();
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Total number of nodes a topology built from this config owns
    pub fn node_count(&self) -> usize {
        self.input_count + self.output_count + self.hidden_layer_count * self.hidden_layer_width
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parsing error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// The weight assigned to an edge at construction time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    Constant(f64),
    /// ```math
    /// X \sim U(-\frac{1}{\sqrt{n}}, \frac{1}{\sqrt{n}})
    /// ```
    ///
    /// - $n$: the number of parents of the child node
    Uniform,
    /// ```math
    /// X \sim N(\mu, \sigma^2)
    /// ```
    Normal { mean: f64, std_dev: f64 },
}
impl From<f64> for WeightInit {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}
impl WeightInit {
    pub fn validate(&self) -> Result<(), WeightInitError> {
        match *self {
            WeightInit::Constant(w) => {
                FiniteF64::new(w).ok_or(WeightInitError::NonFiniteWeight(w))?;
            }
            WeightInit::Uniform => (),
            WeightInit::Normal { mean, std_dev } => {
                Normal::new(mean, std_dev).map_err(|_| WeightInitError::InvalidNormal {
                    mean,
                    std_dev,
                })?;
                FiniteF64::new(mean).ok_or(WeightInitError::NonFiniteWeight(mean))?;
                FiniteF64::new(std_dev).ok_or(WeightInitError::NonFiniteWeight(std_dev))?;
            }
        }
        Ok(())
    }

    /// `fan_in`: the number of parents the child will have
    ///
    /// Call `validate()` first.
    pub fn sample(&self, fan_in: usize, rng: &mut impl Rng) -> f64 {
        match *self {
            WeightInit::Constant(w) => w,
            WeightInit::Uniform => {
                if fan_in == 0 {
                    return 0.;
                }
                let weight_bound = 1.0 / (fan_in as f64).sqrt();
                rng.gen_range(-weight_bound..weight_bound)
            }
            WeightInit::Normal { mean, std_dev } => match Normal::new(mean, std_dev) {
                Ok(normal) => normal.sample(rng),
                Err(_) => mean,
            },
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeightInitError {
    #[error("Weight `{0}` is not finite")]
    NonFiniteWeight(f64),
    #[error("Invalid normal distribution with mean `{mean}` and standard deviation `{std_dev}`")]
    InvalidNormal { mean: f64, std_dev: f64 },
}
