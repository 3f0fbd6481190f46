use serde::{Deserialize, Serialize};

/// The function applied to the accumulated input of a node
///
/// ```math
/// f : \mathbb{R} \to \mathbb{R}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Activation {
    #[default]
    Identity,
    Sigmoid,
    Tanh,
    ReLu,
    Swish,
}
impl Activation {
    pub fn call(&self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => tanh(x),
            Activation::ReLu => relu(x),
            Activation::Swish => swish(x),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::ReLu => "relu",
            Activation::Swish => "swish",
        }
    }

    pub fn all() -> [Activation; 5] {
        [
            Activation::Identity,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::ReLu,
            Activation::Swish,
        ]
    }
}
impl core::fmt::Display for Activation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
impl core::str::FromStr for Activation {
    type Err = UnknownActivation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Activation::all()
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownActivation(s.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown activation function `{0}`")]
pub struct UnknownActivation(pub String);

/// ```math
/// f(x) = \frac{e^x}{e^x + 1}
/// ```
pub fn sigmoid(x: f64) -> f64 {
    // `exp(x)` overflows for large `x`; use the mirrored form there
    if x >= 0. {
        1. / (1. + (-x).exp())
    } else {
        let exp = x.exp();
        exp / (exp + 1.)
    }
}

/// ```math
/// f(x) = \frac{e^{2x} - 1}{e^{2x} + 1}
/// ```
pub fn tanh(x: f64) -> f64 {
    x.tanh()
}

/// ```math
/// f(x) = \begin{cases}
///   x & x \geq 0 \\
///   0 & x < 0 \\
/// \end{cases}
/// ```
pub fn relu(x: f64) -> f64 {
    f64::max(x, 0.0)
}

/// ```math
/// f(x) = x \cdot \sigma(x)
/// ```
pub fn swish(x: f64) -> f64 {
    x * sigmoid(x)
}
