//! Embedding head and the speaker-axis helpers that sit on top of the engine.

pub mod head;
pub mod separator;
pub mod speakers;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DualPathError;

pub use head::EmbeddingHead;
pub use separator::Separator;
pub use speakers::split_speakers;

/// Output nonlinearity of the embedding head.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    Relu,
}

impl Activation {
    #[inline]
    pub fn apply(self, v: f32) -> f32 {
        match self {
            Activation::Tanh => v.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-v).exp()),
            Activation::Relu => v.max(0.0),
        }
    }
}

impl FromStr for Activation {
    type Err = DualPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tanh" => Ok(Activation::Tanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::Relu),
            _ => Err(DualPathError::UnknownVariant {
                kind: "activation",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Tanh => "tanh",
            Activation::Sigmoid => "sigmoid",
            Activation::Relu => "relu",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activation() {
        assert_eq!("Tanh".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!("SIGMOID".parse::<Activation>().unwrap(), Activation::Sigmoid);
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
        let err = "softmax".parse::<Activation>().unwrap_err();
        assert!(matches!(err, DualPathError::UnknownVariant { kind: "activation", .. }));
    }

    #[test]
    fn test_activation_values() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Relu.apply(1.5), 1.5);
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-7);
        assert!((Activation::Tanh.apply(0.5) - 0.5f32.tanh()).abs() < 1e-7);
    }
}
