//! Recurrent transforms used by the intra- and inter-chunk stages.

pub mod cell;
pub mod layer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DualPathError;

pub use cell::CellWeights;
pub use layer::Recurrent;

/// Recurrent cell family. Resolved once at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RnnKind {
    /// Elman recurrence with tanh.
    #[serde(alias = "rnn")]
    Plain,
    #[default]
    Lstm,
    Gru,
}

impl RnnKind {
    /// Number of stacked gate blocks in the weight matrices.
    pub fn gates(self) -> usize {
        match self {
            RnnKind::Plain => 1,
            RnnKind::Lstm => 4,
            RnnKind::Gru => 3,
        }
    }
}

impl FromStr for RnnKind {
    type Err = DualPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rnn" | "plain" => Ok(RnnKind::Plain),
            "lstm" => Ok(RnnKind::Lstm),
            "gru" => Ok(RnnKind::Gru),
            _ => Err(DualPathError::UnknownVariant {
                kind: "rnn",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RnnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RnnKind::Plain => "plain",
            RnnKind::Lstm => "lstm",
            RnnKind::Gru => "gru",
        };
        f.write_str(name)
    }
}
