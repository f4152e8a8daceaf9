//! Per-position affine projection.
//!
//! Applied independently at every time step: `y = W · x + b` with
//! `W ∈ R^{out × in}`, the same row-major layout the recurrent weights use.

use ndarray::{Array1, Array2, Array3, ArrayView2};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::core::reshape::{pseudo_batch, reshape};
use crate::error::{DualPathError, Result, Stage};

/// Weights for a linear projection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Linear {
    /// Weight matrix: W ∈ R^{out × in}
    pub weight: Array2<f32>,

    /// Bias: b ∈ R^{out}
    pub bias: Array1<f32>,
}

impl Linear {
    /// Zero weights and bias.
    pub fn zeros(in_features: usize, out_features: usize) -> Self {
        Self {
            weight: Array2::zeros((out_features, in_features)),
            bias: Array1::zeros(out_features),
        }
    }

    /// Uniform `U(-1/sqrt(in), 1/sqrt(in))` initialisation.
    pub fn init(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        Self {
            weight: Array2::from_shape_simple_fn((out_features, in_features), || {
                dist.sample(&mut *rng)
            }),
            bias: Array1::from_shape_simple_fn(out_features, || dist.sample(&mut *rng)),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    /// Project a batch of rows: `[rows, in] -> [rows, out]`.
    pub fn forward_rows(&self, x: ArrayView2<'_, f32>, stage: Stage) -> Result<Array2<f32>> {
        if x.ncols() != self.in_features() {
            return Err(DualPathError::DimensionMismatch {
                stage,
                axis: 1,
                expected: self.in_features(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(&self.weight.t()) + &self.bias)
    }

    /// Project the trailing axis of `[batch, steps, in]` to `[batch, steps, out]`.
    pub fn forward_seq(&self, x: Array3<f32>, stage: Stage) -> Result<Array3<f32>> {
        let (batch, steps, features) = x.dim();
        if features != self.in_features() {
            return Err(DualPathError::DimensionMismatch {
                stage,
                axis: 2,
                expected: self.in_features(),
                got: features,
            });
        }
        let rows = pseudo_batch(batch, steps, stage)?;
        let flat = reshape(x, (rows, features), stage)?;
        let projected = self.forward_rows(flat.view(), stage)?;
        reshape(projected, (batch, steps, self.out_features()), stage)
    }

    pub fn param_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}
