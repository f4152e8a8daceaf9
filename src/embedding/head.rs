//! Projection from the engine's output to per-bin embeddings.
//!
//! `[B, H', T] → [B, T, H'] → dropout → linear H' → F·D → activation → [B, T·F, D]`

use ndarray::Array3;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::Activation;
use crate::core::dropout::{Dropout, Mode};
use crate::core::linear::Linear;
use crate::core::reshape::{pseudo_batch, reshape};
use crate::error::{DualPathError, Result, Stage};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingHead {
    /// Projection: W ∈ R^{(F·D) × H'}
    pub linear: Linear,
    activation: Activation,
    dropout: Dropout,
    bins: usize,
    emb_dim: usize,
}

impl EmbeddingHead {
    /// Head mapping `width` channels to `bins · emb_dim` outputs per frame.
    pub fn init(
        width: usize,
        bins: usize,
        emb_dim: usize,
        activation: Activation,
        dropout: Dropout,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if width == 0 || bins == 0 || emb_dim == 0 {
            return Err(DualPathError::config(format!(
                "embedding head needs positive sizes, got width {width}, bins {bins}, dim {emb_dim}"
            )));
        }
        let out = bins
            .checked_mul(emb_dim)
            .ok_or_else(|| DualPathError::config("bins · emb_dim overflows usize"))?;
        Ok(Self {
            linear: Linear::init(width, out, rng),
            activation,
            dropout,
            bins,
            emb_dim,
        })
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn emb_dim(&self) -> usize {
        self.emb_dim
    }

    pub fn param_count(&self) -> usize {
        self.linear.param_count()
    }

    /// `[B, H', T] -> [B, T·F, D]`.
    pub fn forward(&self, x: &Array3<f32>, mode: &mut Mode) -> Result<Array3<f32>> {
        let stage = Stage::Embedding;
        let (batch, width, frames) = x.dim();
        if width != self.linear.in_features() {
            return Err(DualPathError::DimensionMismatch {
                stage,
                axis: 1,
                expected: self.linear.in_features(),
                got: width,
            });
        }

        let mut frames_first = x.view().permuted_axes([0, 2, 1]).as_standard_layout().into_owned();
        self.dropout.apply(&mut frames_first, mode);
        let mut projected = self.linear.forward_seq(frames_first, stage)?;
        let activation = self.activation;
        projected.mapv_inplace(|v| activation.apply(v));

        let bins = pseudo_batch(frames, self.bins, stage)?;
        reshape(projected, (batch, bins, self.emb_dim), stage)
    }
}
