//! Normalization strategies.
//!
//! Four variants, chosen once at construction:
//!
//! | kind         | statistics                                   | eps    |
//! |--------------|----------------------------------------------|--------|
//! | `global`     | all non-batch axes jointly, per batch element | `1e-8` |
//! | `cumulative` | channel axis, per spatial position            | `1e-8` |
//! | `layer`      | channel axis (one group), per spatial position | `1e-8` |
//! | `batch`      | batch + length axes, per channel (3-D only)   | `1e-5` |
//!
//! Statistics are always recomputed from the tensor being normalized; no
//! running averages are kept. Affine scale and bias are per-channel and
//! broadcast over every other axis.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array3, Array4, ArrayView1, ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::config::{BATCH_NORM_EPS, NORM_EPS};
use crate::error::{DualPathError, Result, Stage};

/// Normalization variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    Global,
    Cumulative,
    #[default]
    Layer,
    Batch,
}

/// Reduction axes of the variants defined on `[B, N, K, S]`.
#[derive(Clone, Copy, Debug)]
enum ChunkStats {
    /// One mean/variance per batch element.
    Global,
    /// One mean/variance per spatial position, across channels.
    Channel,
}

impl NormKind {
    /// Whether the variant is defined for `[B, N, K, S]` chunk tensors.
    pub fn supports_chunks(self) -> bool {
        self.chunk_stats().is_some()
    }

    /// Reduction used on chunk tensors; `None` for batch statistics.
    fn chunk_stats(self) -> Option<ChunkStats> {
        match self {
            NormKind::Global => Some(ChunkStats::Global),
            NormKind::Cumulative | NormKind::Layer => Some(ChunkStats::Channel),
            NormKind::Batch => None,
        }
    }

    /// Epsilon added to the variance before the square root.
    pub fn epsilon(self) -> f32 {
        match self {
            NormKind::Batch => BATCH_NORM_EPS,
            _ => NORM_EPS,
        }
    }
}

impl FromStr for NormKind {
    type Err = DualPathError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gln" | "global" => Ok(NormKind::Global),
            "cln" | "cumulative" => Ok(NormKind::Cumulative),
            "ln" | "layer" => Ok(NormKind::Layer),
            "bn" | "batch" => Ok(NormKind::Batch),
            _ => Err(DualPathError::UnknownVariant {
                kind: "norm",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NormKind::Global => "global",
            NormKind::Cumulative => "cumulative",
            NormKind::Layer => "layer",
            NormKind::Batch => "batch",
        };
        f.write_str(name)
    }
}

/// Per-channel affine parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Affine {
    /// Scale γ ∈ R^{channels}, initialised to ones.
    pub weight: Array1<f32>,

    /// Shift β ∈ R^{channels}, initialised to zeros.
    pub bias: Array1<f32>,
}

impl Affine {
    pub fn identity(channels: usize) -> Self {
        Self {
            weight: Array1::ones(channels),
            bias: Array1::zeros(channels),
        }
    }
}

/// A configured normalization layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Normalization {
    kind: NormKind,
    channels: usize,
    epsilon: f32,
    affine: Option<Affine>,
}

impl Normalization {
    /// Normalization with learnable per-channel affine parameters.
    pub fn new(kind: NormKind, channels: usize) -> Result<Self> {
        let mut norm = Self::without_affine(kind, channels)?;
        norm.affine = Some(Affine::identity(channels));
        Ok(norm)
    }

    /// Normalization without the affine step (pure standardisation).
    pub fn without_affine(kind: NormKind, channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(DualPathError::config(format!(
                "{kind} normalization needs at least one channel"
            )));
        }
        Ok(Self {
            kind,
            channels,
            epsilon: kind.epsilon(),
            affine: None,
        })
    }

    pub fn kind(&self) -> NormKind {
        self.kind
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn affine(&self) -> Option<&Affine> {
        self.affine.as_ref()
    }

    pub fn affine_mut(&mut self) -> Option<&mut Affine> {
        self.affine.as_mut()
    }

    pub fn param_count(&self) -> usize {
        self.affine.as_ref().map_or(0, |a| a.weight.len() + a.bias.len())
    }

    /// Normalize a `[B, N, L]` sequence.
    pub fn forward_seq(&self, x: &Array3<f32>) -> Result<Array3<f32>> {
        self.check_channels(x.dim().1)?;
        let Some(stats) = self.kind.chunk_stats() else {
            return Ok(self.batch_norm(x));
        };
        // [B, N, L] is [B, N, L, 1] for every other variant.
        let lifted = x.view().insert_axis(Axis(3)).to_owned();
        let out = self.normalize_chunks(&lifted, stats);
        Ok(out.remove_axis(Axis(3)))
    }

    /// Normalize a `[B, N, K, S]` chunk tensor.
    pub fn forward_chunks(&self, x: &Array4<f32>) -> Result<Array4<f32>> {
        self.check_channels(x.dim().1)?;
        let stats = self.kind.chunk_stats().ok_or_else(|| {
            DualPathError::config(format!(
                "{} normalization is only defined for [B, N, L] sequences",
                self.kind
            ))
        })?;
        Ok(self.normalize_chunks(x, stats))
    }

    fn check_channels(&self, got: usize) -> Result<()> {
        if got != self.channels {
            return Err(DualPathError::DimensionMismatch {
                stage: Stage::Normalize,
                axis: 1,
                expected: self.channels,
                got,
            });
        }
        Ok(())
    }

    fn normalize_chunks(&self, x: &Array4<f32>, stats: ChunkStats) -> Array4<f32> {
        let mut out = x.clone();
        match stats {
            ChunkStats::Global => self.global_norm(&mut out),
            ChunkStats::Channel => self.channel_norm(&mut out),
        }
        if let Some(affine) = &self.affine {
            for (c, mut channel) in out.axis_iter_mut(Axis(1)).enumerate() {
                let (w, b) = (affine.weight[c], affine.bias[c]);
                channel.mapv_inplace(|v| w * v + b);
            }
        }
        out
    }

    /// One mean/variance per batch element over `[N, K, S]`.
    fn global_norm(&self, x: &mut Array4<f32>) {
        let eps = self.epsilon;
        for mut sample in x.axis_iter_mut(Axis(0)) {
            let n = sample.len() as f32;
            let mean = sample.sum() / n;
            let var = sample.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
            let denom = (var + eps).sqrt();
            sample.mapv_inplace(|v| (v - mean) / denom);
        }
    }

    /// One mean/variance per (batch, k, s) position over the channel axis.
    fn channel_norm(&self, x: &mut Array4<f32>) {
        let eps = self.epsilon;
        Zip::from(x.lanes_mut(Axis(1))).for_each(|lane| standardize(lane, eps));
    }

    /// One mean/variance per channel over the batch and length axes.
    fn batch_norm(&self, x: &Array3<f32>) -> Array3<f32> {
        let eps = self.epsilon;
        let mut out = x.clone();
        for (c, mut channel) in out.axis_iter_mut(Axis(1)).enumerate() {
            let n = channel.len() as f32;
            let mean = channel.sum() / n;
            let var = channel.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
            let denom = (var + eps).sqrt();
            let (w, b) = match &self.affine {
                Some(a) => (a.weight[c], a.bias[c]),
                None => (1.0, 0.0),
            };
            channel.mapv_inplace(|v| w * (v - mean) / denom + b);
        }
        out
    }
}

fn standardize(mut lane: ArrayViewMut1<'_, f32>, eps: f32) {
    let (mean, var) = moments(lane.view());
    let denom = (var + eps).sqrt();
    lane.mapv_inplace(|v| (v - mean) / denom);
}

/// Mean and biased variance of a 1-D lane.
fn moments(lane: ArrayView1<'_, f32>) -> (f32, f32) {
    let n = lane.len() as f32;
    let mean = lane.sum() / n;
    let var = lane.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, var)
}
