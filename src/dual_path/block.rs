//! Dual-Path block: an intra-chunk pass followed by an inter-chunk pass.
//!
//! ```text
//! x: [B, N, K, S]
//!   intra: permute → [B·S, K, N] → rnn → dropout → linear → [B, N, K, S] → norm → + x
//!   inter: permute → [B·K, S, N] → rnn → dropout → linear → [B, N, K, S] → norm → + intra
//! ```
//!
//! The recurrent hidden size is `N / directions`, so the recurrent output
//! already has width `N` and the projection is square.

use ndarray::{Array3, Array4};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::core::dropout::{Dropout, Mode};
use crate::core::linear::Linear;
use crate::core::reshape::{pseudo_batch, reshape};
use crate::error::{DualPathError, Result, Stage};
use crate::norm::{NormKind, Normalization};
use crate::recurrent::{Recurrent, RnnKind};

/// Parameters of one path (intra or inter) of a block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathParams {
    /// Recurrent transform along the path's sequence axis.
    pub rnn: Recurrent,

    /// Square projection: W ∈ R^{N × N}
    pub linear: Linear,

    /// Normalization over the reassembled chunk tensor.
    pub norm: Normalization,
}

impl PathParams {
    fn init(
        rnn_kind: RnnKind,
        norm_kind: NormKind,
        hidden: usize,
        bidirectional: bool,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let directions = if bidirectional { 2 } else { 1 };
        let width = hidden
            .checked_mul(directions)
            .ok_or_else(|| DualPathError::config("bidirectional width overflows usize"))?;
        Ok(Self {
            rnn: Recurrent::init(rnn_kind, width, hidden, bidirectional, rng),
            linear: Linear::init(width, width, rng),
            norm: Normalization::new(norm_kind, width)?,
        })
    }

    fn param_count(&self) -> usize {
        self.rnn.param_count() + self.linear.param_count() + self.norm.param_count()
    }

    /// `[batch', steps, N]` → rnn → dropout → linear.
    fn transform(
        &self,
        seqs: Array3<f32>,
        dropout: &Dropout,
        mode: &mut Mode,
        stage: Stage,
    ) -> Result<Array3<f32>> {
        let mut hidden = self.rnn.forward(seqs.view(), stage)?;
        dropout.apply(&mut hidden, mode);
        self.linear.forward_seq(hidden, stage)
    }
}

/// One intra/inter pair with its own parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DualPathBlock {
    width: usize,
    pub intra: PathParams,
    pub inter: PathParams,
    dropout: Dropout,
}

impl DualPathBlock {
    /// Build a block for chunk tensors with `hidden · directions` channels.
    ///
    /// Fails for normalizations that are not defined on chunk tensors.
    pub fn init(
        rnn_kind: RnnKind,
        norm_kind: NormKind,
        hidden: usize,
        bidirectional: bool,
        dropout: Dropout,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if hidden == 0 {
            return Err(DualPathError::config("hidden width must be positive"));
        }
        if !norm_kind.supports_chunks() {
            return Err(DualPathError::config(format!(
                "{norm_kind} normalization cannot be used inside a dual-path block"
            )));
        }
        let intra = PathParams::init(rnn_kind, norm_kind, hidden, bidirectional, rng)?;
        let inter = PathParams::init(rnn_kind, norm_kind, hidden, bidirectional, rng)?;
        Ok(Self {
            width: intra.linear.out_features(),
            intra,
            inter,
            dropout,
        })
    }

    /// Channel count `N` the block expects.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn param_count(&self) -> usize {
        self.intra.param_count() + self.inter.param_count()
    }

    /// `[B, N, K, S] -> [B, N, K, S]`.
    pub fn forward(&self, x: &Array4<f32>, mode: &mut Mode) -> Result<Array4<f32>> {
        let (batch, channels, chunk_len, num_chunks) = x.dim();
        if channels != self.width {
            return Err(DualPathError::DimensionMismatch {
                stage: Stage::IntraChunk,
                axis: 1,
                expected: self.width,
                got: channels,
            });
        }

        // Intra: one sequence of length K per (batch, chunk).
        let stage = Stage::IntraChunk;
        let rows = pseudo_batch(batch, num_chunks, stage)?;
        let seqs = reshape(
            x.view().permuted_axes([0, 3, 2, 1]).to_owned(),
            (rows, chunk_len, channels),
            stage,
        )?;
        let seqs = self.intra.transform(seqs, &self.dropout, mode, stage)?;
        let back = reshape(seqs, (batch, num_chunks, chunk_len, channels), stage)?
            .permuted_axes([0, 3, 2, 1]);
        let intra = self.intra.norm.forward_chunks(&back.as_standard_layout().into_owned())? + x;

        // Inter: one sequence of length S per (batch, within-chunk position).
        let stage = Stage::InterChunk;
        let rows = pseudo_batch(batch, chunk_len, stage)?;
        let seqs = reshape(
            intra.view().permuted_axes([0, 2, 3, 1]).to_owned(),
            (rows, num_chunks, channels),
            stage,
        )?;
        let seqs = self.inter.transform(seqs, &self.dropout, mode, stage)?;
        let back = reshape(seqs, (batch, chunk_len, num_chunks, channels), stage)?
            .permuted_axes([0, 3, 1, 2]);
        let inter = self.inter.norm.forward_chunks(&back.as_standard_layout().into_owned())?;
        Ok(inter + &intra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;
    use rand::SeedableRng;

    fn chunks(b: usize, n: usize, k: usize, s: usize) -> Array4<f32> {
        Array4::from_shape_fn((b, n, k, s), |(i, c, t, j)| {
            ((i * 13 + c * 5 + t * 3 + j) as f32 * 0.21).cos()
        })
    }

    fn block(rnn: RnnKind, norm: NormKind, hidden: usize, bi: bool) -> DualPathBlock {
        let mut rng = StdRng::seed_from_u64(11);
        DualPathBlock::init(rnn, norm, hidden, bi, Dropout::disabled(), &mut rng).unwrap()
    }

    /// Zero a path's projection and affine so its residual branch adds nothing.
    fn silence(path: &mut PathParams) {
        path.linear.weight.fill(0.0);
        path.linear.bias.fill(0.0);
        if let Some(affine) = path.norm.affine_mut() {
            affine.weight.fill(0.0);
            affine.bias.fill(0.0);
        }
    }

    /// Absolute output change caused by bumping `x[b, .., k, j]`.
    fn response(
        blk: &DualPathBlock,
        x: &Array4<f32>,
        b: usize,
        k: usize,
        j: usize,
    ) -> Array4<f32> {
        let base = blk.forward(x, &mut Mode::Inference).unwrap();
        let mut bumped = x.clone();
        bumped.slice_mut(s![b, .., k, j]).mapv_inplace(|v| v + 1.5);
        let moved = blk.forward(&bumped, &mut Mode::Inference).unwrap();
        (&moved - &base).mapv(f32::abs)
    }

    #[test]
    fn test_intra_path_stays_inside_chunk() {
        let mut blk = block(RnnKind::Lstm, NormKind::Layer, 2, true);
        silence(&mut blk.inter);
        let x = chunks(2, 4, 5, 4);
        let delta = response(&blk, &x, 0, 1, 2);
        for ((b, _, k, j), &d) in delta.indexed_iter() {
            if b != 0 || j != 2 {
                assert!(d < 1e-6, "leak into batch {b} chunk {j} position {k}: {d}");
            }
        }
        // The recurrence runs along K, so other positions of chunk 2 move.
        let inside = delta.slice(s![0, .., 3, 2]).iter().fold(0.0f32, |m, &d| m.max(d));
        assert!(inside > 1e-4);
    }

    #[test]
    fn test_inter_path_stays_on_position() {
        let mut blk = block(RnnKind::Gru, NormKind::Layer, 2, true);
        silence(&mut blk.intra);
        let x = chunks(2, 4, 5, 4);
        let delta = response(&blk, &x, 1, 3, 2);
        for ((b, _, k, _), &d) in delta.indexed_iter() {
            if b != 1 || k != 3 {
                assert!(d < 1e-6, "leak into batch {b} position {k}: {d}");
            }
        }
        // The recurrence runs along S, so the same position in chunk 0 moves.
        let across = delta.slice(s![1, .., 3, 0]).iter().fold(0.0f32, |m, &d| m.max(d));
        assert!(across > 1e-4);
    }

    #[test]
    fn test_full_block_mixes_chunks_and_positions() {
        let blk = block(RnnKind::Lstm, NormKind::Cumulative, 2, true);
        let x = chunks(1, 4, 5, 4);
        let delta = response(&blk, &x, 0, 1, 2);
        // Intra then inter: position 4 of chunk 0 is reachable.
        let far = delta.slice(s![0, .., 4, 0]).iter().fold(0.0f32, |m, &d| m.max(d));
        assert!(far > 1e-5);
    }

    #[test]
    fn test_shape_preserved_for_every_kind() {
        let x = chunks(2, 6, 4, 5);
        for rnn in [RnnKind::Plain, RnnKind::Lstm, RnnKind::Gru] {
            for norm in [NormKind::Global, NormKind::Cumulative, NormKind::Layer] {
                let blk = block(rnn, norm, 3, true);
                let y = blk.forward(&x, &mut Mode::Inference).unwrap();
                assert_eq!(y.dim(), x.dim(), "{rnn} {norm}");
                assert!(y.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn test_single_chunk_inter_path() {
        // S = 1: the inter-chunk recurrence sees length-1 sequences.
        let blk = block(RnnKind::Lstm, NormKind::Layer, 4, false);
        let x = chunks(3, 4, 6, 1);
        let y = blk.forward(&x, &mut Mode::Inference).unwrap();
        assert_eq!(y.dim(), (3, 4, 6, 1));
    }

    #[test]
    fn test_unit_dimensions() {
        let blk = block(RnnKind::Gru, NormKind::Global, 1, false);
        let x = chunks(1, 1, 1, 1);
        assert_eq!(blk.forward(&x, &mut Mode::Inference).unwrap().dim(), (1, 1, 1, 1));
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(5);
        let blk = DualPathBlock::init(
            RnnKind::Lstm,
            NormKind::Layer,
            2,
            true,
            Dropout::new(0.5).unwrap(),
            &mut rng,
        )
        .unwrap();
        let x = chunks(2, 4, 4, 4);
        let a = blk.forward(&x, &mut Mode::Inference).unwrap();
        let b = blk.forward(&x, &mut Mode::Inference).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_dropout_changes_output() {
        let mut rng = StdRng::seed_from_u64(5);
        let blk = DualPathBlock::init(
            RnnKind::Gru,
            NormKind::Global,
            3,
            false,
            Dropout::new(0.5).unwrap(),
            &mut rng,
        )
        .unwrap();
        let x = chunks(1, 3, 4, 4);
        let eval = blk.forward(&x, &mut Mode::Inference).unwrap();
        let train = blk.forward(&x, &mut Mode::training(1)).unwrap();
        assert_eq!(train.dim(), eval.dim());
        assert_ne!(train, eval);
        // Same seed, same mask.
        let again = blk.forward(&x, &mut Mode::training(1)).unwrap();
        assert_eq!(train, again);
    }

    #[test]
    fn test_batch_elements_independent() {
        let blk = block(RnnKind::Plain, NormKind::Cumulative, 2, true);
        let x = chunks(3, 4, 4, 2);
        let y = blk.forward(&x, &mut Mode::Inference).unwrap();
        let single = x.slice(s![1..2, .., .., ..]).to_owned();
        let ys = blk.forward(&single, &mut Mode::Inference).unwrap();
        for (a, b) in ys.iter().zip(y.slice(s![1..2, .., .., ..]).iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_width_follows_direction_count() {
        assert_eq!(block(RnnKind::Lstm, NormKind::Layer, 5, true).width(), 10);
        assert_eq!(block(RnnKind::Lstm, NormKind::Layer, 5, false).width(), 5);
    }

    #[test]
    fn test_rejects_batch_norm() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = DualPathBlock::init(
            RnnKind::Lstm,
            NormKind::Batch,
            4,
            false,
            Dropout::disabled(),
            &mut rng,
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let blk = block(RnnKind::Lstm, NormKind::Layer, 2, true);
        let err = blk.forward(&chunks(1, 3, 4, 2), &mut Mode::Inference).unwrap_err();
        assert!(matches!(
            err,
            DualPathError::DimensionMismatch { stage: Stage::IntraChunk, expected: 4, got: 3, .. }
        ));
    }
}
