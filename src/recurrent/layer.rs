//! Batched (optionally bidirectional) recurrent layer.
//!
//! Sequences in a batch are independent, so they are scanned in parallel
//! across rayon workers. Output order always matches input order.

use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cell::CellWeights;
use super::RnnKind;
use crate::error::{DualPathError, Result, Stage};

/// A single-layer recurrent transform over `[batch, steps, input]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recurrent {
    kind: RnnKind,
    input: usize,
    hidden: usize,
    forward_cell: CellWeights,
    backward_cell: Option<CellWeights>,
}

impl Recurrent {
    /// Zero-weight transform.
    pub fn zeros(kind: RnnKind, input: usize, hidden: usize, bidirectional: bool) -> Self {
        Self {
            kind,
            input,
            hidden,
            forward_cell: CellWeights::zeros(kind, input, hidden),
            backward_cell: bidirectional.then(|| CellWeights::zeros(kind, input, hidden)),
        }
    }

    /// Seeded uniform initialisation; each direction draws its own weights.
    pub fn init(
        kind: RnnKind,
        input: usize,
        hidden: usize,
        bidirectional: bool,
        rng: &mut StdRng,
    ) -> Self {
        let forward_cell = CellWeights::init(kind, input, hidden, rng);
        let backward_cell = bidirectional.then(|| CellWeights::init(kind, input, hidden, rng));
        Self {
            kind,
            input,
            hidden,
            forward_cell,
            backward_cell,
        }
    }

    pub fn kind(&self) -> RnnKind {
        self.kind
    }

    pub fn is_bidirectional(&self) -> bool {
        self.backward_cell.is_some()
    }

    /// Output feature width: `hidden` per direction.
    pub fn output_width(&self) -> usize {
        if self.is_bidirectional() {
            2 * self.hidden
        } else {
            self.hidden
        }
    }

    pub fn param_count(&self) -> usize {
        let backward = self.backward_cell.as_ref().map_or(0, CellWeights::param_count);
        self.forward_cell.param_count() + backward
    }

    /// `[batch, steps, input] -> [batch, steps, hidden · directions]`.
    pub fn forward(&self, x: ArrayView3<'_, f32>, stage: Stage) -> Result<Array3<f32>> {
        let (batch, steps, input) = x.dim();
        if input != self.input {
            return Err(DualPathError::DimensionMismatch {
                stage,
                axis: 2,
                expected: self.input,
                got: input,
            });
        }

        let outputs: Vec<Array2<f32>> = (0..batch)
            .into_par_iter()
            .map(|b| self.run_sequence(&x, b))
            .collect();

        let mut out = Array3::zeros((batch, steps, self.output_width()));
        for (b, seq) in outputs.iter().enumerate() {
            out.index_axis_mut(Axis(0), b).assign(seq);
        }
        Ok(out)
    }

    fn run_sequence(&self, x: &ArrayView3<'_, f32>, b: usize) -> Array2<f32> {
        let seq = x.index_axis(Axis(0), b);
        let fwd = self.forward_cell.scan(self.kind, seq, false);
        match &self.backward_cell {
            None => fwd,
            Some(cell) => {
                let bwd = cell.scan(self.kind, seq, true);
                // [forward | backward] along the feature axis.
                let mut both = Array2::zeros((seq.nrows(), 2 * self.hidden));
                both.slice_mut(s![.., ..self.hidden]).assign(&fwd);
                both.slice_mut(s![.., self.hidden..]).assign(&bwd);
                both
            }
        }
    }
}
