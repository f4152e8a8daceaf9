//! Sequential stack of dual-path blocks.

use ndarray::Array4;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::block::DualPathBlock;
use crate::core::dropout::{Dropout, Mode};
use crate::error::{DualPathError, Result};
use crate::norm::NormKind;
use crate::recurrent::RnnKind;

/// `num_layers` blocks; block `i + 1` consumes block `i`'s output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DualPathStack {
    blocks: Vec<DualPathBlock>,
}

impl DualPathStack {
    pub fn init(
        num_layers: usize,
        rnn_kind: RnnKind,
        norm_kind: NormKind,
        hidden: usize,
        bidirectional: bool,
        dropout: Dropout,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if num_layers == 0 {
            return Err(DualPathError::config("a dual-path stack needs at least one block"));
        }
        let blocks = (0..num_layers)
            .map(|_| DualPathBlock::init(rnn_kind, norm_kind, hidden, bidirectional, dropout, rng))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[DualPathBlock] {
        &self.blocks
    }

    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }

    pub fn param_count(&self) -> usize {
        self.blocks.iter().map(DualPathBlock::param_count).sum()
    }

    /// `[B, N, K, S] -> [B, N, K, S]` through every block in order.
    pub fn forward(&self, chunks: Array4<f32>, mode: &mut Mode) -> Result<Array4<f32>> {
        self.blocks
            .iter()
            .enumerate()
            .try_fold(chunks, |x, (i, block)| {
                let y = block.forward(&x, mode)?;
                debug!(layer = i, shape = ?y.shape(), "dual-path block done");
                Ok(y)
            })
    }
}
