//! Engine plus embedding head: frames in, per-bin embeddings out.

use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Activation, EmbeddingHead};
use crate::core::dropout::{Dropout, Mode};
use crate::core::reshape::reshape;
use crate::dual_path::{Engine, EngineConfig};
use crate::error::{Result, Stage};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Separator {
    engine: Engine,
    head: EmbeddingHead,
}

impl Separator {
    pub fn new(config: EngineConfig, emb_dim: usize, activation: Activation) -> Result<Self> {
        let dropout = Dropout::new(config.dropout)?;
        // Separate stream so the engine's parameters match a standalone engine.
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let engine = Engine::new(config)?;
        let head = EmbeddingHead::init(
            engine.output_width(),
            engine.config().in_channels,
            emb_dim,
            activation,
            dropout,
            &mut rng,
        )?;
        Ok(Self { engine, head })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn head(&self) -> &EmbeddingHead {
        &self.head
    }

    pub fn param_count(&self) -> usize {
        self.engine.param_count() + self.head.param_count()
    }

    /// `[B, T, F] -> [B, T·F, D]`.
    pub fn embed(&self, x: &Array3<f32>, mode: &mut Mode) -> Result<Array3<f32>> {
        let hidden = self.engine.process(x, mode)?;
        let emb = self.head.forward(&hidden, mode)?;
        debug!(input = ?x.shape(), output = ?emb.shape(), "embedded batch");
        Ok(emb)
    }

    /// Single utterance: `[T, F] -> [T·F, D]`.
    pub fn embed_single(&self, x: &Array2<f32>, mode: &mut Mode) -> Result<Array2<f32>> {
        let batched = x.view().insert_axis(Axis(0)).to_owned();
        let emb = self.embed(&batched, mode)?;
        let (_, rows, dim) = emb.dim();
        reshape(emb, (rows, dim), Stage::Embedding)
    }
}
