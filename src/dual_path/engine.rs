//! Dual-path processing engine.
//!
//! ```text
//! x: [B, T, F]
//!   → [B, F, T] → normalize (channels = F)
//!   → project F → H' per frame, H' = hidden · directions
//!   → [B, H', T] → segment → stack → overlap-add
//!   → [B, H', T]
//! ```

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::stack::DualPathStack;
use crate::config::{
    DEFAULT_CHUNK_LEN, DEFAULT_HIDDEN_WIDTH, DEFAULT_IN_CHANNELS, DEFAULT_NUM_LAYERS,
    DEFAULT_NUM_SPEAKERS,
};
use crate::core::dropout::{Dropout, Mode};
use crate::core::linear::Linear;
use crate::error::{DualPathError, Result, Stage};
use crate::norm::{NormKind, Normalization};
use crate::recurrent::RnnKind;
use crate::segment::{self, geometry};

/// Construction options for [`Engine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Feature width `F` of the input frames.
    pub in_channels: usize,

    /// Recurrent hidden size per direction.
    pub hidden_width: usize,

    pub rnn_kind: RnnKind,

    pub norm_kind: NormKind,

    /// Number of stacked dual-path blocks.
    pub num_layers: usize,

    /// Chunk length `K`; hop is `K / 2`.
    pub chunk_len: usize,

    pub bidirectional: bool,

    /// Dropout probability after each recurrent transform (training only).
    pub dropout: f32,

    /// Speaker count for downstream disaggregation. The stack itself is
    /// speaker-agnostic.
    pub num_speakers: usize,

    /// Seed for parameter initialisation.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            in_channels: DEFAULT_IN_CHANNELS,
            hidden_width: DEFAULT_HIDDEN_WIDTH,
            rnn_kind: RnnKind::default(),
            norm_kind: NormKind::default(),
            num_layers: DEFAULT_NUM_LAYERS,
            chunk_len: DEFAULT_CHUNK_LEN,
            bidirectional: true,
            dropout: 0.0,
            num_speakers: DEFAULT_NUM_SPEAKERS,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Every construction-time check. No tensor work happens before this passes.
    pub fn validate(&self) -> Result<()> {
        if self.in_channels == 0 {
            return Err(DualPathError::config("in_channels must be positive"));
        }
        if self.hidden_width == 0 {
            return Err(DualPathError::config("hidden_width must be positive"));
        }
        if self.num_layers == 0 {
            return Err(DualPathError::config("num_layers must be positive"));
        }
        if self.num_speakers == 0 {
            return Err(DualPathError::config("num_speakers must be positive"));
        }
        if !self.norm_kind.supports_chunks() {
            return Err(DualPathError::config(format!(
                "{} normalization is not defined for chunk tensors",
                self.norm_kind
            )));
        }
        geometry::validate_chunk_len(self.chunk_len)?;
        Dropout::new(self.dropout)?;
        self.model_width()?;
        Ok(())
    }

    /// Channel width `H'` inside the stack: `hidden_width · directions`.
    pub fn model_width(&self) -> Result<usize> {
        let directions = if self.bidirectional { 2 } else { 1 };
        self.hidden_width
            .checked_mul(directions)
            .ok_or_else(|| DualPathError::config("hidden_width overflows when doubled"))
    }
}

/// Normalization, projection and the dual-path stack, built from one config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Engine {
    config: EngineConfig,
    input_norm: Normalization,
    projection: Linear,
    stack: DualPathStack,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let width = config.model_width()?;
        let dropout = Dropout::new(config.dropout)?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let input_norm = Normalization::new(config.norm_kind, config.in_channels)?;
        let projection = Linear::init(config.in_channels, width, &mut rng);
        let stack = DualPathStack::init(
            config.num_layers,
            config.rnn_kind,
            config.norm_kind,
            config.hidden_width,
            config.bidirectional,
            dropout,
            &mut rng,
        )?;

        let engine = Self {
            config,
            input_norm,
            projection,
            stack,
        };
        info!(
            rnn = %engine.config.rnn_kind,
            norm = %engine.config.norm_kind,
            layers = engine.config.num_layers,
            chunk_len = engine.config.chunk_len,
            width,
            params = engine.param_count(),
            "dual-path engine ready"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stack(&self) -> &DualPathStack {
        &self.stack
    }

    /// Channel width of the output sequence.
    pub fn output_width(&self) -> usize {
        self.projection.out_features()
    }

    pub fn param_count(&self) -> usize {
        self.input_norm.param_count() + self.projection.param_count() + self.stack.param_count()
    }

    /// `[B, T, F] -> [B, H', T]`.
    pub fn process(&self, x: &Array3<f32>, mode: &mut Mode) -> Result<Array3<f32>> {
        let features = x.dim().2;
        if features != self.config.in_channels {
            return Err(DualPathError::DimensionMismatch {
                stage: Stage::Normalize,
                axis: 2,
                expected: self.config.in_channels,
                got: features,
            });
        }

        // [B, T, F] -> [B, F, T]
        let channels_first = x.view().permuted_axes([0, 2, 1]).as_standard_layout().into_owned();
        let normed = self.input_norm.forward_seq(&channels_first)?;

        // Per-frame projection: [B, T, F] -> [B, T, H'] -> [B, H', T]
        let projected = self
            .projection
            .forward_seq(normed.permuted_axes([0, 2, 1]), Stage::Project)?;
        let seq = projected.permuted_axes([0, 2, 1]).as_standard_layout().into_owned();

        let (chunks, gap) = segment::segment(&seq, self.config.chunk_len)?;
        let chunks = self.stack.forward(chunks, mode)?;
        segment::overlap_add(&chunks, gap)
    }
}
