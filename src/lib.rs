//! # dualpath
//!
//! Dual-path recurrent sequence modelling over chunked feature sequences.
//!
//! A long `[B, N, L]` sequence is cut into 50%-overlapping chunks
//! `[B, N, K, S]`. Each block then alternates a recurrence *within* every
//! chunk (short range) with a recurrence *across* chunks (long range), and
//! the chunks are overlap-added back into `[B, N, L]`.
//!
//! ## Components
//!
//! 1. **Normalization**: global, cumulative, layer or batch statistics
//! 2. **Segmenter**: sequence to overlapping chunks, plus the padding gap
//! 3. **Dual-Path Block**: intra-chunk then inter-chunk recurrence with residuals
//! 4. **Stack**: `num_layers` blocks applied in order
//! 5. **Overlap-Adder**: exact inverse of the segmenter
//! 6. **Engine**: normalize, project, segment, stack, overlap-add
//!
//! The [`embedding`] module adds the per-bin embedding head on top of the
//! engine and the speaker-axis split used by clustering back ends.

pub mod core;
pub mod dual_path;
pub mod embedding;
pub mod error;
pub mod norm;
pub mod recurrent;
pub mod segment;

pub use crate::core::dropout::{Dropout, Mode};
pub use crate::dual_path::{DualPathBlock, DualPathStack, Engine, EngineConfig};
pub use crate::embedding::{split_speakers, Activation, EmbeddingHead, Separator};
pub use crate::error::{DualPathError, Result, Stage};
pub use crate::norm::{NormKind, Normalization};
pub use crate::recurrent::{Recurrent, RnnKind};
pub use crate::segment::{overlap_add, segment, ChunkGeometry};

/// Crate-wide constants.
pub mod config {
    /// Default chunk length `K`.
    pub const DEFAULT_CHUNK_LEN: usize = 250;

    /// Default number of dual-path blocks.
    pub const DEFAULT_NUM_LAYERS: usize = 6;

    /// Default recurrent hidden size per direction.
    pub const DEFAULT_HIDDEN_WIDTH: usize = 600;

    /// Default input feature width (STFT bins for a 256-point FFT).
    pub const DEFAULT_IN_CHANNELS: usize = 129;

    /// Default embedding dimension `D`.
    pub const DEFAULT_EMB_DIM: usize = 40;

    /// Default speaker count.
    pub const DEFAULT_NUM_SPEAKERS: usize = 2;

    /// Epsilon for global, cumulative and layer normalization.
    pub const NORM_EPS: f32 = 1e-8;

    /// Epsilon for batch normalization.
    pub const BATCH_NORM_EPS: f32 = 1e-5;

    /// Chunks covering each retained sample after overlap-add (hop = K / 2).
    pub const OVERLAP_FACTOR: f32 = 2.0;
}
