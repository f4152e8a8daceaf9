//! Error taxonomy for the dual-path engine.
//!
//! Construction-time problems surface as [`DualPathError::Config`] or
//! [`DualPathError::UnknownVariant`]; anything that goes wrong while tensors
//! flow through a stage carries the [`Stage`] it happened in.

use std::fmt;

use thiserror::Error;

/// Pipeline stage an error was raised from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Project,
    Segment,
    IntraChunk,
    InterChunk,
    OverlapAdd,
    Embedding,
    Speakers,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Project => "project",
            Stage::Segment => "segment",
            Stage::IntraChunk => "intra-chunk",
            Stage::InterChunk => "inter-chunk",
            Stage::OverlapAdd => "overlap-add",
            Stage::Embedding => "embedding",
            Stage::Speakers => "speakers",
        };
        f.write_str(name)
    }
}

/// Errors returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum DualPathError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown {kind} variant: {name:?}")]
    UnknownVariant { kind: &'static str, name: String },

    #[error("shape error in {stage}: target {target:?} needs {expected} elements, got {actual}")]
    Shape {
        stage: Stage,
        expected: usize,
        actual: usize,
        target: Vec<usize>,
    },

    #[error("dimension mismatch in {stage}: axis {axis} expected {expected}, got {got}")]
    DimensionMismatch {
        stage: Stage,
        axis: usize,
        expected: usize,
        got: usize,
    },

    #[error("shape arithmetic overflow in {stage}: {what}")]
    Overflow { stage: Stage, what: &'static str },
}

impl DualPathError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        DualPathError::Config(msg.into())
    }

    /// Stage the error was raised from, when it came from tensor work.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DualPathError::Shape { stage, .. }
            | DualPathError::DimensionMismatch { stage, .. }
            | DualPathError::Overflow { stage, .. } => Some(*stage),
            DualPathError::Config(_) | DualPathError::UnknownVariant { .. } => None,
        }
    }

    /// True for errors that can only come from construction-time validation.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DualPathError::Config(_) | DualPathError::UnknownVariant { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DualPathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_reports_both_counts() {
        let err = DualPathError::Shape {
            stage: Stage::Speakers,
            expected: 240,
            actual: 360,
            target: vec![1, 2, 4, 30],
        };
        let msg = err.to_string();
        assert!(msg.contains("speakers"));
        assert!(msg.contains("240"));
        assert!(msg.contains("360"));
        assert_eq!(err.stage(), Some(Stage::Speakers));
        assert!(!err.is_config());
    }

    #[test]
    fn test_config_errors_have_no_stage() {
        let err = DualPathError::UnknownVariant {
            kind: "rnn",
            name: "foo".into(),
        };
        assert!(err.is_config());
        assert_eq!(err.stage(), None);
        assert!(err.to_string().contains("\"foo\""));
    }
}
