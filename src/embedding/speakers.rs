//! Speaker-axis disaggregation.
//!
//! Rows of a speaker-expanded batch are batch-major: row `b · spks + s`
//! holds speaker `s` of utterance `b`.

use ndarray::{Array3, Array4};

use crate::core::reshape::reshape;
use crate::error::{DualPathError, Result, Stage};

/// `[B · spks, N, L] -> [spks, B, N, L]`.
///
/// A leading axis that is not a multiple of `num_speakers` is a
/// [`DualPathError::Shape`] carrying both element counts.
pub fn split_speakers(x: Array3<f32>, num_speakers: usize) -> Result<Array4<f32>> {
    if num_speakers == 0 {
        return Err(DualPathError::config("num_speakers must be positive"));
    }
    let (rows, channels, len) = x.dim();
    let batch = rows.div_ceil(num_speakers);
    let grouped = reshape(x, (batch, num_speakers, channels, len), Stage::Speakers)?;
    Ok(grouped
        .permuted_axes([1, 0, 2, 3])
        .as_standard_layout()
        .into_owned())
}
