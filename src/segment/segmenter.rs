//! Sequence → overlapping chunks.

use ndarray::{s, Array3, Array4};
use tracing::debug;

use super::geometry::ChunkGeometry;
use crate::error::Result;

/// Split `[B, N, L]` into 50%-overlapping chunks `[B, N, K, S]`.
///
/// Returns the chunk tensor and the right padding (`gap`) that
/// [`overlap_add`](super::overlap_add) needs to trim the result back to `L`.
pub fn segment(x: &Array3<f32>, chunk_len: usize) -> Result<(Array4<f32>, usize)> {
    let (batch, channels, len) = x.dim();
    let geom = ChunkGeometry::new(len, chunk_len)?;
    debug!(
        len,
        chunk_len,
        gap = geom.gap,
        padded_len = geom.padded_len,
        num_chunks = geom.num_chunks,
        "segment"
    );

    // Zeros on both sides: P on the left, gap + P on the right.
    let mut padded = Array3::<f32>::zeros((batch, channels, geom.padded_len));
    padded
        .slice_mut(s![.., .., geom.hop..geom.hop + len])
        .assign(x);

    let mut chunks = Array4::<f32>::zeros((batch, channels, chunk_len, geom.num_chunks));
    for j in 0..geom.num_chunks {
        let start = geom.chunk_start(j);
        chunks
            .slice_mut(s![.., .., .., j])
            .assign(&padded.slice(s![.., .., start..start + chunk_len]));
    }
    Ok((chunks, geom.gap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DualPathError, Stage};

    fn ramp(b: usize, n: usize, l: usize) -> Array3<f32> {
        Array3::from_shape_fn((b, n, l), |(i, c, t)| (i * 100 + c * 10 + t) as f32 + 1.0)
    }

    #[test]
    fn test_segment_shape_l7_k4() {
        let (chunks, gap) = segment(&ramp(2, 4, 7), 4).unwrap();
        assert_eq!(gap, 3);
        assert_eq!(chunks.shape(), &[2, 4, 4, 6]);
    }

    #[test]
    fn test_chunk_contents_overlap_by_hop() {
        // L = 7, K = 4, P = 2: padded = [0 0 | x0..x6 | 0 0 0 | 0 0]
        let x = ramp(1, 1, 7);
        let (chunks, _) = segment(&x, 4).unwrap();
        let chunk = |j: usize| -> Vec<f32> { chunks.slice(s![0, 0, .., j]).to_vec() };
        assert_eq!(chunk(0), vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(chunk(1), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(chunk(2), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(chunk(3), vec![5.0, 6.0, 7.0, 0.0]);
        // Consecutive chunks share K/2 samples.
        for j in 0..5 {
            assert_eq!(chunk(j)[2..], chunk(j + 1)[..2]);
        }
    }

    #[test]
    fn test_batches_and_channels_stay_separate() {
        let x = ramp(3, 2, 5);
        let (chunks, _) = segment(&x, 2).unwrap();
        for b in 0..3 {
            for c in 0..2 {
                let first = x[[b, c, 0]];
                // K = 2, P = 1: chunk 0 is [0, x0].
                assert_eq!(chunks[[b, c, 1, 0]], first);
                assert_eq!(chunks[[b, c, 0, 0]], 0.0);
            }
        }
    }

    #[test]
    fn test_sequence_shorter_than_chunk() {
        let (chunks, gap) = segment(&ramp(1, 3, 3), 8).unwrap();
        assert!(gap < 8);
        assert_eq!(chunks.shape()[2], 8);
        assert_eq!(chunks.shape()[3], 2);
    }

    #[test]
    fn test_rejects_bad_chunk_len_and_empty_input() {
        assert!(segment(&ramp(1, 2, 5), 3).unwrap_err().is_config());
        let err = segment(&Array3::zeros((1, 2, 0)), 4).unwrap_err();
        assert!(matches!(
            err,
            DualPathError::DimensionMismatch { stage: Stage::Segment, .. }
        ));
    }
}
