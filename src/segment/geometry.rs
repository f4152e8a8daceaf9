//! Chunk layout arithmetic shared by the segmenter and the overlap-adder.
//!
//! For a sequence of length `L` and chunk length `K` (hop `P = K/2`):
//!
//! ```text
//! gap = (K - (P + L mod K) mod K) mod K      0 <= gap < K
//! L'  = L + gap + 2P                          padded length
//! S   = 2 (L' - P) / K                        chunk count, always even
//! chunk j starts at (j / 2) K + (j mod 2) P
//! ```
//!
//! `L + gap + P` is always a multiple of `K`, so both interleaved views tile
//! exactly and every retained sample is covered by two chunks.

use crate::error::{DualPathError, Result, Stage};

/// Validate a chunk length: even and at least 2, so the hop is at least 1.
pub fn validate_chunk_len(chunk_len: usize) -> Result<()> {
    if chunk_len < 2 || chunk_len % 2 != 0 {
        return Err(DualPathError::config(format!(
            "chunk length must be an even number >= 2, got {chunk_len}"
        )));
    }
    Ok(())
}

/// Right-padding needed before chunking a length-`len` sequence.
pub fn gap_for(len: usize, chunk_len: usize) -> usize {
    let hop = chunk_len / 2;
    (chunk_len - (hop + len % chunk_len) % chunk_len) % chunk_len
}

/// Resolved chunk layout for one sequence length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkGeometry {
    /// True sequence length `L`.
    pub len: usize,

    /// Chunk length `K`.
    pub chunk_len: usize,

    /// Hop `P = K / 2`.
    pub hop: usize,

    /// Right padding added before chunking.
    pub gap: usize,

    /// `L + gap + 2P`.
    pub padded_len: usize,

    /// Chunk count `S`.
    pub num_chunks: usize,
}

impl ChunkGeometry {
    pub fn new(len: usize, chunk_len: usize) -> Result<Self> {
        validate_chunk_len(chunk_len)?;
        if len == 0 {
            return Err(DualPathError::DimensionMismatch {
                stage: Stage::Segment,
                axis: 2,
                expected: 1,
                got: 0,
            });
        }
        let hop = chunk_len / 2;
        let gap = gap_for(len, chunk_len);
        let padded_len = len
            .checked_add(gap)
            .and_then(|v| v.checked_add(2 * hop))
            .ok_or(DualPathError::Overflow {
                stage: Stage::Segment,
                what: "padded length",
            })?;
        let num_chunks = 2 * ((padded_len - hop) / chunk_len);
        Ok(Self {
            len,
            chunk_len,
            hop,
            gap,
            padded_len,
            num_chunks,
        })
    }

    /// Recover the layout from a chunk tensor's `K`, `S` and the recorded gap.
    pub fn from_chunks(chunk_len: usize, num_chunks: usize, gap: usize) -> Result<Self> {
        validate_chunk_len(chunk_len)?;
        if num_chunks == 0 || num_chunks % 2 != 0 {
            return Err(DualPathError::DimensionMismatch {
                stage: Stage::OverlapAdd,
                axis: 3,
                expected: num_chunks + num_chunks % 2,
                got: num_chunks,
            });
        }
        let hop = chunk_len / 2;
        let covered = (num_chunks / 2)
            .checked_mul(chunk_len)
            .ok_or(DualPathError::Overflow {
                stage: Stage::OverlapAdd,
                what: "merged length",
            })?;
        // Retained samples lie in [P, covered - gap).
        if gap >= chunk_len || covered < hop + gap + 1 {
            return Err(DualPathError::config(format!(
                "gap {gap} is inconsistent with {num_chunks} chunks of length {chunk_len}"
            )));
        }
        let len = covered - hop - gap;
        Ok(Self {
            len,
            chunk_len,
            hop,
            gap,
            padded_len: covered + hop,
            num_chunks,
        })
    }

    /// Start offset of chunk `j` inside the padded sequence.
    pub fn chunk_start(&self, j: usize) -> usize {
        (j / 2) * self.chunk_len + (j % 2) * self.hop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_l7_k4() {
        let g = ChunkGeometry::new(7, 4).unwrap();
        assert_eq!(g.hop, 2);
        assert_eq!(g.gap, 3);
        assert_eq!(g.padded_len, 14);
        assert_eq!(g.num_chunks, 6);
    }

    #[test]
    fn test_gap_bounds() {
        for k in (2..=16).step_by(2) {
            for len in 1..=64 {
                let g = ChunkGeometry::new(len, k).unwrap();
                assert!(g.gap < k, "len={len} k={k} gap={}", g.gap);
                assert_eq!((len + g.gap + g.hop) % k, 0);
                assert!(g.num_chunks >= 2 && g.num_chunks % 2 == 0);
            }
        }
    }

    #[test]
    fn test_gap_wraps_to_zero() {
        // L mod K == K - P: the unreduced formula would give gap == K.
        assert_eq!(gap_for(2, 4), 0);
        assert_eq!(gap_for(6, 4), 0);
        let g = ChunkGeometry::new(2, 4).unwrap();
        assert_eq!(g.num_chunks, 2);
    }

    #[test]
    fn test_chunk_starts_interleave() {
        let g = ChunkGeometry::new(7, 4).unwrap();
        let starts: Vec<usize> = (0..g.num_chunks).map(|j| g.chunk_start(j)).collect();
        assert_eq!(starts, vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(g.chunk_start(g.num_chunks - 1) + g.chunk_len, g.padded_len);
    }

    #[test]
    fn test_invalid_chunk_len() {
        assert!(ChunkGeometry::new(10, 0).unwrap_err().is_config());
        assert!(ChunkGeometry::new(10, 1).unwrap_err().is_config());
        assert!(ChunkGeometry::new(10, 5).unwrap_err().is_config());
    }

    #[test]
    fn test_empty_sequence() {
        let err = ChunkGeometry::new(0, 4).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Segment));
    }

    #[test]
    fn test_from_chunks_recovers_length() {
        for len in 1..40 {
            let g = ChunkGeometry::new(len, 6).unwrap();
            let back = ChunkGeometry::from_chunks(6, g.num_chunks, g.gap).unwrap();
            assert_eq!(back, g);
        }
    }

    #[test]
    fn test_from_chunks_rejects_odd_count() {
        assert!(matches!(
            ChunkGeometry::from_chunks(4, 3, 0),
            Err(DualPathError::DimensionMismatch { axis: 3, .. })
        ));
        assert!(ChunkGeometry::from_chunks(4, 2, 4).is_err());
    }
}
