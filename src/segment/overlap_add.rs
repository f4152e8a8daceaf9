//! Overlapping chunks → sequence.

use ndarray::{s, Array3, Array4};
use tracing::debug;

use super::geometry::ChunkGeometry;
use crate::config::OVERLAP_FACTOR;
use crate::error::Result;

/// Merge `[B, N, K, S]` chunks back into `[B, N, L]`.
///
/// Each chunk is added back at the offset [`segment`](super::segment) took it
/// from; every retained sample receives exactly two contributions, so the sum
/// is divided by the overlap factor. `gap` must be the value returned by the
/// matching `segment` call.
pub fn overlap_add(chunks: &Array4<f32>, gap: usize) -> Result<Array3<f32>> {
    let (batch, channels, chunk_len, num_chunks) = chunks.dim();
    let geom = ChunkGeometry::from_chunks(chunk_len, num_chunks, gap)?;
    debug!(
        chunk_len,
        num_chunks,
        gap,
        len = geom.len,
        "overlap-add"
    );

    let mut merged = Array3::<f32>::zeros((batch, channels, geom.padded_len));
    for j in 0..num_chunks {
        let start = geom.chunk_start(j);
        let mut window = merged.slice_mut(s![.., .., start..start + chunk_len]);
        window += &chunks.slice(s![.., .., .., j]);
    }

    let mut out = merged
        .slice(s![.., .., geom.hop..geom.hop + geom.len])
        .to_owned();
    out.mapv_inplace(|v| v / OVERLAP_FACTOR);
    Ok(out)
}
