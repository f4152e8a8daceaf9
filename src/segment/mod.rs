//! Chunking of long sequences into 50%-overlapping windows and its exact inverse.

pub mod geometry;
pub mod overlap_add;
pub mod segmenter;

pub use geometry::ChunkGeometry;
pub use overlap_add::overlap_add;
pub use segmenter::segment;
