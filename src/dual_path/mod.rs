//! Dual-path sequence modelling: blocks, the block stack and the engine that
//! wraps them with input normalization, projection and chunking.

pub mod block;
pub mod engine;
pub mod stack;

pub use block::{DualPathBlock, PathParams};
pub use engine::{Engine, EngineConfig};
pub use stack::DualPathStack;
