//! Checked reshapes.
//!
//! Every shape change in the crate funnels through [`reshape`], which compares
//! element counts up front so a mismatch is reported with both counts instead
//! of silently producing a tensor with the wrong semantics.

use ndarray::{Array, Dimension, IntoDimension};

use crate::error::{DualPathError, Result, Stage};

/// Reshape `array` into `shape` in row-major order.
///
/// Non-contiguous inputs (e.g. the result of `permuted_axes`) are copied into
/// standard layout first, so permute-then-reshape behaves like
/// `permute().contiguous().view()`.
pub fn reshape<D, E>(array: Array<f32, D>, shape: E, stage: Stage) -> Result<Array<f32, E::Dim>>
where
    D: Dimension,
    E: IntoDimension,
{
    let dim = shape.into_dimension();
    let target = dim.slice().to_vec();
    let expected = checked_product(&target, stage)?;
    let actual = array.len();
    if expected != actual {
        return Err(DualPathError::Shape {
            stage,
            expected,
            actual,
            target,
        });
    }

    let array = if array.is_standard_layout() {
        array
    } else {
        array.as_standard_layout().into_owned()
    };

    array
        .into_shape_with_order(dim)
        .map_err(|_| DualPathError::Shape {
            stage,
            expected,
            actual,
            target,
        })
}

/// Product of `dims`, failing on overflow instead of wrapping.
pub fn checked_product(dims: &[usize], stage: Stage) -> Result<usize> {
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d).ok_or(DualPathError::Overflow {
            stage,
            what: "element count",
        })
    })
}

/// Multiply two axis lengths into a pseudo-batch size.
pub fn pseudo_batch(a: usize, b: usize, stage: Stage) -> Result<usize> {
    a.checked_mul(b).ok_or(DualPathError::Overflow {
        stage,
        what: "pseudo-batch size",
    })
}
