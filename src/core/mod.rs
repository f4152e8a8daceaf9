//! Core building blocks shared by every stage: projections, dropout, and
//! checked reshapes.

pub mod dropout;
pub mod linear;
pub mod reshape;
