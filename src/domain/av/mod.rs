//! Encoder argument builders for concatenation and transforms.

pub mod concat;
pub mod transform;
