//! Primitive types shared with the platform layer.

pub mod geometry;
