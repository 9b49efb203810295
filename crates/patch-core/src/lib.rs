//! Core types for the multibeam patch test.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Mat6`, ...),
//! - soundings and the concatenated point buffer with per-line index ranges,
//! - the rotation of survey points into the sonar-forward model frame,
//! - the grid contract data (`GridExtent`, `GridLayers`) shared with the gridder,
//! - the six patch-test parameters and the 6×2 calibration result.
//!
//! Model frame:
//! `x = +forward, y = +starboard, z = +down`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Soundings, point buffer and line index bookkeeping.
pub mod sounding;
/// Rotation of points about a common pivot.
pub mod rotation;
/// Gridded surface layers and node coordinates.
pub mod grid;
/// Patch-test parameters and calibration result.
pub mod params;

pub use grid::*;
pub use math::*;
pub use params::*;
pub use rotation::*;
pub use sounding::*;
