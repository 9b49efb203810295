//! Gridding engine contract.
//!
//! The pipeline does not bin points itself. It creates a grid through a
//! [`GridEngine`], feeds each line's rotated points tagged with the line
//! identifier, builds it, and reads back the combined depth and slope layers
//! plus one depth layer per line.

use anyhow::Result;
use patch_core::{GridLayers, Sounding};
use serde::{Deserialize, Serialize};

/// Kind of grid requested from the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    /// One resolution over the whole extent.
    #[default]
    SingleResolution,
}

/// Factory for grid accumulators.
pub trait GridEngine {
    type Grid: GridBuilder;

    fn create(&self, kind: GridKind) -> Result<Self::Grid>;
}

/// A grid accumulator.
pub trait GridBuilder {
    /// Ingest points of one line. `line` becomes the name of that line's
    /// depth layer after [`GridBuilder::build`].
    fn add_points(&mut self, points: &[Sounding], line: &str, tags: &[String]) -> Result<()>;

    /// Finalize: combined `depth`, `x_slope`, `y_slope` and per-line depth layers.
    fn build(&mut self) -> Result<()>;

    /// Named layers, all sharing one shape and cell indexing, plus the grid extent.
    fn get_layers(&self, names: &[&str]) -> Result<GridLayers>;
}
