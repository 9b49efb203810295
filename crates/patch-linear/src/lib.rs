//! Linear algebra of the multibeam patch test.
//!
//! - [`build_design_system`]: overlap mask and the `A`/`L` matrices from grid layers.
//! - [`NormalEquations`] and [`solve_normal_equations`]: `AᵗA·X = AᵗL` solved by SVD,
//!   with optional a-priori parameter weighting.

mod design;
mod normal;

pub use design::*;
pub use normal::*;
