//! Mathematical type definitions.
//!
//! Fundamental types used throughout the patch-test crates.

use nalgebra::{Matrix6, Matrix6x2, Point2, Rotation2, Vector2, Vector6};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 6-vector, one entry per patch-test parameter.
pub type Vec6 = Vector6<Real>;
/// 6×6 matrix (normal matrix of the patch-test system).
pub type Mat6 = Matrix6<Real>;
/// 6×2 matrix, one column per survey line.
pub type Mat6x2 = Matrix6x2<Real>;

/// Counter-clockwise rotation angle that brings a line of the given azimuth
/// (degrees clockwise from north) onto the +x (east) axis.
///
/// Returns radians: `θ = (az − 90°)`.
pub fn heading_alignment_angle(azimuth_deg: Real) -> Real {
    (azimuth_deg - 90.0).to_radians()
}

/// Rotate `p` counter-clockwise by `angle` radians about `pivot`.
///
/// Applies `R(θ) · (p − pivot) + pivot` with
/// `R(θ) = [[cosθ, −sinθ], [sinθ, cosθ]]`.
pub fn rotate_about(p: &Pt2, pivot: &Pt2, angle: Real) -> Pt2 {
    let rot = Rotation2::new(angle);
    pivot + rot * (p - pivot)
}
