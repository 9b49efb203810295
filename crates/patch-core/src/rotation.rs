//! Rotation of survey points into the sonar-forward model frame.
//!
//! All points are rotated about one pivot, the minimum easting and minimum
//! northing of the whole buffer, so that the reference line's direction of
//! travel becomes +x. Depth is untouched.

use serde::{Deserialize, Serialize};

use crate::{heading_alignment_angle, rotate_about, Pt2, Real, Sounding};

/// Center of rotation: `(min x, min y)` over all points of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationPivot {
    pub min_x: Real,
    pub min_y: Real,
}

impl RotationPivot {
    /// Pivot over `points`, or `None` if the slice is empty.
    pub fn from_points(points: &[Sounding]) -> Option<Self> {
        let first = points.first()?;
        let (min_x, min_y) = points
            .iter()
            .fold((first.x, first.y), |(mx, my), p| (mx.min(p.x), my.min(p.y)));
        Some(Self { min_x, min_y })
    }

    #[inline]
    pub fn point(&self) -> Pt2 {
        Pt2::new(self.min_x, self.min_y)
    }
}

/// Rotate `points` in place by the alignment angle of `azimuth_deg`.
///
/// Returns the angle applied, in radians. An azimuth of 90° leaves the
/// points unchanged.
pub fn rotate_points(points: &mut [Sounding], pivot: &RotationPivot, azimuth_deg: Real) -> Real {
    let angle = heading_alignment_angle(azimuth_deg);
    let center = pivot.point();
    for p in points.iter_mut() {
        let r = rotate_about(&p.position(), &center, angle);
        p.x = r.x;
        p.y = r.y;
    }
    angle
}
