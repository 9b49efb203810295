//! Pipeline stages of a patch-test run.
//!
//! Each stage consumes the record of the previous one and returns a new
//! immutable record:
//!
//! ```text
//! collect_points -> CollectedPoints
//! rotate         -> RotatedPoints
//! grid_surface   -> GriddedSurface
//! design         -> DesignSystem
//! solve          -> SolvedSystem
//! ```
//!
//! [`PatchTest::run`](crate::PatchTest::run) chains them; they are public so
//! a caller can stop after any stage or restart from a stored record.

use anyhow::{ensure, Context, Result};
use patch_core::{
    rotate_points, GridLayers, PointBuffer, Real, RotationPivot, DEPTH_LAYER, X_SLOPE_LAYER,
    Y_SLOPE_LAYER,
};
use patch_linear::{
    build_design_system, residual_sum_of_squares, solve_normal_equations, DesignError,
    DesignSystem, LeastSquaresSolution, NormalEquations, ParameterPrior, SolveError,
    SolveOptions,
};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::gridding::{GridBuilder, GridEngine, GridKind};
use crate::source::SoundingSource;

/// The two survey lines of a patch test, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePair {
    pub first: String,
    pub second: String,
}

impl LinePair {
    /// # Errors
    ///
    /// [`ConfigError::DuplicateLine`] when both identifiers are equal.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Result<Self, ConfigError> {
        let (first, second) = (first.into(), second.into());
        if first == second {
            return Err(ConfigError::DuplicateLine(first));
        }
        Ok(Self { first, second })
    }

    pub fn as_array(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }
}

impl std::fmt::Display for LinePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.first, self.second)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage records
// ─────────────────────────────────────────────────────────────────────────────

/// Accepted soundings of both lines, concatenated in line order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedPoints {
    pub lines: LinePair,
    pub buffer: PointBuffer,
}

/// Soundings rotated so the reference line runs along +x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatedPoints {
    pub lines: LinePair,
    pub buffer: PointBuffer,
    pub pivot: RotationPivot,
    /// Applied rotation, radians counter-clockwise.
    pub angle: Real,
}

/// Combined surface and per-line depths on a shared grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedSurface {
    pub lines: LinePair,
    pub layers: GridLayers,
}

/// Normal equations with their solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolvedSystem {
    pub normal: NormalEquations,
    pub solution: LeastSquaresSolution,
    /// Residual sum of squares of `A·X − L`, per line.
    pub residual_ss: [Real; 2],
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage functions
// ─────────────────────────────────────────────────────────────────────────────

/// Fetch each line's accepted soundings and concatenate them.
///
/// Returns `Ok(None)` when the lines yield no soundings at all.
///
/// # Errors
///
/// Source failures (with the failing line in the context) and sources
/// returning arrays of unequal length.
pub fn collect_points<S>(lines: &LinePair, source: &S) -> Result<Option<CollectedPoints>>
where
    S: SoundingSource + ?Sized,
{
    let mut buffer = PointBuffer::new();
    for line in lines.as_array() {
        let subset = source
            .subset(line, true)
            .with_context(|| format!("failed to fetch soundings of line {:?}", line))?;
        ensure!(
            subset.is_consistent(),
            "line {:?}: coordinate arrays differ in length (x {}, y {}, z {})",
            line,
            subset.x.len(),
            subset.y.len(),
            subset.z.len()
        );
        let range = buffer.push_line(line, subset.soundings())?;
        log::debug!("line {:?}: {} soundings at {:?}", line, range.len(), range);
    }

    if buffer.is_empty() {
        return Ok(None);
    }
    Ok(Some(CollectedPoints {
        lines: lines.clone(),
        buffer,
    }))
}

/// Rotate all soundings about their minimum corner so that a line of
/// `azimuth` degrees (clockwise from north) runs along +x.
///
/// Returns `None` for an empty buffer, which [`collect_points`] never produces.
pub fn rotate(collected: &CollectedPoints, azimuth: Real) -> Option<RotatedPoints> {
    let mut buffer = collected.buffer.clone();
    let pivot = RotationPivot::from_points(buffer.points())?;
    let angle = rotate_points(buffer.points_mut(), &pivot, azimuth);
    log::debug!(
        "rotated {} soundings by {:.6} rad about ({:.3}, {:.3})",
        buffer.len(),
        angle,
        pivot.min_x,
        pivot.min_y
    );
    Some(RotatedPoints {
        lines: collected.lines.clone(),
        buffer,
        pivot,
        angle,
    })
}

/// Grid the rotated soundings through `engine`.
///
/// Each line's points are added separately, tagged with the line identifier,
/// so the engine produces one depth layer per line next to the combined
/// depth and slope layers.
pub fn grid_surface<E>(rotated: &RotatedPoints, engine: &E) -> Result<GriddedSurface>
where
    E: GridEngine + ?Sized,
{
    let mut grid = engine
        .create(GridKind::SingleResolution)
        .context("failed to create grid")?;
    for line in rotated.lines.as_array() {
        let points = rotated.buffer.line_points(line).unwrap_or(&[]);
        let tags = [line.to_string()];
        grid.add_points(points, line, &tags)
            .with_context(|| format!("failed to add points of line {:?}", line))?;
    }
    grid.build().context("failed to build grid")?;

    let [first, second] = rotated.lines.as_array();
    let names = [DEPTH_LAYER, X_SLOPE_LAYER, Y_SLOPE_LAYER, first, second];
    let layers = grid.get_layers(&names).context("failed to read grid layers")?;
    let (nx, ny) = layers.extent.shape();
    log::debug!("gridded surface: {}x{} cells, {} layers", nx, ny, layers.layers.len());

    Ok(GriddedSurface {
        lines: rotated.lines.clone(),
        layers,
    })
}

/// Assemble the design and observation matrices over the overlap.
pub fn design(surface: &GriddedSurface) -> Result<DesignSystem, DesignError> {
    let [first, second] = surface.lines.as_array();
    build_design_system(&surface.layers, first, second)
}

/// Form and solve the normal equations, with an optional a-priori prior.
pub fn solve(
    system: &DesignSystem,
    prior: Option<&ParameterPrior>,
    opts: &SolveOptions,
) -> Result<SolvedSystem, SolveError> {
    let mut normal = NormalEquations::from_design(system)?;
    if let Some(prior) = prior {
        normal = normal.with_prior(prior);
    }
    let solution = solve_normal_equations(&normal, opts)?;
    let residual_ss = residual_sum_of_squares(system, &solution.result);
    Ok(SolvedSystem {
        normal,
        solution,
        residual_ss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemorySource;
    use patch_core::Sounding;

    fn line(x0: Real, n: usize) -> Vec<Sounding> {
        (0..n)
            .map(|k| Sounding::new(x0 + k as Real, 10.0 + k as Real, 20.0 + k as f32))
            .collect()
    }

    #[test]
    fn line_pair_rejects_duplicates() {
        assert_eq!(
            LinePair::new("a", "a").unwrap_err(),
            ConfigError::DuplicateLine("a".to_string())
        );
        let pair = LinePair::new("a", "b").unwrap();
        assert_eq!(pair.to_string(), "[a, b]");
    }

    #[test]
    fn collect_partitions_by_line() {
        let source = InMemorySource::new()
            .with_line("a", line(0.0, 4))
            .with_line("b", line(100.0, 3));
        let pair = LinePair::new("a", "b").unwrap();
        let collected = collect_points(&pair, &source).unwrap().unwrap();

        assert_eq!(collected.buffer.len(), 7);
        assert_eq!(collected.buffer.line_range("a"), Some(0..4));
        assert_eq!(collected.buffer.line_range("b"), Some(4..7));
        assert_eq!(collected.buffer.line_points("b").unwrap()[0].x, 100.0);
    }

    #[test]
    fn collect_skips_rejected_soundings() {
        let mut source = InMemorySource::new()
            .with_line("a", line(0.0, 4))
            .with_line("b", line(100.0, 3));
        source.reject("a", 1);
        source.reject("a", 2);
        let pair = LinePair::new("a", "b").unwrap();
        let collected = collect_points(&pair, &source).unwrap().unwrap();
        assert_eq!(collected.buffer.line_range("a"), Some(0..2));
        assert_eq!(collected.buffer.line_points("a").unwrap()[1].x, 3.0);
    }

    #[test]
    fn collect_without_points_is_none() {
        let source = InMemorySource::new()
            .with_line("a", Vec::new())
            .with_line("b", Vec::new());
        let pair = LinePair::new("a", "b").unwrap();
        assert!(collect_points(&pair, &source).unwrap().is_none());
    }

    #[test]
    fn collect_reports_failing_line() {
        let source = InMemorySource::new().with_line("a", line(0.0, 2));
        let pair = LinePair::new("a", "missing").unwrap();
        let err = collect_points(&pair, &source).unwrap_err();
        assert!(format!("{:#}", err).contains("\"missing\""));
    }

    struct Ragged;

    impl SoundingSource for Ragged {
        fn subset(&self, _line: &str, _filter_rejected: bool) -> Result<crate::LineSoundings> {
            Ok(crate::LineSoundings {
                x: vec![0.0, 1.0],
                y: vec![0.0],
                z: vec![1.0, 2.0],
            })
        }
    }

    #[test]
    fn collect_rejects_ragged_arrays() {
        let pair = LinePair::new("a", "b").unwrap();
        let err = collect_points(&pair, &Ragged).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("\"a\""), "{}", msg);
        assert!(msg.contains("y 1"), "{}", msg);
    }

    #[test]
    fn rotate_keeps_input_record() {
        let source = InMemorySource::new()
            .with_line("a", line(5.0, 3))
            .with_line("b", line(8.0, 3));
        let pair = LinePair::new("a", "b").unwrap();
        let collected = collect_points(&pair, &source).unwrap().unwrap();
        let rotated = rotate(&collected, 0.0).unwrap();

        assert_eq!(
            rotated.pivot,
            RotationPivot {
                min_x: 5.0,
                min_y: 10.0
            }
        );
        assert!((rotated.angle + std::f64::consts::FRAC_PI_2).abs() < 1e-15);
        assert_eq!(collected.buffer.points()[0].x, 5.0);
        assert_eq!(rotated.buffer.line_range("b"), collected.buffer.line_range("b"));
        for (r, c) in rotated.buffer.points().iter().zip(collected.buffer.points()) {
            assert_eq!(r.z, c.z);
        }
    }
}
