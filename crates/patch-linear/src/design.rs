//! Design and observation matrices from a gridded overlap surface.
//!
//! Only grid nodes where both lines have a depth take part. For each such
//! node, with combined depth `d`, slopes `sx = ∂d/∂x`, `sy = ∂d/∂y` and node
//! coordinate `y`, the design row holds the linearized partial derivatives
//! of depth with respect to the six parameters:
//!
//! ```text
//! | sy·d − y | sx·d | sx·y | sx | sy | sy·y |
//!   roll       pitch  head   x    y    scale
//! ```
//!
//! The observation row holds `[line_one_depth, line_two_depth]`. Rows follow
//! the column-major flattening of the overlap mask.

use nalgebra::DMatrix;
use patch_core::{GridLayers, Real, DEPTH_LAYER, X_SLOPE_LAYER, Y_SLOPE_LAYER};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of patch-test parameters (design matrix columns).
pub const NUM_PARAMS: usize = 6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DesignError {
    #[error("grid is missing layer {0:?}")]
    MissingLayer(String),
    #[error("layer {name:?} has shape {found:?}, expected {expected:?}")]
    LayerShapeMismatch {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("node mesh has shape {mesh:?} but layers have shape {layers:?}")]
    MeshShapeMismatch {
        mesh: (usize, usize),
        layers: (usize, usize),
    },
    #[error("no grid node has depth for both {line_one:?} and {line_two:?}")]
    NoOverlap { line_one: String, line_two: String },
    #[error("{count} overlapping nodes have non-finite depth or slope")]
    NonFiniteSurface { count: usize },
}

/// Borrowed views of the five layers the design needs.
#[derive(Debug, Clone, Copy)]
pub struct OverlapLayers<'a> {
    pub depth: &'a DMatrix<Real>,
    pub x_slope: &'a DMatrix<Real>,
    pub y_slope: &'a DMatrix<Real>,
    pub line_one: &'a DMatrix<Real>,
    pub line_two: &'a DMatrix<Real>,
}

impl<'a> OverlapLayers<'a> {
    /// Look up the combined layers and the two per-line depth layers.
    ///
    /// # Errors
    ///
    /// - [`DesignError::MissingLayer`] if any layer is absent
    /// - [`DesignError::LayerShapeMismatch`] if the layers differ in shape
    pub fn from_grid(
        grid: &'a GridLayers,
        line_one: &str,
        line_two: &str,
    ) -> Result<Self, DesignError> {
        let get = move |name: &str| {
            grid.layer(name)
                .ok_or_else(|| DesignError::MissingLayer(name.to_string()))
        };
        let layers = Self {
            depth: get(DEPTH_LAYER)?,
            x_slope: get(X_SLOPE_LAYER)?,
            y_slope: get(Y_SLOPE_LAYER)?,
            line_one: get(line_one)?,
            line_two: get(line_two)?,
        };

        let expected = layers.depth.shape();
        for (name, m) in [
            (X_SLOPE_LAYER, layers.x_slope),
            (Y_SLOPE_LAYER, layers.y_slope),
            (line_one, layers.line_one),
            (line_two, layers.line_two),
        ] {
            if m.shape() != expected {
                return Err(DesignError::LayerShapeMismatch {
                    name: name.to_string(),
                    expected,
                    found: m.shape(),
                });
            }
        }
        Ok(layers)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.depth.shape()
    }
}

/// True where both per-line depth layers are present (not NaN).
pub fn overlap_mask(line_one: &DMatrix<Real>, line_two: &DMatrix<Real>) -> DMatrix<bool> {
    line_one.zip_map(line_two, |a, b| !a.is_nan() && !b.is_nan())
}

/// Least-squares system restricted to the overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSystem {
    /// `n × 6` design matrix.
    pub a: DMatrix<Real>,
    /// `n × 2` observation matrix.
    pub l: DMatrix<Real>,
    /// Overlap mask over the grid; `n` equals its number of `true` entries.
    pub mask: DMatrix<bool>,
}

impl DesignSystem {
    /// Number of overlap rows.
    pub fn rows(&self) -> usize {
        self.a.nrows()
    }
}

/// Assemble the design system from named grid layers.
///
/// # Errors
///
/// Layer lookup/shape errors from [`OverlapLayers::from_grid`],
/// [`DesignError::MeshShapeMismatch`] when the grid metadata does not describe
/// the layers, [`DesignError::NoOverlap`] when no node is shared by both lines,
/// and [`DesignError::NonFiniteSurface`] when shared nodes lack depth or slope.
pub fn build_design_system(
    grid: &GridLayers,
    line_one: &str,
    line_two: &str,
) -> Result<DesignSystem, DesignError> {
    let layers = OverlapLayers::from_grid(grid, line_one, line_two)?;

    let mask = overlap_mask(layers.line_one, layers.line_two);
    let n = mask.iter().filter(|&&v| v).count();
    if n == 0 {
        return Err(DesignError::NoOverlap {
            line_one: line_one.to_string(),
            line_two: line_two.to_string(),
        });
    }

    let mesh = grid.extent.shape();
    if mesh != layers.shape() {
        return Err(DesignError::MeshShapeMismatch {
            mesh,
            layers: layers.shape(),
        });
    }
    let node_y = grid.extent.node_y_mesh();

    let select = |m: &DMatrix<Real>| -> Vec<Real> {
        m.iter()
            .zip(mask.iter())
            .filter_map(|(&v, &keep)| keep.then_some(v))
            .collect()
    };
    let depth = select(layers.depth);
    let x_slope = select(layers.x_slope);
    let y_slope = select(layers.y_slope);
    let y_node = select(&node_y);
    let one = select(layers.line_one);
    let two = select(layers.line_two);

    let non_finite = (0..n)
        .filter(|&k| !(depth[k].is_finite() && x_slope[k].is_finite() && y_slope[k].is_finite()))
        .count();
    if non_finite > 0 {
        return Err(DesignError::NonFiniteSurface { count: non_finite });
    }

    let mut a = DMatrix::<Real>::zeros(n, NUM_PARAMS);
    let mut l = DMatrix::<Real>::zeros(n, 2);
    for k in 0..n {
        let (d, sx, sy, y) = (depth[k], x_slope[k], y_slope[k], y_node[k]);
        a[(k, 0)] = sy * d - y;
        a[(k, 1)] = sx * d;
        a[(k, 2)] = sx * y;
        a[(k, 3)] = sx;
        a[(k, 4)] = sy;
        a[(k, 5)] = sy * y;

        l[(k, 0)] = one[k];
        l[(k, 1)] = two[k];
    }

    log::debug!(
        "design system: {} overlap nodes of {}x{} grid",
        n,
        layers.shape().0,
        layers.shape().1
    );

    Ok(DesignSystem { a, l, mask })
}
