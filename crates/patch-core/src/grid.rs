//! Gridded surface data exchanged with the gridding engine.
//!
//! A grid is a regular raster over the rotated points' bounding box with a
//! single resolution. Every layer is a `DMatrix` whose row index `i` walks
//! along x and whose column index `j` walks along y; missing cells are NaN.
//! Cell `(i, j)` is centered at
//! `(min_x + i·res + res/2, min_y + j·res + res/2)`.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{Pt2, Real};

/// Name of the combined depth layer.
pub const DEPTH_LAYER: &str = "depth";
/// Name of the combined surface's partial derivative along x.
pub const X_SLOPE_LAYER: &str = "x_slope";
/// Name of the combined surface's partial derivative along y.
pub const Y_SLOPE_LAYER: &str = "y_slope";

/// Bounding box and resolution of a single-resolution grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridExtent {
    pub min_x: Real,
    pub min_y: Real,
    pub max_x: Real,
    pub max_y: Real,
    /// Cell size.
    pub resolution: Real,
}

impl GridExtent {
    /// Number of cells along x: the length of `[min_x, max_x)` stepped by resolution.
    pub fn cells_x(&self) -> usize {
        Self::steps(self.min_x, self.max_x, self.resolution)
    }

    /// Number of cells along y: the length of `[min_y, max_y)` stepped by resolution.
    pub fn cells_y(&self) -> usize {
        Self::steps(self.min_y, self.max_y, self.resolution)
    }

    /// `(cells_x, cells_y)`, matching `(nrows, ncols)` of every layer.
    pub fn shape(&self) -> (usize, usize) {
        (self.cells_x(), self.cells_y())
    }

    /// Center of cell `(i, j)`.
    pub fn node_center(&self, i: usize, j: usize) -> Pt2 {
        let half = self.resolution / 2.0;
        Pt2::new(
            self.min_x + i as Real * self.resolution + half,
            self.min_y + j as Real * self.resolution + half,
        )
    }

    /// Node-center coordinate mesh.
    ///
    /// Returns `(node_x, node_y)`, both shaped [`Self::shape`].
    pub fn node_mesh(&self) -> (DMatrix<Real>, DMatrix<Real>) {
        let (nx, ny) = self.shape();
        let node_x = DMatrix::from_fn(nx, ny, |i, j| self.node_center(i, j).x);
        (node_x, self.node_y_mesh())
    }

    /// Node-center y coordinates, shaped [`Self::shape`].
    ///
    /// Allocates `cells_x · cells_y` values; callers check the shape first.
    pub fn node_y_mesh(&self) -> DMatrix<Real> {
        let (nx, ny) = self.shape();
        DMatrix::from_fn(nx, ny, |i, j| self.node_center(i, j).y)
    }

    fn steps(min: Real, max: Real, res: Real) -> usize {
        if !(res > 0.0) || !(max > min) {
            return 0;
        }
        // tolerate round-off when the span is an exact multiple of res
        let n = (max - min) / res;
        (n - 1e-9).ceil().max(0.0) as usize
    }
}

/// A named 2D layer of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLayer {
    pub name: String,
    pub values: DMatrix<Real>,
}

/// Layers returned by the gridding engine together with the grid metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLayers {
    pub extent: GridExtent,
    pub layers: Vec<NamedLayer>,
}

impl GridLayers {
    pub fn new(extent: GridExtent) -> Self {
        Self {
            extent,
            layers: Vec::new(),
        }
    }

    /// Builder-style insertion; a layer of the same name is replaced.
    pub fn with_layer(mut self, name: impl Into<String>, values: DMatrix<Real>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: DMatrix<Real>) {
        let name = name.into();
        if let Some(existing) = self.layers.iter_mut().find(|l| l.name == name) {
            existing.values = values;
        } else {
            self.layers.push(NamedLayer { name, values });
        }
    }

    pub fn layer(&self, name: &str) -> Option<&DMatrix<Real>> {
        self.layers
            .iter()
            .find(|l| l.name == name)
            .map(|l| &l.values)
    }
}
