//! In-memory collaborators for tests.
//!
//! This module is public to allow use in integration tests across the
//! workspace, but is not intended for production use.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use nalgebra::DMatrix;
use patch_core::{
    GridExtent, GridLayers, Pt2, Real, Sounding, DEPTH_LAYER, X_SLOPE_LAYER, Y_SLOPE_LAYER,
};

use crate::gridding::{GridBuilder, GridEngine, GridKind};
use crate::source::{LineSoundings, SoundingSource};

/// A [`SoundingSource`] over soundings held in memory, with per-sounding
/// rejected flags.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    lines: BTreeMap<String, Vec<(Sounding, bool)>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, line: impl Into<String>, soundings: Vec<Sounding>) -> Self {
        self.insert_line(line, soundings);
        self
    }

    pub fn insert_line(&mut self, line: impl Into<String>, soundings: Vec<Sounding>) {
        let entries = soundings.into_iter().map(|s| (s, false)).collect();
        self.lines.insert(line.into(), entries);
    }

    /// Flag sounding `index` of `line` as rejected. Unknown indices are ignored.
    pub fn reject(&mut self, line: &str, index: usize) {
        if let Some(entry) = self.lines.get_mut(line).and_then(|v| v.get_mut(index)) {
            entry.1 = true;
        }
    }

    /// Flag every sounding of `line` as rejected.
    pub fn reject_all(&mut self, line: &str) {
        if let Some(entries) = self.lines.get_mut(line) {
            entries.iter_mut().for_each(|e| e.1 = true);
        }
    }
}

impl SoundingSource for InMemorySource {
    fn subset(&self, line: &str, filter_rejected: bool) -> Result<LineSoundings> {
        let Some(entries) = self.lines.get(line) else {
            bail!("unknown line {:?}", line);
        };
        let kept: Vec<Sounding> = entries
            .iter()
            .filter(|(_, rejected)| !(filter_rejected && *rejected))
            .map(|(s, _)| *s)
            .collect();
        Ok(LineSoundings::from_soundings(&kept))
    }
}

/// Depth and slopes of the combined surface at one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub depth: Real,
    pub x_slope: Real,
    pub y_slope: Real,
}

type SurfaceFn = Arc<dyn Fn(Pt2) -> SurfaceSample + Send + Sync>;

/// A deterministic [`GridEngine`].
///
/// Points are binned into square cells aligned to multiples of the
/// resolution. Each line's depth layer holds the mean depth of that line's
/// points per cell. The combined `depth`, `x_slope` and `y_slope` layers are
/// evaluated from the surface closure at the center of every cell occupied
/// by any line. Empty cells are NaN everywhere.
#[derive(Clone)]
pub struct SyntheticGridEngine {
    resolution: Real,
    surface: SurfaceFn,
}

impl SyntheticGridEngine {
    pub fn new<F>(resolution: Real, surface: F) -> Self
    where
        F: Fn(Pt2) -> SurfaceSample + Send + Sync + 'static,
    {
        Self {
            resolution,
            surface: Arc::new(surface),
        }
    }
}

impl std::fmt::Debug for SyntheticGridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticGridEngine")
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl GridEngine for SyntheticGridEngine {
    type Grid = SyntheticGrid;

    fn create(&self, kind: GridKind) -> Result<SyntheticGrid> {
        match kind {
            GridKind::SingleResolution => {}
        }
        if !(self.resolution > 0.0) {
            bail!("grid resolution must be positive, got {}", self.resolution);
        }
        Ok(SyntheticGrid {
            resolution: self.resolution,
            surface: Arc::clone(&self.surface),
            lines: Vec::new(),
            layers: None,
        })
    }
}

/// Grid produced by [`SyntheticGridEngine`].
pub struct SyntheticGrid {
    resolution: Real,
    surface: SurfaceFn,
    lines: Vec<(String, Vec<Sounding>)>,
    layers: Option<GridLayers>,
}

impl SyntheticGrid {
    fn extent(&self) -> Option<GridExtent> {
        let res = self.resolution;
        let mut points = self.lines.iter().flat_map(|(_, p)| p.iter());
        let first = points.next()?;
        let init = (first.x, first.y, first.x, first.y);
        let (min_x, min_y, max_x, max_y) = points.fold(init, |(a, b, c, d), p| {
            (a.min(p.x), b.min(p.y), c.max(p.x), d.max(p.y))
        });
        Some(GridExtent {
            min_x: (min_x / res).floor() * res,
            min_y: (min_y / res).floor() * res,
            max_x: (max_x / res).floor() * res + res,
            max_y: (max_y / res).floor() * res + res,
            resolution: res,
        })
    }

    fn cell(extent: &GridExtent, p: &Sounding) -> (usize, usize) {
        let (nx, ny) = extent.shape();
        let i = ((p.x - extent.min_x) / extent.resolution).floor().max(0.0) as usize;
        let j = ((p.y - extent.min_y) / extent.resolution).floor().max(0.0) as usize;
        (i.min(nx - 1), j.min(ny - 1))
    }
}

impl GridBuilder for SyntheticGrid {
    fn add_points(&mut self, points: &[Sounding], line: &str, _tags: &[String]) -> Result<()> {
        match self.lines.iter_mut().find(|(name, _)| name == line) {
            Some((_, existing)) => existing.extend_from_slice(points),
            None => self.lines.push((line.to_string(), points.to_vec())),
        }
        self.layers = None;
        Ok(())
    }

    fn build(&mut self) -> Result<()> {
        let Some(extent) = self.extent() else {
            bail!("cannot build a grid without points");
        };
        let (nx, ny) = extent.shape();
        let mut occupied = DMatrix::from_element(nx, ny, false);
        let mut layers = GridLayers::new(extent);

        for (line, points) in &self.lines {
            let mut sum = DMatrix::<Real>::zeros(nx, ny);
            let mut count = DMatrix::<usize>::zeros(nx, ny);
            for p in points {
                let c = Self::cell(&extent, p);
                sum[c] += p.z as Real;
                count[c] += 1;
                occupied[c] = true;
            }
            let mean = sum.zip_map(&count, |s, n| if n > 0 { s / n as Real } else { Real::NAN });
            layers.insert(line.as_str(), mean);
        }

        let samples = DMatrix::from_fn(nx, ny, |i, j| {
            occupied[(i, j)].then(|| (self.surface)(extent.node_center(i, j)))
        });
        let pick = |f: fn(&SurfaceSample) -> Real| {
            samples.map(|s| s.as_ref().map_or(Real::NAN, f))
        };
        layers.insert(DEPTH_LAYER, pick(|s| s.depth));
        layers.insert(X_SLOPE_LAYER, pick(|s| s.x_slope));
        layers.insert(Y_SLOPE_LAYER, pick(|s| s.y_slope));

        self.layers = Some(layers);
        Ok(())
    }

    fn get_layers(&self, names: &[&str]) -> Result<GridLayers> {
        let Some(built) = &self.layers else {
            bail!("grid has not been built");
        };
        let mut out = GridLayers::new(built.extent);
        for &name in names {
            match built.layer(name) {
                Some(values) => out.insert(name, values.clone()),
                None => bail!("grid has no layer {:?}", name),
            }
        }
        Ok(out)
    }
}
