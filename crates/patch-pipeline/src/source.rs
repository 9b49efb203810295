//! Upstream sounding source.

use anyhow::Result;
use patch_core::{Real, Sounding};
use serde::{Deserialize, Serialize};

/// Per-line sounding arrays as returned by a [`SoundingSource`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineSoundings {
    pub x: Vec<Real>,
    pub y: Vec<Real>,
    pub z: Vec<f32>,
}

impl LineSoundings {
    pub fn from_soundings(soundings: &[Sounding]) -> Self {
        Self {
            x: soundings.iter().map(|s| s.x).collect(),
            y: soundings.iter().map(|s| s.y).collect(),
            z: soundings.iter().map(|s| s.z).collect(),
        }
    }

    /// True when the three arrays have equal length.
    pub fn is_consistent(&self) -> bool {
        self.x.len() == self.y.len() && self.x.len() == self.z.len()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Zip the arrays into soundings. The caller checks [`Self::is_consistent`].
    pub fn soundings(&self) -> impl Iterator<Item = Sounding> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| Sounding::new(x, y, z))
    }
}

/// Provides the (x, y, z) soundings of a survey line.
///
/// Implementations must return equal-length arrays, or empty arrays when the
/// line has no accepted soundings.
pub trait SoundingSource {
    /// Soundings of `line`; with `filter_rejected` set, rejected soundings
    /// are left out.
    fn subset(&self, line: &str, filter_rejected: bool) -> Result<LineSoundings>;
}

impl<T: SoundingSource + ?Sized> SoundingSource for &T {
    fn subset(&self, line: &str, filter_rejected: bool) -> Result<LineSoundings> {
        (**self).subset(line, filter_rejected)
    }
}
