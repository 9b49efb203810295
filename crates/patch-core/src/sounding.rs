//! Soundings and the concatenated point buffer.
//!
//! Points from both survey lines live in one [`PointBuffer`]. Line membership
//! is recovered only through the half-open index ranges recorded in
//! [`LineIndex`], so the buffer is append-only and keeps insertion order.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Pt2, Real};

/// A single georeferenced sounding.
///
/// `x`/`y` are easting/northing (or local model coordinates after rotation),
/// `z` is depth, positive down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sounding {
    pub x: Real,
    pub y: Real,
    pub z: f32,
}

impl Sounding {
    pub fn new(x: Real, y: Real, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal position of the sounding.
    #[inline]
    pub fn position(&self) -> Pt2 {
        Pt2::new(self.x, self.y)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointBufferError {
    #[error("line {0:?} was already added to the point buffer")]
    DuplicateLine(String),
}

/// Ordered mapping from line identifier to its half-open range in the buffer.
///
/// Ranges partition `[0, len)` without gaps or overlaps, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    entries: Vec<(String, Range<usize>)>,
}

impl LineIndex {
    /// Range for `line`, if it was added.
    pub fn range(&self, line: &str) -> Option<Range<usize>> {
        self.entries
            .iter()
            .find(|(name, _)| name == line)
            .map(|(_, r)| r.clone())
    }

    /// `(line, range)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Range<usize>)> + '_ {
        self.entries.iter().map(|(name, r)| (name.as_str(), r.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last range, i.e. the number of indexed points.
    pub fn end(&self) -> usize {
        self.entries.last().map_or(0, |(_, r)| r.end)
    }
}

/// Soundings of several lines concatenated in line order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointBuffer {
    points: Vec<Sounding>,
    index: LineIndex,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the soundings of one line and record its range.
    ///
    /// The range start is the running total of all previously added points,
    /// so any number of lines stays correctly partitioned.
    ///
    /// # Errors
    ///
    /// Returns [`PointBufferError::DuplicateLine`] if `line` is already present.
    pub fn push_line(
        &mut self,
        line: impl Into<String>,
        soundings: impl IntoIterator<Item = Sounding>,
    ) -> Result<Range<usize>, PointBufferError> {
        let line = line.into();
        if self.index.range(&line).is_some() {
            return Err(PointBufferError::DuplicateLine(line));
        }
        let start = self.points.len();
        self.points.extend(soundings);
        let range = start..self.points.len();
        self.index.entries.push((line, range.clone()));
        Ok(range)
    }

    pub fn points(&self) -> &[Sounding] {
        &self.points
    }

    /// Mutable access to the soundings; ranges are unaffected since the
    /// number of points cannot change through a slice.
    pub fn points_mut(&mut self) -> &mut [Sounding] {
        &mut self.points
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn line_range(&self, line: &str) -> Option<Range<usize>> {
        self.index.range(line)
    }

    /// Soundings belonging to `line`.
    pub fn line_points(&self, line: &str) -> Option<&[Sounding]> {
        self.index.range(line).map(|r| &self.points[r])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
