//! Patch-test calibration pipeline.
//!
//! Estimates roll, pitch and heading misalignment, horizontal translation
//! and horizontal scale of a multibeam installation from two overlapping
//! survey lines:
//!
//! 1. collect the accepted soundings of both lines ([`SoundingSource`]),
//! 2. rotate them so the reference line runs along +x,
//! 3. grid them through an injected [`GridEngine`],
//! 4. build the linearized design system over the overlap,
//! 5. solve the normal equations and report the result.
//!
//! # Example
//!
//! ```ignore
//! use patch_pipeline::{LinePair, PatchTest, PatchTestConfig, RunStatus};
//!
//! let mut pt = PatchTest::new(PatchTestConfig::new(271.5))?;
//! let lines = LinePair::new("0003_20230612", "0004_20230612")?;
//! if pt.run(&lines, &source, &engine)? == RunStatus::Solved {
//!     println!("{}", pt.report());
//! }
//! ```

mod config;
mod gridding;
mod report;
mod source;
pub mod stages;
/// In-memory collaborators for tests.
///
/// This module is public to allow usage in integration tests across
/// the workspace, but is not intended for production use.
pub mod test_utils;

pub use config::*;
pub use gridding::*;
pub use patch_test::*;
pub use report::*;
pub use source::*;
pub use stages::{CollectedPoints, GriddedSurface, LinePair, RotatedPoints, SolvedSystem};
