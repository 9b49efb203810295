//! Patch-test parameters and the calibration result.

use serde::{Deserialize, Serialize};

use crate::{Mat6x2, Real, Vec6};

/// The six patch-test parameters, in design-matrix column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchParameter {
    Roll,
    Pitch,
    Heading,
    XTranslation,
    YTranslation,
    HorizontalScale,
}

impl PatchParameter {
    /// All parameters, in row/column order.
    pub const ALL: [PatchParameter; 6] = [
        PatchParameter::Roll,
        PatchParameter::Pitch,
        PatchParameter::Heading,
        PatchParameter::XTranslation,
        PatchParameter::YTranslation,
        PatchParameter::HorizontalScale,
    ];

    /// Row index in [`CalibrationResult`] and column index in the design matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable label used by the result report.
    pub fn label(self) -> &'static str {
        match self {
            PatchParameter::Roll => "roll",
            PatchParameter::Pitch => "pitch",
            PatchParameter::Heading => "heading",
            PatchParameter::XTranslation => "x_translation",
            PatchParameter::YTranslation => "y_translation",
            PatchParameter::HorizontalScale => "horizontal scale factor",
        }
    }
}

impl std::fmt::Display for PatchParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Solved patch-test parameters.
///
/// Rows follow [`PatchParameter::ALL`]; column 0 is the solution driven by
/// line one's depths, column 1 by line two's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub values: Mat6x2,
}

impl CalibrationResult {
    pub fn new(values: Mat6x2) -> Self {
        Self { values }
    }

    /// Both line solutions for one parameter.
    pub fn parameter(&self, param: PatchParameter) -> [Real; 2] {
        let r = param.index();
        [self.values[(r, 0)], self.values[(r, 1)]]
    }

    /// Full parameter vector for line `0` or `1`.
    ///
    /// # Panics
    ///
    /// Panics if `line` is not 0 or 1.
    pub fn line_solution(&self, line: usize) -> Vec6 {
        self.values.column(line).into_owned()
    }

    /// `(parameter, [line one, line two])` rows in order.
    pub fn rows(&self) -> impl Iterator<Item = (PatchParameter, [Real; 2])> + '_ {
        PatchParameter::ALL
            .iter()
            .map(move |&p| (p, self.parameter(p)))
    }
}
