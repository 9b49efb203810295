//! Result reporting.

use patch_core::{PatchParameter, Real};
use serde::{Deserialize, Serialize};

use crate::patch_test::Diagnostic;
use crate::stages::{LinePair, SolvedSystem};

/// One named parameter row: `[line one, line two]` solutions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    pub parameter: PatchParameter,
    pub values: [Real; 2],
}

/// Presentation of a patch-test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchTestReport {
    /// Line pair of the most recent run, if any.
    pub lines: Option<LinePair>,
    /// Six rows in parameter order; `None` when there is no result.
    pub parameters: Option<Vec<ParameterRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_ss: Option<[Real; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl PatchTestReport {
    pub fn new(
        lines: Option<&LinePair>,
        solved: Option<&SolvedSystem>,
        diagnostics: &[Diagnostic],
    ) -> Self {
        let parameters = solved.map(|s| {
            s.solution
                .result
                .rows()
                .map(|(parameter, values)| ParameterRow { parameter, values })
                .collect()
        });
        Self {
            lines: lines.cloned(),
            parameters,
            rank: solved.map(|s| s.solution.rank),
            residual_ss: solved.map(|s| s.residual_ss),
            diagnostics: diagnostics.to_vec(),
        }
    }

    pub fn has_result(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for PatchTestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Patch test results")?;
        if let Some(lines) = &self.lines {
            writeln!(f, "Lines: {}", lines)?;
        }
        match &self.parameters {
            Some(rows) => {
                for row in rows {
                    writeln!(
                        f,
                        "{}: [{}, {}]",
                        row.parameter, row.values[0], row.values[1]
                    )?;
                }
            }
            None => writeln!(f, "no result")?,
        }
        for d in &self.diagnostics {
            writeln!(f, "warning: {}", d)?;
        }
        Ok(())
    }
}
