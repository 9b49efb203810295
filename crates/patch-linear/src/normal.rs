//! Normal equations and their least-squares solve.
//!
//! Forms `N = AᵗA` and `U = AᵗL` from a [`DesignSystem`], optionally adds an
//! a-priori diagonal weight `P` (`N + P`, `U + P·x₀`), and solves `N·X = U`
//! through an SVD so that rank-deficient systems still yield the
//! minimum-norm solution instead of failing.
//!
//! The design columns mix metres, metres² and unitless slopes, so `N` is
//! Jacobi-equilibrated (`D·N·D`, `D = diag(1/√N_kk)`) before the SVD; rank and
//! singular values refer to the equilibrated matrix.

use nalgebra::DMatrix;
use patch_core::{CalibrationResult, Mat6, Mat6x2, Real, Vec6};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DesignSystem, NUM_PARAMS};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("design matrix has {0} columns, expected 6")]
    BadDesignColumns(usize),
    #[error("observation matrix has shape {found:?}, expected ({rows}, 2)")]
    BadObservationShape { rows: usize, found: (usize, usize) },
    #[error("normal equations contain non-finite values")]
    NonFinite,
    #[error("svd failed: {0}")]
    SvdFailed(&'static str),
}

/// Options for the least-squares solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Relative singular-value cutoff. Singular values below
    /// `rcond · σ_max` are treated as zero. Defaults to [`DEFAULT_RCOND`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcond: Option<Real>,
}

/// Default relative singular-value cutoff. `N` squares the condition number
/// of `A`, so round-off sits far above machine epsilon.
pub const DEFAULT_RCOND: Real = 1e-12;

impl SolveOptions {
    pub fn rcond_or_default(&self) -> Real {
        self.rcond.unwrap_or(DEFAULT_RCOND)
    }
}

/// A-priori information on the parameters: diagonal weights `1/σ²` and the
/// initial values they pull towards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterPrior {
    pub weights: Vec6,
    pub initial: Vec6,
}

impl ParameterPrior {
    /// Prior from standard deviations; every `sigma` entry must be positive.
    pub fn from_sigmas(sigmas: &Vec6, initial: Vec6) -> Self {
        Self {
            weights: sigmas.map(|s| 1.0 / (s * s)),
            initial,
        }
    }
}

/// `AᵗA` and `AᵗL` of the patch-test system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalEquations {
    pub ata: Mat6,
    pub atl: Mat6x2,
}

impl NormalEquations {
    /// Form the normal equations of a design system.
    pub fn from_design(system: &DesignSystem) -> Result<Self, SolveError> {
        Self::from_matrices(&system.a, &system.l)
    }

    /// Form `AᵗA` (6×6) and `AᵗL` (6×2).
    pub fn from_matrices(a: &DMatrix<Real>, l: &DMatrix<Real>) -> Result<Self, SolveError> {
        if a.ncols() != NUM_PARAMS {
            return Err(SolveError::BadDesignColumns(a.ncols()));
        }
        if l.shape() != (a.nrows(), 2) {
            return Err(SolveError::BadObservationShape {
                rows: a.nrows(),
                found: l.shape(),
            });
        }

        let at = a.transpose();
        let ata = &at * a;
        let atl = &at * l;
        Ok(Self {
            ata: Mat6::from_iterator(ata.iter().copied()),
            atl: Mat6x2::from_iterator(atl.iter().copied()),
        })
    }

    /// Add a diagonal a-priori weight: `N + P`, `U + P·x₀` (per column).
    pub fn with_prior(mut self, prior: &ParameterPrior) -> Self {
        for k in 0..NUM_PARAMS {
            let w = prior.weights[k];
            self.ata[(k, k)] += w;
            for c in 0..2 {
                self.atl[(k, c)] += w * prior.initial[k];
            }
        }
        self
    }
}

/// Outcome of the normal-equation solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeastSquaresSolution {
    pub result: CalibrationResult,
    /// Numerical rank of the normal matrix.
    pub rank: usize,
    /// Singular values of the equilibrated normal matrix, in decreasing order.
    pub singular_values: Vec6,
}

impl LeastSquaresSolution {
    /// True when the normal matrix lacks full rank; the result is then
    /// the minimum-norm solution and should be treated as unreliable.
    pub fn is_rank_deficient(&self) -> bool {
        self.rank < NUM_PARAMS
    }
}

/// Solve `N·X = U` for the 6×2 calibration result.
pub fn solve_normal_equations(
    ne: &NormalEquations,
    opts: &SolveOptions,
) -> Result<LeastSquaresSolution, SolveError> {
    if ne.ata.iter().chain(ne.atl.iter()).any(|v| !v.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let scale = ne
        .ata
        .diagonal()
        .map(|v| if v > 0.0 { 1.0 / v.sqrt() } else { 1.0 });
    let d = Mat6::from_diagonal(&scale);
    let n_eq = d * ne.ata * d;
    let u_eq = d * ne.atl;

    let svd = n_eq.svd(true, true);
    let mut singular_values = svd.singular_values;
    let sigma_max = singular_values.max();
    let eps = opts.rcond_or_default() * sigma_max;

    let rank = svd.rank(eps);
    let z = svd.solve(&u_eq, eps).map_err(SolveError::SvdFailed)?;
    let x = d * z;

    // nalgebra does not guarantee ordering of the singular values
    singular_values
        .as_mut_slice()
        .sort_by(|a, b| b.total_cmp(a));

    log::debug!(
        "normal equations solved: rank {}/{}, sigma_max {:.3e}",
        rank,
        NUM_PARAMS,
        sigma_max
    );

    Ok(LeastSquaresSolution {
        result: CalibrationResult::new(x),
        rank,
        singular_values,
    })
}

/// Residual sum of squares of `A·X − L`, per line column.
pub fn residual_sum_of_squares(system: &DesignSystem, result: &CalibrationResult) -> [Real; 2] {
    let x = DMatrix::from_iterator(NUM_PARAMS, 2, result.values.iter().copied());
    let r = &system.a * x - &system.l;
    [r.column(0).norm_squared(), r.column(1).norm_squared()]
}
