//! Patch-test configuration.
//!
//! The configuration is plain serde data so it can be loaded from JSON. The
//! initial-parameters mapping stays a raw key/value map until
//! [`PatchTestConfig::initial_parameters`] validates it, so that an incomplete
//! mapping is reported with the exact keys it lacks instead of being
//! silently defaulted.

use std::collections::BTreeMap;

use patch_core::{Real, Vec6};
use patch_linear::{ParameterPrior, SolveOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default standard uncertainty of roll, degrees.
pub const DEFAULT_ROLL_UNC: Real = 0.0005;
/// Default standard uncertainty of pitch, degrees.
pub const DEFAULT_PITCH_UNC: Real = 0.0005;
/// Default standard uncertainty of heading, degrees.
pub const DEFAULT_HEADING_UNC: Real = 0.02;
/// Default standard uncertainty of the x offset, metres.
pub const DEFAULT_X_UNC: Real = 0.2;
/// Default standard uncertainty of the y offset, metres.
pub const DEFAULT_Y_UNC: Real = 0.2;
/// Default standard uncertainty of the horizontal scale factor.
pub const DEFAULT_H_SCALE_UNC: Real = 0.01;

/// Keys an initial-parameters mapping must contain, in reporting order.
pub const INITIAL_PARAMETER_KEYS: [&str; 9] = [
    "roll",
    "roll_unc",
    "pitch",
    "pitch_unc",
    "heading",
    "heading_unc",
    "x_unc",
    "y_unc",
    "h_scale_unc",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("initial parameters are missing required keys: {missing:?}")]
    MissingParameters { missing: Vec<String> },
    #[error("azimuth must be finite, got {0}")]
    InvalidAzimuth(Real),
    #[error("uncertainty {key} must be positive for a-priori weighting, got {value}")]
    NonPositiveUncertainty { key: &'static str, value: Real },
    #[error("line pair needs two distinct lines, got {0:?} twice")]
    DuplicateLine(String),
}

/// Initial values and standard uncertainties of the patch-test parameters.
///
/// Angles and their uncertainties are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialParameters {
    pub roll: Real,
    pub roll_unc: Real,
    pub pitch: Real,
    pub pitch_unc: Real,
    pub heading: Real,
    pub heading_unc: Real,
    pub x_unc: Real,
    pub y_unc: Real,
    pub h_scale_unc: Real,
}

impl Default for InitialParameters {
    fn default() -> Self {
        Self {
            roll: 0.0,
            roll_unc: DEFAULT_ROLL_UNC,
            pitch: 0.0,
            pitch_unc: DEFAULT_PITCH_UNC,
            heading: 0.0,
            heading_unc: DEFAULT_HEADING_UNC,
            x_unc: DEFAULT_X_UNC,
            y_unc: DEFAULT_Y_UNC,
            h_scale_unc: DEFAULT_H_SCALE_UNC,
        }
    }
}

impl InitialParameters {
    /// Build from a key/value mapping holding every key of
    /// [`INITIAL_PARAMETER_KEYS`]. Unrecognized keys are ignored.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingParameters`] naming the absent keys.
    pub fn from_map(map: &BTreeMap<String, Real>) -> Result<Self, ConfigError> {
        let missing: Vec<String> = INITIAL_PARAMETER_KEYS
            .iter()
            .filter(|k| !map.contains_key(**k))
            .map(|k| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingParameters { missing });
        }
        for key in map.keys() {
            if !INITIAL_PARAMETER_KEYS.contains(&key.as_str()) {
                log::debug!("ignoring unrecognized initial parameter {:?}", key);
            }
        }

        let get = |k: &str| map[k];
        Ok(Self {
            roll: get("roll"),
            roll_unc: get("roll_unc"),
            pitch: get("pitch"),
            pitch_unc: get("pitch_unc"),
            heading: get("heading"),
            heading_unc: get("heading_unc"),
            x_unc: get("x_unc"),
            y_unc: get("y_unc"),
            h_scale_unc: get("h_scale_unc"),
        })
    }

    /// Standard uncertainties in design-column order, angles in radians.
    pub fn sigmas(&self) -> Vec6 {
        Vec6::new(
            self.roll_unc.to_radians(),
            self.pitch_unc.to_radians(),
            self.heading_unc.to_radians(),
            self.x_unc,
            self.y_unc,
            self.h_scale_unc,
        )
    }

    /// Initial parameter values in design-column order, angles in radians.
    pub fn initial_values(&self) -> Vec6 {
        Vec6::new(
            self.roll.to_radians(),
            self.pitch.to_radians(),
            self.heading.to_radians(),
            0.0,
            0.0,
            0.0,
        )
    }

    /// Every uncertainty must be strictly positive (and finite) to form `1/σ²`.
    pub fn validate_uncertainties(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("roll_unc", self.roll_unc),
            ("pitch_unc", self.pitch_unc),
            ("heading_unc", self.heading_unc),
            ("x_unc", self.x_unc),
            ("y_unc", self.y_unc),
            ("h_scale_unc", self.h_scale_unc),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveUncertainty { key, value });
            }
        }
        Ok(())
    }

    pub fn prior(&self) -> ParameterPrior {
        ParameterPrior::from_sigmas(&self.sigmas(), self.initial_values())
    }
}

/// How parameter uncertainties enter the normal equations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    /// Plain `AᵗA·X = AᵗL`; uncertainties are accepted but unused.
    #[default]
    None,
    /// Diagonal a-priori weights `1/σ²` pulling towards the initial values.
    APriori,
}

/// Configuration accepted by [`PatchTest::new`](crate::PatchTest::new).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchTestConfig {
    /// Azimuth of the reference line, degrees clockwise from north.
    pub azimuth: Real,
    /// Raw initial-parameters mapping; `None` uses the defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_parameters: Option<BTreeMap<String, Real>>,
    #[serde(default)]
    pub weighting: WeightingMode,
    #[serde(default)]
    pub solve: SolveOptions,
}

impl PatchTestConfig {
    pub fn new(azimuth: Real) -> Self {
        Self {
            azimuth,
            ..Self::default()
        }
    }

    pub fn with_initial_parameters(mut self, map: BTreeMap<String, Real>) -> Self {
        self.initial_parameters = Some(map);
        self
    }

    pub fn with_weighting(mut self, weighting: WeightingMode) -> Self {
        self.weighting = weighting;
        self
    }

    /// Resolve the initial parameters (defaults when no mapping is given).
    pub fn initial_parameters(&self) -> Result<InitialParameters, ConfigError> {
        match &self.initial_parameters {
            Some(map) => InitialParameters::from_map(map),
            None => Ok(InitialParameters::default()),
        }
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<InitialParameters, ConfigError> {
        if !self.azimuth.is_finite() {
            return Err(ConfigError::InvalidAzimuth(self.azimuth));
        }
        let initial = self.initial_parameters()?;
        if self.weighting == WeightingMode::APriori {
            initial.validate_uncertainties()?;
        }
        Ok(initial)
    }
}
