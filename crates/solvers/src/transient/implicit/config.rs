use std::error::Error as StdError;

use thiserror::Error;
use undulate_core::{FieldError, Grid, GridError, ParameterError, SolverOptions};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::finite_difference::StencilError;

use super::FieldKey;

/// Configuration for the implicit solver.
///
/// Fixed for the lifetime of a [`Simulation`](super::Simulation): the grid
/// size, time step, finite-difference order, what to report and how, and the
/// options forwarded to the discretization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ConfigFields"))]
pub struct Config {
    points: usize,
    dt: f64,
    order: usize,
    report: ReportConfig,
    picard: PicardConfig,
    solver: SolverOptions,
}

/// The serialized form of [`Config`], checked on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct ConfigFields {
    points: usize,
    dt: f64,
    order: usize,
    report: ReportConfig,
    picard: PicardConfig,
    solver: SolverOptions,
}

#[cfg(feature = "serde")]
impl TryFrom<ConfigFields> for Config {
    type Error = ConfigError;

    fn try_from(fields: ConfigFields) -> Result<Self, Self::Error> {
        let config = Self {
            points: fields.points,
            dt: fields.dt,
            order: fields.order,
            report: fields.report,
            picard: fields.picard,
            solver: fields.solver,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Which quantities are reported, and how often.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportConfig {
    interval: Option<f64>,
    points: Option<usize>,
    fields: Vec<FieldKey>,
}

/// Fixed-point refinement of each linearized step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PicardConfig {
    max_iterations: usize,
    tolerance: f64,
}

/// Errors detected before stepping begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("time step must be finite and positive, got {0}")]
    TimeStep(f64),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("finite-difference order must be at least 1")]
    Order,

    #[error("report interval {interval} must be finite and exceed the time step {dt}")]
    ReportInterval { interval: f64, dt: f64 },

    #[error("reported points must be between 1 and {points} (exclusive), got {requested}")]
    ReportPoints { requested: usize, points: usize },

    #[error("report stride {stride} exceeds the {steps} planned steps")]
    StrideExceedsSteps { stride: usize, steps: usize },

    #[error("picard iterations must be at least 1")]
    PicardIterations,

    #[error("picard tolerance must be finite and non-negative")]
    PicardTolerance,

    #[error("horizon {horizon} must be finite and span at least one step of {dt}")]
    Horizon { horizon: f64, dt: f64 },

    #[error("{target} table has {found} rows, expected one per step ({expected})")]
    TabulatedRows {
        target: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{target} table rows are shaped {found:?}, expected {expected:?}")]
    TabulatedShape {
        target: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("initial state has {found} points, expected {expected}")]
    InitialShape { expected: usize, found: usize },

    #[error("initial state is not finite")]
    InitialNotFinite,

    #[error("frame index {index} is out of range for {len} frames")]
    FrameIndex { index: usize, len: usize },

    #[error("field {0} is missing or has the wrong shape")]
    MissingField(FieldKey),

    #[error("unknown field name {0:?}")]
    UnknownField(String),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("invalid model parameters: {0}")]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Stencil(#[from] StencilError),

    #[error("failed to build function spaces: {0}")]
    Spaces(#[source] Box<dyn StdError + Send + Sync>),
}

impl ConfigError {
    pub(crate) fn spaces<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Spaces(Box::new(err))
    }
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(100, 1e-2, 2).unwrap()
    }
}

impl Config {
    /// Creates a config that reports every field at every step and point.
    ///
    /// # Errors
    ///
    /// Returns an error if `points < 2`, `dt` is not finite and positive, or
    /// `order` is zero.
    pub fn new(points: usize, dt: f64, order: usize) -> Result<Self, ConfigError> {
        Grid::uniform(points)?;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::TimeStep(dt));
        }
        if order == 0 {
            return Err(ConfigError::Order);
        }

        Ok(Self {
            points,
            dt,
            order,
            report: ReportConfig::default(),
            picard: PicardConfig::default(),
            solver: SolverOptions::default(),
        })
    }

    /// Sets what is reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the report interval does not exceed the time step,
    /// or the reported point count is not below the grid size.
    pub fn with_report(self, report: ReportConfig) -> Result<Self, ConfigError> {
        if let Some(interval) = report.interval {
            if !interval.is_finite() || interval <= self.dt {
                return Err(ConfigError::ReportInterval {
                    interval,
                    dt: self.dt,
                });
            }
        }
        if let Some(requested) = report.points {
            if requested == 0 || requested >= self.points {
                return Err(ConfigError::ReportPoints {
                    requested,
                    points: self.points,
                });
            }
        }
        Ok(Self { report, ..self })
    }

    /// Re-checks every setting against the rules of the constructors.
    ///
    /// # Errors
    ///
    /// Returns the error the failing constructor would have returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(self.points, self.dt, self.order)?.with_report(self.report.clone())?;
        PicardConfig::new(self.picard.max_iterations, self.picard.tolerance)?;
        Ok(())
    }

    #[must_use]
    pub fn with_picard(self, picard: PicardConfig) -> Self {
        Self { picard, ..self }
    }

    #[must_use]
    pub fn with_solver(self, solver: SolverOptions) -> Self {
        Self { solver, ..self }
    }

    /// Returns the number of grid points.
    #[must_use]
    pub fn points(&self) -> usize {
        self.points
    }

    /// Returns the time step.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the accuracy order of the backward difference, which is also the
    /// length of the history window.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    #[must_use]
    pub fn report(&self) -> &ReportConfig {
        &self.report
    }

    #[must_use]
    pub fn picard(&self) -> PicardConfig {
        self.picard
    }

    #[must_use]
    pub fn solver(&self) -> SolverOptions {
        self.solver
    }

    /// Returns the grid described by this config.
    ///
    /// # Errors
    ///
    /// Never fails for a config built through [`Config::new`].
    pub fn grid(&self) -> Result<Grid, GridError> {
        Grid::uniform(self.points)
    }

    /// Returns the number of steps between reported frames.
    #[must_use]
    pub fn time_stride(&self) -> usize {
        self.report
            .interval
            .map_or(1, |interval| ((interval / self.dt).round() as usize).max(1))
    }

    /// Returns the number of grid points between reported samples.
    #[must_use]
    pub fn space_stride(&self) -> usize {
        self.report.points.map_or(1, |requested| {
            ((self.points as f64 / requested as f64).round() as usize).max(1)
        })
    }

    /// Returns the number of reported samples along the body, `⌈N / stride⌉`.
    #[must_use]
    pub fn reported_points(&self) -> usize {
        self.points.div_ceil(self.space_stride())
    }

    /// Returns the number of whole steps that fit in `horizon`.
    ///
    /// # Errors
    ///
    /// Returns an error if the horizon is not finite or shorter than one step.
    pub fn planned_steps(&self, horizon: f64) -> Result<usize, ConfigError> {
        // Absorbs round-off in horizons that are exact multiples of dt.
        const SLACK: f64 = 1e-9;

        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(ConfigError::Horizon {
                horizon,
                dt: self.dt,
            });
        }
        let steps = (horizon / self.dt + SLACK).floor() as usize;
        if steps == 0 {
            return Err(ConfigError::Horizon {
                horizon,
                dt: self.dt,
            });
        }
        Ok(steps)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval: None,
            points: None,
            fields: FieldKey::ALL.to_vec(),
        }
    }
}

impl ReportConfig {
    /// Reports frames every `interval` time units instead of every step.
    #[must_use]
    pub fn every(self, interval: f64) -> Self {
        Self {
            interval: Some(interval),
            ..self
        }
    }

    /// Reports roughly `points` samples along the body instead of every node.
    #[must_use]
    pub fn with_points(self, points: usize) -> Self {
        Self {
            points: Some(points),
            ..self
        }
    }

    /// Restricts the reported quantities.
    #[must_use]
    pub fn with_fields(self, fields: impl IntoIterator<Item = FieldKey>) -> Self {
        let mut fields: Vec<_> = fields.into_iter().collect();
        fields.sort_unstable();
        fields.dedup();
        Self { fields, ..self }
    }

    /// Restricts the reported quantities by wire name.
    ///
    /// # Errors
    ///
    /// Returns an error if any name is not a recognized field.
    pub fn with_field_names<'a>(
        self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let fields = names
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<FieldKey>, _>>()?;
        Ok(self.with_fields(fields))
    }

    #[must_use]
    pub fn interval(&self) -> Option<f64> {
        self.interval
    }

    #[must_use]
    pub fn points(&self) -> Option<usize> {
        self.points
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldKey] {
        &self.fields
    }
}

impl Default for PicardConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1, 1e-10).unwrap()
    }
}

impl PicardConfig {
    /// Creates a refinement config.
    ///
    /// With `max_iterations == 1` every step is linearized once around the
    /// previous state and never refined.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iterations` is zero or `tolerance` is negative
    /// or non-finite.
    pub fn new(max_iterations: usize, tolerance: f64) -> Result<Self, ConfigError> {
        if max_iterations == 0 {
            return Err(ConfigError::PicardIterations);
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::PicardTolerance);
        }
        Ok(Self {
            max_iterations,
            tolerance,
        })
    }

    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the largest nodal change at which refinement stops.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
