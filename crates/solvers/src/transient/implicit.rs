//! Implicit time stepping with backward differences.
//!
//! Each step replaces the time derivatives of the balance laws by a backward
//! difference of order `k` over the last `k` accepted states:
//!
//! ```text
//! ẋ_{n+1} ≈ (c₀ x_{n+1} + Σⱼ cⱼ x_{n+1-j}) / dt
//! ```
//!
//! The remaining nonlinear coefficients are evaluated at the previous state,
//! which turns every step into one linear solve delegated to a
//! [`Discretization`]. Optional Picard refinement re-linearizes around the
//! fresh solution until it stops changing.
//!
//! # Reporting
//!
//! Every `t_step`th step (see [`Config::time_stride`]) is reported: the
//! requested [`FieldKey`]s are derived from the solved state and stored in a
//! [`Frame`], keeping every `s_step`th node. Frames are stacked into a
//! [`FrameSequence`] when the run ends.
//!
//! # Failure
//!
//! Configuration problems are returned as [`ConfigError`] before the first
//! step. A step that fails (a discretization error or a non-finite state)
//! ends the run, and the [`Trajectory`] carries both the frames reported so
//! far and the [`StepError`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use undulate_solvers::{
//!     finite_difference::CoefficientCache,
//!     transient::implicit::{Config, Run, Simulation},
//! };
//!
//! let config = Config::new(129, 1e-3, 2)?;
//! let simulation = Simulation::new(discretization, config, Arc::new(CoefficientCache::new()))?;
//! let trajectory = simulation.solve_unobserved(&Run::new(1.0))?;
//!
//! let (frames, controls, failure) = trajectory.into_parts();
//! ```

mod config;
mod control;
mod derived;
mod error;
mod event;
mod field;
mod frame;
mod history;
mod solution;
mod step;

#[cfg(test)]
mod test_utils;

pub use config::{Config, ConfigError, PicardConfig, ReportConfig};
pub use control::{Actuation, Controls};
pub use error::StepError;
pub use event::Event;
pub use field::{FieldKey, FieldKind};
pub use frame::{ControlSequence, FieldValue, Frame, FrameSequence, Series};
pub use solution::{InitialCondition, Status, Trajectory};

use std::sync::Arc;

use undulate_core::{Discretization, Grid, ModelParameter, Observer};

use crate::finite_difference::CoefficientCache;

use control::ControlEvaluator;
use step::Stepper;

/// The inputs of one run.
#[derive(Debug)]
pub struct Run {
    /// Simulated duration; the run takes `⌊horizon / dt⌋` steps.
    pub horizon: f64,
    pub parameters: ModelParameter,
    pub controls: Controls,

    /// Starting point; the straight rod at `t = 0` if `None`.
    pub initial: Option<InitialCondition>,
}

impl Run {
    /// A run of the straight rod with default parameters and no actuation.
    #[must_use]
    pub fn new(horizon: f64) -> Self {
        Self {
            horizon,
            parameters: ModelParameter::default(),
            controls: Controls::default(),
            initial: None,
        }
    }

    #[must_use]
    pub fn with_parameters(self, parameters: ModelParameter) -> Self {
        Self { parameters, ..self }
    }

    #[must_use]
    pub fn with_controls(self, controls: Controls) -> Self {
        Self { controls, ..self }
    }

    #[must_use]
    pub fn starting_from(self, initial: InitialCondition) -> Self {
        Self {
            initial: Some(initial),
            ..self
        }
    }
}

/// A discretization prepared for a fixed grid and time step.
///
/// One simulation can execute any number of independent [`Run`]s; the
/// coefficient cache may be shared with other simulations.
#[derive(Debug)]
pub struct Simulation<D> {
    discretization: D,
    config: Config,
    grid: Grid,
    cache: Arc<CoefficientCache>,
}

impl<D: Discretization> Simulation<D> {
    /// Builds the function spaces of `discretization` for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` breaks a rule of its constructors (as a
    /// deserialized config can), the discretization rejects the grid, or the
    /// backward difference of the configured order cannot be built.
    pub fn new(
        mut discretization: D,
        config: Config,
        cache: Arc<CoefficientCache>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = config.grid()?;
        discretization
            .build_spaces(&grid)
            .map_err(ConfigError::spaces)?;
        cache.get(1, config.order())?;

        Ok(Self {
            discretization,
            config,
            grid,
            cache,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn discretization(&self) -> &D {
        &self.discretization
    }

    /// Executes `run`.
    ///
    /// # Algorithm
    ///
    /// 1. Validate the run against the config: parameters, planned steps,
    ///    report stride, initial state, tabulated controls.
    /// 2. Seed the history window with the initial state.
    /// 3. For each step:
    ///    - Resolve the preferred strains at the new time.
    ///    - Linearize around the latest accepted state and solve.
    ///    - Reject a non-finite solution.
    ///    - If the step is report-eligible, derive and store its frame.
    ///    - Slide the history window.
    ///    - Emit an [`Event`] to the observer.
    /// 4. Stack the frames and return them with any captured failure.
    ///
    /// # Errors
    ///
    /// Returns an error only for problems detected before the first step.
    /// Failures while stepping are captured on the [`Trajectory`].
    pub fn solve<Obs>(&self, run: &Run, mut observer: Obs) -> Result<Trajectory, ConfigError>
    where
        Obs: Observer<Event>,
    {
        run.parameters.validate()?;

        let steps = self.config.planned_steps(run.horizon)?;
        let time_stride = self.config.time_stride();
        if time_stride > steps {
            return Err(ConfigError::StrideExceedsSteps {
                stride: time_stride,
                steps,
            });
        }

        let initial = match &run.initial {
            Some(initial) => initial.clone(),
            None => InitialCondition::straight(&self.grid),
        };
        for found in [initial.state.r.len(), initial.state.theta.len()] {
            if found != self.grid.points() {
                return Err(ConfigError::InitialShape {
                    expected: self.grid.points(),
                    found,
                });
            }
        }
        if !initial.state.is_finite() || !initial.time.is_finite() {
            return Err(ConfigError::InitialNotFinite);
        }

        let coefficients = self.cache.get(1, self.config.order())?;
        let controls = ControlEvaluator::new(
            &run.controls,
            &self.discretization,
            steps,
            self.grid.points(),
            initial.time,
        )?;
        let mut stepper = Stepper::new(
            &self.discretization,
            &run.parameters,
            &self.config,
            coefficients,
            controls,
            initial.state,
            initial.time,
        );

        tracing::info!(
            steps,
            horizon = run.horizon,
            dt = self.config.dt(),
            start = initial.time,
            "starting implicit run"
        );

        let mut frames = Vec::new();
        let mut records = Vec::new();
        let mut failure = None;
        let mut accepted = 0;

        for index in 0..steps {
            let eligible = (index + 1) % time_stride == 0;
            let time = stepper.time(index);

            match stepper.step(index, eligible) {
                Ok(report) => {
                    accepted += 1;
                    let frame = report.map(|report| {
                        records.push(report.control);
                        report.frame
                    });
                    tracing::debug!(step = index, time, reported = frame.is_some(), "step accepted");

                    observer.observe(&Event {
                        step: index,
                        time,
                        frame: frame.clone(),
                    });
                    frames.extend(frame);
                }
                Err(err) => {
                    tracing::warn!(step = index, time, error = %err, "run stopped");
                    failure = Some(err);
                    break;
                }
            }
        }

        tracing::info!(
            accepted,
            frames = frames.len(),
            failed = failure.is_some(),
            "finished implicit run"
        );

        Ok(Trajectory {
            frames: FrameSequence::from_frames(&frames),
            controls: ControlSequence::from_records(&records, self.config.reported_points()),
            failure,
            steps: accepted,
        })
    }

    /// Executes `run` without observation.
    ///
    /// This is a convenience wrapper around [`Simulation::solve`] that
    /// discards events.
    ///
    /// # Errors
    ///
    /// Returns an error only for problems detected before the first step.
    pub fn solve_unobserved(&self, run: &Run) -> Result<Trajectory, ConfigError> {
        self.solve(run, ())
    }
}
