//! A lightweight discretization for exercising the time stepper.

use std::cell::Cell;

use nalgebra::Vector3;
use thiserror::Error;
use undulate_core::{
    Discretization, Expression, Grid, LinearizedStep, ScalarField, SolverOptions, State,
    VectorField,
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("scripted failure at step {0}")]
pub(crate) struct ScriptedFailure(pub(crate) usize);

/// Moves the linearization state rigidly with a fixed velocity and spin.
///
/// Spatial operations use central differences and the trapezoidal rule on a
/// uniform grid. Failures and non-finite solutions can be scripted per step.
#[derive(Debug, Default)]
pub(crate) struct Drift {
    grid: Option<Grid>,
    velocity: Vector3<f64>,
    spin: Vector3<f64>,
    nan_at: Option<usize>,
    fail_at: Option<usize>,
    solves: Cell<usize>,
}

impl Drift {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A drift whose spaces are already built on `grid`.
    pub(crate) fn on(grid: &Grid) -> Self {
        Self {
            grid: Some(*grid),
            ..Self::default()
        }
    }

    pub(crate) fn with_velocity(self, velocity: Vector3<f64>) -> Self {
        Self { velocity, ..self }
    }

    pub(crate) fn with_spin(self, spin: Vector3<f64>) -> Self {
        Self { spin, ..self }
    }

    pub(crate) fn with_nan_at(self, step: usize) -> Self {
        Self {
            nan_at: Some(step),
            ..self
        }
    }

    pub(crate) fn with_failure_at(self, step: usize) -> Self {
        Self {
            fail_at: Some(step),
            ..self
        }
    }

    /// Returns how many linear solves were requested.
    pub(crate) fn solves(&self) -> usize {
        self.solves.get()
    }

    fn spacing(&self) -> f64 {
        self.grid.map_or(1.0, |grid| grid.spacing())
    }
}

impl Discretization for Drift {
    type Error = ScriptedFailure;

    fn build_spaces(&mut self, grid: &Grid) -> Result<(), Self::Error> {
        self.grid = Some(*grid);
        Ok(())
    }

    fn assemble_and_solve(
        &self,
        step: &LinearizedStep<'_>,
        _options: &SolverOptions,
    ) -> Result<State, Self::Error> {
        self.solves.set(self.solves.get() + 1);
        if self.fail_at == Some(step.step) {
            return Err(ScriptedFailure(step.step));
        }

        let base = step.linearization;
        let mut r = base.r.map(|r| r + self.velocity * step.dt);
        let theta = base.theta.map(|theta| theta + self.spin * step.dt);
        if self.nan_at == Some(step.step) {
            r = r.map(|r| Vector3::new(f64::NAN, r.y, r.z));
        }
        Ok(State::new(r, theta))
    }

    fn gradient(&self, field: &VectorField) -> VectorField {
        let h = self.spacing();
        let last = field.len() - 1;
        VectorField::from_fn(field.len(), |i| match i {
            0 => (field[1] - field[0]) / h,
            i if i == last => (field[last] - field[last - 1]) / h,
            i => (field[i + 1] - field[i - 1]) / (2.0 * h),
        })
    }

    fn integrate(&self, density: &ScalarField) -> f64 {
        let h = self.spacing();
        let values = density.as_slice();
        let interior: f64 = values.iter().sum();
        h * (interior - 0.5 * (values[0] + values[values.len() - 1]))
    }

    fn evaluate_expression(&self, expression: &Expression, time: f64) -> VectorField {
        let grid = self.grid.expect("spaces are built before expressions are evaluated");
        grid.arclengths().map(|s| expression(s, time)).collect()
    }
}
