use nalgebra::Vector3;
use ndarray::Array2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Grid, ModelParameter, ScalarField, State, VectorField};

/// A closed-form vector field `f(s, t)` over arclength and time.
pub type Expression = dyn Fn(f64, f64) -> Vector3<f64> + Send + Sync;

/// A backward-difference rate for the step being solved.
///
/// The time derivative of a field `x` at the new time level is
/// `ẋ = weight * x + known`, where `weight` multiplies the unknown new value
/// and `known` collects the contributions of already accepted states.
#[derive(Debug, Clone, PartialEq)]
pub struct BackwardRate {
    pub weight: f64,
    pub r_known: VectorField,
    pub theta_known: VectorField,
}

impl BackwardRate {
    /// Returns the centerline velocity implied by the new centerline `r`.
    #[must_use]
    pub fn r_rate(&self, r: &VectorField) -> VectorField {
        r.scale_add(self.weight, &self.r_known)
    }

    /// Returns the Euler-angle rates implied by the new angles `theta`.
    #[must_use]
    pub fn theta_rate(&self, theta: &VectorField) -> VectorField {
        theta.scale_add(self.weight, &self.theta_known)
    }
}

/// Everything a discretization needs to assemble one linearized time step.
///
/// Nonlinear coefficients of the balance laws (rotation matrices, stretch,
/// tangent cross products) are evaluated at `linearization`, which turns the
/// implicit step into a linear system in the unknown new [`State`].
#[derive(Debug, Clone, Copy)]
pub struct LinearizedStep<'a> {
    /// Zero-based index of the step being solved.
    pub step: usize,
    /// Time at the end of the step.
    pub time: f64,
    pub dt: f64,
    pub parameters: &'a ModelParameter,
    /// Preferred curvature `k_pref` at the new time.
    pub curvature: &'a VectorField,
    /// Preferred shear/stretch `σ_pref` at the new time.
    pub shear_stretch: &'a VectorField,
    pub linearization: &'a State,
    pub rate: &'a BackwardRate,
}

/// Direct solver used for the assembled linear system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinearSolver {
    /// Block-tridiagonal elimination without pivoting between blocks.
    #[default]
    BlockTridiagonal,

    /// Dense LU with partial pivoting.
    Dense,
}

/// Options forwarded to [`Discretization::assemble_and_solve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOptions {
    pub linear_solver: LinearSolver,
}

/// The spatial layer of the simulation.
///
/// A discretization owns the function spaces over the arclength grid,
/// assembles and solves the linearized balance laws of one time step, and
/// provides the spatial operations the time stepper needs to report derived
/// quantities.
pub trait Discretization {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prepares the function spaces over `grid`.
    ///
    /// Called once before any other method.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the grid is not supported.
    fn build_spaces(&mut self, grid: &Grid) -> Result<(), Self::Error>;

    /// Assembles the linear system of `step` and solves it for the new state.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if assembly fails or the system is singular.
    fn assemble_and_solve(
        &self,
        step: &LinearizedStep<'_>,
        options: &SolverOptions,
    ) -> Result<State, Self::Error>;

    /// Returns the arclength derivative of a nodal field, recovered at the nodes.
    fn gradient(&self, field: &VectorField) -> VectorField;

    /// Projects a nodal field onto the output representation, a `3×N` array.
    fn project(&self, field: &VectorField) -> Array2<f64> {
        field.to_array()
    }

    /// Integrates a nodal density over the body.
    fn integrate(&self, density: &ScalarField) -> f64;

    /// Evaluates a closed-form expression at every node at `time`.
    fn evaluate_expression(&self, expression: &Expression, time: f64) -> VectorField;
}
