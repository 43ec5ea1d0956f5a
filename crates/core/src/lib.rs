//! Core traits and types for simulating an actuated Cosserat rod.
//!
//! This crate defines the shared abstractions that the time-stepping engine
//! and the spatial discretizations build on:
//!
//! - [`Grid`], [`VectorField`], [`ScalarField`]: nodal fields along arclength
//! - [`State`]: centerline and Euler angles at one instant
//! - [`ModelParameter`]: dimensionless drag, stiffness and damping coefficients
//! - [`kinematics`]: rotation matrices and Euler-angle rate maps
//! - [`Discretization`]: the spatial layer that assembles and solves one
//!   linearized time step
//! - [`Observer`]: receives solver events

mod discretization;
mod field;
pub mod kinematics;
mod observer;
mod parameter;
mod state;

pub use discretization::{
    BackwardRate, Discretization, Expression, LinearSolver, LinearizedStep, SolverOptions,
};
pub use field::{FieldError, Grid, GridError, ScalarField, VectorField};
pub use observer::Observer;
pub use parameter::{ModelParameter, ParameterError};
pub use state::State;
