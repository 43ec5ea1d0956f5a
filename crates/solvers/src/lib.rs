//! Time integration for actuated Cosserat rods.
//!
//! - [`finite_difference`]: backward-difference weights and their shared cache
//! - [`transient`]: time-marching solvers built on a [`Discretization`]
//!
//! [`Discretization`]: undulate_core::Discretization

pub mod finite_difference;
pub mod transient;
