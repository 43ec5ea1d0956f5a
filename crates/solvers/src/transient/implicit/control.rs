use std::fmt;

use nalgebra::Vector3;
use ndarray::{Array3, Axis};
use undulate_core::{Discretization, Expression, VectorField};

use super::ConfigError;

/// How a preferred strain (curvature or shear/stretch) is prescribed.
pub enum Actuation {
    /// A closed form `f(s, t)` evaluated at every step's time.
    Varying(Box<Expression>),

    /// A closed form `f(s, t)` evaluated once, at the start time, and held.
    Steady(Box<Expression>),

    /// One precomputed `3×N` row per planned step, shaped `(steps, 3, N)`.
    Tabulated(Array3<f64>),
}

impl Actuation {
    pub fn varying(f: impl Fn(f64, f64) -> Vector3<f64> + Send + Sync + 'static) -> Self {
        Self::Varying(Box::new(f))
    }

    pub fn steady(f: impl Fn(f64, f64) -> Vector3<f64> + Send + Sync + 'static) -> Self {
        Self::Steady(Box::new(f))
    }

    #[must_use]
    pub fn tabulated(table: Array3<f64>) -> Self {
        Self::Tabulated(table)
    }

    /// Returns the actuation that prefers zero strain everywhere.
    #[must_use]
    pub fn zero() -> Self {
        Self::steady(|_, _| Vector3::zeros())
    }
}

impl fmt::Debug for Actuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varying(_) => f.write_str("Varying(..)"),
            Self::Steady(_) => f.write_str("Steady(..)"),
            Self::Tabulated(table) => f.debug_tuple("Tabulated").field(&table.dim()).finish(),
        }
    }
}

/// The muscle signal of one run: preferred curvature and shear/stretch.
#[derive(Debug)]
pub struct Controls {
    pub curvature: Actuation,
    pub shear_stretch: Actuation,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            curvature: Actuation::zero(),
            shear_stretch: Actuation::zero(),
        }
    }
}

impl Controls {
    #[must_use]
    pub fn new(curvature: Actuation, shear_stretch: Actuation) -> Self {
        Self {
            curvature,
            shear_stretch,
        }
    }
}

/// Preferred strains resolved for one step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Targets {
    pub(crate) curvature: VectorField,
    pub(crate) shear_stretch: VectorField,
}

/// An [`Actuation`] checked against the run it drives.
enum Resolved<'a> {
    Varying(&'a Expression),
    Steady(VectorField),
    Tabulated(&'a Array3<f64>),
}

impl<'a> Resolved<'a> {
    fn new<D: Discretization>(
        target: &'static str,
        actuation: &'a Actuation,
        discretization: &D,
        steps: usize,
        points: usize,
        start: f64,
    ) -> Result<Self, ConfigError> {
        match actuation {
            Actuation::Varying(f) => Ok(Self::Varying(f.as_ref())),
            Actuation::Steady(f) => Ok(Self::Steady(
                discretization.evaluate_expression(f.as_ref(), start),
            )),
            Actuation::Tabulated(table) => {
                let (rows, components, columns) = table.dim();
                if rows != steps {
                    return Err(ConfigError::TabulatedRows {
                        target,
                        expected: steps,
                        found: rows,
                    });
                }
                if (components, columns) != (3, points) {
                    return Err(ConfigError::TabulatedShape {
                        target,
                        expected: (3, points),
                        found: (components, columns),
                    });
                }
                Ok(Self::Tabulated(table))
            }
        }
    }

    fn at<D: Discretization>(&self, discretization: &D, step: usize, time: f64) -> VectorField {
        match self {
            Self::Varying(f) => discretization.evaluate_expression(*f, time),
            Self::Steady(field) => field.clone(),
            Self::Tabulated(table) => {
                let row = table.index_axis(Axis(0), step);
                VectorField::from_fn(row.dim().1, |j| {
                    Vector3::new(row[[0, j]], row[[1, j]], row[[2, j]])
                })
            }
        }
    }
}

/// Resolves the preferred strains of every step.
///
/// Tabulated inputs are checked once, at construction, so a mismatched table
/// fails before any step runs.
pub(crate) struct ControlEvaluator<'a> {
    curvature: Resolved<'a>,
    shear_stretch: Resolved<'a>,
}

impl<'a> ControlEvaluator<'a> {
    pub(crate) fn new<D: Discretization>(
        controls: &'a Controls,
        discretization: &D,
        steps: usize,
        points: usize,
        start: f64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            curvature: Resolved::new(
                "curvature",
                &controls.curvature,
                discretization,
                steps,
                points,
                start,
            )?,
            shear_stretch: Resolved::new(
                "shear/stretch",
                &controls.shear_stretch,
                discretization,
                steps,
                points,
                start,
            )?,
        })
    }

    pub(crate) fn resolve<D: Discretization>(
        &self,
        discretization: &D,
        step: usize,
        time: f64,
    ) -> Targets {
        Targets {
            curvature: self.curvature.at(discretization, step, time),
            shear_stretch: self.shear_stretch.at(discretization, step, time),
        }
    }
}
