use nalgebra::Vector3;
use ndarray::ArrayView2;

use crate::{FieldError, Grid, VectorField};

/// The configuration of the rod at one instant.
///
/// A [`State`] pairs:
/// - `r`: the centerline position at every node, in the lab frame.
/// - `theta`: the Euler angles `(α, β, γ)` at every node.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub r: VectorField,
    pub theta: VectorField,
}

impl State {
    /// Creates a state from centerline and Euler-angle fields.
    #[must_use]
    pub fn new(r: VectorField, theta: VectorField) -> Self {
        debug_assert_eq!(r.len(), theta.len());
        Self { r, theta }
    }

    /// Returns the straight, untwisted rod lying along the lab `z` axis.
    ///
    /// The centerline is `r(s) = (0, 0, s)` and all Euler angles are zero.
    #[must_use]
    pub fn straight(grid: &Grid) -> Self {
        let r = grid.arclengths().map(|s| Vector3::new(0.0, 0.0, s)).collect();
        let theta = VectorField::zeros(grid.points());
        Self { r, theta }
    }

    /// Builds a state from `3×N` centerline and Euler-angle arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if either array is not `3×N` or if the two disagree
    /// on `N`.
    pub fn from_arrays(
        r: ArrayView2<'_, f64>,
        theta: ArrayView2<'_, f64>,
    ) -> Result<Self, FieldError> {
        if r.dim() != theta.dim() {
            return Err(FieldError::Shape {
                expected: r.dim(),
                found: theta.dim(),
            });
        }
        Ok(Self {
            r: VectorField::from_array(r)?,
            theta: VectorField::from_array(theta)?,
        })
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.r.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Returns `true` if no component of either field is NaN or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.theta.is_finite()
    }

    /// Returns the largest absolute nodal difference to another state.
    #[must_use]
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.r
            .max_abs_diff(&other.r)
            .max(self.theta.max_abs_diff(&other.theta))
    }
}
