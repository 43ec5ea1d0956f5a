use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::kinematics::E3;

/// Dimensionless material and fluid coefficients of one run.
///
/// Drag is anisotropic: translational drag normal to the centerline tangent is
/// `c` times the tangential drag, rotational drag is `d` times the translational
/// drag, and rotation about the normal directions is `y` times the rotational
/// drag about the tangent.
///
/// The elastic law is linear viscoelastic: shear/stretch is resisted by the
/// stiffness `s` and damping `s_tilde`, curvature by the stiffness `b` and
/// damping `b_tilde`, each a body-frame 3×3 tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelParameter {
    pub c: f64,
    pub d: f64,
    pub y: f64,
    pub s: Matrix3<f64>,
    pub s_tilde: Matrix3<f64>,
    pub b: Matrix3<f64>,
    pub b_tilde: Matrix3<f64>,
}

/// Errors that can occur when validating a [`ModelParameter`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    #[error("drag coefficient {0} must be finite and positive")]
    Drag(&'static str),

    #[error("tensor {0} must be finite and symmetric")]
    Asymmetric(&'static str),

    #[error("tensor {0} must be positive semi-definite")]
    Indefinite(&'static str),
}

impl Default for ModelParameter {
    fn default() -> Self {
        Self {
            c: 1.5,
            d: 0.01,
            y: 1.0,
            s: Matrix3::from_diagonal_element(1.0),
            s_tilde: Matrix3::from_diagonal_element(0.01),
            b: Matrix3::from_diagonal_element(1.0),
            b_tilde: Matrix3::from_diagonal_element(0.01),
        }
    }
}

impl ModelParameter {
    /// Sets the drag coefficients.
    #[must_use]
    pub fn with_drag(self, c: f64, d: f64, y: f64) -> Self {
        Self { c, d, y, ..self }
    }

    /// Sets the shear/stretch stiffness and damping tensors.
    #[must_use]
    pub fn with_shear_stretch(self, s: Matrix3<f64>, s_tilde: Matrix3<f64>) -> Self {
        Self { s, s_tilde, ..self }
    }

    /// Sets the bending/twist stiffness and damping tensors.
    #[must_use]
    pub fn with_bending(self, b: Matrix3<f64>, b_tilde: Matrix3<f64>) -> Self {
        Self { b, b_tilde, ..self }
    }

    /// Returns the lab-frame translational drag tensor for a unit tangent `d3`.
    ///
    /// Velocity along `d3` sees unit drag, velocity normal to it sees `c`.
    #[must_use]
    pub fn translational_drag(&self, d3: &Vector3<f64>) -> Matrix3<f64> {
        let tangential = d3 * d3.transpose();
        tangential + (Matrix3::identity() - tangential) * self.c
    }

    /// Returns the body-frame rotational drag tensor.
    ///
    /// Spin about the body tangent sees drag `d`, rotation about the normal
    /// directions sees `d * y`.
    #[must_use]
    pub fn rotational_drag(&self) -> Matrix3<f64> {
        let axial = E3 * E3.transpose();
        (axial + (Matrix3::identity() - axial) * self.y) * self.d
    }

    /// Checks that the coefficients describe a dissipative, stable material.
    ///
    /// # Errors
    ///
    /// Returns an error if a drag coefficient is non-positive or non-finite,
    /// or if a tensor is non-finite, asymmetric, or has a negative eigenvalue.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [("C", self.c), ("D", self.d), ("Y", self.y)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::Drag(name));
            }
        }

        for (name, tensor) in [
            ("S", &self.s),
            ("S_tilde", &self.s_tilde),
            ("B", &self.b),
            ("B_tilde", &self.b_tilde),
        ] {
            check_semi_definite(name, tensor)?;
        }

        Ok(())
    }
}

fn check_semi_definite(name: &'static str, tensor: &Matrix3<f64>) -> Result<(), ParameterError> {
    const TOL: f64 = 1e-12;

    if !tensor.iter().all(|x| x.is_finite()) {
        return Err(ParameterError::Asymmetric(name));
    }
    let scale = tensor.amax().max(1.0);
    if (tensor - tensor.transpose()).amax() > TOL * scale {
        return Err(ParameterError::Asymmetric(name));
    }
    if tensor.symmetric_eigenvalues().min() < -TOL * scale {
        return Err(ParameterError::Indefinite(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn default_is_valid() {
        assert_eq!(ModelParameter::default().validate(), Ok(()));
    }

    #[test]
    fn zero_damping_is_allowed() {
        let params =
            ModelParameter::default().with_bending(Matrix3::identity(), Matrix3::zeros());

        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_drag() {
        let params = ModelParameter::default().with_drag(1.5, 0.0, 1.0);

        assert_eq!(params.validate(), Err(ParameterError::Drag("D")));
    }

    #[test]
    fn rejects_asymmetric_stiffness() {
        let mut s = Matrix3::identity();
        s[(0, 1)] = 0.5;
        let params = ModelParameter::default().with_shear_stretch(s, Matrix3::zeros());

        assert_eq!(params.validate(), Err(ParameterError::Asymmetric("S")));
    }

    #[test]
    fn rejects_negative_eigenvalue() {
        let b = Matrix3::from_diagonal(&Vector3::new(1.0, -0.5, 1.0));
        let params = ModelParameter::default().with_bending(b, Matrix3::zeros());

        assert_eq!(params.validate(), Err(ParameterError::Indefinite("B")));
    }

    #[test]
    fn tangential_motion_sees_unit_drag() {
        let params = ModelParameter::default().with_drag(2.0, 0.1, 3.0);
        let d3 = Vector3::new(0.0, 0.6, 0.8);
        let normal = Vector3::new(1.0, 0.0, 0.0);
        let drag = params.translational_drag(&d3);

        assert_relative_eq!(drag * d3, d3, epsilon = 1e-14);
        assert_relative_eq!(drag * normal, normal * 2.0, epsilon = 1e-14);
    }

    #[test]
    fn rotational_drag_is_diagonal() {
        let params = ModelParameter::default().with_drag(2.0, 0.1, 3.0);

        assert_relative_eq!(
            params.rotational_drag(),
            Matrix3::from_diagonal(&Vector3::new(0.3, 0.3, 0.1)),
            epsilon = 1e-15
        );
    }
}
