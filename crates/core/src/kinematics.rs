//! Rod kinematics in Euler-angle coordinates.
//!
//! Orientation along the rod is parameterized by Euler angles
//! `θ = (α, β, γ)`, composed as `Q = R_z(α) R_y(β) R_x(γ)`. The matrix `Q`
//! rotates lab-frame vectors into the body frame; its transpose maps the lab
//! basis onto the director triad `d_i = Qᵀ e_i`.

use nalgebra::{Matrix3, Vector3};

/// First lab basis vector.
pub const E1: Vector3<f64> = Vector3::new(1.0, 0.0, 0.0);
/// Second lab basis vector.
pub const E2: Vector3<f64> = Vector3::new(0.0, 1.0, 0.0);
/// Third lab basis vector, the tangent of the straight reference rod.
pub const E3: Vector3<f64> = Vector3::new(0.0, 0.0, 1.0);

/// Returns the rotation `Q` from the lab frame to the body frame.
#[must_use]
pub fn rotation(theta: &Vector3<f64>) -> Matrix3<f64> {
    let (sa, ca) = theta[0].sin_cos();
    let (sb, cb) = theta[1].sin_cos();
    let (sg, cg) = theta[2].sin_cos();

    #[rustfmt::skip]
    let r_z = Matrix3::new(
        ca, -sa, 0.0,
        sa,  ca, 0.0,
        0.0, 0.0, 1.0,
    );
    #[rustfmt::skip]
    let r_y = Matrix3::new(
         cb, 0.0, sb,
        0.0, 1.0, 0.0,
        -sb, 0.0, cb,
    );
    #[rustfmt::skip]
    let r_x = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0,  cg, -sg,
        0.0,  sg,  cg,
    );

    r_z * r_y * r_x
}

/// Returns the matrix `A` mapping Euler-angle derivatives to body-frame
/// curvature (`k = A θ′ / ε`) and angular velocity (`ω = A θ̇`).
///
/// `A` is singular where `cos β = 0`.
#[must_use]
pub fn angular_map(theta: &Vector3<f64>) -> Matrix3<f64> {
    let (sa, ca) = theta[0].sin_cos();
    let (sb, cb) = theta[1].sin_cos();

    #[rustfmt::skip]
    let a = Matrix3::new(
         0.0,  sa, -ca * cb,
         0.0, -ca, -sa * cb,
        -1.0, 0.0,  sb,
    );
    a
}

/// Returns the time derivative `Ȧ` of [`angular_map`] given the Euler angles
/// and their rates.
#[must_use]
pub fn angular_map_rate(theta: &Vector3<f64>, theta_t: &Vector3<f64>) -> Matrix3<f64> {
    let (sa, ca) = theta[0].sin_cos();
    let (sb, cb) = theta[1].sin_cos();
    let (alpha_t, beta_t) = (theta_t[0], theta_t[1]);

    #[rustfmt::skip]
    let a_t = Matrix3::new(
        0.0, ca * alpha_t,  sa * cb * alpha_t + ca * sb * beta_t,
        0.0, sa * alpha_t, -ca * cb * alpha_t + sa * sb * beta_t,
        0.0, 0.0,           cb * beta_t,
    );
    a_t
}
