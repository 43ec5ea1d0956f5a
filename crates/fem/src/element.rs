//! The linearized residual of one P1 element.
//!
//! Unknowns are ordered `(r_a, θ_a, r_b, θ_b)` for the element's first and
//! second node. Integrals use vertex quadrature, weight `h/2` at each node.
//! With `φ_a′ = −1/h` and `φ_b′ = 1/h` the weak form contributes:
//!
//! ```text
//! R_r_v += h/2 f_F(v)                    R_r_a += ½ Σ_v N(v)    R_r_b −= ½ Σ_v N(v)
//! R_θ_v += h/2 (l_F(v) + r*′ × N(v))     R_θ_a += ½ Σ_v M(v)    R_θ_b −= ½ Σ_v M(v)
//! ```
//!
//! Every coefficient that would multiply two unknowns is taken from the
//! linearization state (marked `*`), so the residual is affine in the
//! unknowns and its Jacobian is recovered exactly by probing with unit vectors.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use undulate_core::{LinearizedStep, kinematics};

pub(crate) type ElementVector = SVector<f64, 12>;
pub(crate) type ElementMatrix = SMatrix<f64, 12, 12>;

/// Per-node coefficients frozen at the linearization state.
struct Vertex {
    theta: Vector3<f64>,
    q: Matrix3<f64>,
    a: Matrix3<f64>,
    translational_drag: Matrix3<f64>,
    r_known: Vector3<f64>,
    theta_known: Vector3<f64>,
    curvature_pref: Vector3<f64>,
    shear_stretch_pref: Vector3<f64>,
}

pub(crate) struct Element<'a> {
    step: &'a LinearizedStep<'a>,
    h: f64,
    vertices: [Vertex; 2],
    /// `r*′`
    tangent: Vector3<f64>,
    /// `|r*′|`
    stretch: f64,
    /// `θ*′`
    theta_s: Vector3<f64>,
}

impl<'a> Element<'a> {
    /// Freezes the coefficients of the element spanning nodes `index` and
    /// `index + 1`.
    pub(crate) fn new(step: &'a LinearizedStep<'a>, index: usize, h: f64) -> Self {
        let lin = step.linearization;
        let vertex = |i: usize| {
            let theta = lin.theta[i];
            let q = kinematics::rotation(&theta);
            Vertex {
                theta,
                q,
                a: kinematics::angular_map(&theta),
                translational_drag: step
                    .parameters
                    .translational_drag(&q.tr_mul(&kinematics::E3)),
                r_known: step.rate.r_known[i],
                theta_known: step.rate.theta_known[i],
                curvature_pref: step.curvature[i],
                shear_stretch_pref: step.shear_stretch[i],
            }
        };

        let tangent = (lin.r[index + 1] - lin.r[index]) / h;
        Self {
            step,
            h,
            vertices: [vertex(index), vertex(index + 1)],
            tangent,
            stretch: tangent.norm(),
            theta_s: (lin.theta[index + 1] - lin.theta[index]) / h,
        }
    }

    /// Returns the element Jacobian `K` and offset `R(0)`, so that the
    /// residual is `R(u) = R(0) + K u`.
    pub(crate) fn linearize(&self) -> (ElementMatrix, ElementVector) {
        let offset = self.residual(&ElementVector::zeros());
        let mut jacobian = ElementMatrix::zeros();
        for j in 0..12 {
            let probe = self.residual(&ElementVector::ith(j, 1.0));
            jacobian.set_column(j, &(probe - offset));
        }
        (jacobian, offset)
    }

    /// Evaluates the linearized residual at the local unknowns `u`.
    pub(crate) fn residual(&self, u: &ElementVector) -> ElementVector {
        let p = self.step.parameters;
        let w = self.step.rate.weight;
        let h = self.h;

        let r = [u.fixed_rows::<3>(0).into_owned(), u.fixed_rows::<3>(6).into_owned()];
        let theta = [u.fixed_rows::<3>(3).into_owned(), u.fixed_rows::<3>(9).into_owned()];

        let r_t = [0, 1].map(|v| r[v] * w + self.vertices[v].r_known);
        let theta_t = [0, 1].map(|v| theta[v] * w + self.vertices[v].theta_known);

        let r_s = (r[1] - r[0]) / h;
        let theta_s = (theta[1] - theta[0]) / h;
        let r_t_s = (r_t[1] - r_t[0]) / h;
        let theta_t_s = (theta_t[1] - theta_t[0]) / h;

        let rotational_drag = p.rotational_drag();
        let mut residual = ElementVector::zeros();

        for (v, vertex) in self.vertices.iter().enumerate() {
            let q = &vertex.q;
            let a = &vertex.a;
            let omega = a * theta_t[v];
            let a_t = kinematics::angular_map_rate(&vertex.theta, &theta_t[v]);

            let sigma = q * r_s - kinematics::E3;
            let sigma_t = q * r_t_s - omega.cross(&(q * self.tangent));
            let k = a * theta_s / self.stretch;
            let k_t = (a * theta_t_s + a_t * self.theta_s) / self.stretch;

            let n = q.tr_mul(
                &(p.s * (sigma - vertex.shear_stretch_pref) + p.s_tilde * sigma_t),
            );
            let m = q.tr_mul(&(p.b * (k - vertex.curvature_pref) + p.b_tilde * k_t));
            let f_fluid = -(vertex.translational_drag * r_t[v]);
            let l_fluid = -q.tr_mul(&(rotational_drag * omega));

            let base = 6 * v;
            add(&mut residual, base, &(f_fluid * (0.5 * h)));
            add(
                &mut residual,
                base + 3,
                &((l_fluid + self.tangent.cross(&n)) * (0.5 * h)),
            );

            add(&mut residual, 0, &(n * 0.5));
            add(&mut residual, 6, &(-n * 0.5));
            add(&mut residual, 3, &(m * 0.5));
            add(&mut residual, 9, &(-m * 0.5));
        }

        residual
    }
}

fn add(residual: &mut ElementVector, offset: usize, value: &Vector3<f64>) {
    let mut rows = residual.fixed_rows_mut::<3>(offset);
    rows += value;
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use undulate_core::{BackwardRate, Grid, ModelParameter, State, VectorField};

    struct Fixture {
        parameters: ModelParameter,
        curvature: VectorField,
        shear_stretch: VectorField,
        linearization: State,
        rate: BackwardRate,
    }

    impl Fixture {
        fn new() -> Self {
            let grid = Grid::uniform(2).unwrap();
            let mut linearization = State::straight(&grid);
            linearization.theta = VectorField::new(vec![
                Vector3::new(0.1, -0.2, 0.3),
                Vector3::new(0.2, 0.1, -0.1),
            ]);
            linearization.r = VectorField::new(vec![
                Vector3::new(0.0, 0.05, 0.0),
                Vector3::new(0.1, -0.02, 0.95),
            ]);
            Self {
                parameters: ModelParameter::default(),
                curvature: VectorField::constant(2, Vector3::new(0.4, 0.0, 0.0)),
                shear_stretch: VectorField::zeros(2),
                rate: BackwardRate {
                    weight: 20.0,
                    r_known: linearization.r.map(|r| -r * 20.0),
                    theta_known: linearization.theta.map(|t| -t * 20.0),
                },
                linearization,
            }
        }

        fn step(&self) -> LinearizedStep<'_> {
            LinearizedStep {
                step: 0,
                time: 0.05,
                dt: 0.05,
                parameters: &self.parameters,
                curvature: &self.curvature,
                shear_stretch: &self.shear_stretch,
                linearization: &self.linearization,
                rate: &self.rate,
            }
        }
    }

    #[test]
    fn probed_jacobian_reproduces_the_residual() {
        let fixture = Fixture::new();
        let step = fixture.step();
        let element = Element::new(&step, 0, 1.0);
        let (jacobian, offset) = element.linearize();

        let u = ElementVector::from_fn(|i, _| 0.1 * (i as f64 + 1.0).sin());

        assert_relative_eq!(
            element.residual(&u),
            offset + jacobian * u,
            epsilon = 1e-10
        );
    }

    #[test]
    fn residual_balances_internal_forces() {
        // Without drag the force rows of one element sum to zero: the two
        // nodes receive equal and opposite internal force.
        let fixture = Fixture::new();
        let step = fixture.step();
        let element = Element::new(&step, 0, 1.0);

        let u = ElementVector::from_fn(|i, _| 0.2 * (i as f64).cos());
        let with_drag = element.residual(&u);
        let drag_only: Vector3<f64> = (0..2)
            .map(|v| {
                let r_t = u.fixed_rows::<3>(6 * v).into_owned() * 20.0
                    + element.vertices[v].r_known;
                -(element.vertices[v].translational_drag * r_t) * 0.5
            })
            .sum();

        let total = with_drag.fixed_rows::<3>(0) + with_drag.fixed_rows::<3>(6);
        assert_relative_eq!(total.into_owned(), drag_only, epsilon = 1e-10);
    }

    #[test]
    fn straight_rod_at_rest_has_zero_residual() {
        let grid = Grid::uniform(2).unwrap();
        let rest = State::straight(&grid);
        let parameters = ModelParameter::default();
        let zeros = VectorField::zeros(2);
        let rate = BackwardRate {
            weight: 10.0,
            r_known: rest.r.map(|r| -r * 10.0),
            theta_known: VectorField::zeros(2),
        };
        let step = LinearizedStep {
            step: 0,
            time: 0.1,
            dt: 0.1,
            parameters: &parameters,
            curvature: &zeros,
            shear_stretch: &zeros,
            linearization: &rest,
            rate: &rate,
        };
        let element = Element::new(&step, 0, 1.0);

        let mut u = ElementVector::zeros();
        u.fixed_rows_mut::<3>(6).copy_from(&Vector3::new(0.0, 0.0, 1.0));

        assert_relative_eq!(element.residual(&u), ElementVector::zeros(), epsilon = 1e-12);
    }
}
