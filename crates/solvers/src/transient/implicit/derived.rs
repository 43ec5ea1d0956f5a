//! Kinematic, dynamic and energetic quantities of one solved step.
//!
//! Every quantity is a lazily evaluated cell: it is computed from its
//! dependencies the first time it is requested and returned from the cell
//! afterwards. A [`DerivedFields`] borrows one step's state and is dropped
//! once that step's frame is assembled.

use std::cell::OnceCell;

use nalgebra::{Matrix3, Vector3};
use undulate_core::{
    BackwardRate, Discretization, ModelParameter, ScalarField, State, VectorField,
    kinematics::{self, E1, E2, E3},
};

use super::control::Targets;

pub(crate) struct DerivedFields<'a, D> {
    discretization: &'a D,
    parameters: &'a ModelParameter,
    state: &'a State,
    rate: &'a BackwardRate,
    targets: &'a Targets,
    time: f64,

    rotation: OnceCell<Vec<Matrix3<f64>>>,
    angular_map: OnceCell<Vec<Matrix3<f64>>>,
    angular_map_rate: OnceCell<Vec<Matrix3<f64>>>,
    directors: [OnceCell<VectorField>; 3],
    r_s: OnceCell<VectorField>,
    theta_s: OnceCell<VectorField>,
    stretch: OnceCell<ScalarField>,
    velocity: OnceCell<VectorField>,
    euler_rate: OnceCell<VectorField>,
    velocity_s: OnceCell<VectorField>,
    euler_rate_s: OnceCell<VectorField>,
    angular_velocity: OnceCell<VectorField>,
    body_tangent: OnceCell<VectorField>,
    shear_stretch: OnceCell<VectorField>,
    curvature: OnceCell<VectorField>,
    shear_stretch_rate: OnceCell<VectorField>,
    curvature_rate: OnceCell<VectorField>,
    internal_force: OnceCell<VectorField>,
    internal_torque: OnceCell<VectorField>,
    fluid_force: OnceCell<VectorField>,
    fluid_torque: OnceCell<VectorField>,
    muscle_force: OnceCell<VectorField>,
    muscle_torque: OnceCell<VectorField>,
    potential: OnceCell<f64>,
    potential_rate: OnceCell<f64>,
    fluid_dissipation_rate: OnceCell<f64>,
    internal_dissipation_rate: OnceCell<f64>,
    actuation_power: OnceCell<f64>,
    curvature_norm: OnceCell<f64>,
    shear_stretch_norm: OnceCell<f64>,
}

impl<'a, D: Discretization> DerivedFields<'a, D> {
    pub(crate) fn new(
        discretization: &'a D,
        parameters: &'a ModelParameter,
        state: &'a State,
        rate: &'a BackwardRate,
        targets: &'a Targets,
        time: f64,
    ) -> Self {
        Self {
            discretization,
            parameters,
            state,
            rate,
            targets,
            time,
            rotation: OnceCell::new(),
            angular_map: OnceCell::new(),
            angular_map_rate: OnceCell::new(),
            directors: [OnceCell::new(), OnceCell::new(), OnceCell::new()],
            r_s: OnceCell::new(),
            theta_s: OnceCell::new(),
            stretch: OnceCell::new(),
            velocity: OnceCell::new(),
            euler_rate: OnceCell::new(),
            velocity_s: OnceCell::new(),
            euler_rate_s: OnceCell::new(),
            angular_velocity: OnceCell::new(),
            body_tangent: OnceCell::new(),
            shear_stretch: OnceCell::new(),
            curvature: OnceCell::new(),
            shear_stretch_rate: OnceCell::new(),
            curvature_rate: OnceCell::new(),
            internal_force: OnceCell::new(),
            internal_torque: OnceCell::new(),
            fluid_force: OnceCell::new(),
            fluid_torque: OnceCell::new(),
            muscle_force: OnceCell::new(),
            muscle_torque: OnceCell::new(),
            potential: OnceCell::new(),
            potential_rate: OnceCell::new(),
            fluid_dissipation_rate: OnceCell::new(),
            internal_dissipation_rate: OnceCell::new(),
            actuation_power: OnceCell::new(),
            curvature_norm: OnceCell::new(),
            shear_stretch_norm: OnceCell::new(),
        }
    }

    pub(crate) fn discretization(&self) -> &D {
        self.discretization
    }

    pub(crate) fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn state(&self) -> &State {
        self.state
    }

    /// `Q`, lab to body frame.
    pub(crate) fn rotation(&self) -> &[Matrix3<f64>] {
        self.rotation
            .get_or_init(|| self.state.theta.iter().map(kinematics::rotation).collect())
    }

    /// `A`, Euler-angle derivatives to body-frame rates.
    pub(crate) fn angular_map(&self) -> &[Matrix3<f64>] {
        self.angular_map
            .get_or_init(|| self.state.theta.iter().map(kinematics::angular_map).collect())
    }

    pub(crate) fn angular_map_rate(&self) -> &[Matrix3<f64>] {
        self.angular_map_rate.get_or_init(|| {
            self.state
                .theta
                .iter()
                .zip(self.euler_rate().iter())
                .map(|(theta, theta_t)| kinematics::angular_map_rate(theta, theta_t))
                .collect()
        })
    }

    /// The director `d_{index+1} = Qᵀ e_{index+1}`.
    pub(crate) fn director(&self, index: usize) -> &VectorField {
        let basis = [E1, E2, E3][index];
        self.directors[index]
            .get_or_init(|| self.rotation().iter().map(|q| q.tr_mul(&basis)).collect())
    }

    pub(crate) fn r_s(&self) -> &VectorField {
        self.r_s
            .get_or_init(|| self.discretization.gradient(&self.state.r))
    }

    pub(crate) fn theta_s(&self) -> &VectorField {
        self.theta_s
            .get_or_init(|| self.discretization.gradient(&self.state.theta))
    }

    /// `ε = |r′|`.
    pub(crate) fn stretch(&self) -> &ScalarField {
        self.stretch.get_or_init(|| self.r_s().norm())
    }

    /// `ṙ`.
    pub(crate) fn velocity(&self) -> &VectorField {
        self.velocity
            .get_or_init(|| self.rate.r_rate(&self.state.r))
    }

    /// `θ̇`.
    pub(crate) fn euler_rate(&self) -> &VectorField {
        self.euler_rate
            .get_or_init(|| self.rate.theta_rate(&self.state.theta))
    }

    fn velocity_s(&self) -> &VectorField {
        self.velocity_s
            .get_or_init(|| self.discretization.gradient(self.velocity()))
    }

    fn euler_rate_s(&self) -> &VectorField {
        self.euler_rate_s
            .get_or_init(|| self.discretization.gradient(self.euler_rate()))
    }

    /// `ω = A θ̇`, body frame.
    pub(crate) fn angular_velocity(&self) -> &VectorField {
        self.angular_velocity
            .get_or_init(|| apply(self.angular_map(), self.euler_rate()))
    }

    /// `Q r′`, the tangent in the body frame.
    fn body_tangent(&self) -> &VectorField {
        self.body_tangent
            .get_or_init(|| apply(self.rotation(), self.r_s()))
    }

    /// `σ = Q r′ − e₃`.
    pub(crate) fn shear_stretch(&self) -> &VectorField {
        self.shear_stretch
            .get_or_init(|| self.body_tangent().map(|t| t - E3))
    }

    /// `k = A θ′ / ε`.
    pub(crate) fn curvature(&self) -> &VectorField {
        self.curvature.get_or_init(|| {
            apply(self.angular_map(), self.theta_s())
                .iter()
                .zip(self.stretch().iter())
                .map(|(v, eps)| v / *eps)
                .collect()
        })
    }

    /// `σ̇ = Q ṙ′ − ω × (Q r′)`.
    pub(crate) fn shear_stretch_rate(&self) -> &VectorField {
        self.shear_stretch_rate.get_or_init(|| {
            apply(self.rotation(), self.velocity_s())
                .iter()
                .zip(self.angular_velocity().iter())
                .zip(self.body_tangent().iter())
                .map(|((q_rt_s, w), t)| q_rt_s - w.cross(t))
                .collect()
        })
    }

    /// `k̇ = (A θ̇′ + Ȧ θ′) / ε`.
    pub(crate) fn curvature_rate(&self) -> &VectorField {
        self.curvature_rate.get_or_init(|| {
            let spatial = apply(self.angular_map(), self.euler_rate_s());
            let temporal = apply(self.angular_map_rate(), self.theta_s());
            spatial
                .iter()
                .zip(temporal.iter())
                .zip(self.stretch().iter())
                .map(|((a, b), eps)| (a + b) / *eps)
                .collect()
        })
    }

    /// `N = Qᵀ (S (σ − σ_pref) + S̃ σ̇)`, lab frame.
    pub(crate) fn internal_force(&self) -> &VectorField {
        self.internal_force.get_or_init(|| {
            let p = self.parameters;
            let body: VectorField = self
                .shear_stretch()
                .iter()
                .zip(self.targets.shear_stretch.iter())
                .zip(self.shear_stretch_rate().iter())
                .map(|((sig, pref), sig_t)| p.s * (sig - pref) + p.s_tilde * sig_t)
                .collect();
            apply_transpose(self.rotation(), &body)
        })
    }

    /// `M = Qᵀ (B (k − k_pref) + B̃ k̇)`, lab frame.
    pub(crate) fn internal_torque(&self) -> &VectorField {
        self.internal_torque.get_or_init(|| {
            let p = self.parameters;
            let body: VectorField = self
                .curvature()
                .iter()
                .zip(self.targets.curvature.iter())
                .zip(self.curvature_rate().iter())
                .map(|((k, pref), k_t)| p.b * (k - pref) + p.b_tilde * k_t)
                .collect();
            apply_transpose(self.rotation(), &body)
        })
    }

    /// `f_F = −(d₃d₃ᵀ + C (I − d₃d₃ᵀ)) ṙ`.
    pub(crate) fn fluid_force(&self) -> &VectorField {
        self.fluid_force.get_or_init(|| {
            self.director(2)
                .zip_map(self.velocity(), |d3, r_t| {
                    -(self.parameters.translational_drag(d3) * r_t)
                })
        })
    }

    /// `l_F = −Qᵀ D (e₃e₃ᵀ + Y (I − e₃e₃ᵀ)) ω`, lab frame.
    pub(crate) fn fluid_torque(&self) -> &VectorField {
        self.fluid_torque.get_or_init(|| {
            let drag = self.parameters.rotational_drag();
            let body = self.angular_velocity().map(|w| -(drag * w));
            apply_transpose(self.rotation(), &body)
        })
    }

    /// `f_M = S σ_pref`.
    pub(crate) fn muscle_force(&self) -> &VectorField {
        self.muscle_force.get_or_init(|| {
            let s = self.parameters.s;
            self.targets.shear_stretch.map(|pref| s * pref)
        })
    }

    /// `l_M = B k_pref`.
    pub(crate) fn muscle_torque(&self) -> &VectorField {
        self.muscle_torque.get_or_init(|| {
            let b = self.parameters.b;
            self.targets.curvature.map(|pref| b * pref)
        })
    }

    /// `V = ½ ∫ k·B k + σ·S σ ds`.
    pub(crate) fn potential(&self) -> f64 {
        *self.potential.get_or_init(|| {
            let p = self.parameters;
            let density = quadratic(self.curvature(), &p.b, self.curvature())
                .zip_map(
                    &quadratic(self.shear_stretch(), &p.s, self.shear_stretch()),
                    |a, b| 0.5 * (a + b),
                );
            self.discretization.integrate(&density)
        })
    }

    /// `V̇ = ∫ k·B k̇ + σ·S σ̇ ds`.
    pub(crate) fn potential_rate(&self) -> f64 {
        *self.potential_rate.get_or_init(|| {
            let p = self.parameters;
            let density = quadratic(self.curvature(), &p.b, self.curvature_rate()).zip_map(
                &quadratic(self.shear_stretch(), &p.s, self.shear_stretch_rate()),
                |a, b| a + b,
            );
            self.discretization.integrate(&density)
        })
    }

    /// `Ḋ_F = ∫ f_F·ṙ + (Q l_F)·ω ds`.
    pub(crate) fn fluid_dissipation_rate(&self) -> f64 {
        *self.fluid_dissipation_rate.get_or_init(|| {
            let body_torque = apply(self.rotation(), self.fluid_torque());
            let density = self.fluid_force().dot(self.velocity()).zip_map(
                &body_torque.dot(self.angular_velocity()),
                |a, b| a + b,
            );
            self.discretization.integrate(&density)
        })
    }

    /// `Ḋ_I = −∫ σ̇·S̃ σ̇ + k̇·B̃ k̇ ds`.
    pub(crate) fn internal_dissipation_rate(&self) -> f64 {
        *self.internal_dissipation_rate.get_or_init(|| {
            let p = self.parameters;
            let density = quadratic(
                self.shear_stretch_rate(),
                &p.s_tilde,
                self.shear_stretch_rate(),
            )
            .zip_map(
                &quadratic(self.curvature_rate(), &p.b_tilde, self.curvature_rate()),
                |a, b| -(a + b),
            );
            self.discretization.integrate(&density)
        })
    }

    /// `Ẇ = ∫ f_M·(Q ṙ) + l_M·ω ds`.
    pub(crate) fn actuation_power(&self) -> f64 {
        *self.actuation_power.get_or_init(|| {
            let body_velocity = apply(self.rotation(), self.velocity());
            let density = self.muscle_force().dot(&body_velocity).zip_map(
                &self.muscle_torque().dot(self.angular_velocity()),
                |a, b| a + b,
            );
            self.discretization.integrate(&density)
        })
    }

    /// `(∫ |k − k_pref|² ds)^½`.
    pub(crate) fn curvature_norm(&self) -> f64 {
        *self
            .curvature_norm
            .get_or_init(|| self.deviation_norm(self.curvature(), &self.targets.curvature))
    }

    /// `(∫ |σ − σ_pref|² ds)^½`.
    pub(crate) fn shear_stretch_norm(&self) -> f64 {
        *self.shear_stretch_norm.get_or_init(|| {
            self.deviation_norm(self.shear_stretch(), &self.targets.shear_stretch)
        })
    }

    fn deviation_norm(&self, actual: &VectorField, preferred: &VectorField) -> f64 {
        let density: ScalarField = actual
            .iter()
            .zip(preferred.iter())
            .map(|(a, p)| (a - p).norm_squared())
            .collect();
        self.discretization.integrate(&density).max(0.0).sqrt()
    }
}

fn apply(matrices: &[Matrix3<f64>], field: &VectorField) -> VectorField {
    matrices.iter().zip(field.iter()).map(|(m, v)| m * v).collect()
}

fn apply_transpose(matrices: &[Matrix3<f64>], field: &VectorField) -> VectorField {
    matrices.iter().zip(field.iter()).map(|(m, v)| m.tr_mul(v)).collect()
}

/// `a·M b` at every node.
fn quadratic(a: &VectorField, m: &Matrix3<f64>, b: &VectorField) -> ScalarField {
    a.iter()
        .zip(b.iter())
        .map(|(a, b): (&Vector3<f64>, &Vector3<f64>)| a.dot(&(m * b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use undulate_core::Grid;

    use crate::{
        finite_difference::Coefficients,
        transient::implicit::{history::HistoryWindow, test_utils::Drift},
    };

    struct Fixture {
        disc: Drift,
        parameters: ModelParameter,
        state: State,
        rate: BackwardRate,
        targets: Targets,
    }

    impl Fixture {
        /// A rod that moved from `previous` to `state` in one step of `dt`.
        fn new(previous: State, state: State, dt: f64, targets: Targets) -> Self {
            let grid = Grid::uniform(state.len()).unwrap();
            let history = HistoryWindow::seeded(previous, 1);
            Self {
                disc: Drift::on(&grid),
                parameters: ModelParameter::default(),
                rate: history.rate(&Coefficients::new(1, 1).unwrap(), dt),
                state,
                targets,
            }
        }

        fn fields(&self) -> DerivedFields<'_, Drift> {
            DerivedFields::new(
                &self.disc,
                &self.parameters,
                &self.state,
                &self.rate,
                &self.targets,
                0.1,
            )
        }
    }

    fn zero_targets(points: usize) -> Targets {
        Targets {
            curvature: VectorField::zeros(points),
            shear_stretch: VectorField::zeros(points),
        }
    }

    /// A planar arc of curvature `kappa` in the x–z plane, bending about `d2`.
    fn arc(points: usize, kappa: f64) -> State {
        let grid = Grid::uniform(points).unwrap();
        let r = grid
            .arclengths()
            .map(|s| {
                Vector3::new(
                    (1.0 - (kappa * s).cos()) / kappa,
                    0.0,
                    (kappa * s).sin() / kappa,
                )
            })
            .collect();
        // Q = R_y(β) has d3 = (−sin β, 0, cos β), tangent to the arc for β = −κs.
        let theta = grid
            .arclengths()
            .map(|s| Vector3::new(0.0, -kappa * s, 0.0))
            .collect();
        State::new(r, theta)
    }

    #[test]
    fn straight_rod_at_rest_is_unloaded() {
        let grid = Grid::uniform(11).unwrap();
        let state = State::straight(&grid);
        let fixture = Fixture::new(state.clone(), state, 0.01, zero_targets(11));
        let fields = fixture.fields();

        for i in 0..11 {
            assert_relative_eq!(fields.internal_force()[i], Vector3::zeros(), epsilon = 1e-12);
            assert_relative_eq!(fields.internal_torque()[i], Vector3::zeros(), epsilon = 1e-12);
            assert_relative_eq!(fields.fluid_force()[i], Vector3::zeros(), epsilon = 1e-12);
            assert_relative_eq!(fields.director(2)[i], E3, epsilon = 1e-14);
        }
        assert_relative_eq!(fields.potential(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(fields.fluid_dissipation_rate(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(fields.internal_dissipation_rate(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(fields.stretch()[5], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn arc_has_uniform_curvature_and_no_shear() {
        let kappa = 1.5;
        let state = arc(201, kappa);
        let fixture = Fixture::new(state.clone(), state, 0.01, zero_targets(201));
        let fields = fixture.fields();

        // Interior nodes, where recovered gradients are second order.
        for i in [50, 100, 150] {
            let k = fields.curvature()[i];
            assert_relative_eq!(k.norm(), kappa, epsilon = 1e-3);
            assert_relative_eq!(fields.shear_stretch()[i].norm(), 0.0, epsilon = 1e-3);
        }

        // V = ½ B κ² over unit length with B = I.
        assert_relative_eq!(fields.potential(), 0.5 * kappa * kappa, epsilon = 1e-2);
        assert!(fields.curvature_norm() > 0.0);
    }

    #[test]
    fn potential_is_non_negative_and_dissipation_non_positive() {
        let previous = arc(41, 0.8);
        let state = arc(41, 1.1);
        let mut moved = state.clone();
        moved.r = moved.r.map(|r| r + Vector3::new(0.02, -0.01, 0.005));
        let fixture = Fixture::new(previous, moved, 0.05, zero_targets(41));
        let fields = fixture.fields();

        assert!(fields.potential() >= 0.0);
        assert!(fields.fluid_dissipation_rate() <= 0.0);
        assert!(fields.internal_dissipation_rate() <= 0.0);
    }

    #[test]
    fn rigid_translation_only_sees_fluid_drag() {
        let grid = Grid::uniform(21).unwrap();
        let previous = State::straight(&grid);
        let mut state = previous.clone();
        // Sideways motion, normal to the tangent.
        state.r = state.r.map(|r| r + Vector3::new(0.1, 0.0, 0.0));
        let fixture = Fixture::new(previous, state, 0.1, zero_targets(21));
        let fields = fixture.fields();

        assert_relative_eq!(fields.velocity()[3], Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            fields.fluid_force()[3],
            Vector3::new(-fixture.parameters.c, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(fields.shear_stretch_rate()[3], Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(
            fields.fluid_dissipation_rate(),
            -fixture.parameters.c,
            epsilon = 1e-12
        );
    }

    #[test]
    fn muscle_terms_scale_the_targets() {
        let grid = Grid::uniform(5).unwrap();
        let state = State::straight(&grid);
        let targets = Targets {
            curvature: VectorField::constant(5, Vector3::new(2.0, 0.0, 0.0)),
            shear_stretch: VectorField::constant(5, Vector3::new(0.0, 0.0, -0.5)),
        };
        let mut fixture = Fixture::new(state.clone(), state, 0.1, targets);
        fixture.parameters = fixture.parameters.with_bending(
            Matrix3::from_diagonal_element(3.0),
            Matrix3::zeros(),
        );
        let fields = fixture.fields();

        assert_relative_eq!(fields.muscle_torque()[0], Vector3::new(6.0, 0.0, 0.0));
        assert_relative_eq!(fields.muscle_force()[4], Vector3::new(0.0, 0.0, -0.5));
        // Elastic torque resists the preferred curvature on a straight rod.
        assert_relative_eq!(
            fields.internal_torque()[2],
            Vector3::new(-6.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(fields.curvature_norm(), 2.0, epsilon = 1e-12);
    }
}
