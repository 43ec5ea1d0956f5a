//! First-order Galerkin discretization of an actuated Cosserat rod.
//!
//! [`P1Galerkin`] implements [`Discretization`] with piecewise-linear
//! elements on a uniform arclength grid. Each node carries the centerline
//! `r` and Euler angles `θ`; the balance laws are enforced in weak form,
//!
//! ```text
//! ∫ f_F·φ_r − N·φ_r′ ds = 0
//! ∫ (l_F + r′ × N)·φ_θ − M·φ_θ′ ds = 0
//! ```
//!
//! with free ends. The time-stepper supplies the backward-difference rates
//! and the linearization state, which make every step a single linear
//! solve.

mod element;
mod error;
mod linear;

pub use error::FemError;

use nalgebra::Vector3;
use undulate_core::{
    Discretization, Expression, Grid, LinearSolver, LinearizedStep, ScalarField, SolverOptions,
    State, VectorField,
};

use element::Element;
use linear::BlockTridiagonal;

/// Piecewise-linear elements with vertex quadrature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct P1Galerkin {
    grid: Option<Grid>,
}

impl P1Galerkin {
    /// Creates a discretization whose spaces are built on first use by the
    /// solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grid the spaces were built on, if any.
    #[must_use]
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    fn built(&self) -> Result<&Grid, FemError> {
        self.grid.as_ref().ok_or(FemError::SpacesNotBuilt)
    }
}

impl Discretization for P1Galerkin {
    type Error = FemError;

    fn build_spaces(&mut self, grid: &Grid) -> Result<(), Self::Error> {
        tracing::debug!(points = grid.points(), "building P1 spaces");
        self.grid = Some(*grid);
        Ok(())
    }

    fn assemble_and_solve(
        &self,
        step: &LinearizedStep<'_>,
        options: &SolverOptions,
    ) -> Result<State, Self::Error> {
        let grid = self.built()?;
        let nodes = grid.points();
        for len in [
            step.linearization.len(),
            step.curvature.len(),
            step.shear_stretch.len(),
        ] {
            if len != nodes {
                return Err(FemError::Shape {
                    expected: nodes,
                    found: len,
                });
            }
        }

        let h = grid.spacing();
        let mut system = BlockTridiagonal::zeros(nodes);
        for index in 0..nodes - 1 {
            let (jacobian, offset) = Element::new(step, index, h).linearize();
            system.add_element(index, &jacobian, &offset);
        }

        let solution = match options.linear_solver {
            LinearSolver::BlockTridiagonal => system.solve(),
            LinearSolver::Dense => system.solve_dense(),
        }?;

        let r = solution
            .iter()
            .map(|u| Vector3::new(u[0], u[1], u[2]))
            .collect();
        let theta = solution
            .iter()
            .map(|u| Vector3::new(u[3], u[4], u[5]))
            .collect();
        Ok(State::new(r, theta))
    }

    /// Averages the gradients of the elements adjacent to each node.
    fn gradient(&self, field: &VectorField) -> VectorField {
        let h = self
            .grid
            .map_or_else(|| 1.0 / (field.len().max(2) - 1) as f64, |grid| grid.spacing());
        let elements: Vec<_> = field
            .as_slice()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) / h)
            .collect();
        let last = elements.len() - 1;

        VectorField::from_fn(field.len(), |i| match i {
            0 => elements[0],
            i if i > last => elements[last],
            i => (elements[i - 1] + elements[i]) * 0.5,
        })
    }

    /// Integrates with vertex quadrature, the trapezoidal rule on P1.
    fn integrate(&self, density: &ScalarField) -> f64 {
        let values = density.as_slice();
        let h = self
            .grid
            .map_or_else(|| 1.0 / (values.len().max(2) - 1) as f64, |grid| grid.spacing());
        let total: f64 = values.iter().sum();
        h * (total - 0.5 * (values[0] + values[values.len() - 1]))
    }

    /// Samples `expression` at every node.
    ///
    /// Before [`build_spaces`](Discretization::build_spaces) there are no
    /// nodes, so the result is empty.
    fn evaluate_expression(&self, expression: &Expression, time: f64) -> VectorField {
        match self.grid {
            Some(grid) => grid.arclengths().map(|s| expression(s, time)).collect(),
            None => VectorField::new(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn built(points: usize) -> P1Galerkin {
        let mut fem = P1Galerkin::new();
        fem.build_spaces(&Grid::uniform(points).unwrap()).unwrap();
        fem
    }

    #[test]
    fn gradient_is_exact_for_quadratics_inside() {
        let fem = built(11);
        let field = VectorField::from_fn(11, |i| {
            let s = i as f64 / 10.0;
            Vector3::new(s * s, 2.0 * s, 1.0)
        });

        let gradient = fem.gradient(&field);

        assert_relative_eq!(gradient[5], Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(gradient[0], Vector3::new(0.1, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(gradient[10], Vector3::new(1.9, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn integration_is_exact_for_linear_densities() {
        let fem = built(5);
        let density = ScalarField::from_fn(5, |i| 1.0 + 2.0 * i as f64 / 4.0);

        assert_relative_eq!(fem.integrate(&density), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn expressions_are_sampled_at_nodes() {
        let fem = built(3);

        let field = fem.evaluate_expression(&|s, t| Vector3::new(s, t, s * t), 2.0);

        assert_eq!(field.len(), 3);
        assert_relative_eq!(field[1], Vector3::new(0.5, 2.0, 1.0));
    }

    #[test]
    fn expressions_are_empty_without_spaces() {
        let fem = P1Galerkin::new();

        let field = fem.evaluate_expression(&|s, _| Vector3::new(s, 0.0, 0.0), 0.0);

        assert!(field.is_empty());
    }

    #[test]
    fn solving_requires_built_spaces() {
        let fem = P1Galerkin::new();
        let grid = Grid::uniform(3).unwrap();
        let state = State::straight(&grid);
        let zeros = VectorField::zeros(3);
        let parameters = undulate_core::ModelParameter::default();
        let rate = undulate_core::BackwardRate {
            weight: 1.0,
            r_known: zeros.clone(),
            theta_known: zeros.clone(),
        };
        let step = LinearizedStep {
            step: 0,
            time: 1.0,
            dt: 1.0,
            parameters: &parameters,
            curvature: &zeros,
            shear_stretch: &zeros,
            linearization: &state,
            rate: &rate,
        };

        assert_eq!(
            fem.assemble_and_solve(&step, &SolverOptions::default()),
            Err(FemError::SpacesNotBuilt)
        );
    }
}
