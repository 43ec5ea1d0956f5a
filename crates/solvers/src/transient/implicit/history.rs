use std::collections::VecDeque;

use undulate_core::{BackwardRate, State, VectorField};

use crate::finite_difference::Coefficients;

/// The last `order` accepted states, oldest first.
///
/// The window is seeded with copies of the initial state, so its length is
/// fixed from construction on; [`advance`](Self::advance) drops the oldest
/// state for every state it appends.
#[derive(Debug, Clone)]
pub(crate) struct HistoryWindow {
    states: VecDeque<State>,
}

impl HistoryWindow {
    pub(crate) fn seeded(initial: State, order: usize) -> Self {
        debug_assert!(order > 0);
        let states = std::iter::repeat_n(initial, order).collect();
        Self { states }
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns the most recently accepted state.
    pub(crate) fn latest(&self) -> &State {
        // Seeded with at least one state and never shrinks.
        &self.states[self.states.len() - 1]
    }

    pub(crate) fn advance(&mut self, state: State) {
        self.states.pop_front();
        self.states.push_back(state);
    }

    /// Builds the backward rate stencil for the state following this window.
    ///
    /// The coefficients must span one more sample than the window holds.
    pub(crate) fn rate(&self, coefficients: &Coefficients, dt: f64) -> BackwardRate {
        debug_assert_eq!(coefficients.past_weights().len(), self.len());

        let points = self.latest().len();
        let mut r_known = VectorField::zeros(points);
        let mut theta_known = VectorField::zeros(points);

        for (weight, state) in coefficients.past_weights().iter().zip(&self.states) {
            let scale = weight / dt;
            r_known = state.r.scale_add(scale, &r_known);
            theta_known = state.theta.scale_add(scale, &theta_known);
        }

        BackwardRate {
            weight: coefficients.current_weight() / dt,
            r_known,
            theta_known,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use undulate_core::Grid;

    fn shifted(grid: &Grid, dz: f64) -> State {
        let mut state = State::straight(grid);
        state.r = state.r.map(|r| r + Vector3::new(0.0, 0.0, dz));
        state
    }

    #[test]
    fn length_is_fixed() {
        let grid = Grid::uniform(4).unwrap();
        let mut history = HistoryWindow::seeded(State::straight(&grid), 3);
        assert_eq!(history.len(), 3);

        for i in 0..5 {
            history.advance(shifted(&grid, f64::from(i)));
            assert_eq!(history.len(), 3);
        }
        assert_relative_eq!(history.latest().r[0].z, 4.0);
    }

    #[test]
    fn rate_is_exact_for_linear_motion() {
        let grid = Grid::uniform(3).unwrap();
        let dt = 0.1;
        let speed = 2.0;
        let coefficients = Coefficients::new(1, 2).unwrap();

        let mut history = HistoryWindow::seeded(shifted(&grid, 0.0), 2);
        history.advance(shifted(&grid, speed * dt));
        let next = shifted(&grid, 2.0 * speed * dt);

        let rate = history.rate(&coefficients, dt);
        let velocity = rate.r_rate(&next.r);

        for v in velocity.iter() {
            assert_relative_eq!(*v, Vector3::new(0.0, 0.0, speed), epsilon = 1e-12);
        }
        assert_relative_eq!(rate.weight, 15.0, epsilon = 1e-12);
    }

    #[test]
    fn seeded_window_gives_zero_rate_at_rest() {
        let grid = Grid::uniform(5).unwrap();
        let state = State::straight(&grid);
        let history = HistoryWindow::seeded(state.clone(), 3);

        let rate = history.rate(&Coefficients::new(1, 3).unwrap(), 0.01);

        assert!(rate.r_rate(&state.r).iter().all(|v| v.norm() < 1e-9));
        assert!(rate.theta_rate(&state.theta).iter().all(|v| v.norm() < 1e-9));
    }
}
