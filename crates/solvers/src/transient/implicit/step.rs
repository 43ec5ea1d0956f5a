use std::sync::Arc;

use undulate_core::{BackwardRate, Discretization, LinearizedStep, ModelParameter, State};

use crate::finite_difference::Coefficients;

use super::{
    Config, Frame, StepError,
    control::{ControlEvaluator, Targets},
    derived::DerivedFields,
    frame::{self, ControlRecord},
    history::HistoryWindow,
};

/// What an accepted step reports.
pub(crate) struct Report {
    pub(crate) frame: Frame,
    pub(crate) control: ControlRecord,
}

/// Advances one run by one implicit step at a time.
pub(crate) struct Stepper<'a, D> {
    discretization: &'a D,
    parameters: &'a ModelParameter,
    config: &'a Config,
    coefficients: Arc<Coefficients>,
    controls: ControlEvaluator<'a>,
    history: HistoryWindow,
    start: f64,
}

impl<'a, D: Discretization> Stepper<'a, D> {
    pub(crate) fn new(
        discretization: &'a D,
        parameters: &'a ModelParameter,
        config: &'a Config,
        coefficients: Arc<Coefficients>,
        controls: ControlEvaluator<'a>,
        initial: State,
        start: f64,
    ) -> Self {
        Self {
            discretization,
            parameters,
            config,
            coefficients,
            controls,
            history: HistoryWindow::seeded(initial, config.order()),
            start,
        }
    }

    /// Returns the time at the end of step `index`.
    pub(crate) fn time(&self, index: usize) -> f64 {
        self.start + (index + 1) as f64 * self.config.dt()
    }

    /// Solves step `index`, reports it if asked, and slides the history.
    ///
    /// # Errors
    ///
    /// Returns an error if the discretization fails or any iterate is not
    /// finite. The history is left untouched on error.
    pub(crate) fn step(&mut self, index: usize, report: bool) -> Result<Option<Report>, StepError> {
        let dt = self.config.dt();
        let time = self.time(index);
        let targets = self.controls.resolve(self.discretization, index, time);
        let rate = self.history.rate(&self.coefficients, dt);

        let solution = self.solve(index, time, &targets, &rate)?;

        // Reported rates come from the same pre-slide window the solve used.
        let report = report.then(|| {
            let stride = self.config.space_stride();
            let derived = DerivedFields::new(
                self.discretization,
                self.parameters,
                &solution,
                &rate,
                &targets,
                time,
            );
            Report {
                frame: frame::assemble(&derived, self.config.report().fields(), stride),
                control: ControlRecord::new(self.discretization, &targets, time, stride),
            }
        });

        self.history.advance(solution);
        Ok(report)
    }

    /// Linearizes around the latest state and solves, refining the
    /// linearization point up to the configured number of iterations.
    fn solve(
        &self,
        index: usize,
        time: f64,
        targets: &Targets,
        rate: &BackwardRate,
    ) -> Result<State, StepError> {
        let picard = self.config.picard();
        let options = self.config.solver();
        let mut linearization = self.history.latest().clone();

        for iteration in 1..=picard.max_iterations() {
            let step = LinearizedStep {
                step: index,
                time,
                dt: self.config.dt(),
                parameters: self.parameters,
                curvature: &targets.curvature,
                shear_stretch: &targets.shear_stretch,
                linearization: &linearization,
                rate,
            };
            let solution = self
                .discretization
                .assemble_and_solve(&step, &options)
                .map_err(|err| StepError::discretization(index, time, err))?;

            if !solution.is_finite() {
                return Err(StepError::NonFinite { step: index, time });
            }

            let change = solution.max_abs_diff(&linearization);
            linearization = solution;

            if picard.max_iterations() > 1 {
                tracing::trace!(step = index, iteration, change, "picard iterate");
            }
            if change <= picard.tolerance() {
                return Ok(linearization);
            }
        }

        if picard.max_iterations() > 1 {
            tracing::warn!(
                step = index,
                time,
                iterations = picard.max_iterations(),
                "picard refinement did not converge, accepting last iterate"
            );
        }
        Ok(linearization)
    }
}
