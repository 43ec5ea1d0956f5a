use std::error::Error as StdError;

/// Errors that end a run after it has started stepping.
///
/// A failed step never discards the frames reported before it; the error is
/// returned alongside them on the [`Trajectory`](super::Trajectory).
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("step {step} (t = {time}) produced a non-finite state")]
    NonFinite { step: usize, time: f64 },

    #[error("discretization failed at step {step} (t = {time}): {source}")]
    Discretization {
        step: usize,
        time: f64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl StepError {
    pub(crate) fn discretization<E: StdError + Send + Sync + 'static>(
        step: usize,
        time: f64,
        err: E,
    ) -> Self {
        Self::Discretization {
            step,
            time,
            source: Box::new(err),
        }
    }

    /// Returns the zero-based index of the failed step.
    #[must_use]
    pub fn step(&self) -> usize {
        match self {
            Self::NonFinite { step, .. } | Self::Discretization { step, .. } => *step,
        }
    }

    /// Returns the time the failed step was advancing to.
    #[must_use]
    pub fn time(&self) -> f64 {
        match self {
            Self::NonFinite { time, .. } | Self::Discretization { time, .. } => *time,
        }
    }
}
