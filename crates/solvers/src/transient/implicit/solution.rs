use ndarray::Axis;
use undulate_core::{Grid, State};

use super::{ConfigError, ControlSequence, FieldKey, FrameSequence, Series, StepError};

/// Indicates how a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Completed all planned steps.
    Complete,

    /// Stopped at a failed step.
    Failed,
}

/// The result of an implicit run.
///
/// Frames and controls cover every report-eligible step completed before the
/// run ended, whether it completed or failed.
#[derive(Debug)]
pub struct Trajectory {
    pub frames: FrameSequence,
    pub controls: ControlSequence,

    /// The error that stopped the run, if any.
    pub failure: Option<StepError>,

    /// Number of steps accepted.
    pub steps: usize,
}

impl Trajectory {
    #[must_use]
    pub fn status(&self) -> Status {
        if self.failure.is_some() {
            Status::Failed
        } else {
            Status::Complete
        }
    }

    /// Splits the trajectory into frames, controls and the captured failure.
    #[must_use]
    pub fn into_parts(self) -> (FrameSequence, ControlSequence, Option<StepError>) {
        (self.frames, self.controls, self.failure)
    }
}

/// Where and when a run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialCondition {
    pub time: f64,
    pub state: State,
}

impl InitialCondition {
    #[must_use]
    pub fn new(time: f64, state: State) -> Self {
        Self { time, state }
    }

    /// The straight, untwisted rod at `t = 0`.
    #[must_use]
    pub fn straight(grid: &Grid) -> Self {
        Self::new(0.0, State::straight(grid))
    }

    /// Continues from frame `index` of a previous run.
    ///
    /// The frame must carry `t`, `r` and `theta`; the run it seeds checks that
    /// they were reported at full spatial resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range or a required field is
    /// missing.
    pub fn from_frames(frames: &FrameSequence, index: usize) -> Result<Self, ConfigError> {
        if index >= frames.len() {
            return Err(ConfigError::FrameIndex {
                index,
                len: frames.len(),
            });
        }

        let time = frames
            .time()
            .map(|t| t[index])
            .ok_or(ConfigError::MissingField(FieldKey::Time))?;
        let vector = |key| match frames.get(key) {
            Some(Series::Vector(values)) => Ok(values.index_axis(Axis(0), index)),
            _ => Err(ConfigError::MissingField(key)),
        };
        let state = State::from_arrays(
            vector(FieldKey::Centerline)?,
            vector(FieldKey::EulerAngles)?,
        )?;

        Ok(Self { time, state })
    }
}
