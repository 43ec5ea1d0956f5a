use super::Frame;

/// Event emitted by the implicit solver after every accepted step.
#[derive(Debug, Clone)]
pub struct Event {
    /// Zero-based index of the step.
    pub step: usize,

    /// Time at the end of the step.
    pub time: f64,

    /// The frame reported at this step, if the step was report-eligible.
    pub frame: Option<Frame>,
}
