use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, s, stack};
use undulate_core::{Discretization, ScalarField, VectorField};

use super::{
    FieldKey, FieldKind,
    control::Targets,
    derived::DerivedFields,
};

/// One reported quantity at one instant.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    /// One value per reported node.
    Profile(Array1<f64>),
    /// One 3-vector per reported node, shaped `3×S`.
    Vector(Array2<f64>),
}

impl FieldValue {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Scalar(_) => FieldKind::Scalar,
            Self::Profile(_) => FieldKind::Profile,
            Self::Vector(_) => FieldKind::Vector,
        }
    }
}

/// The reported quantities of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    fields: BTreeMap<FieldKey, FieldValue>,
}

impl Frame {
    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key)
    }

    /// Returns the reported time, if `t` was requested.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        match self.fields.get(&FieldKey::Time) {
            Some(FieldValue::Scalar(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (*key, value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builds the frame of one step from its derived quantities.
///
/// Spatial quantities are projected by the discretization and keep every
/// `stride`th node, starting with the first.
pub(crate) fn assemble<D: Discretization>(
    derived: &DerivedFields<'_, D>,
    keys: &[FieldKey],
    stride: usize,
) -> Frame {
    let vector = |field: &VectorField| {
        let projected = derived.discretization().project(field);
        FieldValue::Vector(subsample_vector(projected.view(), stride))
    };
    let profile = |field: &ScalarField| {
        FieldValue::Profile(subsample_profile(field.to_array().view(), stride))
    };

    let fields = keys
        .iter()
        .map(|&key| {
            let value = match key {
                FieldKey::Time => FieldValue::Scalar(derived.time()),
                FieldKey::Centerline => vector(&derived.state().r),
                FieldKey::EulerAngles => vector(&derived.state().theta),
                FieldKey::Director1 => vector(derived.director(0)),
                FieldKey::Director2 => vector(derived.director(1)),
                FieldKey::Director3 => vector(derived.director(2)),
                FieldKey::Curvature => vector(derived.curvature()),
                FieldKey::ShearStretch => vector(derived.shear_stretch()),
                FieldKey::CurvatureNorm => FieldValue::Scalar(derived.curvature_norm()),
                FieldKey::ShearStretchNorm => FieldValue::Scalar(derived.shear_stretch_norm()),
                FieldKey::Stretch => profile(derived.stretch()),
                FieldKey::Velocity => vector(derived.velocity()),
                FieldKey::AngularVelocity => vector(derived.angular_velocity()),
                FieldKey::CurvatureRate => vector(derived.curvature_rate()),
                FieldKey::ShearStretchRate => vector(derived.shear_stretch_rate()),
                FieldKey::FluidForce => vector(derived.fluid_force()),
                FieldKey::FluidTorque => vector(derived.fluid_torque()),
                FieldKey::MuscleForce => vector(derived.muscle_force()),
                FieldKey::MuscleTorque => vector(derived.muscle_torque()),
                FieldKey::InternalForce => vector(derived.internal_force()),
                FieldKey::InternalTorque => vector(derived.internal_torque()),
                FieldKey::FluidDissipationRate => {
                    FieldValue::Scalar(derived.fluid_dissipation_rate())
                }
                FieldKey::InternalDissipationRate => {
                    FieldValue::Scalar(derived.internal_dissipation_rate())
                }
                FieldKey::ActuationPower => FieldValue::Scalar(derived.actuation_power()),
                FieldKey::PotentialRate => FieldValue::Scalar(derived.potential_rate()),
                FieldKey::Potential => FieldValue::Scalar(derived.potential()),
            };
            debug_assert!(value.kind() == key.kind());
            (key, value)
        })
        .collect();

    Frame { fields }
}

fn subsample_profile(values: ArrayView1<'_, f64>, stride: usize) -> Array1<f64> {
    values.slice(s![..;stride]).to_owned()
}

fn subsample_vector(values: ArrayView2<'_, f64>, stride: usize) -> Array2<f64> {
    values.slice(s![.., ..;stride]).to_owned()
}

/// The resolved muscle signal of one reported step.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ControlRecord {
    time: f64,
    curvature: Array2<f64>,
    shear_stretch: Array2<f64>,
}

impl ControlRecord {
    pub(crate) fn new<D: Discretization>(
        discretization: &D,
        targets: &Targets,
        time: f64,
        stride: usize,
    ) -> Self {
        let project = |field: &VectorField| {
            subsample_vector(discretization.project(field).view(), stride)
        };
        Self {
            time,
            curvature: project(&targets.curvature),
            shear_stretch: project(&targets.shear_stretch),
        }
    }
}

/// One reported quantity over every reported step, time-major.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    /// Shaped `(T)`.
    Scalar(Array1<f64>),
    /// Shaped `(T, S)`.
    Profile(Array2<f64>),
    /// Shaped `(T, 3, S)`.
    Vector(Array3<f64>),
}

impl Series {
    /// Returns the number of reported steps.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(a) => a.len_of(Axis(0)),
            Self::Profile(a) => a.len_of(Axis(0)),
            Self::Vector(a) => a.len_of(Axis(0)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every reported frame of a run, stacked per quantity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSequence {
    fields: BTreeMap<FieldKey, Series>,
    len: usize,
}

impl FrameSequence {
    /// Stacks the quantities present on the first frame across all frames.
    ///
    /// # Panics
    ///
    /// Panics if a later frame lacks a quantity of the first, or reports it
    /// with a different shape. Frames assembled within one run never do.
    #[must_use]
    pub fn from_frames(frames: &[Frame]) -> Self {
        let Some(first) = frames.first() else {
            return Self::default();
        };

        let fields = first
            .iter()
            .map(|(key, value)| {
                let series = match value {
                    FieldValue::Scalar(_) => Series::Scalar(
                        frames
                            .iter()
                            .map(|frame| match frame.get(key) {
                                Some(FieldValue::Scalar(x)) => *x,
                                _ => mismatch(key),
                            })
                            .collect(),
                    ),
                    FieldValue::Profile(_) => {
                        let views: Vec<_> = frames
                            .iter()
                            .map(|frame| match frame.get(key) {
                                Some(FieldValue::Profile(a)) => a.view(),
                                _ => mismatch(key),
                            })
                            .collect();
                        Series::Profile(
                            stack(Axis(0), &views)
                                .expect("frames of one run share spatial resolution"),
                        )
                    }
                    FieldValue::Vector(_) => {
                        let views: Vec<_> = frames
                            .iter()
                            .map(|frame| match frame.get(key) {
                                Some(FieldValue::Vector(a)) => a.view(),
                                _ => mismatch(key),
                            })
                            .collect();
                        Series::Vector(
                            stack(Axis(0), &views)
                                .expect("frames of one run share spatial resolution"),
                        )
                    }
                };
                (key, series)
            })
            .collect();

        Self {
            fields,
            len: frames.len(),
        }
    }

    /// Returns the number of reported steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&Series> {
        self.fields.get(&key)
    }

    /// Returns the reported times, if `t` was requested.
    #[must_use]
    pub fn time(&self) -> Option<&Array1<f64>> {
        match self.fields.get(&FieldKey::Time) {
            Some(Series::Scalar(t)) => Some(t),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &Series)> {
        self.fields.iter().map(|(key, series)| (*key, series))
    }
}

fn mismatch(key: FieldKey) -> ! {
    panic!("frame lacks {key} or reports it with another shape")
}

/// The resolved muscle signal of every reported step.
///
/// Always present on a [`Trajectory`](super::Trajectory), with zero rows if
/// nothing was reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSequence {
    /// Reported times, shaped `(T)`.
    pub t: Array1<f64>,
    /// Preferred curvature, shaped `(T, 3, S)`.
    pub curvature: Array3<f64>,
    /// Preferred shear/stretch, shaped `(T, 3, S)`.
    pub shear_stretch: Array3<f64>,
}

impl ControlSequence {
    pub(crate) fn from_records(records: &[ControlRecord], points: usize) -> Self {
        let rows = records.len();
        Self {
            t: records.iter().map(|record| record.time).collect(),
            curvature: Array3::from_shape_fn((rows, 3, points), |(i, c, j)| {
                records[i].curvature[[c, j]]
            }),
            shear_stretch: Array3::from_shape_fn((rows, 3, points), |(i, c, j)| {
                records[i].shear_stretch[[c, j]]
            }),
        }
    }

    /// Returns the number of reported steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    fn frame(t: f64, eps: Array1<f64>) -> Frame {
        Frame {
            fields: BTreeMap::from([
                (FieldKey::Time, FieldValue::Scalar(t)),
                (FieldKey::Stretch, FieldValue::Profile(eps)),
                (
                    FieldKey::Centerline,
                    FieldValue::Vector(Array2::from_elem((3, 2), t)),
                ),
            ]),
        }
    }

    #[test]
    fn frames_stack_time_major() {
        let frames = vec![
            frame(0.1, array![1.0, 1.1]),
            frame(0.2, array![1.2, 1.3]),
            frame(0.3, array![1.4, 1.5]),
        ];

        let sequence = FrameSequence::from_frames(&frames);

        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.time(), Some(&array![0.1, 0.2, 0.3]));
        assert_eq!(
            sequence.get(FieldKey::Stretch),
            Some(&Series::Profile(array![[1.0, 1.1], [1.2, 1.3], [1.4, 1.5]]))
        );
        match sequence.get(FieldKey::Centerline) {
            Some(Series::Vector(r)) => {
                assert_eq!(r.dim(), (3, 3, 2));
                assert_eq!(r[[2, 1, 0]], 0.3);
            }
            other => panic!("unexpected centerline series: {other:?}"),
        }
    }

    #[test]
    fn no_frames_make_an_empty_sequence() {
        let sequence = FrameSequence::from_frames(&[]);

        assert!(sequence.is_empty());
        assert_eq!(sequence.keys().count(), 0);
    }

    #[test]
    fn subsampling_keeps_both_ends_when_aligned() {
        let values = Array2::from_shape_fn((3, 7), |(c, j)| (10 * c + j) as f64);

        let strided = subsample_vector(values.view(), 3);

        assert_eq!(strided.dim(), (3, 3));
        assert_eq!(strided.row(1).to_vec(), vec![10.0, 13.0, 16.0]);
        assert_eq!(subsample_profile(array![0.0, 1.0, 2.0, 3.0].view(), 2), array![0.0, 2.0]);
    }

    #[test]
    fn empty_control_sequence_keeps_its_shape() {
        let controls = ControlSequence::from_records(&[], 5);

        assert!(controls.is_empty());
        assert_eq!(controls.curvature.dim(), (0, 3, 5));
    }
}
