use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// A quantity that can be reported in a [`Frame`](super::Frame).
///
/// Each key has a short wire name (`"r"`, `"D_F_dot"`, …) used by
/// [`Display`](fmt::Display), [`FromStr`] and the optional serde derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldKey {
    #[cfg_attr(feature = "serde", serde(rename = "t"))]
    Time,
    #[cfg_attr(feature = "serde", serde(rename = "r"))]
    Centerline,
    #[cfg_attr(feature = "serde", serde(rename = "theta"))]
    EulerAngles,
    #[cfg_attr(feature = "serde", serde(rename = "d1"))]
    Director1,
    #[cfg_attr(feature = "serde", serde(rename = "d2"))]
    Director2,
    #[cfg_attr(feature = "serde", serde(rename = "d3"))]
    Director3,
    #[cfg_attr(feature = "serde", serde(rename = "k"))]
    Curvature,
    #[cfg_attr(feature = "serde", serde(rename = "sig"))]
    ShearStretch,
    #[cfg_attr(feature = "serde", serde(rename = "k_norm"))]
    CurvatureNorm,
    #[cfg_attr(feature = "serde", serde(rename = "sig_norm"))]
    ShearStretchNorm,
    #[cfg_attr(feature = "serde", serde(rename = "eps"))]
    Stretch,
    #[cfg_attr(feature = "serde", serde(rename = "r_t"))]
    Velocity,
    #[cfg_attr(feature = "serde", serde(rename = "w"))]
    AngularVelocity,
    #[cfg_attr(feature = "serde", serde(rename = "k_t"))]
    CurvatureRate,
    #[cfg_attr(feature = "serde", serde(rename = "sig_t"))]
    ShearStretchRate,
    #[cfg_attr(feature = "serde", serde(rename = "f_F"))]
    FluidForce,
    #[cfg_attr(feature = "serde", serde(rename = "l_F"))]
    FluidTorque,
    #[cfg_attr(feature = "serde", serde(rename = "f_M"))]
    MuscleForce,
    #[cfg_attr(feature = "serde", serde(rename = "l_M"))]
    MuscleTorque,
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    InternalForce,
    #[cfg_attr(feature = "serde", serde(rename = "M"))]
    InternalTorque,
    #[cfg_attr(feature = "serde", serde(rename = "D_F_dot"))]
    FluidDissipationRate,
    #[cfg_attr(feature = "serde", serde(rename = "D_I_dot"))]
    InternalDissipationRate,
    #[cfg_attr(feature = "serde", serde(rename = "W_dot"))]
    ActuationPower,
    #[cfg_attr(feature = "serde", serde(rename = "V_dot"))]
    PotentialRate,
    #[cfg_attr(feature = "serde", serde(rename = "V"))]
    Potential,
}

/// The shape of a reported quantity at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single number.
    Scalar,
    /// A scalar at every reported node.
    Profile,
    /// A 3-vector at every reported node, stored as `3×S`.
    Vector,
}

impl FieldKey {
    /// Every recognized key, in reporting order.
    pub const ALL: [FieldKey; 26] = [
        FieldKey::Time,
        FieldKey::Centerline,
        FieldKey::EulerAngles,
        FieldKey::Director1,
        FieldKey::Director2,
        FieldKey::Director3,
        FieldKey::Curvature,
        FieldKey::ShearStretch,
        FieldKey::CurvatureNorm,
        FieldKey::ShearStretchNorm,
        FieldKey::Stretch,
        FieldKey::Velocity,
        FieldKey::AngularVelocity,
        FieldKey::CurvatureRate,
        FieldKey::ShearStretchRate,
        FieldKey::FluidForce,
        FieldKey::FluidTorque,
        FieldKey::MuscleForce,
        FieldKey::MuscleTorque,
        FieldKey::InternalForce,
        FieldKey::InternalTorque,
        FieldKey::FluidDissipationRate,
        FieldKey::InternalDissipationRate,
        FieldKey::ActuationPower,
        FieldKey::PotentialRate,
        FieldKey::Potential,
    ];

    /// Returns the wire name of this key.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FieldKey::Time => "t",
            FieldKey::Centerline => "r",
            FieldKey::EulerAngles => "theta",
            FieldKey::Director1 => "d1",
            FieldKey::Director2 => "d2",
            FieldKey::Director3 => "d3",
            FieldKey::Curvature => "k",
            FieldKey::ShearStretch => "sig",
            FieldKey::CurvatureNorm => "k_norm",
            FieldKey::ShearStretchNorm => "sig_norm",
            FieldKey::Stretch => "eps",
            FieldKey::Velocity => "r_t",
            FieldKey::AngularVelocity => "w",
            FieldKey::CurvatureRate => "k_t",
            FieldKey::ShearStretchRate => "sig_t",
            FieldKey::FluidForce => "f_F",
            FieldKey::FluidTorque => "l_F",
            FieldKey::MuscleForce => "f_M",
            FieldKey::MuscleTorque => "l_M",
            FieldKey::InternalForce => "N",
            FieldKey::InternalTorque => "M",
            FieldKey::FluidDissipationRate => "D_F_dot",
            FieldKey::InternalDissipationRate => "D_I_dot",
            FieldKey::ActuationPower => "W_dot",
            FieldKey::PotentialRate => "V_dot",
            FieldKey::Potential => "V",
        }
    }

    /// Returns the shape of the quantity this key reports.
    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            FieldKey::Time
            | FieldKey::CurvatureNorm
            | FieldKey::ShearStretchNorm
            | FieldKey::FluidDissipationRate
            | FieldKey::InternalDissipationRate
            | FieldKey::ActuationPower
            | FieldKey::PotentialRate
            | FieldKey::Potential => FieldKind::Scalar,
            FieldKey::Stretch => FieldKind::Profile,
            _ => FieldKind::Vector,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownField(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for key in FieldKey::ALL {
            assert_eq!(key.name().parse::<FieldKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let error = "kappa".parse::<FieldKey>().unwrap_err();

        assert!(matches!(error, ConfigError::UnknownField(name) if name == "kappa"));
    }

    #[test]
    fn kinds_follow_the_quantity() {
        assert_eq!(FieldKey::Time.kind(), FieldKind::Scalar);
        assert_eq!(FieldKey::Potential.kind(), FieldKind::Scalar);
        assert_eq!(FieldKey::Stretch.kind(), FieldKind::Profile);
        assert_eq!(FieldKey::InternalForce.kind(), FieldKind::Vector);
        assert_eq!(FieldKey::Director3.to_string(), "d3");
    }
}
