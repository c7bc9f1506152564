//! Discrete display labels for a pose.
//!
//! Pitch is inverted relative to the usual camera convention: a negative
//! pitch reads as "up" and a positive one as "down", and the two thresholds
//! are asymmetric (-7 / +10). Both are deliberate and shared with the
//! capture rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LabelConfig;
use crate::types::PoseAngles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollLabel {
    #[default]
    Straight,
    TiltLeft,
    TiltRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PitchLabel {
    #[default]
    Straight,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YawLabel {
    #[default]
    Straight,
    TurnLeft,
    TurnRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionLabels {
    pub roll: RollLabel,
    pub pitch: PitchLabel,
    pub yaw: YawLabel,
}

impl RollLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollLabel::Straight => "straight",
            RollLabel::TiltLeft => "tilt-left",
            RollLabel::TiltRight => "tilt-right",
        }
    }
}

impl PitchLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchLabel::Straight => "straight",
            PitchLabel::Up => "up",
            PitchLabel::Down => "down",
        }
    }
}

impl YawLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            YawLabel::Straight => "straight",
            YawLabel::TurnLeft => "turn-left",
            YawLabel::TurnRight => "turn-right",
        }
    }
}

impl fmt::Display for DirectionLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.roll.as_str(),
            self.pitch.as_str(),
            self.yaw.as_str()
        )
    }
}

/// Labels with the default thresholds.
pub fn classify(pose: &PoseAngles) -> DirectionLabels {
    classify_with(pose, &LabelConfig::default())
}

pub fn classify_with(pose: &PoseAngles, cfg: &LabelConfig) -> DirectionLabels {
    let roll = if pose.roll.abs() <= cfg.roll_straight_deg {
        RollLabel::Straight
    } else if pose.roll > 0.0 {
        RollLabel::TiltRight
    } else {
        RollLabel::TiltLeft
    };

    let pitch = if pose.pitch < cfg.pitch_up_deg {
        PitchLabel::Up
    } else if pose.pitch > cfg.pitch_down_deg {
        PitchLabel::Down
    } else {
        PitchLabel::Straight
    };

    let yaw = if pose.yaw.abs() <= cfg.yaw_straight_deg {
        YawLabel::Straight
    } else if pose.yaw > 0.0 {
        YawLabel::TurnRight
    } else {
        YawLabel::TurnLeft
    };

    DirectionLabels { roll, pitch, yaw }
}
