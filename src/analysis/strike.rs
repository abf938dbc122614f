// Strike types - classified discrete strikes and their measured parameters
//
// A StrikeEvent is an immutable value produced once per classification hit.
// Its wire shape (camelCase, `type` for the technique) matches what the
// transport and persistence collaborators already exchange.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Technique of a classified strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeType {
    Jab,
    Cross,
    Hook,
    Uppercut,
    Roundhouse,
    FrontKick,
    SideKick,
}

impl StrikeType {
    pub const ALL: [StrikeType; 7] = [
        StrikeType::Jab,
        StrikeType::Cross,
        StrikeType::Hook,
        StrikeType::Uppercut,
        StrikeType::Roundhouse,
        StrikeType::FrontKick,
        StrikeType::SideKick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrikeType::Jab => "jab",
            StrikeType::Cross => "cross",
            StrikeType::Hook => "hook",
            StrikeType::Uppercut => "uppercut",
            StrikeType::Roundhouse => "roundhouse",
            StrikeType::FrontKick => "front_kick",
            StrikeType::SideKick => "side_kick",
        }
    }

    /// Techniques scored and checked with knee/hip angles: the `*_kick`
    /// types. Roundhouse is a leg technique but is scored on the four
    /// upper-body factors, and its leg-angle checks see no angles.
    pub fn uses_leg_angles(&self) -> bool {
        self.as_str().ends_with("_kick")
    }
}

impl fmt::Display for StrikeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the body that threw the strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body-mechanics measurements taken at the moment of the strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeForm {
    /// Angle(left hip, right hip, right shoulder), degrees
    pub hip_rotation: f32,
    /// Angle(left shoulder, right shoulder, right hip), degrees
    pub shoulder_alignment: f32,
    /// Weaker of the two wrist confidences (0.0-1.0)
    pub guard_position: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knee_angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hip_angle: Option<f32>,
}

/// A classified strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeEvent {
    #[serde(rename = "type")]
    pub technique: StrikeType,
    pub side: Side,
    /// Smoothed limb velocity / 100
    pub speed: f32,
    /// Landmark confidence of the striking limb (0.0-1.0)
    pub accuracy: f32,
    /// Speed weighted by technique mechanics; not bounded to [0, 1]
    pub power: f32,
    pub form: StrikeForm,
    /// Frame timestamp at which the strike was classified
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl StrikeEvent {
    /// Breakdown key, e.g. `left_jab`
    pub fn technique_key(&self) -> String {
        technique_key(self.side, self.technique)
    }
}

/// Breakdown key for a side/technique pair
pub fn technique_key(side: Side, technique: StrikeType) -> String {
    format!("{}_{}", side.as_str(), technique.as_str())
}
