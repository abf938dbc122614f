// Technique references - static per-technique checklists
//
// Each reference names the side the technique is thrown from, the expected
// body parameters, and an ordered list of pass/fail form checks with the
// remediation text shown when a check fails.

use serde::Serialize;

use crate::analysis::strike::{Side, StrikeType};

/// Values a form check is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CheckParams {
    pub extension_angle: f32,
    pub hip_rotation: f32,
    pub shoulder_alignment: f32,
    pub guard_position: f32,
    pub speed: f32,
    pub power: f32,
    pub knee_angle: Option<f32>,
    pub hip_angle: Option<f32>,
}

/// One named checklist entry
#[derive(Clone, Copy)]
pub struct FormCheck {
    pub name: &'static str,
    pub condition: fn(&CheckParams) -> bool,
    pub feedback: &'static str,
}

impl FormCheck {
    pub fn passes(&self, params: &CheckParams) -> bool {
        (self.condition)(params)
    }
}

impl std::fmt::Debug for FormCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormCheck")
            .field("name", &self.name)
            .field("feedback", &self.feedback)
            .finish()
    }
}

/// Target body parameters of a technique
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_angle: Option<f32>,
    pub hip_rotation: f32,
    pub shoulder_alignment: f32,
    pub guard_position: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knee_angle: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hip_angle: Option<f32>,
    pub minimum_speed: f32,
}

/// Canonical profile of one technique
#[derive(Debug)]
pub struct TechniqueReference {
    pub technique: StrikeType,
    pub side: Side,
    pub expected: ExpectedParameters,
    pub checks: &'static [FormCheck],
}

/// A check on an angle the strike did not measure fails
fn at_most(value: Option<f32>, limit: f32) -> bool {
    value.is_some_and(|v| v <= limit)
}

fn at_least(value: Option<f32>, limit: f32) -> bool {
    value.is_some_and(|v| v >= limit)
}

pub static JAB: TechniqueReference = TechniqueReference {
    technique: StrikeType::Jab,
    side: Side::Left,
    expected: ExpectedParameters {
        extension_angle: Some(170.0),
        hip_rotation: 0.0,
        shoulder_alignment: 180.0,
        guard_position: 0.8,
        knee_angle: None,
        hip_angle: None,
        minimum_speed: 5.0,
    },
    checks: &[
        FormCheck {
            name: "armExtension",
            condition: |p| p.extension_angle >= 170.0,
            feedback: "Extend your arm fully for a proper jab",
        },
        FormCheck {
            name: "shoulderAlignment",
            condition: |p| (p.shoulder_alignment - 180.0).abs() <= 15.0,
            feedback: "Keep your shoulders square when jabbing",
        },
        FormCheck {
            name: "guardPosition",
            condition: |p| p.guard_position >= 0.8,
            feedback: "Maintain your guard hand position while jabbing",
        },
        FormCheck {
            name: "speed",
            condition: |p| p.speed >= 5.0,
            feedback: "Increase your jab speed for better effectiveness",
        },
    ],
};

pub static CROSS: TechniqueReference = TechniqueReference {
    technique: StrikeType::Cross,
    side: Side::Right,
    expected: ExpectedParameters {
        extension_angle: Some(170.0),
        hip_rotation: 45.0,
        shoulder_alignment: 135.0,
        guard_position: 0.8,
        knee_angle: None,
        hip_angle: None,
        minimum_speed: 6.0,
    },
    checks: &[
        FormCheck {
            name: "armExtension",
            condition: |p| p.extension_angle >= 170.0,
            feedback: "Extend your arm fully for maximum reach",
        },
        FormCheck {
            name: "hipRotation",
            condition: |p| p.hip_rotation >= 45.0,
            feedback: "Rotate your hips more to generate power",
        },
        FormCheck {
            name: "shoulderAlignment",
            condition: |p| p.shoulder_alignment <= 150.0,
            feedback: "Rotate your shoulders more with the cross",
        },
        FormCheck {
            name: "guardPosition",
            condition: |p| p.guard_position >= 0.8,
            feedback: "Keep your guard up while throwing the cross",
        },
        FormCheck {
            name: "speed",
            condition: |p| p.speed >= 6.0,
            feedback: "Increase your cross speed for more power",
        },
    ],
};

pub static ROUNDHOUSE: TechniqueReference = TechniqueReference {
    technique: StrikeType::Roundhouse,
    side: Side::Right,
    expected: ExpectedParameters {
        extension_angle: None,
        hip_rotation: 90.0,
        shoulder_alignment: 135.0,
        guard_position: 0.7,
        knee_angle: Some(45.0),
        hip_angle: Some(90.0),
        minimum_speed: 7.0,
    },
    checks: &[
        FormCheck {
            name: "kneeChambering",
            condition: |p| at_most(p.knee_angle, 60.0),
            feedback: "Chamber your knee more before kicking",
        },
        FormCheck {
            name: "hipOpening",
            condition: |p| at_least(p.hip_angle, 80.0),
            feedback: "Open your hip more for better kick height",
        },
        FormCheck {
            name: "hipRotation",
            condition: |p| p.hip_rotation >= 80.0,
            feedback: "Rotate your hips fully through the kick",
        },
        FormCheck {
            name: "guardPosition",
            condition: |p| p.guard_position >= 0.7,
            feedback: "Keep your guard up during the kick",
        },
        FormCheck {
            name: "speed",
            condition: |p| p.speed >= 7.0,
            feedback: "Increase your kicking speed for more power",
        },
    ],
};

/// Reference profile for a technique, if one exists
pub fn reference_for(technique: StrikeType) -> Option<&'static TechniqueReference> {
    match technique {
        StrikeType::Jab => Some(&JAB),
        StrikeType::Cross => Some(&CROSS),
        StrikeType::Roundhouse => Some(&ROUNDHOUSE),
        _ => None,
    }
}
