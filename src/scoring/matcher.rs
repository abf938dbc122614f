// TechniqueReferenceMatcher - checklist comparison against reference profiles
//
// score = passed / total * 100, failed-check feedback collected in checklist
// order, is_correct when score >= 70. Strikes with no reference or thrown
// from the other side get a zero-score analysis rather than an error.

use serde::{Deserialize, Serialize};

use crate::analysis::strike::{StrikeEvent, StrikeType};
use crate::scoring::reference::{reference_for, CheckParams};

/// Score at or above which a technique counts as correct
pub const CORRECT_THRESHOLD: f64 = 70.0;

pub const UNRECOGNIZED_IMPROVEMENT: &str = "Unrecognized technique or incorrect side";
pub const UNRECOGNIZED_FEEDBACK: &str = "Please practice the basic techniques as demonstrated";

/// Result of matching a strike against its reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueAnalysis {
    pub is_correct: bool,
    /// Percentage of passed checks (0-100)
    pub score: f64,
    pub improvements: Vec<String>,
    pub overall_feedback: String,
}

impl TechniqueAnalysis {
    fn unrecognized() -> Self {
        Self {
            is_correct: false,
            score: 0.0,
            improvements: vec![UNRECOGNIZED_IMPROVEMENT.to_string()],
            overall_feedback: UNRECOGNIZED_FEEDBACK.to_string(),
        }
    }
}

/// Stateless reference matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct TechniqueReferenceMatcher;

impl TechniqueReferenceMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, strike: &StrikeEvent) -> TechniqueAnalysis {
        let Some(reference) =
            reference_for(strike.technique).filter(|reference| reference.side == strike.side)
        else {
            return TechniqueAnalysis::unrecognized();
        };

        let params = check_params(strike);
        let improvements: Vec<String> = reference
            .checks
            .iter()
            .filter(|check| !check.passes(&params))
            .map(|check| check.feedback.to_string())
            .collect();

        let total = reference.checks.len();
        let passed = total - improvements.len();
        let score = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        TechniqueAnalysis {
            is_correct: score >= CORRECT_THRESHOLD,
            score,
            improvements,
            overall_feedback: overall_feedback(score).to_string(),
        }
    }
}

/// Checklist inputs for a strike
///
/// The strike carries no arm-extension measurement, so the extension check
/// reads the shoulder alignment angle. Leg angles are only passed for front
/// and side kicks, so a roundhouse fails its knee and hip checks.
pub fn check_params(strike: &StrikeEvent) -> CheckParams {
    let form = &strike.form;
    let kick = strike.technique.uses_leg_angles();
    CheckParams {
        extension_angle: form.shoulder_alignment,
        hip_rotation: form.hip_rotation,
        shoulder_alignment: form.shoulder_alignment,
        guard_position: form.guard_position,
        speed: strike.speed,
        power: strike.power,
        knee_angle: form.knee_angle.filter(|_| kick),
        hip_angle: form.hip_angle.filter(|_| kick),
    }
}

pub fn overall_feedback(score: f64) -> &'static str {
    if score >= 90.0 {
        "Excellent form! Keep practicing to maintain this level."
    } else if score >= 70.0 {
        "Good technique, but there's room for improvement."
    } else if score >= 50.0 {
        "Basic form achieved. Focus on the suggested improvements."
    } else {
        "Review the basic technique. Pay attention to the fundamentals."
    }
}

/// Speed remark relative to the technique's reference minimum speed
///
/// Empty for techniques without a reference.
pub fn speed_feedback(speed: f32, technique: StrikeType) -> &'static str {
    let Some(reference) = reference_for(technique) else {
        return "";
    };
    let minimum = reference.expected.minimum_speed;

    if speed >= minimum * 1.2 {
        "Excellent speed!"
    } else if speed >= minimum {
        "Good speed, maintain this pace."
    } else if speed >= minimum * 0.8 {
        "Increase your speed slightly."
    } else {
        "Focus on generating more speed."
    }
}

pub fn power_feedback(power: f32) -> &'static str {
    if power >= 0.9 {
        "Powerful technique!"
    } else if power >= 0.7 {
        "Good power generation."
    } else if power >= 0.5 {
        "Focus on hip rotation and body mechanics for more power."
    } else {
        "Work on proper form to generate more power."
    }
}
