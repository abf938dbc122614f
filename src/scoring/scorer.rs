// TechniqueScorer - weighted numeric quality score for a classified strike
//
// Weights: speed 30%, power 40%, form 30%.
//
//   speed term = min(speed / 10, 1) * 30
//   power term = power * 40
//   form term  = mean(hipRotation/90, shoulderAlignment/180, guard, accuracy
//                     [, kneeAngle/90, hipAngle/90 for front/side kicks]) * 30
//
// Power is not re-clamped and the total is not capped, so a fast strike can
// score well above 100.

use serde::{Deserialize, Serialize};

use crate::analysis::strike::StrikeEvent;

/// Speed at which the speed term saturates
pub const REFERENCE_MAX_SPEED: f32 = 10.0;

pub const SPEED_WEIGHT: f32 = 30.0;
pub const POWER_WEIGHT: f32 = 40.0;
pub const FORM_WEIGHT: f32 = 30.0;

/// Individual score terms before rounding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub speed: f32,
    pub power: f32,
    pub form: f32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f32 {
        self.speed + self.power + self.form
    }

    /// Rounded total, half away from zero
    pub fn score(&self) -> i32 {
        self.total().round() as i32
    }
}

/// Stateless strike scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct TechniqueScorer;

impl TechniqueScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, strike: &StrikeEvent) -> i32 {
        self.breakdown(strike).score()
    }

    pub fn breakdown(&self, strike: &StrikeEvent) -> ScoreBreakdown {
        ScoreBreakdown {
            speed: (strike.speed / REFERENCE_MAX_SPEED).min(1.0) * SPEED_WEIGHT,
            power: strike.power * POWER_WEIGHT,
            form: form_quality(strike) * FORM_WEIGHT,
        }
    }
}

/// Mean of the normalized form factors
fn form_quality(strike: &StrikeEvent) -> f32 {
    let form = &strike.form;
    let mut factors = vec![
        form.hip_rotation / 90.0,
        form.shoulder_alignment / 180.0,
        form.guard_position,
        strike.accuracy,
    ];
    if strike.technique.uses_leg_angles() {
        factors.push(form.knee_angle.unwrap_or(0.0) / 90.0);
        factors.push(form.hip_angle.unwrap_or(0.0) / 90.0);
    }
    factors.iter().sum::<f32>() / factors.len() as f32
}
