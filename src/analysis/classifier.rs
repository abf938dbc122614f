// Classifier - cooldown-gated rule-based strike recognition
//
// Turns one frame plus the motion tracker's output into at most one
// StrikeEvent. Evaluation order per call:
//
// 1. Cooldown: nothing is emitted within `cooldown_ms` of the previous strike,
//    including strikes admitted from outside through `admit`
// 2. Pose quality: both shoulders and both hips must exceed `core_confidence`
// 3. Rule table: first matching rule wins (see `rules::default_rules`)
//
// A missing or low-confidence landmark only fails the rule that needs it;
// evaluation falls through to the next rule and never errors.

use std::collections::HashMap;

use crate::analysis::motion::MovementState;
use crate::analysis::rules::{default_rules, PoseContext, StrikeRule};
use crate::analysis::strike::{StrikeEvent, StrikeForm};
use crate::config::ClassifierConfig;
use crate::pose::landmarks::CORE;
use crate::pose::Frame;

/// Outcome of a single classification pass
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Previous strike is still inside the cooldown window
    Cooldown { remaining_ms: u64 },
    /// A core landmark is missing or below the confidence gate
    InsufficientPose { landmark: &'static str },
    /// Pose is usable but no rule matched
    NoMatch,
    Strike(StrikeEvent),
}

impl Classification {
    pub fn into_strike(self) -> Option<StrikeEvent> {
        match self {
            Classification::Strike(strike) => Some(strike),
            _ => None,
        }
    }
}

/// Per-session strike classifier
///
/// Owns the cooldown state, so one instance must serve exactly one session.
#[derive(Debug)]
pub struct StrikeClassifier {
    thresholds: ClassifierConfig,
    rules: Vec<StrikeRule>,
    /// Timestamp of the last emitted strike
    last_emission_ms: Option<u64>,
}

impl StrikeClassifier {
    /// Create a classifier with the default rule table
    pub fn new(thresholds: ClassifierConfig) -> Self {
        Self::with_rules(thresholds, default_rules())
    }

    /// Create a classifier with a custom rule table, evaluated in order
    pub fn with_rules(thresholds: ClassifierConfig, rules: Vec<StrikeRule>) -> Self {
        Self {
            thresholds,
            rules,
            last_emission_ms: None,
        }
    }

    pub fn thresholds(&self) -> &ClassifierConfig {
        &self.thresholds
    }

    pub fn rules(&self) -> &[StrikeRule] {
        &self.rules
    }

    pub fn last_emission_ms(&self) -> Option<u64> {
        self.last_emission_ms
    }

    /// Classify the current frame
    ///
    /// # Arguments
    /// * `frame` - Current keypoints
    /// * `movements` - MotionTracker output for the same frame
    /// * `now_ms` - Time of the call; drives the cooldown window
    pub fn evaluate(
        &mut self,
        frame: &Frame,
        movements: &HashMap<String, MovementState>,
        now_ms: u64,
    ) -> Classification {
        if let Some(remaining_ms) = self.cooldown_remaining(now_ms) {
            return Classification::Cooldown { remaining_ms };
        }

        if let Some(landmark) = CORE.iter().copied().find(|name| {
            frame
                .get(name)
                .map_or(true, |kp| kp.confidence <= self.thresholds.core_confidence)
        }) {
            return Classification::InsufficientPose { landmark };
        }

        let Some(ctx) = PoseContext::new(frame, movements) else {
            return Classification::InsufficientPose { landmark: CORE[0] };
        };

        for rule in &self.rules {
            let Some(measurement) = rule.evaluate(&ctx, &self.thresholds) else {
                continue;
            };

            self.last_emission_ms = Some(now_ms);
            return Classification::Strike(StrikeEvent {
                technique: rule.technique,
                side: rule.side,
                speed: measurement.speed,
                accuracy: measurement.accuracy,
                power: measurement.power,
                form: StrikeForm {
                    hip_rotation: ctx.hip_rotation,
                    shoulder_alignment: ctx.shoulder_alignment,
                    guard_position: ctx.guard_score,
                    knee_angle: measurement.knee_angle,
                    hip_angle: measurement.hip_angle,
                },
                timestamp_ms: now_ms,
            });
        }

        Classification::NoMatch
    }

    /// Time left in the cooldown window at `now_ms`, if still inside it
    ///
    /// A timestamp earlier than the last emission counts as inside the window.
    pub fn cooldown_remaining(&self, now_ms: u64) -> Option<u64> {
        let last = self.last_emission_ms?;
        let elapsed = now_ms.saturating_sub(last);
        (elapsed < self.thresholds.cooldown_ms).then(|| self.thresholds.cooldown_ms - elapsed)
    }

    /// Admit a strike classified outside [`evaluate`](Self::evaluate)
    ///
    /// Applies the same cooldown as frame classification and, on success,
    /// restarts the window at `now_ms`.
    ///
    /// # Errors
    /// Returns the remaining cooldown in ms when `now_ms` is inside the window.
    pub fn admit(&mut self, now_ms: u64) -> Result<(), u64> {
        if let Some(remaining_ms) = self.cooldown_remaining(now_ms) {
            return Err(remaining_ms);
        }
        self.last_emission_ms = Some(now_ms);
        Ok(())
    }

    /// Strike for the current frame, if any
    pub fn classify(
        &mut self,
        frame: &Frame,
        movements: &HashMap<String, MovementState>,
        now_ms: u64,
    ) -> Option<StrikeEvent> {
        self.evaluate(frame, movements, now_ms).into_strike()
    }

    /// Clear the cooldown
    pub fn reset(&mut self) {
        self.last_emission_ms = None;
    }
}

impl Default for StrikeClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
