// Analysis module - per-frame strike recognition pipeline
//
// One SessionPipeline belongs to exactly one training session and processes
// its frames strictly in order. Each frame is one synchronous pass:
//
//   Frame → MotionTracker → StrikeClassifier → { TechniqueScorer, TechniqueReferenceMatcher }
//
// Smoothing, cooldown, pose-rejection debounce and the score-trend window
// live in the pipeline's own fields, so independent sessions can run in
// parallel without sharing anything. Telemetry events are tagged with the
// pipeline's session id.

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::pose::Frame;
use crate::scoring::{TechniqueAnalysis, TechniqueReferenceMatcher, TechniqueScorer};
use crate::telemetry::{self, ScoreWindow};

pub mod angles;
pub mod classifier;
pub mod motion;
pub mod rules;
pub mod strike;

use classifier::{Classification, StrikeClassifier};
use motion::{describe_movement, MotionTracker};
use strike::StrikeEvent;

/// Smoothed speed above which a landmark's movement is logged
const SIGNIFICANT_VELOCITY: f32 = 3.0;

/// A classified strike with its score and reference analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeOutcome {
    pub strike: StrikeEvent,
    pub score: i32,
    pub analysis: TechniqueAnalysis,
}

/// Session-scoped frame processor
#[derive(Debug)]
pub struct SessionPipeline {
    session_id: String,
    tracker: MotionTracker,
    classifier: StrikeClassifier,
    scorer: TechniqueScorer,
    matcher: TechniqueReferenceMatcher,
    scores: ScoreWindow,
    /// Landmark of the last reported rejection, until the pose recovers
    rejected: Option<&'static str>,
    frames_processed: u64,
}

impl SessionPipeline {
    pub fn new(session_id: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            session_id: session_id.into(),
            tracker: MotionTracker::new(config.motion.clone()),
            classifier: StrikeClassifier::new(config.classifier.clone()),
            scorer: TechniqueScorer::new(),
            matcher: TechniqueReferenceMatcher::new(),
            scores: ScoreWindow::default(),
            rejected: None,
            frames_processed: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run one frame through the pipeline
    ///
    /// Never fails: poor pose quality or an unrecognized movement simply
    /// yields `None`.
    pub fn process_frame(&mut self, frame: &Frame) -> Option<StrikeOutcome> {
        self.frames_processed += 1;
        let movements = self.tracker.update(frame);

        for (landmark, state) in movements
            .iter()
            .filter(|(_, state)| state.smoothed_velocity > SIGNIFICANT_VELOCITY)
        {
            tracing::debug!(
                landmark = %landmark,
                velocity = state.smoothed_velocity,
                "{}",
                describe_movement(landmark, state.smoothed_direction)
            );
        }

        match self
            .classifier
            .evaluate(frame, movements, frame.timestamp_ms)
        {
            Classification::Strike(strike) => {
                self.rejected = None;
                let outcome = self.score(strike);
                tracing::info!(
                    session_id = %self.session_id,
                    technique = %outcome.strike.technique,
                    side = %outcome.strike.side,
                    score = outcome.score,
                    timestamp_ms = outcome.strike.timestamp_ms,
                    "strike classified"
                );
                self.publish(&outcome);
                Some(outcome)
            }
            Classification::InsufficientPose { landmark } => {
                tracing::trace!(
                    landmark,
                    timestamp_ms = frame.timestamp_ms,
                    adaptive_threshold = self.tracker.confidence_threshold(),
                    "pose rejected"
                );
                // one event per landmark until the pose recovers
                if self.rejected != Some(landmark) {
                    self.rejected = Some(landmark);
                    telemetry::hub().record_pose_rejected(
                        &self.session_id,
                        landmark,
                        frame.timestamp_ms,
                    );
                }
                None
            }
            Classification::Cooldown { .. } | Classification::NoMatch => {
                self.rejected = None;
                None
            }
        }
    }

    /// Score a strike classified outside the pipeline
    ///
    /// The strike is held to the same cooldown as frame-classified strikes,
    /// measured at its own timestamp, and restarts the window when admitted.
    ///
    /// # Errors
    /// Returns the remaining cooldown in ms when the strike is too close to
    /// the previous one.
    pub fn admit(&mut self, strike: StrikeEvent) -> Result<StrikeOutcome, u64> {
        self.classifier.admit(strike.timestamp_ms)?;
        let outcome = self.score(strike);
        self.publish(&outcome);
        Ok(outcome)
    }

    fn publish(&mut self, outcome: &StrikeOutcome) {
        self.scores.observe(outcome.score);
        let hub = telemetry::hub();
        hub.record_strike(&self.session_id, outcome);
        hub.record_score_trend(&self.session_id, &self.scores);
    }

    /// Score and analyze a strike; leaves the cooldown and telemetry alone
    pub fn score(&self, strike: StrikeEvent) -> StrikeOutcome {
        let score = self.scorer.score(&strike);
        let analysis = self.matcher.analyze(&strike);
        StrikeOutcome {
            strike,
            score,
            analysis,
        }
    }

    pub fn tracker(&self) -> &MotionTracker {
        &self.tracker
    }

    pub fn classifier(&self) -> &StrikeClassifier {
        &self.classifier
    }

    /// Adaptive keypoint confidence threshold of this session's tracker
    pub fn confidence_threshold(&self) -> f32 {
        self.tracker.confidence_threshold()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Drop all motion history, the cooldown and the score window
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.classifier.reset();
        self.scores.clear();
        self.rejected = None;
        self.frames_processed = 0;
    }
}

impl Default for SessionPipeline {
    fn default() -> Self {
        Self::new("local", &AppConfig::default())
    }
}
