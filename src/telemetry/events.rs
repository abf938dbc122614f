//! Core telemetry event types describing pipeline data exposed to the CLI
//! and to any subscriber of the broadcast stream.

use serde::{Deserialize, Serialize};

use crate::analysis::strike::{Side, StrikeType};

/// Session lifecycle stages reported by the session manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Started,
    Ended,
}

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    FixtureLoad,
    SessionNotFound,
    SessionEnded,
    StrikeInCooldown,
    LockPoisoned,
    Unknown,
}

/// Metric events covering strikes, score trend, pose quality and lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Strike {
        session_id: String,
        technique: StrikeType,
        side: Side,
        score: i32,
        speed: f32,
        power: f32,
        timestamp_ms: u64,
    },
    ScoreTrend {
        session_id: String,
        avg_score: f32,
        best_score: i32,
        sample_count: usize,
    },
    PoseRejected {
        session_id: String,
        landmark: String,
        timestamp_ms: u64,
    },
    SessionLifecycle {
        phase: LifecyclePhase,
        session_id: String,
        timestamp_ms: u64,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}

impl MetricEvent {
    /// Session the event belongs to; errors are not tied to one session
    pub fn session_id(&self) -> Option<&str> {
        match self {
            MetricEvent::Strike { session_id, .. }
            | MetricEvent::ScoreTrend { session_id, .. }
            | MetricEvent::PoseRejected { session_id, .. }
            | MetricEvent::SessionLifecycle { session_id, .. } => Some(session_id.as_str()),
            MetricEvent::Error { .. } => None,
        }
    }
}
