//! Pipeline telemetry collector and helpers.
//!
//! The collector multiplexes strike, score-trend, pose-quality and session
//! lifecycle events into a bounded history plus async broadcast stream.
//! Session events are tagged with their session id.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::{broadcast, mpsc};

use crate::analysis::StrikeOutcome;

pub mod events;

pub use events::{DiagnosticError, LifecyclePhase, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Telemetry must keep flowing after a panicking publisher
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No receivers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    /// Forward the broadcast stream into an unbounded channel
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_unbounded(&self) -> mpsc::UnboundedReceiver<MetricEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut broadcast_rx = self.tx.subscribe();

        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "telemetry subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        rx
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = lock(&self.history);
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Score samples kept for a session's trend unless configured otherwise
pub const DEFAULT_SCORE_WINDOW: usize = 32;

/// Rolling window of one session's recent strike scores
#[derive(Debug, Clone)]
pub struct ScoreWindow {
    samples: VecDeque<i32>,
    max_samples: usize,
}

impl ScoreWindow {
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn observe(&mut self, score: i32) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(score);
    }

    /// `(average, best, sample count)`; `None` before the first sample
    pub fn summary(&self) -> Option<(f32, i32, usize)> {
        let best = self.samples.iter().copied().max()?;
        let count = self.samples.len();
        let sum: i64 = self.samples.iter().map(|&s| s as i64).sum();
        Some((sum as f32 / count as f32, best, count))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for ScoreWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE_WINDOW)
    }
}

/// Top-level hub wrapping the collector with typed publishers.
///
/// The hub holds no per-session state: debouncing and score windows live
/// with each session's pipeline, and every session event carries its id.
pub struct TelemetryHub {
    collector: TelemetryCollector,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_strike(&self, session_id: &str, outcome: &StrikeOutcome) {
        let strike = &outcome.strike;
        self.collector.publish(MetricEvent::Strike {
            session_id: session_id.to_string(),
            technique: strike.technique,
            side: strike.side,
            score: outcome.score,
            speed: strike.speed,
            power: strike.power,
            timestamp_ms: strike.timestamp_ms,
        });
    }

    /// Publish the current trend of a session's score window
    pub fn record_score_trend(&self, session_id: &str, window: &ScoreWindow) {
        let Some((avg_score, best_score, sample_count)) = window.summary() else {
            return;
        };
        self.collector.publish(MetricEvent::ScoreTrend {
            session_id: session_id.to_string(),
            avg_score,
            best_score,
            sample_count,
        });
    }

    pub fn record_pose_rejected(&self, session_id: &str, landmark: &str, timestamp_ms: u64) {
        self.collector.publish(MetricEvent::PoseRejected {
            session_id: session_id.to_string(),
            landmark: landmark.to_string(),
            timestamp_ms,
        });
    }

    pub fn record_session_phase(&self, phase: LifecyclePhase, session_id: &str) {
        self.collector.publish(MetricEvent::SessionLifecycle {
            phase,
            session_id: session_id.to_string(),
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Wall-clock time in ms since the Unix epoch
pub fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::strike::{Side, StrikeEvent, StrikeForm, StrikeType};
    use crate::scoring::TechniqueAnalysis;

    fn sample_outcome(score: i32) -> StrikeOutcome {
        StrikeOutcome {
            strike: StrikeEvent {
                technique: StrikeType::Jab,
                side: Side::Left,
                speed: 4.0,
                accuracy: 0.9,
                power: 0.8,
                form: StrikeForm {
                    hip_rotation: 10.0,
                    shoulder_alignment: 170.0,
                    guard_position: 0.9,
                    knee_angle: None,
                    hip_angle: None,
                },
                timestamp_ms: 42,
            },
            score,
            analysis: TechniqueAnalysis {
                is_correct: true,
                score: 75.0,
                improvements: Vec::new(),
                overall_feedback: String::new(),
            },
        }
    }

    fn error_event(context: &str) -> MetricEvent {
        MetricEvent::Error {
            code: DiagnosticError::Unknown,
            context: context.to_string(),
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(error_event("first"));
        collector.publish(error_event("second"));
        collector.publish(MetricEvent::PoseRejected {
            session_id: "session_1_0".to_string(),
            landmark: "left_hip".to_string(),
            timestamp_ms: 1,
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(
            matches!(&snapshot.recent[0], MetricEvent::Error { context, .. } if context == "first")
        );
        assert!(matches!(
            snapshot.recent[2],
            MetricEvent::PoseRejected { .. }
        ));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        collector.publish(error_event("a"));
        collector.publish(error_event("b"));
        collector.publish(error_event("c"));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert!(
            matches!(&snapshot.recent[0], MetricEvent::Error { context, .. } if context == "b")
        );
    }

    #[test]
    fn hub_emits_strike_and_score_trend() {
        let hub = TelemetryHub::new(8, 8);
        let mut window = ScoreWindow::new(4);
        for score in [60, 80] {
            window.observe(score);
            hub.record_strike("session_1_0", &sample_outcome(score));
            hub.record_score_trend("session_1_0", &window);
        }

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.total_events, 4);
        assert!(snapshot
            .recent
            .iter()
            .all(|event| event.session_id() == Some("session_1_0")));
        let trend = snapshot
            .recent
            .iter()
            .rev()
            .find_map(|event| match event {
                MetricEvent::ScoreTrend {
                    avg_score,
                    best_score,
                    sample_count,
                    ..
                } => Some((*avg_score, *best_score, *sample_count)),
                _ => None,
            })
            .unwrap();
        assert_eq!(trend, (70.0, 80, 2));
    }

    #[test]
    fn score_window_is_bounded() {
        let mut window = ScoreWindow::new(2);
        assert_eq!(window.summary(), None);
        for score in [100, 10, 20] {
            window.observe(score);
        }
        assert_eq!(window.summary(), Some((15.0, 20, 2)));

        window.clear();
        assert_eq!(window.summary(), None);
    }

    #[test]
    fn empty_window_publishes_no_trend() {
        let hub = TelemetryHub::new(8, 8);
        hub.record_score_trend("session_1_0", &ScoreWindow::default());
        assert_eq!(hub.snapshot().total_events, 0);
    }

    #[test]
    fn every_pose_rejection_is_published_with_its_session() {
        let hub = TelemetryHub::new(8, 8);
        hub.record_pose_rejected("a", "left_hip", 1);
        hub.record_pose_rejected("b", "left_hip", 1);

        let sessions: Vec<_> = hub
            .snapshot()
            .recent
            .iter()
            .filter_map(|event| match event {
                MetricEvent::PoseRejected { session_id, .. } => Some(session_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(sessions, vec!["a", "b"]);
    }

    #[test]
    fn metric_event_wire_shape() {
        let json = serde_json::to_value(MetricEvent::SessionLifecycle {
            phase: LifecyclePhase::Started,
            session_id: "session_1_0".to_string(),
            timestamp_ms: 5,
        })
        .unwrap();
        assert_eq!(json["type"], "session_lifecycle");
        assert_eq!(json["payload"]["phase"], "started");
        assert_eq!(json["payload"]["session_id"], "session_1_0");
    }

    #[test]
    fn errors_belong_to_no_session() {
        assert_eq!(error_event("x").session_id(), None);
    }

    #[tokio::test]
    async fn broadcast_stream_delivers_published_events() {
        let collector = TelemetryCollector::new(8, 8);
        let mut rx = collector.subscribe_unbounded();
        // Let the forwarding task subscribe before publishing
        tokio::task::yield_now().await;
        collector.publish(error_event("streamed"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event, error_event("streamed"));
    }
}
