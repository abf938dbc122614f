//! Motion tracker - per-landmark velocity and direction estimation
//!
//! Converts positional deltas between consecutive frames into smoothed
//! velocity/direction per landmark. One tracker instance belongs to exactly
//! one session; the exponential smoothing and the retained previous frame
//! are plain fields, so two sessions can never leak state into each other.
//!
//! Smoothing: `smoothed = 0.7 * previous_smoothed + 0.3 * sample`, applied to
//! both velocity and direction. The first measured sample after a baseline
//! seeds the average directly.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::MotionConfig;
use crate::pose::types::find;
use crate::pose::{Frame, Keypoint, Vector2};

/// Weight of the previous smoothed value in the moving average
pub const SMOOTHING_FACTOR: f32 = 0.7;

/// Number of recent samples per landmark used by the adaptive threshold
const CONFIDENCE_WINDOW: usize = 10;

/// Movement state of a single landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementState {
    /// Instantaneous speed (units per second)
    pub velocity: f32,
    /// Unit displacement direction, after the mirror convention
    pub direction: Vector2,
    pub smoothed_velocity: f32,
    pub smoothed_direction: Vector2,
    /// Timestamp of the frame that produced this state
    pub last_update_ms: u64,
    /// Keypoint confidence, clamped to [0, 1]
    pub confidence: f32,
}

impl MovementState {
    /// Zero-velocity baseline
    pub fn at_rest(confidence: f32, now_ms: u64) -> Self {
        Self {
            velocity: 0.0,
            direction: Vector2::ZERO,
            smoothed_velocity: 0.0,
            smoothed_direction: Vector2::ZERO,
            last_update_ms: now_ms,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Per-landmark smoothing state and bounded history
#[derive(Debug)]
struct LandmarkTrack {
    /// Whether the moving average has been seeded by a measured sample
    seeded: bool,
    current: MovementState,
    history: VecDeque<MovementState>,
    capacity: usize,
}

impl LandmarkTrack {
    fn new(capacity: usize, now_ms: u64) -> Self {
        Self {
            seeded: false,
            current: MovementState::at_rest(0.0, now_ms),
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn advance(
        &mut self,
        displacement: Vector2,
        elapsed_ms: f64,
        confidence: f32,
        now_ms: u64,
    ) -> MovementState {
        let distance = displacement.length();
        let velocity = if elapsed_ms > 0.0 {
            (distance as f64 / (elapsed_ms / 1000.0)) as f32
        } else {
            0.0
        };
        let direction = displacement.normalized();

        let (smoothed_velocity, smoothed_direction) = if self.seeded {
            (
                self.current.smoothed_velocity * SMOOTHING_FACTOR
                    + velocity * (1.0 - SMOOTHING_FACTOR),
                self.current
                    .smoothed_direction
                    .blend(direction, SMOOTHING_FACTOR),
            )
        } else {
            (velocity, direction)
        };

        self.seeded = true;
        self.current = MovementState {
            velocity,
            direction,
            smoothed_velocity,
            smoothed_direction,
            last_update_ms: now_ms,
            confidence: confidence.clamp(0.0, 1.0),
        };
        self.current
    }

    fn rest(&mut self, confidence: f32, now_ms: u64) -> MovementState {
        self.seeded = false;
        self.current = MovementState::at_rest(confidence, now_ms);
        self.current
    }

    fn record(&mut self, state: MovementState) {
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(state);
    }
}

/// Session-scoped motion tracker
#[derive(Debug)]
pub struct MotionTracker {
    config: MotionConfig,
    tracks: HashMap<String, LandmarkTrack>,
    states: HashMap<String, MovementState>,
    previous: Option<Frame>,
}

impl MotionTracker {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            tracks: HashMap::new(),
            states: HashMap::new(),
            previous: None,
        }
    }

    /// Process a frame against the internally retained previous frame
    ///
    /// Elapsed time is the signed difference of the two frame timestamps;
    /// an out-of-order frame produces zero velocity rather than an error.
    pub fn update(&mut self, frame: &Frame) -> &HashMap<String, MovementState> {
        let previous = self.previous.take();
        let elapsed_ms = previous
            .as_ref()
            .map(|prev| frame.timestamp_ms as f64 - prev.timestamp_ms as f64)
            .unwrap_or(0.0);

        self.update_with(
            &frame.keypoints,
            previous.as_ref().map(|prev| prev.keypoints.as_slice()),
            elapsed_ms,
            frame.timestamp_ms,
        );
        self.previous = Some(frame.clone());
        &self.states
    }

    /// Process keypoints against a caller-supplied previous frame
    ///
    /// # Arguments
    /// * `current` - Keypoints of the frame being processed
    /// * `previous` - Keypoints of the preceding frame, if any
    /// * `elapsed_ms` - Time since the preceding frame (may be <= 0)
    /// * `now_ms` - Timestamp stamped on the produced states
    pub fn update_with(
        &mut self,
        current: &[Keypoint],
        previous: Option<&[Keypoint]>,
        elapsed_ms: f64,
        now_ms: u64,
    ) -> &HashMap<String, MovementState> {
        self.states.clear();
        let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());

        for keypoint in current {
            seen.insert(keypoint.name.as_str());

            let prev = previous
                .and_then(|points| find(points, &keypoint.name))
                .filter(|prev| prev.confidence >= self.config.min_confidence);
            let displacement = prev.map(|prev| self.displacement(keypoint, prev));
            let measurable = keypoint.confidence >= self.config.min_confidence;

            let capacity = self.config.history_size;
            let track = self
                .tracks
                .entry(keypoint.name.clone())
                .or_insert_with(|| LandmarkTrack::new(capacity, now_ms));

            let state = match displacement {
                Some(displacement) if measurable => {
                    track.advance(displacement, elapsed_ms, keypoint.confidence, now_ms)
                }
                _ => track.rest(keypoint.confidence, now_ms),
            };
            track.record(state);
            self.states.insert(keypoint.name.clone(), state);
        }

        for (name, track) in self.tracks.iter_mut() {
            if !seen.contains(name.as_str()) {
                let state = track.rest(0.0, now_ms);
                self.states.insert(name.clone(), state);
            }
        }

        &self.states
    }

    /// Displacement between two sightings, applying the mirror convention
    fn displacement(&self, current: &Keypoint, previous: &Keypoint) -> Vector2 {
        let dx = current.x - previous.x;
        let dy = current.y - previous.y;
        if self.config.mirrored {
            Vector2::new(-dx, dy)
        } else {
            Vector2::new(dx, dy)
        }
    }

    /// Latest state of a landmark
    pub fn state(&self, name: &str) -> Option<&MovementState> {
        self.states.get(name)
    }

    /// Latest states of every tracked landmark
    pub fn states(&self) -> &HashMap<String, MovementState> {
        &self.states
    }

    /// Rolling history of a landmark, oldest first
    pub fn history(&self, name: &str) -> Option<&VecDeque<MovementState>> {
        self.tracks.get(name).map(|track| &track.history)
    }

    /// Adaptive confidence threshold floored at the configured
    /// `base_confidence_threshold`
    pub fn confidence_threshold(&self) -> f32 {
        self.dynamic_confidence_threshold(self.config.base_confidence_threshold)
    }

    /// Adaptive confidence threshold from recent history
    ///
    /// Returns `max(base, 0.7 * mean)` where `mean` is the average confidence
    /// over the last 10 samples of every landmark, or `base` when nothing has
    /// been tracked yet.
    pub fn dynamic_confidence_threshold(&self, base: f32) -> f32 {
        let (sum, count) = self
            .tracks
            .values()
            .flat_map(|track| {
                let skip = track.history.len().saturating_sub(CONFIDENCE_WINDOW);
                track.history.iter().skip(skip)
            })
            .fold((0.0_f32, 0_usize), |(sum, count), state| {
                (sum + state.confidence, count + 1)
            });

        if count == 0 {
            return base;
        }
        base.max(sum / count as f32 * 0.7)
    }

    /// Forget all landmarks and the retained previous frame
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.states.clear();
        self.previous = None;
    }
}

impl Default for MotionTracker {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

/// Human-readable label for a landmark moving in `direction`
///
/// Used for debug logging of significant movements.
pub fn describe_movement(landmark: &str, direction: Vector2) -> String {
    let side = landmark.split('_').next().unwrap_or(landmark);
    let vertical = direction.y.abs() > direction.x.abs();
    let upward = direction.y < 0.0;
    let rightward = direction.x > 0.0;

    match landmark {
        "left_wrist" | "right_wrist" => {
            if vertical {
                format!("{side} arm {}", if upward { "raising" } else { "lowering" })
            } else {
                format!(
                    "{side} arm {}",
                    if rightward { "extending" } else { "retracting" }
                )
            }
        }
        "left_ankle" | "right_ankle" => {
            if vertical {
                format!("{side} leg {}", if upward { "lifting" } else { "lowering" })
            } else {
                format!(
                    "{side} leg {} movement",
                    if rightward { "forward" } else { "backward" }
                )
            }
        }
        "left_knee" | "right_knee" => {
            let motion = match (vertical, upward) {
                (true, true) => "lifting",
                (true, false) => "lowering",
                (false, _) => "bending",
            };
            format!("{side} knee {motion}")
        }
        "left_hip" | "right_hip" => format!("{side} hip rotation"),
        "left_shoulder" | "right_shoulder" => {
            format!("{side} shoulder {}", if vertical { "shrug" } else { "rotation" })
        }
        _ => format!("{landmark} movement"),
    }
}
