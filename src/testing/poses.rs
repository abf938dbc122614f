//! Synthetic pose generator for deterministic classifier harnesses.
//!
//! Coordinates are image pixels (y grows downward) of a fighter facing the
//! camera in an orthodox guard, as seen through a mirrored webcam. Every
//! landmark starts at confidence 0.9; builders adjust individual points to
//! produce the canonical strike shapes.

use serde::{Deserialize, Serialize};

use crate::analysis::strike::Side;
use crate::pose::landmarks::*;
use crate::pose::{Frame, Keypoint};

/// Nominal capture cadence (~30 fps)
pub const FRAME_INTERVAL_MS: u64 = 33;

/// Neutral frames appended after each pattern; spans more than one cooldown
pub const IDLE_GAP_FRAMES: usize = 18;

const DEFAULT_CONFIDENCE: f32 = 0.9;

/// Builder over a full-body keypoint set
#[derive(Debug, Clone, PartialEq)]
pub struct PoseBuilder {
    keypoints: Vec<Keypoint>,
}

impl PoseBuilder {
    /// Hands up at the chin, feet under the hips
    pub fn guard_stance() -> Self {
        let points = [
            (NOSE, 250.0, 120.0),
            (LEFT_SHOULDER, 300.0, 200.0),
            (RIGHT_SHOULDER, 200.0, 200.0),
            (LEFT_ELBOW, 320.0, 250.0),
            (RIGHT_ELBOW, 180.0, 250.0),
            (LEFT_WRIST, 300.0, 180.0),
            (RIGHT_WRIST, 200.0, 180.0),
            (LEFT_HIP, 290.0, 350.0),
            (RIGHT_HIP, 210.0, 350.0),
            (LEFT_KNEE, 300.0, 450.0),
            (RIGHT_KNEE, 200.0, 450.0),
            (LEFT_ANKLE, 305.0, 550.0),
            (RIGHT_ANKLE, 195.0, 550.0),
        ];
        Self {
            keypoints: points
                .iter()
                .map(|&(name, x, y)| Keypoint::new(name, x, y, DEFAULT_CONFIDENCE))
                .collect(),
        }
    }

    /// Move (or add) a landmark
    pub fn with(mut self, name: &str, x: f32, y: f32) -> Self {
        match self.keypoints.iter_mut().find(|kp| kp.name == name) {
            Some(kp) => {
                kp.x = x;
                kp.y = y;
            }
            None => self
                .keypoints
                .push(Keypoint::new(name, x, y, DEFAULT_CONFIDENCE)),
        }
        self
    }

    pub fn with_confidence(mut self, name: &str, confidence: f32) -> Self {
        if let Some(kp) = self.keypoints.iter_mut().find(|kp| kp.name == name) {
            kp.confidence = confidence;
        }
        self
    }

    /// Drop a landmark entirely, as if the detector never reported it
    pub fn without(mut self, name: &str) -> Self {
        self.keypoints.retain(|kp| kp.name != name);
        self
    }

    /// Left arm straight out at shoulder height, driven `reach` pixels forward
    pub fn jab_extended(self, reach: f32) -> Self {
        self.with(LEFT_ELBOW, 350.0 + reach / 2.0, 195.0)
            .with(LEFT_WRIST, 390.0 + reach, 190.0)
    }

    /// Right arm straight across at shoulder height
    pub fn cross_extended(self, reach: f32) -> Self {
        self.with(RIGHT_ELBOW, 150.0 - reach / 2.0, 195.0)
            .with(RIGHT_WRIST, 110.0 - reach, 190.0)
    }

    /// Knee raised and bent with the ankle above hip height, `sweep` pixels
    /// into the horizontal arc
    pub fn roundhouse_chamber(self, side: Side, sweep: f32) -> Self {
        match side {
            Side::Left => self
                .with(LEFT_KNEE, 360.0 + sweep, 320.0)
                .with(LEFT_ANKLE, 385.0 + sweep, 340.0),
            Side::Right => self
                .with(RIGHT_KNEE, 140.0 - sweep, 320.0)
                .with(RIGHT_ANKLE, 115.0 - sweep, 340.0),
        }
    }

    /// Raised leg already straightened (knee angle near 160°)
    pub fn extended_leg(self, side: Side, sweep: f32) -> Self {
        match side {
            Side::Left => self
                .with(LEFT_KNEE, 360.0 + sweep, 320.0)
                .with(LEFT_ANKLE, 440.0 + sweep, 316.0),
            Side::Right => self
                .with(RIGHT_KNEE, 140.0 - sweep, 320.0)
                .with(RIGHT_ANKLE, 60.0 - sweep, 316.0),
        }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn frame(&self, timestamp_ms: u64) -> Frame {
        Frame::new(timestamp_ms, self.keypoints.clone())
    }
}

/// Deterministic movement patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    /// Guard stance held for one idle gap
    Idle,
    Jab,
    Cross,
    LeftRoundhouse,
    RightRoundhouse,
    /// Straight-leg sweep that must never classify as a roundhouse
    ExtendedKick,
}

impl SyntheticPattern {
    /// Poses of the movement itself, excluding the surrounding guard frames
    pub fn poses(&self) -> Vec<PoseBuilder> {
        let stance = PoseBuilder::guard_stance;
        let sweep = |build: fn(PoseBuilder, f32) -> PoseBuilder| {
            (0..7)
                .map(|step| build(stance(), step as f32 * 10.0))
                .collect::<Vec<_>>()
        };

        match self {
            SyntheticPattern::Idle => Vec::new(),
            SyntheticPattern::Jab => sweep(PoseBuilder::jab_extended),
            SyntheticPattern::Cross => sweep(PoseBuilder::cross_extended),
            SyntheticPattern::LeftRoundhouse => {
                sweep(|pose, s| pose.roundhouse_chamber(Side::Left, s))
            }
            SyntheticPattern::RightRoundhouse => {
                sweep(|pose, s| pose.roundhouse_chamber(Side::Right, s))
            }
            SyntheticPattern::ExtendedKick => sweep(|pose, s| pose.extended_leg(Side::Left, s)),
        }
    }
}

/// Render a pattern sequence into timestamped frames
///
/// Starts with one guard frame, then each pattern followed by
/// [`IDLE_GAP_FRAMES`] guard frames, all [`FRAME_INTERVAL_MS`] apart.
pub fn synthesize(patterns: &[SyntheticPattern], start_ms: u64) -> Vec<Frame> {
    let mut poses = vec![PoseBuilder::guard_stance()];
    for pattern in patterns {
        poses.extend(pattern.poses());
        poses.extend(std::iter::repeat(PoseBuilder::guard_stance()).take(IDLE_GAP_FRAMES));
    }

    poses
        .iter()
        .enumerate()
        .map(|(index, pose)| pose.frame(start_ms + index as u64 * FRAME_INTERVAL_MS))
        .collect()
}
