// Strike rules - ordered detection table used by the classifier
//
// Each rule is a pair of plain functions: a predicate that gates on
// landmark confidence, joint angles and limb motion, and a builder that
// derives speed/power/accuracy once the predicate has accepted the pose.
// Rules are evaluated in declaration order and the first match wins.
//
// Precedence: jab (left arm), cross (right arm), roundhouse (left leg),
// roundhouse (right leg).

use std::collections::HashMap;

use crate::analysis::angles::joint_angle;
use crate::analysis::motion::MovementState;
use crate::analysis::strike::{Side, StrikeType};
use crate::config::ClassifierConfig;
use crate::pose::landmarks::*;
use crate::pose::{Frame, Keypoint, Vector2};

/// Pose-derived measurements shared by every rule for one frame
#[derive(Debug, Clone)]
pub struct PoseContext<'a> {
    pub frame: &'a Frame,
    pub movements: &'a HashMap<String, MovementState>,
    /// Angle(left hip, right hip, right shoulder)
    pub hip_rotation: f32,
    /// Angle(left shoulder, right shoulder, right hip)
    pub shoulder_alignment: f32,
    /// min(left wrist confidence, right wrist confidence); 0 when a wrist is missing
    pub guard_score: f32,
}

impl<'a> PoseContext<'a> {
    /// Build the context; `None` when a core landmark is absent from the frame
    pub fn new(frame: &'a Frame, movements: &'a HashMap<String, MovementState>) -> Option<Self> {
        let left_shoulder = frame.get(LEFT_SHOULDER)?.position();
        let right_shoulder = frame.get(RIGHT_SHOULDER)?.position();
        let left_hip = frame.get(LEFT_HIP)?.position();
        let right_hip = frame.get(RIGHT_HIP)?.position();

        let guard_score = match (frame.get(LEFT_WRIST), frame.get(RIGHT_WRIST)) {
            (Some(left), Some(right)) => left.confidence.min(right.confidence),
            _ => 0.0,
        };

        Some(Self {
            frame,
            movements,
            hip_rotation: joint_angle(left_hip, right_hip, right_shoulder),
            shoulder_alignment: joint_angle(left_shoulder, right_shoulder, right_hip),
            guard_score,
        })
    }

    pub fn keypoint(&self, name: &str) -> Option<&'a Keypoint> {
        self.frame.get(name)
    }

    /// Keypoint whose confidence is strictly above `threshold`
    pub fn confident(&self, name: &str, threshold: f32) -> Option<&'a Keypoint> {
        self.keypoint(name).filter(|kp| kp.confidence > threshold)
    }

    /// Movement of a landmark, at rest when it was never tracked
    pub fn movement(&self, name: &str) -> MovementState {
        self.movements
            .get(name)
            .copied()
            .unwrap_or_else(|| MovementState::at_rest(0.0, self.frame.timestamp_ms))
    }
}

/// Values a rule contributes to the emitted strike
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMeasurement {
    pub speed: f32,
    pub power: f32,
    pub accuracy: f32,
    pub knee_angle: Option<f32>,
    pub hip_angle: Option<f32>,
}

pub type RulePredicate = fn(&PoseContext<'_>, &ClassifierConfig) -> bool;
pub type RuleBuilder = fn(&PoseContext<'_>) -> Option<RuleMeasurement>;

/// One entry of the detection table
#[derive(Clone)]
pub struct StrikeRule {
    pub name: &'static str,
    pub technique: StrikeType,
    pub side: Side,
    pub predicate: RulePredicate,
    pub builder: RuleBuilder,
}

impl StrikeRule {
    /// Measurement when the pose satisfies this rule
    pub fn evaluate(
        &self,
        ctx: &PoseContext<'_>,
        thresholds: &ClassifierConfig,
    ) -> Option<RuleMeasurement> {
        if (self.predicate)(ctx, thresholds) {
            (self.builder)(ctx)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for StrikeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrikeRule")
            .field("name", &self.name)
            .field("technique", &self.technique)
            .field("side", &self.side)
            .finish()
    }
}

/// Detection table in precedence order
pub fn default_rules() -> Vec<StrikeRule> {
    vec![
        StrikeRule {
            name: "left_jab",
            technique: StrikeType::Jab,
            side: Side::Left,
            predicate: is_jab,
            builder: build_jab,
        },
        StrikeRule {
            name: "right_cross",
            technique: StrikeType::Cross,
            side: Side::Right,
            predicate: is_cross,
            builder: build_cross,
        },
        StrikeRule {
            name: "left_roundhouse",
            technique: StrikeType::Roundhouse,
            side: Side::Left,
            predicate: |ctx, cfg| is_roundhouse(ctx, cfg, Side::Left),
            builder: |ctx| build_roundhouse(ctx, Side::Left),
        },
        StrikeRule {
            name: "right_roundhouse",
            technique: StrikeType::Roundhouse,
            side: Side::Right,
            predicate: |ctx, cfg| is_roundhouse(ctx, cfg, Side::Right),
            builder: |ctx| build_roundhouse(ctx, Side::Right),
        },
    ]
}

struct ArmLandmarks {
    wrist: &'static str,
    elbow: &'static str,
    shoulder: &'static str,
}

struct LegLandmarks {
    ankle: &'static str,
    knee: &'static str,
    hip: &'static str,
    opposite_hip: &'static str,
}

fn arm(side: Side) -> ArmLandmarks {
    match side {
        Side::Left => ArmLandmarks {
            wrist: LEFT_WRIST,
            elbow: LEFT_ELBOW,
            shoulder: LEFT_SHOULDER,
        },
        Side::Right => ArmLandmarks {
            wrist: RIGHT_WRIST,
            elbow: RIGHT_ELBOW,
            shoulder: RIGHT_SHOULDER,
        },
    }
}

fn leg(side: Side) -> LegLandmarks {
    match side {
        Side::Left => LegLandmarks {
            ankle: LEFT_ANKLE,
            knee: LEFT_KNEE,
            hip: LEFT_HIP,
            opposite_hip: RIGHT_HIP,
        },
        Side::Right => LegLandmarks {
            ankle: RIGHT_ANKLE,
            knee: RIGHT_KNEE,
            hip: RIGHT_HIP,
            opposite_hip: LEFT_HIP,
        },
    }
}

/// Elbow extension angle(wrist, elbow, shoulder) of a confidently tracked arm
fn arm_extension(ctx: &PoseContext<'_>, side: Side, confidence: f32) -> Option<f32> {
    let landmarks = arm(side);
    let wrist = ctx.confident(landmarks.wrist, confidence)?;
    let elbow = ctx.confident(landmarks.elbow, confidence)?;
    let shoulder = ctx.keypoint(landmarks.shoulder)?;
    Some(joint_angle(wrist.position(), elbow.position(), shoulder.position()))
}

/// Gates common to both punches
fn punch_gates(
    ctx: &PoseContext<'_>,
    cfg: &ClassifierConfig,
    side: Side,
    min_velocity: f32,
    direction_ok: fn(Vector2, &ClassifierConfig) -> bool,
) -> bool {
    let landmarks = arm(side);
    let Some(extension) = arm_extension(ctx, side, cfg.arm_confidence) else {
        return false;
    };
    let (Some(wrist), Some(shoulder)) = (
        ctx.keypoint(landmarks.wrist),
        ctx.keypoint(landmarks.shoulder),
    ) else {
        return false;
    };

    let movement = ctx.movement(landmarks.wrist);
    extension > cfg.min_extension_angle
        && movement.smoothed_velocity > min_velocity
        && direction_ok(movement.smoothed_direction, cfg)
        && wrist.y < shoulder.y
        && ctx.guard_score > cfg.min_guard_score
}

/// Left arm driving forward (negative x after the mirror convention)
pub fn is_jab(ctx: &PoseContext<'_>, cfg: &ClassifierConfig) -> bool {
    punch_gates(ctx, cfg, Side::Left, cfg.jab_velocity, |dir, cfg| {
        dir.x < -cfg.min_horizontal_direction && dir.y.abs() < cfg.max_vertical_direction
    })
}

/// Right arm driving across with hip twist
pub fn is_cross(ctx: &PoseContext<'_>, cfg: &ClassifierConfig) -> bool {
    punch_gates(ctx, cfg, Side::Right, cfg.cross_velocity, |dir, cfg| {
        dir.x > cfg.min_horizontal_direction && dir.y.abs() < cfg.max_vertical_direction
    }) && ctx.hip_rotation > cfg.min_hip_rotation
}

/// Chambered leg sweeping horizontally above hip height
pub fn is_roundhouse(ctx: &PoseContext<'_>, cfg: &ClassifierConfig, side: Side) -> bool {
    let Some((knee_angle, hip_angle)) = leg_angles(ctx, side, cfg.leg_confidence) else {
        return false;
    };
    let landmarks = leg(side);
    let (Some(ankle), Some(hip)) = (ctx.keypoint(landmarks.ankle), ctx.keypoint(landmarks.hip))
    else {
        return false;
    };

    let movement = ctx.movement(landmarks.ankle);
    knee_angle < cfg.max_chamber_knee_angle
        && hip_angle > cfg.min_kick_hip_angle
        && ankle.y < hip.y
        && movement.smoothed_velocity > cfg.roundhouse_velocity
        && movement.smoothed_direction.x.abs() > cfg.min_horizontal_direction
        && ctx.guard_score > cfg.min_guard_score
}

/// (kneeAngle, hipAngle) of a leg whose ankle/knee/hip exceed `confidence`
fn leg_angles(ctx: &PoseContext<'_>, side: Side, confidence: f32) -> Option<(f32, f32)> {
    let landmarks = leg(side);
    let ankle = ctx.confident(landmarks.ankle, confidence)?;
    let knee = ctx.confident(landmarks.knee, confidence)?;
    let hip = ctx.confident(landmarks.hip, confidence)?;
    let opposite_hip = ctx.keypoint(landmarks.opposite_hip)?;

    let knee_angle = joint_angle(ankle.position(), knee.position(), hip.position());
    let hip_angle = joint_angle(knee.position(), hip.position(), opposite_hip.position());
    Some((knee_angle, hip_angle))
}

fn build_punch(ctx: &PoseContext<'_>, side: Side, power_factor: f32) -> Option<RuleMeasurement> {
    let landmarks = arm(side);
    let wrist = ctx.keypoint(landmarks.wrist)?;
    let extension = arm_extension(ctx, side, f32::NEG_INFINITY)?;
    let speed = ctx.movement(landmarks.wrist).smoothed_velocity / 100.0;

    Some(RuleMeasurement {
        speed,
        power: speed * power_factor * (extension / 180.0),
        accuracy: wrist.confidence,
        knee_angle: None,
        hip_angle: None,
    })
}

/// speed = v/100, power = speed * extension/180
pub fn build_jab(ctx: &PoseContext<'_>) -> Option<RuleMeasurement> {
    build_punch(ctx, Side::Left, 1.0)
}

/// speed = v/100, power = speed * hipTwist/90 * extension/180
pub fn build_cross(ctx: &PoseContext<'_>) -> Option<RuleMeasurement> {
    build_punch(ctx, Side::Right, ctx.hip_rotation / 90.0)
}

/// speed = v/100, power = speed * hipAngle/90
pub fn build_roundhouse(ctx: &PoseContext<'_>, side: Side) -> Option<RuleMeasurement> {
    let landmarks = leg(side);
    let (knee_angle, hip_angle) = leg_angles(ctx, side, f32::NEG_INFINITY)?;
    let ankle = ctx.keypoint(landmarks.ankle)?;
    let knee = ctx.keypoint(landmarks.knee)?;
    let speed = ctx.movement(landmarks.ankle).smoothed_velocity / 100.0;

    Some(RuleMeasurement {
        speed,
        power: speed * (hip_angle / 90.0),
        accuracy: ankle.confidence.min(knee.confidence),
        knee_angle: Some(knee_angle),
        hip_angle: Some(hip_angle),
    })
}
