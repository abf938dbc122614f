use super::*;
use crate::analysis::motion::MotionTracker;
use crate::analysis::strike::{Side, StrikeType};
use crate::config::MotionConfig;
use crate::pose::landmarks::*;
use crate::pose::Vector2;
use crate::testing::poses::{synthesize, PoseBuilder, SyntheticPattern, FRAME_INTERVAL_MS};

/// Helper to run synthetic patterns through a fresh tracker + classifier
fn classify_patterns(patterns: &[SyntheticPattern]) -> Vec<StrikeEvent> {
    let mut tracker = MotionTracker::new(MotionConfig::default());
    let mut classifier = StrikeClassifier::default();

    synthesize(patterns, 1000)
        .iter()
        .filter_map(|frame| {
            let states = tracker.update(frame);
            classifier.classify(frame, states, frame.timestamp_ms)
        })
        .collect()
}

/// Helper to create a movement map with one landmark in motion
fn moving(name: &str, velocity: f32, direction: Vector2) -> HashMap<String, MovementState> {
    let mut map = HashMap::new();
    map.insert(
        name.to_string(),
        MovementState {
            velocity,
            direction,
            smoothed_velocity: velocity,
            smoothed_direction: direction,
            last_update_ms: 0,
            confidence: 0.9,
        },
    );
    map
}

fn jab_pose() -> (Frame, HashMap<String, MovementState>) {
    (
        PoseBuilder::guard_stance().jab_extended(0.0).frame(0),
        moving(LEFT_WRIST, 300.0, Vector2::new(-1.0, 0.0)),
    )
}

#[test]
fn test_jab_sequence_emits_single_left_jab() {
    let strikes = classify_patterns(&[SyntheticPattern::Jab]);

    assert_eq!(strikes.len(), 1, "Expected exactly one strike, got {:?}", strikes);
    let jab = &strikes[0];
    assert_eq!(jab.technique, StrikeType::Jab);
    assert_eq!(jab.side, Side::Left);
    assert_eq!(jab.timestamp_ms, 1000 + FRAME_INTERVAL_MS);
    assert!((jab.accuracy - 0.9).abs() < 1e-6);
    assert!((jab.form.guard_position - 0.9).abs() < 1e-6);
    assert!(jab.form.knee_angle.is_none());
    assert!(jab.form.hip_angle.is_none());
}

#[test]
fn test_cross_sequence_emits_right_cross() {
    let strikes = classify_patterns(&[SyntheticPattern::Cross]);

    assert_eq!(strikes.len(), 1);
    assert_eq!(strikes[0].technique, StrikeType::Cross);
    assert_eq!(strikes[0].side, Side::Right);
    assert!(strikes[0].form.hip_rotation > 20.0);
}

#[test]
fn test_left_roundhouse_sequence() {
    let strikes = classify_patterns(&[SyntheticPattern::LeftRoundhouse]);

    assert_eq!(strikes.len(), 1);
    let kick = &strikes[0];
    assert_eq!(kick.technique, StrikeType::Roundhouse);
    assert_eq!(kick.side, Side::Left);
    assert!(kick.form.knee_angle.unwrap() < 140.0);
    // Hip angle of the left leg is reported as a reflex value (~203°)
    // because joint angles are not folded into [0, 180]
    assert!(kick.form.hip_angle.unwrap() > 180.0);
}

#[test]
fn test_right_roundhouse_sequence() {
    let strikes = classify_patterns(&[SyntheticPattern::RightRoundhouse]);

    assert_eq!(strikes.len(), 1);
    assert_eq!(strikes[0].technique, StrikeType::Roundhouse);
    assert_eq!(strikes[0].side, Side::Right);
    let hip_angle = strikes[0].form.hip_angle.unwrap();
    assert!(hip_angle > 45.0 && hip_angle < 180.0, "{}", hip_angle);
}

#[test]
fn test_extended_leg_never_classified_as_roundhouse() {
    let strikes = classify_patterns(&[
        SyntheticPattern::ExtendedKick,
        SyntheticPattern::ExtendedKick,
    ]);
    assert!(strikes.is_empty(), "Unexpected strikes {:?}", strikes);
}

#[test]
fn test_repeated_jabs_respect_cooldown() {
    let strikes = classify_patterns(&[
        SyntheticPattern::Jab,
        SyntheticPattern::Jab,
        SyntheticPattern::Jab,
    ]);

    assert_eq!(strikes.len(), 3);
    assert!(strikes.iter().all(|s| s.technique == StrikeType::Jab));
    for pair in strikes.windows(2) {
        assert!(pair[1].timestamp_ms - pair[0].timestamp_ms >= 500);
    }
}

#[test]
fn test_mixed_combination_in_order() {
    let strikes = classify_patterns(&[
        SyntheticPattern::Jab,
        SyntheticPattern::Cross,
        SyntheticPattern::LeftRoundhouse,
        SyntheticPattern::RightRoundhouse,
        SyntheticPattern::ExtendedKick,
        SyntheticPattern::Idle,
    ]);

    let keys: Vec<_> = strikes.iter().map(|s| s.technique_key()).collect();
    assert_eq!(
        keys,
        vec![
            "left_jab",
            "right_cross",
            "left_roundhouse",
            "right_roundhouse"
        ]
    );
}

#[test]
fn test_cooldown_blocks_second_strike() {
    let (frame, movements) = jab_pose();
    let mut classifier = StrikeClassifier::default();

    assert!(matches!(
        classifier.evaluate(&frame, &movements, 1000),
        Classification::Strike(_)
    ));
    assert_eq!(
        classifier.evaluate(&frame, &movements, 1200),
        Classification::Cooldown { remaining_ms: 300 }
    );
    assert_eq!(classifier.last_emission_ms(), Some(1000));
}

#[test]
fn test_cooldown_boundary_is_inclusive_of_500ms() {
    let (frame, movements) = jab_pose();
    let mut classifier = StrikeClassifier::default();

    assert!(classifier.classify(&frame, &movements, 1000).is_some());
    assert!(classifier.classify(&frame, &movements, 1499).is_none());
    assert!(classifier.classify(&frame, &movements, 1500).is_some());
    assert_eq!(classifier.last_emission_ms(), Some(1500));
}

#[test]
fn test_out_of_order_time_stays_in_cooldown() {
    let (frame, movements) = jab_pose();
    let mut classifier = StrikeClassifier::default();

    assert!(classifier.classify(&frame, &movements, 5000).is_some());
    assert_eq!(
        classifier.evaluate(&frame, &movements, 4000),
        Classification::Cooldown { remaining_ms: 500 }
    );
}

#[test]
fn test_admitted_strikes_share_the_cooldown() {
    let (frame, movements) = jab_pose();
    let mut classifier = StrikeClassifier::default();

    assert_eq!(classifier.admit(1000), Ok(()));
    assert_eq!(classifier.admit(1010), Err(490));
    assert_eq!(classifier.last_emission_ms(), Some(1000));

    // a frame-classified strike inside the window is held back too
    assert_eq!(
        classifier.evaluate(&frame, &movements, 1400),
        Classification::Cooldown { remaining_ms: 100 }
    );
    assert!(classifier.classify(&frame, &movements, 1500).is_some());
    assert_eq!(classifier.admit(1700), Err(300));
    assert_eq!(classifier.admit(2000), Ok(()));
}

#[test]
fn test_cooldown_remaining() {
    let mut classifier = StrikeClassifier::default();
    assert_eq!(classifier.cooldown_remaining(0), None);
    classifier.admit(1000).unwrap();
    assert_eq!(classifier.cooldown_remaining(1250), Some(250));
    assert_eq!(classifier.cooldown_remaining(900), Some(500));
    assert_eq!(classifier.cooldown_remaining(1500), None);
}

#[test]
fn test_reset_clears_cooldown() {
    let (frame, movements) = jab_pose();
    let mut classifier = StrikeClassifier::default();

    assert!(classifier.classify(&frame, &movements, 1000).is_some());
    classifier.reset();
    assert!(classifier.last_emission_ms().is_none());
    assert!(classifier.classify(&frame, &movements, 1100).is_some());
}

#[test]
fn test_low_confidence_core_landmark_rejects_pose() {
    let frame = PoseBuilder::guard_stance()
        .jab_extended(0.0)
        .with_confidence(LEFT_HIP, 0.65)
        .frame(0);
    let movements = moving(LEFT_WRIST, 300.0, Vector2::new(-1.0, 0.0));
    let mut classifier = StrikeClassifier::default();

    assert_eq!(
        classifier.evaluate(&frame, &movements, 0),
        Classification::InsufficientPose { landmark: LEFT_HIP }
    );
    // Rejection does not start a cooldown
    assert!(classifier.last_emission_ms().is_none());
}

#[test]
fn test_missing_core_landmark_rejects_pose() {
    let frame = PoseBuilder::guard_stance().without(RIGHT_SHOULDER).frame(0);
    let mut classifier = StrikeClassifier::default();

    assert_eq!(
        classifier.evaluate(&frame, &HashMap::new(), 0),
        Classification::InsufficientPose {
            landmark: RIGHT_SHOULDER
        }
    );
}

#[test]
fn test_static_stance_is_no_match() {
    let frame = PoseBuilder::guard_stance().frame(0);
    let mut classifier = StrikeClassifier::default();
    assert_eq!(
        classifier.evaluate(&frame, &HashMap::new(), 0),
        Classification::NoMatch
    );
}

#[test]
fn test_jab_takes_precedence_over_cross() {
    let frame = PoseBuilder::guard_stance()
        .jab_extended(0.0)
        .cross_extended(0.0)
        .frame(0);
    let mut movements = moving(LEFT_WRIST, 300.0, Vector2::new(-1.0, 0.0));
    movements.extend(moving(RIGHT_WRIST, 300.0, Vector2::new(1.0, 0.0)));
    let mut classifier = StrikeClassifier::default();

    let strike = classifier.classify(&frame, &movements, 0).unwrap();
    assert_eq!(strike.technique, StrikeType::Jab);
}

#[test]
fn test_low_confidence_wrist_falls_through_to_next_rule() {
    let frame = PoseBuilder::guard_stance()
        .jab_extended(0.0)
        .cross_extended(0.0)
        .with_confidence(LEFT_ELBOW, 0.5)
        .frame(0);
    let mut movements = moving(LEFT_WRIST, 300.0, Vector2::new(-1.0, 0.0));
    movements.extend(moving(RIGHT_WRIST, 300.0, Vector2::new(1.0, 0.0)));
    let mut classifier = StrikeClassifier::default();

    let strike = classifier.classify(&frame, &movements, 0).unwrap();
    assert_eq!(strike.technique, StrikeType::Cross);
}

#[test]
fn test_low_confidence_leg_is_not_a_kick() {
    let frame = PoseBuilder::guard_stance()
        .roundhouse_chamber(Side::Left, 0.0)
        .with_confidence(LEFT_ANKLE, 0.5)
        .frame(0);
    let movements = moving(LEFT_ANKLE, 450.0, Vector2::new(-1.0, 0.0));
    let mut classifier = StrikeClassifier::default();

    assert_eq!(
        classifier.evaluate(&frame, &movements, 0),
        Classification::NoMatch
    );
}

#[test]
fn test_empty_rule_table_never_matches() {
    let (frame, movements) = jab_pose();
    let mut classifier = StrikeClassifier::with_rules(ClassifierConfig::default(), Vec::new());
    assert_eq!(
        classifier.evaluate(&frame, &movements, 0),
        Classification::NoMatch
    );
}

#[test]
fn test_custom_thresholds() {
    let (frame, movements) = jab_pose();
    let thresholds = ClassifierConfig {
        jab_velocity: 400.0,
        ..ClassifierConfig::default()
    };
    let mut classifier = StrikeClassifier::new(thresholds);
    assert_eq!(
        classifier.evaluate(&frame, &movements, 0),
        Classification::NoMatch
    );
}
