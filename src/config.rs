//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Motion tracking,
//! classifier thresholds and session queries can be adjusted via the
//! config file for rapid experimentation with different cameras.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Motion tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Horizontal mirror convention of the capture device (selfie view)
    pub mirrored: bool,
    /// Keypoints below this confidence are not used for velocity estimation
    pub min_confidence: f32,
    /// Rolling history length per landmark
    pub history_size: usize,
    /// Base value for the adaptive confidence threshold
    pub base_confidence_threshold: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            // Webcam video is usually mirrored
            mirrored: true,
            min_confidence: 0.5,
            history_size: 30,
            base_confidence_threshold: 0.3,
        }
    }
}

/// Strike classifier thresholds
///
/// Velocities are in pose units per second, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum time between two strike events in a session
    pub cooldown_ms: u64,
    /// Shoulders/hips must exceed this confidence for any classification
    pub core_confidence: f32,
    /// Wrist/elbow confidence required for punches
    pub arm_confidence: f32,
    /// Ankle/knee/hip confidence required for kicks
    pub leg_confidence: f32,
    pub jab_velocity: f32,
    pub cross_velocity: f32,
    pub roundhouse_velocity: f32,
    /// Elbow angle above which an arm counts as extended
    pub min_extension_angle: f32,
    /// Hip twist required for a cross
    pub min_hip_rotation: f32,
    /// Both wrists must be visible above this confidence
    pub min_guard_score: f32,
    /// Knee angle below which a kicking leg is still chambered
    pub max_chamber_knee_angle: f32,
    pub min_kick_hip_angle: f32,
    /// Horizontal component a punch/kick direction must exceed
    pub min_horizontal_direction: f32,
    /// Vertical drift tolerated on a punch direction
    pub max_vertical_direction: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 500,
            core_confidence: 0.65,
            arm_confidence: 0.65,
            leg_confidence: 0.5,
            jab_velocity: 150.0,
            cross_velocity: 200.0,
            roundhouse_velocity: 250.0,
            min_extension_angle: 150.0,
            min_hip_rotation: 20.0,
            min_guard_score: 0.6,
            max_chamber_knee_angle: 140.0,
            min_kick_hip_angle: 45.0,
            min_horizontal_direction: 0.8,
            max_vertical_direction: 0.3,
        }
    }
}

/// Session registry query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Default number of sessions returned by history queries
    pub history_limit: usize,
    /// Maximum sessions returned by technique progress queries
    pub progress_limit: usize,
    /// Ended sessions kept per user; older ones are pruned when a session ends
    #[serde(default = "default_retained_sessions")]
    pub retained_sessions: usize,
}

fn default_retained_sessions() -> usize {
    50
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            progress_limit: 10,
            retained_sessions: default_retained_sessions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults when the file is missing or
    /// the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default assets location
    pub fn load() -> Self {
        Self::load_from_file("assets/strike_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.motion.mirrored);
        assert_eq!(config.motion.history_size, 30);
        assert_eq!(config.classifier.cooldown_ms, 500);
        assert_eq!(config.classifier.core_confidence, 0.65);
        assert_eq!(config.classifier.jab_velocity, 150.0);
        assert_eq!(config.session.history_limit, 10);
        assert_eq!(config.session.retained_sessions, 50);
    }

    #[test]
    fn test_session_retention_defaults_when_absent() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"session":{"history_limit":5,"progress_limit":3}}"#).unwrap();
        assert_eq!(parsed.session.history_limit, 5);
        assert_eq!(parsed.session.retained_sessions, 50);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.classifier, config.classifier);
        assert_eq!(parsed.motion.min_confidence, config.motion.min_confidence);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"motion":{"mirrored":false,"min_confidence":0.4,"history_size":10,"base_confidence_threshold":0.3}}"#)
                .unwrap();
        assert!(!parsed.motion.mirrored);
        assert_eq!(parsed.motion.history_size, 10);
        assert_eq!(parsed.classifier.cross_velocity, 200.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/strike_config.json");
        assert_eq!(config.classifier.cooldown_ms, 500);
    }
}
