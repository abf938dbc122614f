// Types module - Data structures for pose frames
//
// This module defines the keypoint/frame contract shared with the external
// pose-estimation collaborator, plus the small 2D vector used for motion.

use serde::{Deserialize, Serialize};

/// A single named anatomical landmark
///
/// Coordinates are in the pose model's image space (y grows downwards).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Landmark name (e.g. `left_wrist`)
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Depth estimate, when the model provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Detection confidence (0.0-1.0)
    ///
    /// Pose models call this `score`; `confidence` is accepted as well.
    #[serde(rename = "score", alias = "confidence")]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            z: None,
            confidence,
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

/// One timestamped set of keypoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time in milliseconds (monotonic within a session)
    pub timestamp_ms: u64,
    pub keypoints: Vec<Keypoint>,
}

impl Frame {
    pub fn new(timestamp_ms: u64, keypoints: Vec<Keypoint>) -> Self {
        Self {
            timestamp_ms,
            keypoints,
        }
    }

    /// Look up a keypoint by landmark name
    pub fn get(&self, name: &str) -> Option<&Keypoint> {
        find(&self.keypoints, name)
    }
}

/// Find a keypoint by name in an ordered keypoint list
pub fn find<'a>(keypoints: &'a [Keypoint], name: &str) -> Option<&'a Keypoint> {
    keypoints.iter().find(|kp| kp.name == name)
}

/// 2D vector used for displacement and direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero-length vector
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Linear blend: `self * weight + other * (1 - weight)`
    pub fn blend(&self, other: Vector2, weight: f32) -> Self {
        Self::new(
            self.x * weight + other.x * (1.0 - weight),
            self.y * weight + other.y * (1.0 - weight),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_deserializes_score_field() {
        let json = r#"{"name":"left_wrist","x":1.0,"y":2.0,"score":0.9}"#;
        let kp: Keypoint = serde_json::from_str(json).unwrap();
        assert_eq!(kp.name, "left_wrist");
        assert_eq!(kp.confidence, 0.9);
        assert!(kp.z.is_none());

        let json = r#"{"name":"nose","x":1.0,"y":2.0,"z":-0.5,"confidence":0.4}"#;
        let kp: Keypoint = serde_json::from_str(json).unwrap();
        assert_eq!(kp.confidence, 0.4);
        assert_eq!(kp.z, Some(-0.5));
    }

    #[test]
    fn test_frame_lookup_by_name() {
        let frame = Frame::new(
            10,
            vec![
                Keypoint::new("left_hip", 1.0, 1.0, 0.8),
                Keypoint::new("right_hip", 2.0, 1.0, 0.7),
            ],
        );
        assert_eq!(frame.get("right_hip").map(|kp| kp.x), Some(2.0));
        assert!(frame.get("nose").is_none());
    }

    #[test]
    fn test_vector_normalization() {
        let v = Vector2::new(3.0, 4.0).normalized();
        assert!((v.x - 0.6).abs() < 1e-6);
        assert!((v.y - 0.8).abs() < 1e-6);
        assert_eq!(Vector2::ZERO.normalized(), Vector2::ZERO);
    }

    #[test]
    fn test_vector_blend() {
        let blended = Vector2::new(1.0, 0.0).blend(Vector2::new(0.0, 1.0), 0.7);
        assert!((blended.x - 0.7).abs() < 1e-6);
        assert!((blended.y - 0.3).abs() < 1e-6);
    }
}
