// Pose module - landmark data consumed from the external pose model
//
// Frames arrive from a pose-estimation model (BlazePose/MoveNet style naming)
// as an ordered list of named keypoints plus a timestamp. Everything
// downstream (motion tracking, strike classification) reads these types.

pub mod landmarks;
pub mod types;

pub use types::{Frame, Keypoint, Vector2};
