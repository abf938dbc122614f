// Landmark names emitted by the pose model
//
// Only the landmarks used by strike classification are named here; frames may
// carry any number of additional keypoints (eyes, ears, fingers) which are
// tracked but otherwise ignored.

pub const NOSE: &str = "nose";

pub const LEFT_SHOULDER: &str = "left_shoulder";
pub const RIGHT_SHOULDER: &str = "right_shoulder";
pub const LEFT_ELBOW: &str = "left_elbow";
pub const RIGHT_ELBOW: &str = "right_elbow";
pub const LEFT_WRIST: &str = "left_wrist";
pub const RIGHT_WRIST: &str = "right_wrist";

pub const LEFT_HIP: &str = "left_hip";
pub const RIGHT_HIP: &str = "right_hip";
pub const LEFT_KNEE: &str = "left_knee";
pub const RIGHT_KNEE: &str = "right_knee";
pub const LEFT_ANKLE: &str = "left_ankle";
pub const RIGHT_ANKLE: &str = "right_ankle";

/// Landmarks that must be confidently visible before any strike is classified
pub const CORE: [&str; 4] = [LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_HIP, RIGHT_HIP];
