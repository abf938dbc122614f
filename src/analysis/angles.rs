//! Joint angle calculation
//!
//! The angle at `p2` formed by `p1-p2-p3`, computed as the absolute
//! difference of the two segment headings. The result is NOT reduced modulo
//! 180°: depending on which side of the x-axis the segments fall, a joint
//! can report a reflex value (up to 360°). Strike thresholds were tuned
//! against this exact behavior, so it is kept as-is.

use crate::pose::Vector2;

/// Angle at `p2` in degrees, range [0, 360)
pub fn joint_angle(p1: Vector2, p2: Vector2, p3: Vector2) -> f32 {
    let heading_3 = (p3.y - p2.y).atan2(p3.x - p2.x);
    let heading_1 = (p1.y - p2.y).atan2(p1.x - p2.x);
    (heading_3 - heading_1).to_degrees().abs()
}
