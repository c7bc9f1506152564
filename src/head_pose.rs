//! Head pose from 2D face-mesh landmark geometry.
//!
//! Roll comes from the eye line, yaw from the nose's relative distance to
//! each eye, and pitch from a blend of the nose/eye-centre height ratio and
//! the tilt of the forehead->chin vector. Degenerate geometry (coincident
//! points) yields 0 rather than NaN.

use crate::config::PoseConfig;
use crate::types::{Landmarks, PixelPoint, PoseAngles};

/// Face-mesh indices of the points the geometry reads.
pub mod indices {
    pub const LEFT_EYE: usize = 33;
    pub const RIGHT_EYE: usize = 263;
    pub const NOSE_TIP: usize = 1;
    pub const CHIN: usize = 152;
    pub const FOREHEAD: usize = 10;
    pub const MOUTH_LEFT: usize = 61;
    pub const MOUTH_RIGHT: usize = 291;
}

/// Minimum landmark count for pose estimation (highest index read + 1).
pub const MIN_LANDMARKS: usize = indices::MOUTH_RIGHT + 1;

/// Pixel positions of the named landmarks for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacePoints {
    pub left_eye: PixelPoint,
    pub right_eye: PixelPoint,
    pub nose_tip: PixelPoint,
    pub chin: PixelPoint,
    pub forehead: PixelPoint,
    pub mouth_left: PixelPoint,
    pub mouth_right: PixelPoint,
}

impl FacePoints {
    /// Returns `None` when the landmark set is too short to hold every named index.
    pub fn resolve(landmarks: &Landmarks, width: u32, height: u32) -> Option<Self> {
        if landmarks.len() < MIN_LANDMARKS {
            return None;
        }
        let px = |i: usize| PixelPoint::from_landmark(&landmarks.points[i], width, height);
        Some(Self {
            left_eye: px(indices::LEFT_EYE),
            right_eye: px(indices::RIGHT_EYE),
            nose_tip: px(indices::NOSE_TIP),
            chin: px(indices::CHIN),
            forehead: px(indices::FOREHEAD),
            mouth_left: px(indices::MOUTH_LEFT),
            mouth_right: px(indices::MOUTH_RIGHT),
        })
    }

    pub fn eye_center(&self) -> PixelPoint {
        self.left_eye.midpoint(&self.right_eye)
    }
}

/// Pose with the default constants. `None` if the landmark set is too short.
pub fn compute_pose(landmarks: &Landmarks, width: u32, height: u32) -> Option<PoseAngles> {
    compute_pose_with(landmarks, width, height, &PoseConfig::default())
}

pub fn compute_pose_with(
    landmarks: &Landmarks,
    width: u32,
    height: u32,
    config: &PoseConfig,
) -> Option<PoseAngles> {
    FacePoints::resolve(landmarks, width, height).map(|pts| pose_from_points(&pts, config))
}

pub fn pose_from_points(pts: &FacePoints, config: &PoseConfig) -> PoseAngles {
    PoseAngles {
        roll: roll(pts),
        pitch: pitch(pts, config),
        yaw: yaw(pts),
    }
}

/// Angle of the left->right eye line against the horizontal.
fn roll(pts: &FacePoints) -> f32 {
    let dy = pts.right_eye.y as f32 - pts.left_eye.y as f32;
    let dx = pts.right_eye.x as f32 - pts.left_eye.x as f32;
    degrees_atan2(dy, dx)
}

fn pitch(pts: &FacePoints, config: &PoseConfig) -> f32 {
    let eye_center = pts.eye_center();
    let nose_to_eye = pts.nose_tip.y as f32 - eye_center.y as f32;
    let forehead_to_chin = pts.chin.y as f32 - pts.forehead.y as f32;

    // Forehead at or below the chin: no usable ratio.
    let ratio = if forehead_to_chin > 0.0 {
        nose_to_eye / forehead_to_chin
    } else {
        0.0
    };
    let ratio_estimate = (ratio - config.reference_ratio) * config.pitch_gain;

    let vx = pts.chin.x as f32 - pts.forehead.x as f32;
    let vy = pts.chin.y as f32 - pts.forehead.y as f32;
    let vector_angle = degrees_atan2(vx, vy);

    (ratio_estimate - vector_angle * config.vector_weight).clamp(-90.0, 90.0)
}

/// Positive when the nose sits closer to the right eye.
fn yaw(pts: &FacePoints) -> f32 {
    let left = pts.left_eye.distance(&pts.nose_tip);
    let right = pts.right_eye.distance(&pts.nose_tip);
    let eye_distance = pts.left_eye.distance(&pts.right_eye);
    degrees_atan2(left - right, eye_distance)
}

fn degrees_atan2(y: f32, x: f32) -> f32 {
    if y == 0.0 && x == 0.0 {
        return 0.0;
    }
    let angle = y.atan2(x).to_degrees();
    if angle.is_finite() {
        angle
    } else {
        0.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Point3D;
    use approx::assert_abs_diff_eq;

    /// Mesh-sized landmark set with the seven named points placed explicitly
    /// and every other point parked at the frame centre.
    pub(crate) fn face(
        left_eye: (f32, f32),
        right_eye: (f32, f32),
        nose: (f32, f32),
        forehead: (f32, f32),
        chin: (f32, f32),
    ) -> Landmarks {
        let mut points = vec![Point3D::new(0.5, 0.5); 468];
        points[indices::LEFT_EYE] = Point3D::new(left_eye.0, left_eye.1);
        points[indices::RIGHT_EYE] = Point3D::new(right_eye.0, right_eye.1);
        points[indices::NOSE_TIP] = Point3D::new(nose.0, nose.1);
        points[indices::FOREHEAD] = Point3D::new(forehead.0, forehead.1);
        points[indices::CHIN] = Point3D::new(chin.0, chin.1);
        points[indices::MOUTH_LEFT] = Point3D::new(0.45, 0.65);
        points[indices::MOUTH_RIGHT] = Point3D::new(0.55, 0.65);
        Landmarks::new(points)
    }

    /// On a 1000x1000 frame: eye centre y=400, forehead->chin 600 px, nose
    /// 72 px below the eyes, i.e. exactly the 0.12 reference ratio.
    pub(crate) fn straight_face() -> Landmarks {
        face((0.4, 0.4), (0.6, 0.4), (0.5, 0.472), (0.5, 0.2), (0.5, 0.8))
    }

    #[test]
    fn straight_face_is_level() {
        let pose = compute_pose(&straight_face(), 1000, 1000).unwrap();
        assert_abs_diff_eq!(pose.roll, 0.0, epsilon = 0.01);
        assert_abs_diff_eq!(pose.pitch, 0.0, epsilon = 2.0);
        assert_abs_diff_eq!(pose.yaw, 0.0, epsilon = 2.0);
    }

    #[test]
    fn coincident_eyes_give_zero_roll_and_yaw() {
        let lm = face((0.5, 0.4), (0.5, 0.4), (0.5, 0.5), (0.5, 0.2), (0.5, 0.8));
        let pose = compute_pose(&lm, 640, 480).unwrap();
        assert_eq!(pose.roll, 0.0);
        assert_eq!(pose.yaw, 0.0);
        assert!(pose.pitch.is_finite());
    }

    #[test]
    fn coincident_forehead_and_chin_do_not_divide_by_zero() {
        let lm = face((0.4, 0.4), (0.6, 0.4), (0.5, 0.5), (0.5, 0.6), (0.5, 0.6));
        let pose = compute_pose(&lm, 640, 480).unwrap();
        // ratio falls back to 0 and the vector angle is 0
        assert_abs_diff_eq!(pose.pitch, -0.12 * 90.0, epsilon = 1e-3);
    }

    #[test]
    fn fully_collapsed_face_is_all_zero_except_reference_offset() {
        let p = (0.5, 0.5);
        let pose = compute_pose(&face(p, p, p, p, p), 100, 100).unwrap();
        assert_eq!(pose.roll, 0.0);
        assert_eq!(pose.yaw, 0.0);
        assert!(pose.pitch.is_finite());
    }

    #[test]
    fn roll_follows_eye_line() {
        // right eye 100 px lower than the left over a 100 px run: 45 degrees
        let lm = face((0.4, 0.4), (0.5, 0.5), (0.45, 0.55), (0.45, 0.2), (0.45, 0.8));
        let pose = compute_pose(&lm, 1000, 1000).unwrap();
        assert_abs_diff_eq!(pose.roll, 45.0, epsilon = 0.01);
    }

    #[test]
    fn yaw_sign_tracks_nose_offset() {
        let towards_right = face((0.4, 0.4), (0.6, 0.4), (0.57, 0.472), (0.5, 0.2), (0.5, 0.8));
        let towards_left = face((0.4, 0.4), (0.6, 0.4), (0.43, 0.472), (0.5, 0.2), (0.5, 0.8));
        let r = compute_pose(&towards_right, 1000, 1000).unwrap();
        let l = compute_pose(&towards_left, 1000, 1000).unwrap();
        assert!(r.yaw > 10.0, "yaw {}", r.yaw);
        assert!(l.yaw < -10.0, "yaw {}", l.yaw);
        assert_abs_diff_eq!(r.yaw, -l.yaw, epsilon = 0.01);
    }

    #[test]
    fn nose_lower_on_face_raises_pitch() {
        // ratio 0.25 -> (0.25 - 0.12) * 90 = 11.7
        let lm = face((0.4, 0.4), (0.6, 0.4), (0.5, 0.55), (0.5, 0.2), (0.5, 0.8));
        let pose = compute_pose(&lm, 1000, 1000).unwrap();
        assert_abs_diff_eq!(pose.pitch, 11.7, epsilon = 0.01);
    }

    #[test]
    fn pitch_is_clamped() {
        let lm = face((0.4, 0.1), (0.6, 0.1), (0.5, 0.9), (0.5, 0.45), (0.5, 0.5));
        let pose = compute_pose(&lm, 1000, 1000).unwrap();
        assert_eq!(pose.pitch, 90.0);
    }

    #[test]
    fn too_few_landmarks_is_none() {
        let lm = Landmarks::new(vec![Point3D::new(0.5, 0.5); 100]);
        assert!(compute_pose(&lm, 640, 480).is_none());
    }

    #[test]
    fn pixel_positions_are_truncated() {
        let lm = face((0.4019, 0.4), (0.6, 0.4), (0.5, 0.5), (0.5, 0.2), (0.5, 0.8));
        let pts = FacePoints::resolve(&lm, 1000, 1000).unwrap();
        assert_eq!(pts.left_eye, PixelPoint::new(401, 400));
        assert_eq!(pts.eye_center(), PixelPoint::new(500, 400));
    }

    #[test]
    fn far_out_landmarks_stay_finite() {
        let lm = face((1e7, 0.4), (1e7, 0.4), (0.5, 0.472), (0.5, -1e7), (0.5, 1e7));
        let pose = compute_pose(&lm, 1000, 1000).unwrap();
        assert!(pose.roll.is_finite() && pose.pitch.is_finite() && pose.yaw.is_finite());
        assert!(pose.pitch.abs() <= 90.0);
    }

    #[test]
    fn midpoint_of_saturated_points_does_not_overflow() {
        let a = PixelPoint::new(i32::MAX, i32::MIN);
        assert_eq!(a.midpoint(&a), a);
        assert!(a.distance(&PixelPoint::new(i32::MIN, i32::MAX)).is_finite());
    }
}
