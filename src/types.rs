use serde::{Deserialize, Serialize};

/// A single landmark. `x`/`y` are normalized to the frame (0..1), `z` is
/// the detector's relative depth and is not used by the geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Ordered landmark set for one face, as produced by the mesh model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landmarks {
    pub points: Vec<Point3D>,
}

impl Landmarks {
    pub fn new(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reflects every point across the vertical centre line (`x -> 1 - x`).
    /// Used to map landmarks found on a mirrored frame back onto the raw one.
    pub fn mirrored(&self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point3D {
                    x: 1.0 - p.x,
                    y: p.y,
                    z: p.z,
                })
                .collect(),
        }
    }
}

/// Integer pixel position; landmark coordinates are truncated, not rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_landmark(point: &Point3D, width: u32, height: u32) -> Self {
        Self {
            x: (point.x * width as f32) as i32,
            y: (point.y * height as f32) as i32,
        }
    }

    /// Computed in `f32`; far-off points saturate instead of overflowing.
    pub fn distance(&self, other: &PixelPoint) -> f32 {
        let dx = other.x as f32 - self.x as f32;
        let dy = other.y as f32 - self.y as f32;
        dx.hypot(dy)
    }

    /// Floor of the midpoint, summed in `i64`.
    pub fn midpoint(&self, other: &PixelPoint) -> PixelPoint {
        let mid = |a: i32, b: i32| (a as i64 + b as i64).div_euclid(2) as i32;
        PixelPoint::new(mid(self.x, other.x), mid(self.y, other.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Result of the face-presence query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub score: f32,
    pub region: Rect,
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseAngles {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl PoseAngles {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Identity snapshot attached to every capture's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub fullname: String,
    #[serde(rename = "employeeId")]
    pub employee_id: String,
    pub email: String,
    pub department: String,
}
