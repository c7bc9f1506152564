//! Per-frame orchestration: validate, mirror, query the detector, derive the
//! pose and labels, and annotate a display copy.

use image::{imageops, DynamicImage, RgbImage};
use log::{debug, error, warn};
use std::fmt;

use crate::config::{AppConfig, LabelConfig, PoseConfig};
use crate::detector::FaceDetector;
use crate::direction::{classify_with, DirectionLabels};
use crate::head_pose::compute_pose_with;
use crate::overlay::Overlay;
use crate::types::{Landmarks, PoseAngles};

/// Size of the blank frame returned for unusable input.
pub const BLANK_WIDTH: u32 = 640;
pub const BLANK_HEIGHT: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFault {
    Empty { width: u32, height: u32 },
    UnsupportedChannels(u8),
}

impl fmt::Display for FrameFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameFault::Empty { width, height } => write!(f, "empty frame ({}x{})", width, height),
            FrameFault::UnsupportedChannels(n) => write!(f, "expected 3 colour channels, got {}", n),
        }
    }
}

/// What one frame says about the face. Overwritten every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisResult {
    pub face_detected: bool,
    /// Detector confidence clamped to `[0, 1]`.
    pub real_face_score: f32,
    pub pose: PoseAngles,
    pub labels: DirectionLabels,
    /// False when no landmarks were available; `pose` is then all zeros.
    pub pose_estimated: bool,
}

#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Display copy (mirrored when enabled) with overlays drawn on it.
    pub annotated: RgbImage,
    /// The frame as received, never mirrored or annotated.
    pub raw: RgbImage,
    pub result: AnalysisResult,
    /// Landmarks in `raw` coordinates.
    pub landmarks: Option<Landmarks>,
    pub fault: Option<FrameFault>,
}

impl FrameAnalysis {
    fn blank(fault: FrameFault) -> Self {
        let blank = RgbImage::new(BLANK_WIDTH, BLANK_HEIGHT);
        Self {
            annotated: blank.clone(),
            raw: blank,
            result: AnalysisResult::default(),
            landmarks: None,
            fault: Some(fault),
        }
    }
}

pub fn validate_frame(frame: &DynamicImage) -> Option<FrameFault> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return Some(FrameFault::Empty { width, height });
    }
    let channels = frame.color().channel_count();
    if channels != 3 {
        return Some(FrameFault::UnsupportedChannels(channels));
    }
    None
}

/// Normalized coordinates beyond this margin outside `[0, 1]` are treated as
/// a broken landmark set.
const LANDMARK_MARGIN: f32 = 1.0;

fn landmarks_usable(landmarks: &Landmarks) -> bool {
    let in_range = |v: f32| v.is_finite() && (-LANDMARK_MARGIN..=1.0 + LANDMARK_MARGIN).contains(&v);
    landmarks.points.iter().all(|p| in_range(p.x) && in_range(p.y))
}

fn clamp_score(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub struct FrameProcessor {
    detector: Box<dyn FaceDetector>,
    overlay: Overlay,
    pose_config: PoseConfig,
    label_config: LabelConfig,
    mirror: bool,
}

impl FrameProcessor {
    pub fn new(detector: Box<dyn FaceDetector>, config: &AppConfig) -> Self {
        Self {
            detector,
            overlay: Overlay::new(&config.display, config.capture.min_confidence),
            pose_config: config.pose,
            label_config: config.labels,
            mirror: config.display.mirror,
        }
    }

    pub fn detector_name(&self) -> String {
        self.detector.name()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Never fails: malformed input yields a blank frame with `fault` set,
    /// and detector errors are logged and treated as "nothing found".
    pub fn process(&mut self, frame: &DynamicImage) -> FrameAnalysis {
        if let Some(fault) = validate_frame(frame) {
            warn!("Skipping invalid frame: {}", fault);
            return FrameAnalysis::blank(fault);
        }

        let raw = frame.to_rgb8();
        let view = if self.mirror {
            imageops::flip_horizontal(&raw)
        } else {
            raw.clone()
        };
        let (width, height) = view.dimensions();
        let mut annotated = view.clone();
        let mut result = AnalysisResult::default();

        let detection = self.detector.detect_face(&view).unwrap_or_else(|e| {
            error!("Face detection failed: {:#}", e);
            None
        });
        if let Some(face) = detection {
            result.face_detected = true;
            result.real_face_score = clamp_score(face.score);
            self.overlay
                .draw_detection(&mut annotated, &face.region, result.real_face_score);
        }

        let landmarks = self
            .detector
            .extract_landmarks(&view)
            .unwrap_or_else(|e| {
                error!("Landmark extraction failed: {:#}", e);
                None
            })
            .filter(|lm| {
                let usable = landmarks_usable(lm);
                if !usable {
                    debug!("Dropping landmark set with non-finite or off-frame points");
                }
                usable
            });
        if let Some(lm) = &landmarks {
            self.overlay.draw_landmarks(&mut annotated, lm);
            match compute_pose_with(lm, width, height, &self.pose_config) {
                Some(pose) => {
                    result.pose = pose;
                    result.labels = classify_with(&pose, &self.label_config);
                    result.pose_estimated = true;
                    self.overlay.draw_pose(&mut annotated, &pose, &result.labels);
                }
                None => debug!("Only {} landmarks, pose not estimated", lm.len()),
            }
        }

        let landmarks = match landmarks {
            Some(lm) if self.mirror => Some(lm.mirrored()),
            other => other,
        };

        FrameAnalysis {
            annotated,
            raw,
            result,
            landmarks,
            fault: None,
        }
    }
}
