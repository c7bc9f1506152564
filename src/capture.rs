//! Five-slot capture state machine.
//!
//! Each session must collect one still per [`Direction`]. A frame fills at
//! most one slot; rules are tried yaw first, then pitch, then straight, and
//! the first match wins. A slot is only marked filled once the sample and
//! its metadata have been persisted.

use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::crop::FaceCropNormalizer;
use crate::direction::{DirectionLabels, PitchLabel, YawLabel};
use crate::error::{EnrollError, Result};
use crate::types::{Landmarks, PoseAngles, UserInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Straight,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Straight,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Canonical name used in file names and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Straight => "straight",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Instruction shown to the user for this orientation.
    pub fn display_label(&self) -> &'static str {
        match self {
            Direction::Straight => "Look straight",
            Direction::Left => "Turn left",
            Direction::Right => "Turn right",
            Direction::Up => "Look up",
            Direction::Down => "Look down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSlots {
    pub straight: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl CaptureSlots {
    pub fn is_filled(&self, dir: Direction) -> bool {
        match dir {
            Direction::Straight => self.straight,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    fn fill(&mut self, dir: Direction) {
        match dir {
            Direction::Straight => self.straight = true,
            Direction::Left => self.left = true,
            Direction::Right => self.right = true,
            Direction::Up => self.up = true,
            Direction::Down => self.down = true,
        }
    }

    pub fn is_complete(&self) -> bool {
        Direction::ALL.iter().all(|d| self.is_filled(*d))
    }

    pub fn filled_count(&self) -> usize {
        Direction::ALL.iter().filter(|d| self.is_filled(**d)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCaptureReason {
    Complete,
    LowConfidence,
    NoConditionMet,
}

impl fmt::Display for NoCaptureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoCaptureReason::Complete => "complete",
            NoCaptureReason::LowConfidence => "low confidence",
            NoCaptureReason::NoConditionMet => "no condition met",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureDecision {
    NoCapture(NoCaptureReason),
    Captured {
        direction: Direction,
        record: CapturedImage,
        all_complete: bool,
    },
}

/// Sidecar JSON written next to every stored sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub timestamp: String,
    pub direction: Direction,
    pub original_direction: String,
    pub real_face_score: f32,
    pub rotation: PoseAngles,
    pub session_id: String,
    pub image_size: String,
    pub user_info: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub id: u32,
    pub path: PathBuf,
    pub filename: String,
    pub metadata_path: PathBuf,
    pub direction: Direction,
    pub original_direction: String,
    pub timestamp: String,
    pub real_face_score: f32,
    pub rotation: PoseAngles,
    pub session_id: String,
    pub user: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureSummary {
    pub images: Vec<CapturedImage>,
    pub directions: CaptureSlots,
    pub all_captured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredCapture {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Destination for normalized samples and their metadata.
pub trait CaptureStore: Send {
    fn persist(&mut self, base_name: &str, image: &RgbImage, metadata: &CaptureMetadata) -> Result<StoredCapture>;
}

/// Writes `<dir>/<base>.jpg` and `<dir>/<base>.json`.
pub struct DiskStore {
    dir: PathBuf,
    jpeg_quality: u8,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            dir: dir.into(),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn write_jpeg(&self, path: &Path, image: &RgbImage) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality).encode_image(image)?;
        writer.flush()?;
        Ok(())
    }

    fn write_json(&self, path: &Path, metadata: &CaptureMetadata) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, metadata)?;
        Ok(())
    }
}

impl CaptureStore for DiskStore {
    fn persist(&mut self, base_name: &str, image: &RgbImage, metadata: &CaptureMetadata) -> Result<StoredCapture> {
        fs::create_dir_all(&self.dir)?;
        let image_path = self.dir.join(format!("{}.jpg", base_name));
        let metadata_path = self.dir.join(format!("{}.json", base_name));

        self.write_jpeg(&image_path, image)?;
        if let Err(e) = self.write_json(&metadata_path, metadata) {
            // no sample without its sidecar
            let _ = fs::remove_file(&image_path);
            return Err(e);
        }

        Ok(StoredCapture {
            image_path,
            metadata_path,
        })
    }
}

/// Rules 1-8 of the capture policy, without side effects.
pub fn select_direction(
    slots: &CaptureSlots,
    pose: &PoseAngles,
    labels: &DirectionLabels,
    confidence: f32,
    cfg: &CaptureConfig,
) -> std::result::Result<Direction, NoCaptureReason> {
    if slots.is_complete() {
        return Err(NoCaptureReason::Complete);
    }
    if confidence < cfg.min_confidence {
        return Err(NoCaptureReason::LowConfidence);
    }

    let turned = pose.yaw.abs() > cfg.turn_yaw_deg;
    if labels.yaw == YawLabel::TurnLeft && !slots.left && turned {
        Ok(Direction::Left)
    } else if labels.yaw == YawLabel::TurnRight && !slots.right && turned {
        Ok(Direction::Right)
    } else if labels.pitch == PitchLabel::Up && !slots.up && pose.pitch < cfg.up_pitch_deg {
        Ok(Direction::Up)
    } else if labels.pitch == PitchLabel::Down && !slots.down && pose.pitch > cfg.down_pitch_deg {
        Ok(Direction::Down)
    } else if pose.yaw.abs() <= cfg.straight_yaw_deg
        && pose.pitch.abs() <= cfg.straight_pitch_deg
        && !slots.straight
    {
        Ok(Direction::Straight)
    } else {
        Err(NoCaptureReason::NoConditionMet)
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub struct CaptureStateMachine {
    slots: CaptureSlots,
    captured: Vec<CapturedImage>,
    next_id: u32,
    session_id: String,
    user: UserInfo,
    thresholds: CaptureConfig,
    normalizer: FaceCropNormalizer,
    store: Box<dyn CaptureStore>,
}

impl CaptureStateMachine {
    pub fn new(thresholds: CaptureConfig, normalizer: FaceCropNormalizer, store: Box<dyn CaptureStore>) -> Self {
        Self {
            slots: CaptureSlots::default(),
            captured: Vec::new(),
            next_id: 1,
            session_id: new_session_id(),
            user: UserInfo::default(),
            thresholds,
            normalizer,
            store,
        }
    }

    pub fn slots(&self) -> &CaptureSlots {
        &self.slots
    }

    pub fn captured(&self) -> &[CapturedImage] {
        &self.captured
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn set_user(&mut self, user: UserInfo) {
        self.user = user;
    }

    pub fn is_complete(&self) -> bool {
        self.slots.is_complete()
    }

    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            images: self.captured.clone(),
            directions: self.slots,
            all_captured: self.slots.is_complete(),
        }
    }

    /// Decides whether this frame fills a slot and, if so, stores the
    /// normalized crop of `frame` (the raw, un-mirrored frame; `landmarks`
    /// must be in its coordinates). On a persistence error the slot stays
    /// open and the error is returned.
    pub fn try_capture(
        &mut self,
        frame: &RgbImage,
        landmarks: Option<&Landmarks>,
        pose: &PoseAngles,
        labels: &DirectionLabels,
        confidence: f32,
    ) -> Result<CaptureDecision> {
        let direction = match select_direction(&self.slots, pose, labels, confidence, &self.thresholds) {
            Ok(d) => d,
            Err(reason) => return Ok(CaptureDecision::NoCapture(reason)),
        };

        let record = self
            .persist(direction, frame, landmarks, pose, confidence)
            .map_err(|e| {
                error!("Capture '{}' failed, slot left open: {}", direction, e);
                EnrollError::Persist {
                    direction: direction.to_string(),
                    source: Box::new(e),
                }
            })?;

        self.slots.fill(direction);
        self.next_id += 1;
        self.captured.push(record.clone());
        info!(
            "Captured '{}' for '{}' -> {} ({}/5)",
            direction,
            self.user.fullname,
            record.path.display(),
            self.slots.filled_count()
        );

        Ok(CaptureDecision::Captured {
            direction,
            record,
            all_complete: self.slots.is_complete(),
        })
    }

    fn persist(
        &mut self,
        direction: Direction,
        frame: &RgbImage,
        landmarks: Option<&Landmarks>,
        pose: &PoseAngles,
        confidence: f32,
    ) -> Result<CapturedImage> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let base_name = format!("face-{}-{}-{}", self.session_id, direction, timestamp);
        let size = self.normalizer.output_size();

        let face = self.normalizer.crop_and_normalize(frame, landmarks)?;
        let metadata = CaptureMetadata {
            timestamp: timestamp.clone(),
            direction,
            original_direction: direction.display_label().to_string(),
            real_face_score: confidence,
            rotation: *pose,
            session_id: self.session_id.clone(),
            image_size: format!("{}x{}", size, size),
            user_info: self.user.clone(),
        };

        let stored = self.store.persist(&base_name, &face, &metadata)?;
        let filename = stored
            .image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.jpg", base_name));

        Ok(CapturedImage {
            id: self.next_id,
            path: stored.image_path,
            filename,
            metadata_path: stored.metadata_path,
            direction,
            original_direction: metadata.original_direction,
            timestamp,
            real_face_score: confidence,
            rotation: *pose,
            session_id: self.session_id.clone(),
            user: self.user.fullname.clone(),
        })
    }

    /// Clears slots and records and starts a new session id. Files already
    /// written are left alone.
    pub fn reset(&mut self) {
        let previous = std::mem::take(&mut self.session_id);
        let mut id = new_session_id();
        while id == previous {
            id = new_session_id();
        }
        self.session_id = id;
        self.slots = CaptureSlots::default();
        self.captured.clear();
        self.next_id = 1;
        info!("Capture session reset: {} -> {}", previous, self.session_id);
    }
}
