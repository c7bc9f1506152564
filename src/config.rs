use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelConfig,
    pub pose: PoseConfig,
    pub labels: LabelConfig,
    pub capture: CaptureConfig,
    pub crop: CropConfig,
    pub display: DisplayConfig,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub face_detection_path: String,
    pub face_mesh_path: String,
    pub min_detection_score: f32,
    pub intra_threads: usize,
}

/// Constants of the landmark pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Nose/eye-centre to forehead/chin ratio observed when facing straight.
    pub reference_ratio: f32,
    pub pitch_gain: f32,
    /// Weight of the forehead->chin vector angle subtracted from the ratio estimate.
    pub vector_weight: f32,
}

/// Display label thresholds (degrees). Looser than the capture thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub roll_straight_deg: f32,
    pub pitch_up_deg: f32,
    pub pitch_down_deg: f32,
    pub yaw_straight_deg: f32,
}

/// Capture trigger thresholds (degrees, confidence in 0..1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub min_confidence: f32,
    pub turn_yaw_deg: f32,
    pub up_pitch_deg: f32,
    pub down_pitch_deg: f32,
    pub straight_yaw_deg: f32,
    pub straight_pitch_deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Padding on each side as a fraction of the landmark box's longer side.
    pub padding_ratio: f32,
    pub output_size: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mirror: bool,
    pub draw_overlay: bool,
    pub show_landmarks: bool,
    pub landmark_color_hex: String, // e.g. "#FF0000"
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detection_path: "face_detection.onnx".to_string(),
            face_mesh_path: "face_mesh.onnx".to_string(),
            min_detection_score: 0.5,
            intra_threads: 4,
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            reference_ratio: 0.12,
            pitch_gain: 90.0,
            vector_weight: 0.3,
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            roll_straight_deg: 10.0,
            pitch_up_deg: -7.0,
            pitch_down_deg: 10.0,
            yaw_straight_deg: 10.0,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            turn_yaw_deg: 15.0,
            up_pitch_deg: -7.0,
            down_pitch_deg: 10.0,
            straight_yaw_deg: 10.0,
            straight_pitch_deg: 10.0,
        }
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            padding_ratio: 0.5,
            output_size: 128,
            jpeg_quality: 80,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            draw_overlay: true,
            show_landmarks: false,
            landmark_color_hex: "#FF0000".to_string(),
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.json";

    /// Loads the config at `path`, falling back to defaults when the file is
    /// missing or unparsable. The result is always written back so fields
    /// added since the file was created show up in it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = fs::read_to_string(path)?;
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    info!("Loaded configuration from {}", path.display());
                    c
                }
                Err(e) => {
                    warn!("Error parsing config {}: {}. Loading defaults.", path.display(), e);
                    Self::default()
                }
            }
        } else {
            info!("Configuration file not found. Creating default at {}", path.display());
            Self::default()
        };

        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelConfig::default(),
            pose: PoseConfig::default(),
            labels: LabelConfig::default(),
            capture: CaptureConfig::default(),
            crop: CropConfig::default(),
            display: DisplayConfig::default(),
            output_dir: "temp_captures".to_string(),
        }
    }
}

/// Parses `#RRGGBB`; anything else yields red.
pub fn parse_hex(hex: &str) -> (u8, u8, u8) {
    if hex.len() == 7 && hex.starts_with('#') {
        let r = u8::from_str_radix(&hex[1..3], 16).unwrap_or(255);
        let g = u8::from_str_radix(&hex[3..5], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[5..7], 16).unwrap_or(0);
        (r, g, b)
    } else {
        (255, 0, 0)
    }
}
