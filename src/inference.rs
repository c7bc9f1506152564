//! ONNX backend for [`FaceDetector`]: UltraFace (RFB-320) for the face box
//! and the 468-point face mesh for landmarks.

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use log::{info, warn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

use crate::config::ModelConfig;
use crate::detector::FaceDetector;
use crate::types::{FaceDetection, Landmarks, Point3D, Rect};

const DET_W: u32 = 320;
const DET_H: u32 = 240;
const MESH_SIZE: u32 = 192;
const MESH_POINTS: usize = 468;

fn load_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    Ok(session)
}

pub struct UltraFace {
    session: Session,
    anchors: Vec<(f32, f32, f32, f32)>, // cx, cy, w, h
    score_threshold: f32,
}

impl UltraFace {
    pub fn new(model_path: &Path, score_threshold: f32, intra_threads: usize) -> Result<Self> {
        let session = load_session(model_path, intra_threads)?;
        let anchors = generate_anchors(DET_W as usize, DET_H as usize);
        Ok(Self {
            session,
            anchors,
            score_threshold,
        })
    }

    pub fn detect(&mut self, frame: &RgbImage) -> Result<Option<FaceDetection>> {
        let resized = image::imageops::resize(frame, DET_W, DET_H, FilterType::Triangle);

        // NCHW, (pixel - 127) / 128
        let plane = (DET_W * DET_H) as usize;
        let mut input_data = vec![0.0f32; 3 * plane];
        for (x, y, p) in resized.enumerate_pixels() {
            let i = (y * DET_W + x) as usize;
            for c in 0..3 {
                input_data[c * plane + i] = (p[c] as f32 - 127.0) / 128.0;
            }
        }

        let input_tensor = Tensor::from_array((vec![1, 3, 240, 320], input_data))?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let (_, scores_data) = outputs["scores"].try_extract_tensor::<f32>()?;
        let (_, boxes_data) = outputs["boxes"].try_extract_tensor::<f32>()?;

        let best = decode_best(&self.anchors, scores_data, boxes_data, self.score_threshold);

        Ok(best.map(|(score, rect)| {
            let sx = frame.width() as f32 / DET_W as f32;
            let sy = frame.height() as f32 / DET_H as f32;
            FaceDetection {
                score,
                region: Rect::new(rect.x * sx, rect.y * sy, rect.width * sx, rect.height * sy),
            }
        }))
    }
}

/// Highest-scoring anchor above `threshold`, decoded to a box in 320x240 space.
fn decode_best(
    anchors: &[(f32, f32, f32, f32)],
    scores_raw: &[f32],
    boxes_raw: &[f32],
    threshold: f32,
) -> Option<(f32, Rect)> {
    let center_variance = 0.1;
    let size_variance = 0.2;

    let count = anchors
        .len()
        .min(scores_raw.len() / 2)
        .min(boxes_raw.len() / 4);

    let mut best: Option<(f32, Rect)> = None;
    for i in 0..count {
        let score = scores_raw[i * 2 + 1];
        if score <= threshold || best.map_or(false, |(s, _)| score <= s) {
            continue;
        }
        let (ax, ay, aw, ah) = anchors[i];
        let cx = boxes_raw[i * 4] * center_variance * aw + ax;
        let cy = boxes_raw[i * 4 + 1] * center_variance * ah + ay;
        let w = (boxes_raw[i * 4 + 2] * size_variance).exp() * aw;
        let h = (boxes_raw[i * 4 + 3] * size_variance).exp() * ah;

        let rect = Rect::new(
            (cx - w / 2.0) * DET_W as f32,
            (cy - h / 2.0) * DET_H as f32,
            w * DET_W as f32,
            h * DET_H as f32,
        );
        best = Some((score, rect));
    }
    best
}

fn generate_anchors(width: usize, height: usize) -> Vec<(f32, f32, f32, f32)> {
    let shrinkage_list = [8, 16, 32, 64];
    let min_boxes: [&[f32]; 4] = [&[10.0, 16.0, 24.0], &[32.0, 48.0], &[64.0, 96.0], &[128.0, 192.0, 256.0]];
    let mut anchors = Vec::new();

    let w = width as f32;
    let h = height as f32;

    for (i, &shrinkage) in shrinkage_list.iter().enumerate() {
        let s = shrinkage as f32;
        let feature_h = (h / s).ceil() as usize;
        let feature_w = (w / s).ceil() as usize;

        for v in 0..feature_h {
            for u in 0..feature_w {
                let cx = (u as f32 * s + s / 2.0) / w;
                let cy = (v as f32 * s + s / 2.0) / h;
                for &min_box in min_boxes[i] {
                    anchors.push((cx, cy, min_box / w, min_box / h));
                }
            }
        }
    }
    anchors
}

pub struct FaceMesh {
    session: Session,
}

impl FaceMesh {
    pub fn new(model_path: &Path, intra_threads: usize) -> Result<Self> {
        Ok(Self {
            session: load_session(model_path, intra_threads)?,
        })
    }

    /// Runs the mesh on `roi` (or the whole frame) and returns landmarks
    /// normalized to the full frame.
    pub fn landmarks(&mut self, frame: &RgbImage, roi: Option<Rect>) -> Result<Option<Landmarks>> {
        let (fw, fh) = (frame.width() as f32, frame.height() as f32);

        let (crop, offset_x, offset_y, crop_w, crop_h) = match roi {
            Some(rect) => {
                // Expand the box a little; the mesh wants forehead and chin in view.
                let pad_w = rect.width * 0.25;
                let pad_h = rect.height * 0.25;
                let x = (rect.x - pad_w / 2.0).max(0.0);
                let y = (rect.y - pad_h / 2.0).max(0.0);
                let w = (rect.width + pad_w).min(fw - x);
                let h = (rect.height + pad_h).min(fh - y);
                if w < 1.0 || h < 1.0 {
                    return Ok(None);
                }
                let crop = image::imageops::crop_imm(frame, x as u32, y as u32, w as u32, h as u32).to_image();
                (crop, x, y, w, h)
            }
            None => (frame.clone(), 0.0, 0.0, fw, fh),
        };

        let resized = image::imageops::resize(&crop, MESH_SIZE, MESH_SIZE, FilterType::Triangle);
        // NHWC, [-1, 1]
        let input_data: Vec<f32> = resized
            .pixels()
            .flat_map(|p| p.0.map(|c| c as f32 / 127.5 - 1.0))
            .collect();

        let input = Tensor::from_array((vec![1, 192, 192, 3], input_data))?;
        let outputs = self.session.run(ort::inputs![input])?;
        let (_, output_data) = outputs[0].try_extract_tensor::<f32>()?;

        if output_data.len() < MESH_POINTS * 3 {
            warn!("Face mesh returned {} values, expected {}", output_data.len(), MESH_POINTS * 3);
            return Ok(None);
        }

        let scale_x = crop_w / MESH_SIZE as f32;
        let scale_y = crop_h / MESH_SIZE as f32;
        let points = output_data
            .chunks_exact(3)
            .take(MESH_POINTS)
            .map(|v| Point3D {
                x: (offset_x + v[0] * scale_x) / fw,
                y: (offset_y + v[1] * scale_y) / fh,
                z: v[2],
            })
            .collect();

        Ok(Some(Landmarks { points }))
    }
}

/// Detector + mesh pair. Missing model files disable the matching query,
/// which then reports no result.
///
/// The face region found by `detect_face` is kept for the next
/// `extract_landmarks` call on the same frame, so the detector runs once per
/// frame when both queries are made in that order.
pub struct OnnxFaceDetector {
    detector: Option<UltraFace>,
    mesh: Option<FaceMesh>,
    pending_region: Option<Result<Option<Rect>>>,
}

impl OnnxFaceDetector {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let det_path = Path::new(&config.face_detection_path);
        let detector = if det_path.exists() {
            info!("Loading face detector from {}", det_path.display());
            Some(UltraFace::new(det_path, config.min_detection_score, config.intra_threads)?)
        } else {
            warn!("Face detector {} not found; no face will be detected", det_path.display());
            None
        };

        let mesh_path = Path::new(&config.face_mesh_path);
        let mesh = if mesh_path.exists() {
            info!("Loading face mesh from {}", mesh_path.display());
            Some(FaceMesh::new(mesh_path, config.intra_threads)?)
        } else {
            warn!("Face mesh {} not found; pose will not be estimated", mesh_path.display());
            None
        };

        Ok(Self {
            detector,
            mesh,
            pending_region: None,
        })
    }
}

/// Where the mesh should look given the detector's answer. `None` skips the
/// mesh (no face); `Some(None)` means the whole frame.
fn mesh_roi(detection: Result<Option<Rect>>) -> Option<Option<Rect>> {
    match detection {
        Ok(Some(region)) => Some(Some(region)),
        Ok(None) => None,
        Err(e) => {
            warn!("Face detector failed ({:#}); running the mesh on the full frame", e);
            Some(None)
        }
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn name(&self) -> String {
        "UltraFace + Face Mesh (ONNX)".to_string()
    }

    fn detect_face(&mut self, frame: &RgbImage) -> Result<Option<FaceDetection>> {
        let Some(det) = &mut self.detector else {
            return Ok(None);
        };
        let result = det.detect(frame);
        self.pending_region = Some(match &result {
            Ok(face) => Ok(face.map(|f| f.region)),
            Err(e) => Err(anyhow!("{:#}", e)),
        });
        result
    }

    fn extract_landmarks(&mut self, frame: &RgbImage) -> Result<Option<Landmarks>> {
        let pending = self.pending_region.take();
        let Some(mesh) = &mut self.mesh else {
            return Ok(None);
        };
        let roi = match &mut self.detector {
            Some(det) => {
                let detection = pending.unwrap_or_else(|| det.detect(frame).map(|face| face.map(|f| f.region)));
                match mesh_roi(detection) {
                    Some(roi) => roi,
                    None => return Ok(None),
                }
            }
            None => None,
        };
        mesh.landmarks(frame, roi)
    }
}
