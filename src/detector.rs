use anyhow::Result;
use image::RgbImage;

use crate::types::{FaceDetection, Landmarks};

/// Face presence and landmark extraction, queried independently per frame.
///
/// Either query may fail or find nothing without affecting the other; the
/// frame processor treats an `Err` the same as `Ok(None)` after logging it.
pub trait FaceDetector: Send {
    fn name(&self) -> String;

    /// Best face in the frame, if any, with its detector confidence.
    fn detect_face(&mut self, frame: &RgbImage) -> Result<Option<FaceDetection>>;

    /// Landmarks of the (single) face, normalized to the frame size.
    fn extract_landmarks(&mut self, frame: &RgbImage) -> Result<Option<Landmarks>>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn detect_face(&mut self, frame: &RgbImage) -> Result<Option<FaceDetection>> {
        (**self).detect_face(frame)
    }

    fn extract_landmarks(&mut self, frame: &RgbImage) -> Result<Option<Landmarks>> {
        (**self).extract_landmarks(frame)
    }
}
