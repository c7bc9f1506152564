use image::{DynamicImage, RgbImage};

use crate::capture::{CaptureDecision, CaptureSlots, CaptureStateMachine, CaptureStore, CaptureSummary, CapturedImage};
use crate::config::AppConfig;
use crate::crop::FaceCropNormalizer;
use crate::detector::FaceDetector;
use crate::error::EnrollError;
use crate::processor::{AnalysisResult, FrameFault, FrameProcessor};
use crate::types::UserInfo;

#[derive(Debug)]
pub enum CaptureStatus {
    /// The frame lacked a detected face or a pose estimate.
    NotAttempted,
    Decided(CaptureDecision),
    /// Persisting the sample failed; the slot is still open.
    Failed(EnrollError),
}

#[derive(Debug)]
pub struct FrameReport {
    pub annotated: RgbImage,
    pub analysis: AnalysisResult,
    pub fault: Option<FrameFault>,
    pub capture: CaptureStatus,
}

impl FrameReport {
    pub fn captured(&self) -> Option<&CapturedImage> {
        match &self.capture {
            CaptureStatus::Decided(CaptureDecision::Captured { record, .. }) => Some(record),
            _ => None,
        }
    }
}

/// One enrollment run: owns the frame processor and the capture state, so
/// several sessions can live side by side.
pub struct EnrollmentSession {
    processor: FrameProcessor,
    capture: CaptureStateMachine,
}

impl EnrollmentSession {
    pub fn new(detector: Box<dyn FaceDetector>, store: Box<dyn CaptureStore>, config: &AppConfig) -> Self {
        Self {
            processor: FrameProcessor::new(detector, config),
            capture: CaptureStateMachine::new(config.capture, FaceCropNormalizer::new(&config.crop), store),
        }
    }

    pub fn process_frame(&mut self, frame: &DynamicImage) -> FrameReport {
        let analysis = self.processor.process(frame);
        let result = analysis.result;

        let capture = if analysis.fault.is_some() || !(result.face_detected && result.pose_estimated) {
            CaptureStatus::NotAttempted
        } else {
            match self.capture.try_capture(
                &analysis.raw,
                analysis.landmarks.as_ref(),
                &result.pose,
                &result.labels,
                result.real_face_score,
            ) {
                Ok(decision) => CaptureStatus::Decided(decision),
                Err(e) => CaptureStatus::Failed(e),
            }
        };

        let mut annotated = analysis.annotated;
        if analysis.fault.is_none() {
            self.processor
                .overlay()
                .draw_progress(&mut annotated, self.capture.slots());
        }

        FrameReport {
            annotated,
            analysis: result,
            fault: analysis.fault,
            capture,
        }
    }

    pub fn detector_name(&self) -> String {
        self.processor.detector_name()
    }

    pub fn summary(&self) -> CaptureSummary {
        self.capture.summary()
    }

    pub fn slots(&self) -> &CaptureSlots {
        self.capture.slots()
    }

    pub fn is_complete(&self) -> bool {
        self.capture.is_complete()
    }

    pub fn latest(&self) -> Option<&CapturedImage> {
        self.capture.captured().last()
    }

    pub fn session_id(&self) -> &str {
        self.capture.session_id()
    }

    pub fn set_user(&mut self, user: UserInfo) {
        self.capture.set_user(user);
    }

    pub fn reset(&mut self) {
        self.capture.reset();
    }
}
