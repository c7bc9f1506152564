pub mod capture;
pub mod config;
pub mod crop;
pub mod detector;
pub mod direction;
pub mod error;
pub mod font;
pub mod head_pose;
pub mod inference;
pub mod overlay;
pub mod processor;
pub mod session;
pub mod types;

#[cfg(test)]
mod capture_tests;

pub use capture::{CaptureDecision, CaptureStateMachine, CaptureStore, Direction, DiskStore, NoCaptureReason};
pub use config::AppConfig;
pub use detector::FaceDetector;
pub use error::{EnrollError, Result};
pub use processor::{AnalysisResult, FrameProcessor};
pub use session::{CaptureStatus, EnrollmentSession, FrameReport};
