use anyhow::{bail, Context};
use clap::Parser;
use colored::*;
use image::ImageReader;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

mod args;

use args::Args;
use face_enroll::capture::{CaptureDecision, CaptureSummary, Direction};
use face_enroll::inference::OnnxFaceDetector;
use face_enroll::types::UserInfo;
use face_enroll::{AppConfig, CaptureStatus, DiskStore, EnrollmentSession};

const FRAME_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "ppm"];

fn list_frames(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

fn print_summary(summary: &CaptureSummary, session_id: &str) {
    println!();
    println!("{}", format!("Session {}", session_id).bold());
    for dir in Direction::ALL {
        let status = if summary.directions.is_filled(dir) {
            "captured".green()
        } else {
            "missing".red()
        };
        println!("  {:<9} {}", dir.as_str(), status);
    }
    for image in &summary.images {
        println!(
            "  #{} {:<9} score {:.2}  roll {:>6.1} pitch {:>6.1} yaw {:>6.1}  {}",
            image.id,
            image.direction.as_str(),
            image.real_face_score,
            image.rotation.roll,
            image.rotation.pitch,
            image.rotation.yaw,
            image.path.display()
        );
    }
    if summary.all_captured {
        println!("{}", "All five directions captured.".green().bold());
    } else {
        println!("{}", format!("{}/5 directions captured.", summary.directions.filled_count()).yellow());
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // 0. Load Config
    let mut config = AppConfig::load(&args.config)?;
    if args.no_mirror {
        config.display.mirror = false;
    }
    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));

    // 1. Collect frames
    let frames = list_frames(&args.frames)?;
    if frames.is_empty() {
        bail!("No frames found in {}", args.frames.display());
    }
    println!("Found {} frames in {}", frames.len(), args.frames.display());

    // 2. Setup detector and session
    let detector = OnnxFaceDetector::new(&config.models)?;
    let store = DiskStore::new(&output_dir, config.crop.jpeg_quality);
    let mut session = EnrollmentSession::new(Box::new(detector), Box::new(store), &config);
    session.set_user(UserInfo {
        fullname: args.fullname.clone(),
        employee_id: args.employee_id.clone(),
        email: args.email.clone(),
        department: args.department.clone(),
    });
    println!("Detector: {}", session.detector_name());
    println!("Session: {}  ->  {}", session.session_id(), output_dir.display());

    if let Some(dir) = &args.annotated {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    }

    // 3. Run the stream
    for (index, path) in frames.iter().enumerate() {
        let frame = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
            Ok(reader) => match reader.decode() {
                Ok(img) => img,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            },
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let report = session.process_frame(&frame);

        if let Some(dir) = &args.annotated {
            let out = dir.join(format!("frame_{:05}.png", index));
            if let Err(e) = report.annotated.save(&out) {
                warn!("Failed to write annotated frame {}: {}", out.display(), e);
            }
        }

        match &report.capture {
            CaptureStatus::Decided(CaptureDecision::Captured { direction, record, .. }) => {
                println!(
                    "{}",
                    format!("[{}] {} -> {}", index, direction.display_label(), record.filename).green()
                );
            }
            CaptureStatus::Failed(e) => {
                println!("{}", format!("[{}] capture failed: {}", index, e).red());
            }
            _ => {}
        }

        if session.is_complete() {
            info!("All directions captured after {} frames", index + 1);
            break;
        }
    }

    print_summary(&session.summary(), session.session_id());
    Ok(())
}
