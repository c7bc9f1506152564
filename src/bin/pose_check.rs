use anyhow::Context;
use face_enroll::config::AppConfig;
use face_enroll::crop::FaceCropNormalizer;
use face_enroll::detector::FaceDetector;
use face_enroll::direction::classify_with;
use face_enroll::head_pose::compute_pose_with;
use face_enroll::inference::OnnxFaceDetector;
use image::ImageReader;
use std::path::PathBuf;

/// Runs detector and geometry on one still and writes the normalized crop
/// next to it as `<stem>_face.jpg`.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(img_path) = std::env::args().nth(1).map(PathBuf::from) else {
        anyhow::bail!("usage: pose_check <IMAGE>");
    };
    let config = AppConfig::load(AppConfig::DEFAULT_PATH)?;

    println!("Loading {:?}", img_path);
    let img = ImageReader::open(&img_path)?
        .decode()
        .with_context(|| format!("Cannot decode {}", img_path.display()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    println!("Frame: {}x{}", w, h);

    let mut detector = OnnxFaceDetector::new(&config.models)?;
    match detector.detect_face(&img)? {
        Some(face) => println!(
            "Face: score {:.3} at ({:.0}, {:.0}) {:.0}x{:.0}",
            face.score.clamp(0.0, 1.0),
            face.region.x,
            face.region.y,
            face.region.width,
            face.region.height
        ),
        None => println!("Face: none"),
    }

    let landmarks = detector.extract_landmarks(&img)?;
    match landmarks.as_ref().and_then(|lm| compute_pose_with(lm, w, h, &config.pose)) {
        Some(pose) => {
            let labels = classify_with(&pose, &config.labels);
            println!("Roll {:>7.2}  Pitch {:>7.2}  Yaw {:>7.2}", pose.roll, pose.pitch, pose.yaw);
            println!("Labels: {}", labels);
        }
        None => println!("Pose: not estimated"),
    }

    let crop = FaceCropNormalizer::new(&config.crop).crop_and_normalize(&img, landmarks.as_ref())?;
    let stem = img_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let out = img_path.with_file_name(format!("{}_face.jpg", stem));
    crop.save(&out)?;
    println!("Crop {}x{} written to {}", crop.width(), crop.height(), out.display());
    Ok(())
}
