//! Debug annotations drawn on the mirrored display frame.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;

use crate::capture::{CaptureSlots, Direction};
use crate::config::{parse_hex, DisplayConfig};
use crate::direction::DirectionLabels;
use crate::font;
use crate::types::{Landmarks, PoseAngles, Rect};

const TEXT_SCALE: u32 = 2;
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);
const GREY: Rgb<u8> = Rgb([160, 160, 160]);

pub struct Overlay {
    enabled: bool,
    show_landmarks: bool,
    landmark_color: Rgb<u8>,
    score_threshold: f32,
}

impl Overlay {
    /// `score_threshold` picks the colour of the real-face score line.
    pub fn new(display: &DisplayConfig, score_threshold: f32) -> Self {
        let (r, g, b) = parse_hex(&display.landmark_color_hex);
        Self {
            enabled: display.draw_overlay,
            show_landmarks: display.show_landmarks,
            landmark_color: Rgb([r, g, b]),
            score_threshold,
        }
    }

    pub fn draw_detection(&self, img: &mut RgbImage, region: &Rect, score: f32) {
        if !self.enabled {
            return;
        }
        let (w, h) = img.dimensions();
        let x = region.x.max(0.0) as i32;
        let y = region.y.max(0.0) as i32;
        let rw = region.width.min(w as f32 - x as f32).max(1.0) as u32;
        let rh = region.height.min(h as f32 - y as f32).max(1.0) as u32;
        draw_hollow_rect_mut(img, PixelRect::at(x, y).of_size(rw, rh), GREEN);

        let color = if score > self.score_threshold { GREEN } else { RED };
        let text = format!("REAL FACE: {:.0}%", score * 100.0);
        font::draw_text_line(img, 10, 10, &text, color, TEXT_SCALE);
    }

    pub fn draw_landmarks(&self, img: &mut RgbImage, landmarks: &Landmarks) {
        if !self.enabled || !self.show_landmarks {
            return;
        }
        let (w, h) = img.dimensions();
        for p in &landmarks.points {
            let x = (p.x * w as f32) as i32;
            let y = (p.y * h as f32) as i32;
            draw_filled_circle_mut(img, (x, y), 1, self.landmark_color);
        }
    }

    pub fn draw_pose(&self, img: &mut RgbImage, pose: &PoseAngles, labels: &DirectionLabels) {
        if !self.enabled {
            return;
        }
        let step = font::line_height(TEXT_SCALE) + 4;
        let mut y = 10 + step;
        for line in [
            format!("ROLL: {:.1}", pose.roll),
            format!("PITCH: {:.1}", pose.pitch),
            format!("YAW: {:.1}", pose.yaw),
        ] {
            font::draw_text_line(img, 10, y, &line, BLUE, TEXT_SCALE);
            y += step;
        }
        font::draw_text_line(img, 10, y, &format!("DIR: {}", labels), ORANGE, TEXT_SCALE);
    }

    /// One marker per slot along the bottom edge; filled slots are green.
    pub fn draw_progress(&self, img: &mut RgbImage, slots: &CaptureSlots) {
        if !self.enabled {
            return;
        }
        let (_, h) = img.dimensions();
        let y = h.saturating_sub(font::line_height(TEXT_SCALE) + 6);
        let mut x = 10;
        for dir in Direction::ALL {
            let color = if slots.is_filled(dir) { GREEN } else { GREY };
            let text = format!("[{}]", dir.as_str());
            font::draw_text_line(img, x, y, &text, color, TEXT_SCALE);
            x += font::measure_text_width(&text, TEXT_SCALE) + font::advance(TEXT_SCALE);
        }
    }
}
