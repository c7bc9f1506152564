//! Square face crop and fixed-size resample for stored enrollment samples.

use fast_image_resize as fr;
use image::{imageops, RgbImage};
use log::warn;

use crate::config::CropConfig;
use crate::error::{EnrollError, Result};
use crate::types::{Landmarks, PixelPoint};

/// Pixel region `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl CropRegion {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FaceCropNormalizer {
    padding_ratio: f32,
    output_size: u32,
}

impl Default for FaceCropNormalizer {
    fn default() -> Self {
        Self::new(&CropConfig::default())
    }
}

impl FaceCropNormalizer {
    pub fn new(config: &CropConfig) -> Self {
        Self {
            padding_ratio: config.padding_ratio,
            output_size: config.output_size.max(1),
        }
    }

    pub fn output_size(&self) -> u32 {
        self.output_size
    }

    /// Crops `frame` around the face (or its centre square when there are no
    /// landmarks) and resamples to `output_size` x `output_size`.
    pub fn crop_and_normalize(&self, frame: &RgbImage, landmarks: Option<&Landmarks>) -> Result<RgbImage> {
        let cropped = match landmarks.filter(|l| !l.is_empty()) {
            Some(lm) => self.crop_face(frame, lm),
            None => center_square(frame),
        };
        resize_area(&cropped, self.output_size, self.output_size)
    }

    fn crop_face(&self, frame: &RgbImage, landmarks: &Landmarks) -> RgbImage {
        let region = self.face_region(landmarks, frame.width(), frame.height());
        if region.is_empty() {
            warn!("Face crop region {:?} is empty, keeping the full frame", region);
            return frame.clone();
        }
        imageops::crop_imm(
            frame,
            region.left as u32,
            region.top as u32,
            region.width() as u32,
            region.height() as u32,
        )
        .to_image()
    }

    /// Padded square around the landmark bounding box, clamped to the frame
    /// and re-squared along the shorter axis where the frame allows.
    pub fn face_region(&self, landmarks: &Landmarks, width: u32, height: u32) -> CropRegion {
        let (w, h) = (width as i64, height as i64);
        let coords: Vec<(i64, i64)> = landmarks
            .points
            .iter()
            .map(|p| {
                let px = PixelPoint::from_landmark(p, width, height);
                (px.x as i64, px.y as i64)
            })
            .collect();

        let x_min = coords.iter().map(|p| p.0).min().unwrap_or(0);
        let x_max = coords.iter().map(|p| p.0).max().unwrap_or(0);
        let y_min = coords.iter().map(|p| p.1).min().unwrap_or(0);
        let y_max = coords.iter().map(|p| p.1).max().unwrap_or(0);

        let center_x = (x_min + x_max).div_euclid(2);
        let center_y = (y_min + y_max).div_euclid(2);

        let face_size = (x_max - x_min).max(y_max - y_min);
        let padding = (face_size as f32 * self.padding_ratio) as i64;
        let half = (face_size + 2 * padding).div_euclid(2);

        let mut left = (center_x - half).max(0);
        let mut top = (center_y - half).max(0);
        let mut right = (center_x + half).min(w);
        let mut bottom = (center_y + half).min(h);

        let crop_w = right - left;
        let crop_h = bottom - top;
        if crop_w > crop_h {
            let diff = crop_w - crop_h;
            top = (top - diff / 2).max(0);
            bottom = (bottom + diff / 2).min(h);
        } else if crop_h > crop_w {
            let diff = crop_h - crop_w;
            left = (left - diff / 2).max(0);
            right = (right + diff / 2).min(w);
        }

        // off-frame regions collapse to an empty one inside the frame
        CropRegion {
            left: left.clamp(0, w) as i32,
            top: top.clamp(0, h) as i32,
            right: right.clamp(0, w) as i32,
            bottom: bottom.clamp(0, h) as i32,
        }
    }
}

/// Centre square with the side of the frame's shorter dimension.
pub fn center_square(frame: &RgbImage) -> RgbImage {
    let (w, h) = frame.dimensions();
    let size = w.min(h);
    imageops::crop_imm(frame, (w - size) / 2, (h - size) / 2, size, size).to_image()
}

/// Area-averaging resample (box-filter convolution). Each output pixel is
/// the mean of the source pixels under its footprint when downsampling;
/// upsampling replicates source pixels and blends only at their borders.
pub fn resize_area(src: &RgbImage, dst_w: u32, dst_h: u32) -> Result<RgbImage> {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Ok(RgbImage::new(dst_w, dst_h));
    }
    if (src_w, src_h) == (dst_w, dst_h) {
        return Ok(src.clone());
    }

    let src_view = fr::images::ImageRef::new(src_w, src_h, src.as_raw(), fr::PixelType::U8x3)?;
    let mut dst = fr::images::Image::new(dst_w, dst_h, fr::PixelType::U8x3);

    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Box));
    fr::Resizer::new().resize(&src_view, &mut dst, Some(&options))?;

    RgbImage::from_raw(dst_w, dst_h, dst.into_vec()).ok_or(EnrollError::Resample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3D;
    use image::Rgb;

    fn frame(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    fn box_landmarks(x0: f32, y0: f32, x1: f32, y1: f32) -> Landmarks {
        Landmarks::new(vec![
            Point3D::new(x0, y0),
            Point3D::new(x1, y0),
            Point3D::new(x0, y1),
            Point3D::new(x1, y1),
            Point3D::new((x0 + x1) / 2.0, (y0 + y1) / 2.0),
        ])
    }

    #[test]
    fn no_landmarks_uses_center_square() {
        let norm = FaceCropNormalizer::default();
        let out = norm.crop_and_normalize(&frame(640, 480), None).unwrap();
        assert_eq!(out.dimensions(), (128, 128));

        let sq = center_square(&frame(640, 480));
        assert_eq!(sq.dimensions(), (480, 480));
        // left offset (640 - 480) / 2 = 80
        assert_eq!(sq.get_pixel(0, 0)[0], 80);
    }

    #[test]
    fn interior_face_gets_padded_square() {
        let norm = FaceCropNormalizer::default();
        // 128 x 64 px box centred at (512, 512) on a 1024 x 1024 frame
        let lm = box_landmarks(0.4375, 0.46875, 0.5625, 0.53125);
        let region = norm.face_region(&lm, 1024, 1024);
        // face_size 128, padding 64 -> side 256
        assert_eq!(
            region,
            CropRegion {
                left: 384,
                top: 384,
                right: 640,
                bottom: 640
            }
        );
    }

    #[test]
    fn non_square_box_at_edge_still_yields_canonical_square() {
        let norm = FaceCropNormalizer::default();
        let src = frame(640, 480);
        // wide box touching the left and top edges
        let lm = box_landmarks(0.0, 0.0, 0.5, 0.2);
        let region = norm.face_region(&lm, 640, 480);
        assert!(region.left >= 0 && region.top >= 0);
        assert!(region.right <= 640 && region.bottom <= 480);
        assert!(!region.is_empty());

        let out = norm.crop_and_normalize(&src, Some(&lm)).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
    }

    #[test]
    fn tall_box_touching_bottom_right() {
        let norm = FaceCropNormalizer::default();
        let lm = box_landmarks(0.9, 0.5, 1.0, 1.0);
        let out = norm.crop_and_normalize(&frame(320, 240), Some(&lm)).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
    }

    #[test]
    fn clamped_region_grows_along_the_shorter_axis() {
        let norm = FaceCropNormalizer::default();
        // 128 px face hugging the top edge of a 1024 x 1024 frame
        let lm = box_landmarks(0.4375, 0.0, 0.5625, 0.125);
        let r = norm.face_region(&lm, 1024, 1024);
        // clamped to 256 x 192, then bottom extended by half the difference
        assert_eq!(
            r,
            CropRegion {
                left: 384,
                top: 0,
                right: 640,
                bottom: 224
            }
        );
    }

    #[test]
    fn landmarks_outside_frame_fall_back_to_full_frame() {
        let norm = FaceCropNormalizer::default();
        let lm = box_landmarks(1.5, 1.5, 1.6, 1.6);
        let region = norm.face_region(&lm, 200, 100);
        assert!(region.is_empty());
        let out = norm.crop_and_normalize(&frame(200, 100), Some(&lm)).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
    }

    fn assert_close(actual: &Rgb<u8>, expected: [u8; 3]) {
        for (a, e) in actual.0.iter().zip(expected) {
            assert!((*a as i16 - e as i16).abs() <= 1, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn area_downsample_averages_blocks() {
        let src = RgbImage::from_fn(4, 4, |x, _| if x < 2 { Rgb([0, 0, 0]) } else { Rgb([200, 100, 50]) });
        let out = resize_area(&src, 2, 2).unwrap();
        assert_close(out.get_pixel(0, 0), [0, 0, 0]);
        assert_close(out.get_pixel(1, 1), [200, 100, 50]);

        let avg = resize_area(&src, 1, 1).unwrap();
        assert_close(avg.get_pixel(0, 0), [100, 50, 25]);
    }

    #[test]
    fn area_upsample_preserves_flat_regions() {
        let src = RgbImage::from_fn(2, 2, |x, y| Rgb([(x * 100) as u8, (y * 100) as u8, 7]));
        let out = resize_area(&src, 128, 128).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
        assert_close(out.get_pixel(0, 0), [0, 0, 7]);
        assert_close(out.get_pixel(127, 127), [100, 100, 7]);
    }

    #[test]
    fn uniform_frame_stays_uniform_at_any_ratio() {
        for (w, h) in [(480, 480), (100, 100), (7, 7)] {
            let src = RgbImage::from_pixel(w, h, Rgb([120, 100, 90]));
            let out = resize_area(&src, 128, 128).unwrap();
            for p in out.pixels() {
                assert_close(p, [120, 100, 90]);
            }
        }
    }

    #[test]
    fn far_out_landmarks_do_not_overflow_the_region() {
        let norm = FaceCropNormalizer::default();
        let mut lm = box_landmarks(0.4, 0.4, 0.6, 0.6);
        lm.points.push(Point3D::new(1e7, 0.5));
        lm.points.push(Point3D::new(-1e7, -1e7));
        let region = norm.face_region(&lm, 1000, 1000);
        assert!(region.left >= 0 && region.right <= 1000);
        assert!(region.top >= 0 && region.bottom <= 1000);

        let out = norm.crop_and_normalize(&frame(1000, 1000), Some(&lm)).unwrap();
        assert_eq!(out.dimensions(), (128, 128));
    }
}
