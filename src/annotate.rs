// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton drawing.
//!
//! [`PoseAnnotator`] draws skeleton edges, then joint circles, then optional labels. Joints
//! below the confidence threshold are left out entirely, as are edges touching them.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};

use crate::config::VisualizationStyle;
use crate::error::Result;
use crate::pose::{Joint, Pose};
use crate::topology::Topology;
use crate::visualizer::Color;
use crate::{verbose, warn};

/// Assets URL for downloading fonts
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Default label font.
pub const DEFAULT_FONT: &str = "Arial.ttf";

/// Joints preferred as the label anchor, in order.
const LABEL_ANCHORS: [&str; 4] = ["nose", "head", "left_eye", "right_eye"];

/// Base label height in pixels at a font scale of 1.0.
const BASE_FONT_PX: f32 = 32.0;

/// Check if font exists locally or download it
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy();
    let config_dir = dirs::config_dir()?.join("posedetect");
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        warn!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    verbose!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(&font_path) {
                Ok(f) => f,
                Err(e) => {
                    warn!("Failed to create font file: {e}");
                    return None;
                }
            };

            let mut reader = response.into_body().into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                warn!("Failed to download font: {e}");
                let _ = fs::remove_file(&font_path);
                return None;
            }

            Some(font_path)
        }
        Err(e) => {
            warn!("Failed to download font from {url}: {e}");
            None
        }
    }
}

/// Load the label font for a style.
///
/// Uses `style.font_path` when set, otherwise the downloaded default font. Returns `None` when
/// no usable font is available; labels are then skipped.
#[must_use]
pub fn load_font(style: &VisualizationStyle) -> Option<FontVec> {
    let path = match &style.font_path {
        Some(path) => path.clone(),
        None => check_font(DEFAULT_FONT)?,
    };
    let data = fs::read(&path)
        .map_err(|e| warn!("Failed to read font {}: {e}", path.display()))
        .ok()?;
    FontVec::try_from_vec(data)
        .map_err(|e| warn!("Invalid font {}: {e}", path.display()))
        .ok()
}

/// Draws poses onto frames with a fixed style.
pub struct PoseAnnotator {
    style: VisualizationStyle,
    confidence_threshold: f32,
    font: Option<FontVec>,
}

impl PoseAnnotator {
    /// Create an annotator, loading a font only when the style draws labels.
    #[must_use]
    pub fn new(style: &VisualizationStyle, confidence_threshold: f32) -> Self {
        let font = if style.draws_labels() {
            let font = load_font(style);
            if font.is_none() {
                warn!("No label font available; pose labels will not be drawn");
            }
            font
        } else {
            None
        };
        Self {
            style: style.clone(),
            confidence_threshold,
            font,
        }
    }

    /// Drawing style.
    #[must_use]
    pub const fn style(&self) -> &VisualizationStyle {
        &self.style
    }

    /// Return a copy of `image` with all poses drawn.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a pose has non-finite coordinates or invalid confidences.
    pub fn annotate(&self, image: &DynamicImage, poses: &[&Pose]) -> Result<DynamicImage> {
        let mut canvas = image.to_rgb8();
        for pose in poses {
            self.draw_pose(&mut canvas, pose)?;
        }
        Ok(DynamicImage::ImageRgb8(canvas))
    }

    /// Draw one pose in place.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pose is malformed; nothing is drawn in that case.
    pub fn draw_pose(&self, canvas: &mut RgbImage, pose: &Pose) -> Result<()> {
        pose.validate()?;

        let (skeleton_color, joint_color) = if self.style.color_by_person {
            let c = Color::from_index(pose.person_id as usize);
            (c, c)
        } else {
            (self.style.skeleton_color, self.style.joint_color)
        };

        let visible: HashMap<u32, &Joint> = pose
            .confident_joints(self.confidence_threshold)
            .map(|j| (j.joint_id, j))
            .collect();
        if visible.is_empty() {
            return Ok(());
        }

        if let Some(topology) = Topology::infer(pose) {
            for [a, b] in topology.edges() {
                if let (Some(ja), Some(jb)) = (visible.get(a), visible.get(b)) {
                    draw_thick_line(
                        canvas,
                        (ja.keypoint.x, ja.keypoint.y),
                        (jb.keypoint.x, jb.keypoint.y),
                        self.style.line_thickness,
                        skeleton_color.to_rgb(),
                    );
                }
            }
        }

        let radius = i32::try_from(self.style.joint_radius).unwrap_or(i32::MAX);
        for joint in visible.values() {
            draw_filled_circle_mut(
                canvas,
                to_pixel(joint.keypoint.x, joint.keypoint.y),
                radius,
                joint_color.to_rgb(),
            );
        }

        if let Some(font) = &self.font {
            self.draw_label(canvas, pose, &visible, font);
        }
        Ok(())
    }

    fn draw_label(
        &self,
        canvas: &mut RgbImage,
        pose: &Pose,
        visible: &HashMap<u32, &Joint>,
        font: &FontVec,
    ) {
        let mut parts = Vec::with_capacity(2);
        if self.style.show_person_id {
            parts.push(format!("P{}", pose.person_id));
        }
        if self.style.show_confidence {
            parts.push(format!("{:.2}", pose.confidence));
        }
        if parts.is_empty() {
            return;
        }

        let anchor = LABEL_ANCHORS
            .iter()
            .find_map(|name| visible.values().find(|j| j.name == *name))
            .or_else(|| visible.values().min_by_key(|j| j.joint_id));
        let Some(anchor) = anchor else {
            return;
        };

        let (x, y) = to_pixel(anchor.keypoint.x, anchor.keypoint.y - 10.0);
        let (width, height) = canvas.dimensions();
        let in_bounds = x >= 0
            && y >= 0
            && u32::try_from(x).is_ok_and(|x| x < width)
            && u32::try_from(y).is_ok_and(|y| y < height);
        if in_bounds {
            let scale = PxScale::from(BASE_FONT_PX * self.style.font_scale);
            draw_text_mut(
                canvas,
                self.style.font_color.to_rgb(),
                x,
                y,
                scale,
                font,
                &parts.join(" "),
            );
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_pixel(x: f32, y: f32) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

/// Draw a line of the given thickness by stamping discs along the segment.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn draw_thick_line(
    canvas: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    if thickness <= 1 {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = dx.hypot(dy);
    // Bound the work for segments far outside the canvas.
    let max_steps = 4 * (canvas.width() + canvas.height()) as usize;
    let steps = (length.ceil() as usize).clamp(1, max_steps.max(1));
    let radius = (thickness / 2) as i32;

    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let point = to_pixel(start.0 + dx * t, start.1 + dy * t);
        draw_filled_circle_mut(canvas, point, radius, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::KeyPoint;

    fn annotator(threshold: f32) -> PoseAnnotator {
        let style = VisualizationStyle::new()
            .with_show_confidence(false)
            .with_show_person_id(false);
        PoseAnnotator::new(&style, threshold)
    }

    fn shoulders(conf_left: f32, conf_right: f32) -> Pose {
        Pose::from_joints(
            0,
            0,
            0.0,
            vec![
                Joint::new("left_shoulder", 5, KeyPoint::new(10.0, 20.0, conf_left)),
                Joint::new("right_shoulder", 6, KeyPoint::new(50.0, 20.0, conf_right)),
            ],
        )
    }

    #[test]
    fn test_draws_edge_and_joints() {
        let blank = DynamicImage::new_rgb8(64, 40);
        let out = annotator(0.1)
            .annotate(&blank, &[&shoulders(0.9, 0.9)])
            .unwrap()
            .to_rgb8();

        assert_eq!(*out.get_pixel(10, 20), Color::RED.to_rgb());
        assert_eq!(*out.get_pixel(30, 20), Color::GREEN.to_rgb());
        assert_eq!(*out.get_pixel(30, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_low_confidence_joint_and_edge_omitted() {
        let blank = DynamicImage::new_rgb8(64, 40);
        let out = annotator(0.5)
            .annotate(&blank, &[&shoulders(0.9, 0.2)])
            .unwrap()
            .to_rgb8();

        assert_eq!(*out.get_pixel(10, 20), Color::RED.to_rgb());
        assert_eq!(*out.get_pixel(30, 20), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(50, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_malformed_pose_is_an_error() {
        let blank = DynamicImage::new_rgb8(8, 8);
        let bad = Pose::from_joints(
            0,
            0,
            0.0,
            vec![Joint::new("nose", 0, KeyPoint::new(f32::INFINITY, 1.0, 0.9))],
        );
        assert!(annotator(0.1).annotate(&blank, &[&bad]).is_err());
    }

    #[test]
    fn test_offscreen_joints_do_not_panic() {
        let blank = DynamicImage::new_rgb8(16, 16);
        let far = Pose::from_joints(
            0,
            0,
            0.0,
            vec![
                Joint::new("left_shoulder", 5, KeyPoint::new(-1.0e7, 5.0, 0.9)),
                Joint::new("right_shoulder", 6, KeyPoint::new(1.0e7, 5.0, 0.9)),
            ],
        );
        assert!(annotator(0.1).annotate(&blank, &[&far]).is_ok());
    }

    #[test]
    fn test_color_by_person() {
        let style = VisualizationStyle::new()
            .with_show_confidence(false)
            .with_show_person_id(false)
            .with_color_by_person(true);
        let annotator = PoseAnnotator::new(&style, 0.1);
        let mut pose = shoulders(0.9, 0.9);
        pose.person_id = 2;
        let out = annotator
            .annotate(&DynamicImage::new_rgb8(64, 40), &[&pose])
            .unwrap()
            .to_rgb8();
        assert_eq!(*out.get_pixel(10, 20), Color::BLUE.to_rgb());
    }
}
