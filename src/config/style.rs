// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Drawing style shared by overlay videos, overlay frames and annotated images.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};
use crate::visualizer::Color;

/// How poses are drawn onto frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationStyle {
    /// Skeleton line color.
    pub skeleton_color: Color,
    /// Joint circle color.
    pub joint_color: Color,
    /// Skeleton line thickness in pixels.
    pub line_thickness: u32,
    /// Joint circle radius in pixels.
    pub joint_radius: u32,
    /// Draw the pose confidence next to each person.
    pub show_confidence: bool,
    /// Draw the person id next to each person.
    pub show_person_id: bool,
    /// Label size relative to a 32 px base.
    pub font_scale: f32,
    /// Label color.
    pub font_color: Color,
    /// Use a per-person palette color instead of the fixed skeleton and joint colors.
    pub color_by_person: bool,
    /// TTF font used for labels. Downloaded to the config directory when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for VisualizationStyle {
    fn default() -> Self {
        Self {
            skeleton_color: Color::GREEN,
            joint_color: Color::RED,
            line_thickness: 2,
            joint_radius: 4,
            show_confidence: true,
            show_person_id: true,
            font_scale: 0.5,
            font_color: Color::WHITE,
            color_by_person: false,
            font_path: None,
        }
    }
}

impl VisualizationStyle {
    /// Create the default style.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set skeleton and joint colors.
    #[must_use]
    pub const fn with_colors(mut self, skeleton: Color, joint: Color) -> Self {
        self.skeleton_color = skeleton;
        self.joint_color = joint;
        self
    }

    /// Set line thickness.
    #[must_use]
    pub const fn with_line_thickness(mut self, thickness: u32) -> Self {
        self.line_thickness = thickness;
        self
    }

    /// Set joint radius.
    #[must_use]
    pub const fn with_joint_radius(mut self, radius: u32) -> Self {
        self.joint_radius = radius;
        self
    }

    /// Toggle the confidence label.
    #[must_use]
    pub const fn with_show_confidence(mut self, show: bool) -> Self {
        self.show_confidence = show;
        self
    }

    /// Toggle the person id label.
    #[must_use]
    pub const fn with_show_person_id(mut self, show: bool) -> Self {
        self.show_person_id = show;
        self
    }

    /// Set label font scale.
    #[must_use]
    pub const fn with_font_scale(mut self, scale: f32) -> Self {
        self.font_scale = scale;
        self
    }

    /// Use per-person colors.
    #[must_use]
    pub const fn with_color_by_person(mut self, enabled: bool) -> Self {
        self.color_by_person = enabled;
        self
    }

    /// Use a specific font file for labels.
    #[must_use]
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Whether any text label is drawn.
    #[must_use]
    pub const fn draws_labels(&self) -> bool {
        self.show_confidence || self.show_person_id
    }

    /// Check style values.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for zero sizes or a non-positive font scale.
    pub fn validate(&self) -> Result<()> {
        if self.line_thickness == 0 {
            return Err(PoseError::ConfigError(
                "line_thickness must be at least 1".to_string(),
            ));
        }
        if self.joint_radius == 0 {
            return Err(PoseError::ConfigError(
                "joint_radius must be at least 1".to_string(),
            ));
        }
        if !self.font_scale.is_finite() || self.font_scale <= 0.0 {
            return Err(PoseError::ConfigError(format!(
                "font_scale must be positive, got {}",
                self.font_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_valid() {
        let style = VisualizationStyle::default();
        assert!(style.validate().is_ok());
        assert_eq!(style.skeleton_color, Color::GREEN);
        assert!(style.draws_labels());
    }

    #[test]
    fn test_invalid_style() {
        assert!(VisualizationStyle::new().with_line_thickness(0).validate().is_err());
        assert!(VisualizationStyle::new().with_joint_radius(0).validate().is_err());
        assert!(VisualizationStyle::new().with_font_scale(-1.0).validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let style: VisualizationStyle =
            serde_json::from_str(r#"{"joint_radius": 7, "show_confidence": false}"#).unwrap();
        assert_eq!(style.joint_radius, 7);
        assert!(!style.show_confidence);
        assert_eq!(style.line_thickness, 2);
    }
}
