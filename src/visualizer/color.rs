// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::Rgb;
use serde::{Deserialize, Serialize};

/// RGB color used for drawing.
///
/// Serialized as a `[r, g, b]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Self = Self(255, 0, 0);
    /// Green color.
    pub const GREEN: Self = Self(0, 255, 0);
    /// Blue color.
    pub const BLUE: Self = Self(0, 0, 255);
    /// White color.
    pub const WHITE: Self = Self(255, 255, 255);
    /// Black color.
    pub const BLACK: Self = Self(0, 0, 0);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Get a color from the person palette by index.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        let color = PERSON_COLORS[index % PERSON_COLORS.len()];
        Self(color[0], color[1], color[2])
    }

    /// Convert to an `image` pixel.
    #[must_use]
    pub const fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.0, self.1, self.2])
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        color.to_rgb()
    }
}

/// Palette for coloring people individually.
pub const PERSON_COLORS: [[u8; 3]; 8] = [
    [255, 0, 0],   // red
    [0, 255, 0],   // green
    [0, 0, 255],   // blue
    [255, 255, 0], // yellow
    [255, 0, 255], // magenta
    [0, 255, 255], // cyan
    [255, 128, 0], // orange
    [128, 0, 255], // purple
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(Color::from_index(0), Color::RED);
        assert_eq!(Color::from_index(8), Color::RED);
        assert_eq!(Color::from_index(2), Color::BLUE);
    }

    #[test]
    fn test_serde_as_array() {
        let json = serde_json::to_string(&Color::new(1, 2, 3)).unwrap();
        assert_eq!(json, "[1,2,3]");
        let color: Color = serde_json::from_str("[255,255,255]").unwrap();
        assert_eq!(color, Color::WHITE);
    }
}
