use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub mod graph;
pub mod layout;
pub mod palette;
pub mod render;

pub use graph::*;
pub use layout::*;
pub use palette::*;
pub use render::*;

pub const DEFAULT_CANVAS_WIDTH: u32 = 1920;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1080;
pub const DEFAULT_LANE_SPACING: u32 = 100;
pub const DEFAULT_HORIZONTAL_CLEARANCE: u32 = 20;
pub const DEFAULT_VERTICAL_CLEARANCE: u32 = 200;
pub const POINT_RADIUS: f32 = 20.0;
pub const EDGE_STROKE_WIDTH: f32 = 12.0;
pub const TITLE_FONT_SIZE: f32 = 55.0;
pub const TITLE_EDGE_OFFSET: f32 = 50.0;
pub const TITLE_BAND_FACTOR: f32 = 1.5;
pub const ID_FONT_SIZE: f32 = 22.0;
pub const ID_LABEL_RISE: f32 = 10.0;

/// Errors surfaced by graph construction and the layout passes. Any failure
/// aborts the whole layout; there is no partial output.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("malformed graph: parent '{parent}' of commit '{child}' is not in the log")]
    MissingParent { parent: String, child: String },
    #[error("malformed graph: history contains a cycle through commit '{id}'")]
    GraphCycle { id: String },
    #[error("color palette contains no colors")]
    EmptyPalette,
    #[error("no placement found for commit '{id}'")]
    NoLayoutFound { id: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Formats the color the way SVG attributes expect it: opaque colors as
    /// hex, translucent ones as an rgba() function.
    pub fn to_svg(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({},{},{},{:.3})",
                self.r,
                self.g,
                self.b,
                f32::from(self.a) / 255.0
            )
        }
    }
}

impl FromStr for Rgba {
    type Err = anyhow::Error;

    /// Accepts `r,g,b`, `r,g,b,a` and 6-digit hex (with or without `#`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let r = u8::from_str_radix(&hex[0..2], 16)?;
            let g = u8::from_str_radix(&hex[2..4], 16)?;
            let b = u8::from_str_radix(&hex[4..6], 16)?;
            return Ok(Self::rgb(r, g, b));
        }

        let channels = value
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()?;
        match channels.as_slice() {
            [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
            [r, g, b, a] => Ok(Self::new(*r, *g, *b, *a)),
            _ => anyhow::bail!("expected 'r,g,b', 'r,g,b,a' or a 6-digit hex code, got '{value}'"),
        }
    }
}

/// Placement of the image title, mirroring the eight compass-style anchors
/// the CLI exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TitleAnchor {
    TopLeft,
    TopCenter,
    TopRight,
    RightEdge,
    BottomRight,
    BottomCenter,
    BottomLeft,
    LeftEdge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleOptions {
    pub font_size: f32,
    pub font_family: String,
    pub color: Rgba,
    pub anchor: TitleAnchor,
    /// Distance from the left or right canvas edge.
    pub x_offset: f32,
    /// Distance from the top or bottom canvas edge.
    pub y_offset: f32,
}

impl Default for TitleOptions {
    fn default() -> Self {
        Self {
            font_size: TITLE_FONT_SIZE,
            font_family: "monospace".to_string(),
            color: Rgba::rgb(170, 170, 170),
            anchor: TitleAnchor::BottomRight,
            x_offset: TITLE_EDGE_OFFSET,
            y_offset: TITLE_EDGE_OFFSET,
        }
    }
}

/// Configuration consumed by the layout passes. The layout call is a pure
/// function of one commit graph plus one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub width: u32,
    pub height: u32,
    pub background: Rgba,
    /// Vertical spacing in pixels between adjacent lanes.
    pub lane_spacing: u32,
    /// Minimum horizontal distance between points before the canvas is
    /// scaled up along the x axis.
    pub min_horizontal_clearance: u32,
    /// Minimum vertical distance between the highest lane and the canvas
    /// edge before the canvas is scaled up along the y axis.
    pub min_vertical_clearance: u32,
    pub allow_resize: bool,
    /// When false, the width and height multipliers are forced equal so the
    /// configured aspect ratio survives scaling.
    pub independent_axes: bool,
    pub palette: Vec<Rgba>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            background: Rgba::rgb(30, 30, 30),
            lane_spacing: DEFAULT_LANE_SPACING,
            min_horizontal_clearance: DEFAULT_HORIZONTAL_CLEARANCE,
            min_vertical_clearance: DEFAULT_VERTICAL_CLEARANCE,
            allow_resize: true,
            independent_axes: true,
            palette: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_colors() {
        let color: Rgba = "70, 70, 70, 255".parse().unwrap();
        assert_eq!(color, Rgba::rgb(70, 70, 70));

        let color: Rgba = "12,34,56".parse().unwrap();
        assert_eq!(color, Rgba::rgb(12, 34, 56));
    }

    #[test]
    fn parses_hex_colors() {
        let color: Rgba = "#aa3939".parse().unwrap();
        assert_eq!(color, Rgba::rgb(170, 57, 57));

        let color: Rgba = "00ff7f".parse().unwrap();
        assert_eq!(color, Rgba::rgb(0, 255, 127));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!("1,2".parse::<Rgba>().is_err());
        assert!("300,0,0".parse::<Rgba>().is_err());
        assert!("#12345".parse::<Rgba>().is_err());
    }

    #[test]
    fn formats_svg_colors() {
        assert_eq!(Rgba::rgb(255, 0, 255).to_svg(), "#ff00ff");
        assert_eq!(Rgba::new(0, 0, 0, 0).to_svg(), "rgba(0,0,0,0.000)");
    }
}
