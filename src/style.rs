//! Presentation settings
//!
//! Plot styling is explicit configuration handed to whatever writes the
//! output, instead of process-wide state.
use std::io::Write;

use serde::{Deserialize, Serialize};

/// Colour with an index for plotting programs that use colour tables
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Colour {
    pub index: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const fn new(index: u32, r: u8, g: u8, b: u8) -> Self {
        Self { index, r, g, b }
    }

    // Qualitative colour-blind friendly scheme,
    // see https://personal.sron.nl/~pault/#sec:qualitative
    pub const BLUE: Self = Self::new(9000, 0, 119, 187);
    pub const CYAN: Self = Self::new(9001, 51, 187, 238);
    pub const TEAL: Self = Self::new(9002, 0, 153, 136);
    pub const ORANGE: Self = Self::new(9003, 238, 119, 51);
    pub const RED: Self = Self::new(9004, 204, 51, 17);
    pub const MAGENTA: Self = Self::new(9005, 238, 51, 119);
    pub const GRAY: Self = Self::new(9006, 187, 187, 187);

    /// `#rrggbb` notation
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Colour palette for two-dimensional histograms
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Palette {
    InvertedDarkBodyRadiator,
    Viridis,
}

/// Legend placement and layout
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Legend {
    /// x1, y1, x2, y2 in normalised pad coordinates
    pub position: [f64; 4],
    pub columns: u32,
    pub text_size: f64,
}

/// Pad margins in normalised coordinates
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Style {
    pub line_width: u32,
    pub text_size: f64,
    pub label_size: f64,
    pub title_size: f64,
    /// Maximum number of digits on axis labels before switching to
    /// scientific notation
    pub max_digits: u32,
    pub ndivisions: u32,
    /// Tick marks on the opposite axes
    pub pad_ticks: bool,
    pub palette: Palette,
    pub number_contours: u32,
    pub legend: Legend,
    pub margins: Margins,
}

impl Style {
    /// Settings for the containment study
    pub fn containment() -> Self {
        Self {
            line_width: 3,
            text_size: 0.06,
            label_size: 0.05,
            title_size: 0.06,
            max_digits: 3,
            ndivisions: 505,
            pad_ticks: true,
            palette: Palette::InvertedDarkBodyRadiator,
            number_contours: 255,
            legend: Legend {
                position: [0.1, 0.85, 0.98, 1.0],
                columns: 1,
                text_size: 0.04,
            },
            margins: Margins {
                left: 0.15,
                right: 0.15,
                top: 0.05,
                bottom: 0.15,
            },
        }
    }

    /// Settings for generator comparisons
    pub fn comparison() -> Self {
        Self {
            text_size: 0.05,
            title_size: 0.05,
            max_digits: 4,
            legend: Legend {
                position: [0.1, 0.85, 0.98, 1.0],
                columns: 3,
                text_size: 0.036,
            },
            margins: Margins {
                left: 0.2,
                right: 0.03,
                top: 0.15,
                bottom: 0.15,
            },
            ..Self::containment()
        }
    }

    /// Write the settings as `#` comment lines in front of a data table
    pub fn write_header(&self, mut out: impl Write) -> std::io::Result<()> {
        writeln!(
            out,
            "# line width {}, text size {}, label size {}, title size {}",
            self.line_width, self.text_size, self.label_size, self.title_size
        )?;
        writeln!(
            out,
            "# max digits {}, divisions {}, pad ticks {}",
            self.max_digits, self.ndivisions, self.pad_ticks
        )?;
        writeln!(
            out,
            "# palette {:?} with {} contours",
            self.palette, self.number_contours
        )?;
        let Margins { left, right, top, bottom } = self.margins;
        writeln!(out, "# margins left {left} right {right} top {top} bottom {bottom}")
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::containment()
    }
}
