//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`media`](crate::media) service (which decides what
//! images to create) and the [`transform`](super::transform) engine and
//! [`backend`](super::backend) (which do the pixel and codec work).
//!
//! ## Types
//!
//! - [`ResizeMethod`]: `fit` (scale into the box) or `fill` (scale + center crop).
//! - [`ResizeSpec`]: Method + maximum width, as configured per output.
//! - [`ResizeBox`]: Concrete bounding box for one transform call.
//! - [`Quality`]: Lossy encoding quality (1-100, default 95). Clamped on construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an image is mapped onto its target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    /// Scale so the whole image fits inside the box. No cropping.
    Fit,
    /// Scale and center-crop so the result is exactly the box.
    #[serde(alias = "resize")]
    Fill,
}

impl ResizeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ResizeMethod::Fit => "fit",
            ResizeMethod::Fill => "fill",
        }
    }
}

impl fmt::Display for ResizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fit" => Ok(ResizeMethod::Fit),
            // Older configs used "resize" for the cropping mode
            "fill" | "resize" => Ok(ResizeMethod::Fill),
            other => Err(format!(
                "invalid resize method '{other}': must be 'fit', 'fill', or 'resize'"
            )),
        }
    }
}

/// Configured resize for one output (primary image or thumbnail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeSpec {
    pub method: ResizeMethod,
    pub max_width: u32,
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            method: ResizeMethod::Fit,
            max_width: 2800,
        }
    }
}

/// Bounding box handed to the transform engine.
///
/// Both sides are at least 1px; a zero side cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeBox {
    pub width: u32,
    pub height: u32,
}

impl ResizeBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}
