//! Conversion between image-relative fractional coordinates, as the job
//! platform stores them, and absolute pixel coordinates, as STAR files
//! from picking tools carry them.
//!
//! `x` runs along the width and `y` along the height. Neither direction
//! rounds or clamps: fractions outside `[0, 1]` map to pixels outside
//! the image and back again.

use crate::error::PickError;
use std::str::FromStr;

fn check_dimension(width: i64, height: i64) -> Result<(), PickError> {
    if width <= 0 || height <= 0 {
        return Err(PickError::InvalidDimension { width, height });
    }
    Ok(())
}

/// `(center_x_frac * width, center_y_frac * height)`
pub fn fractional_to_pixel(
    center_x_frac: f64,
    center_y_frac: f64,
    width: i64,
    height: i64,
) -> Result<(f64, f64), PickError> {
    check_dimension(width, height)?;
    Ok((center_x_frac * width as f64, center_y_frac * height as f64))
}

/// `(pixel_x / width, pixel_y / height)`
pub fn pixel_to_fractional(
    pixel_x: f64,
    pixel_y: f64,
    width: i64,
    height: i64,
) -> Result<(f64, f64), PickError> {
    check_dimension(width, height)?;
    Ok((pixel_x / width as f64, pixel_y / height as f64))
}

/// Micrograph size in pixels, `(height, width)` order as the platform
/// stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MicrographShape {
    pub height: i64,
    pub width: i64,
}

impl MicrographShape {
    pub fn new(height: i64, width: i64) -> Self {
        Self { height, width }
    }

    pub fn to_pixel(&self, center_x_frac: f64, center_y_frac: f64) -> Result<(f64, f64), PickError> {
        fractional_to_pixel(center_x_frac, center_y_frac, self.width, self.height)
    }

    pub fn to_fractional(&self, pixel_x: f64, pixel_y: f64) -> Result<(f64, f64), PickError> {
        pixel_to_fractional(pixel_x, pixel_y, self.width, self.height)
    }
}

/// `height,width`
impl std::fmt::Display for MicrographShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.height, self.width)
    }
}

impl FromStr for MicrographShape {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (h, w) = s
            .split_once(',')
            .ok_or(anyhow::anyhow!("expected `height,width`, got `{}`", s))?;
        Ok(Self {
            height: h.trim().parse()?,
            width: w.trim().parse()?,
        })
    }
}
