use std::sync::Arc;

use crate::foundation::error::{MosaicError, MosaicResult};

/// Channel layout of a source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Channels {
    /// 3 bytes per pixel.
    Rgb,
    /// 4 bytes per pixel; the fourth channel participates in blending.
    Rgba,
}

impl Channels {
    pub fn byte_count(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// One decoded source image, row-major and tightly packed.
///
/// Pixel data is shared via `Arc`: many clips referencing the same image hold
/// the same allocation, and the packer deduplicates on that identity.
#[derive(Clone, Debug)]
pub struct SourceImage {
    width: u32,
    height: u32,
    channels: Channels,
    data: Arc<Vec<u8>>,
}

impl SourceImage {
    pub fn new(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> MosaicResult<Self> {
        if width == 0 || height == 0 {
            return Err(MosaicError::validation(
                "SourceImage dimensions must be > 0",
            ));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(channels.byte_count()))
            .ok_or_else(|| MosaicError::validation("SourceImage byte size overflow"))?;
        if data.len() != expected {
            return Err(MosaicError::validation(format!(
                "SourceImage expects {expected} bytes for {width}x{height}x{}, got {}",
                channels.byte_count(),
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data: Arc::new(data),
        })
    }

    pub fn from_rgb_image(img: &image::RgbImage) -> MosaicResult<Self> {
        Self::new(img.width(), img.height(), Channels::Rgb, img.as_raw().clone())
    }

    pub fn from_rgba_image(img: &image::RgbaImage) -> MosaicResult<Self> {
        Self::new(
            img.width(),
            img.height(),
            Channels::Rgba,
            img.as_raw().clone(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn data(&self) -> &Arc<Vec<u8>> {
        &self.data
    }
}

/// Where and how one clip lands on the canvas.
///
/// Geometry is real-valued; sub-pixel positions and non-integer scales are
/// honored by the full kernel. `z_index` stacks clips (higher draws on top),
/// `brightness` scales RGB only and is a no-op at `>= 1`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Opacity in `[0, 1]`.
    pub alpha: f64,
    pub z_index: i32,
    pub brightness: f64,
}

impl Placement {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            alpha: 1.0,
            z_index: 1,
            brightness: 1.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_brightness(mut self, brightness: f64) -> Self {
        self.brightness = brightness;
        self
    }

    pub fn validate(&self) -> MosaicResult<()> {
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("alpha", self.alpha),
            ("brightness", self.brightness),
        ] {
            if !v.is_finite() {
                return Err(MosaicError::validation(format!(
                    "Placement {name} must be finite, got {v}"
                )));
            }
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(MosaicError::validation(
                "Placement width and height must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(MosaicError::validation(format!(
                "Placement alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if self.brightness <= 0.0 {
            return Err(MosaicError::validation(format!(
                "Placement brightness must be > 0, got {}",
                self.brightness
            )));
        }
        Ok(())
    }
}

/// One positioned, scaled, depth-ordered source image to composite.
#[derive(Clone, Debug)]
pub struct Clip {
    pub source: SourceImage,
    pub placement: Placement,
}

impl Clip {
    pub fn new(source: SourceImage, placement: Placement) -> Self {
        Self { source, placement }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/clip.rs"]
mod tests;
