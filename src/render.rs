use crate::composition::pack::PackedClips;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::foundation::fixed::Precision;

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod pipeline;

/// A composited frame: `height x width x 3` RGB bytes, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgb {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgb {
    /// A blank (black) frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }

    pub fn from_rgb_image(img: &image::RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }

    pub fn into_rgb_image(self) -> MosaicResult<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data)
            .ok_or_else(|| MosaicError::validation("FrameRgb byte length does not match size"))
    }

    /// The RGB bytes at `(x, y)`.
    ///
    /// Panics when the coordinate lies outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        debug_assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) outside {}x{} canvas",
            self.width,
            self.height
        );
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Which compositing kernel to dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KernelVariant {
    /// Bilinear resampling, alpha blending, z-order occlusion.
    Full,
    /// Nearest-neighbor copy at integer positions; no blending, no depth.
    /// Overlapping clips are last-writer-wins with no ordering guarantee.
    Lite,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub precision: Precision,
    pub variant: KernelVariant,
}

impl RenderSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            precision: Precision::default(),
            variant: KernelVariant::Full,
        }
    }

    pub fn validate(&self) -> MosaicResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MosaicError::validation(
                "RenderSettings canvas dimensions must be > 0",
            ));
        }
        Ok(())
    }
}

/// A device context that can execute the compositor kernels.
///
/// A render call owns its canvas and depth buffers; contexts keep no pixel
/// state across calls (the accelerated context caches compiled pipelines
/// only). A render is all-or-nothing: there is no cancellation of an issued
/// dispatch and no partial result.
pub trait CompositeBackend {
    fn composite(
        &mut self,
        packed: &PackedClips,
        settings: &RenderSettings,
        base: Option<&FrameRgb>,
    ) -> MosaicResult<FrameRgb>;
}

#[derive(Clone, Copy, Debug)]
pub enum BackendKind {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

/// Create a device context.
///
/// Requesting [`BackendKind::Gpu`] when no adapter can be acquired logs a
/// warning and falls back to the CPU context; kernel compile and readback
/// failures on an acquired device remain fatal.
pub fn create_backend(kind: BackendKind) -> MosaicResult<Box<dyn CompositeBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(cpu::CpuBackend::new())),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => match gpu::GpuBackend::new() {
            Ok(backend) => Ok(Box::new(backend)),
            Err(MosaicError::DeviceUnavailable(reason)) => {
                tracing::warn!(%reason, "no accelerated device, using CPU context");
                Ok(Box::new(cpu::CpuBackend::new()))
            }
            Err(other) => Err(other),
        },
    }
}
