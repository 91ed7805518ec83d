//! Clipmosaic composites many independently positioned, scaled, alpha-blended
//! and depth-ordered image clips onto a single RGB canvas with a
//! data-parallel kernel: one task per clip, not per pixel.
//!
//! # Pipeline overview
//!
//! 1. **Pack**: a clip set is flattened into one read-only source pixel
//!    buffer plus a fixed-stride integer property table, with real-valued
//!    geometry quantized by [`Precision`] for device transfer.
//! 2. **Dispatch**: the full kernel rasterizes each clip's sub-pixel
//!    footprint with bilinear resampling, brightness, alpha blending and
//!    z-order occlusion against a shared depth record; the lite kernel is a
//!    nearest-neighbor fast path with neither.
//! 3. **Assemble**: the canvas is read back as a `height x width x 3`
//!    [`FrameRgb`].
//!
//! The CPU context is the default and resolves every per-pixel update with a
//! compare-exchange, so occlusion is race-free. The optional `gpu` feature
//! adds a wgpu compute context that keeps the original unsynchronized
//! read-modify-write for overlapping clips.
//!
//! Validation and quantization fail before any device work; an unavailable
//! accelerated device falls back to the CPU context with a warning, while
//! kernel compile and readback failures abort the render.
#![forbid(unsafe_code)]

mod composition;
mod foundation;
mod render;

pub use composition::clip::{Channels, Clip, Placement, SourceImage};
pub use composition::pack::{PROP_STRIDE, PackedClips, pack_clips};
pub use foundation::error::{MosaicError, MosaicResult};
pub use foundation::fixed::Precision;
pub use render::cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use render::gpu::GpuBackend;
pub use render::pipeline::{Compositor, composite_clips};
pub use render::{
    BackendKind, CompositeBackend, FrameRgb, KernelVariant, RenderSettings, create_backend,
};
