use crate::composition::clip::Clip;
use crate::composition::pack::pack_clips;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::render::{
    BackendKind, CompositeBackend, FrameRgb, RenderSettings, create_backend,
};

/// Owns a device context and render settings across frames.
///
/// Each [`render`](Compositor::render) call packs its clip set, dispatches
/// the configured kernel and assembles the result; no pixel state survives
/// between calls.
pub struct Compositor {
    backend: Box<dyn CompositeBackend>,
    settings: RenderSettings,
}

impl Compositor {
    pub fn new(kind: BackendKind, settings: RenderSettings) -> MosaicResult<Self> {
        settings.validate()?;
        Ok(Self {
            backend: create_backend(kind)?,
            settings,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Composite a clip set onto a blank canvas or a caller-supplied base.
    ///
    /// Packing validates geometry and quantization before any device work is
    /// issued. Zero clips return a copy of the base image when one is given
    /// and [`MosaicError::EmptyClipSet`] otherwise.
    #[tracing::instrument(skip(self, clips, base), fields(clip_count = clips.len()))]
    pub fn render(&mut self, clips: &[Clip], base: Option<&FrameRgb>) -> MosaicResult<FrameRgb> {
        if let Some(base) = base
            && (base.width != self.settings.width || base.height != self.settings.height)
        {
            return Err(MosaicError::validation(format!(
                "base image is {}x{}, canvas is {}x{}",
                base.width, base.height, self.settings.width, self.settings.height
            )));
        }

        if clips.is_empty() {
            return match base {
                Some(base) => Ok(base.clone()),
                None => Err(MosaicError::EmptyClipSet),
            };
        }

        let packed = pack_clips(clips, self.settings.precision)?;
        self.backend.composite(&packed, &self.settings, base)
    }
}

/// One-shot convenience: build a context, composite once.
pub fn composite_clips(
    clips: &[Clip],
    kind: BackendKind,
    settings: RenderSettings,
    base: Option<&FrameRgb>,
) -> MosaicResult<FrameRgb> {
    Compositor::new(kind, settings)?.render(clips, base)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
