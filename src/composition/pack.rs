use std::collections::HashMap;
use std::sync::Arc;

use crate::composition::clip::Clip;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::foundation::fixed::Precision;

/// Integers per property-table row.
pub const PROP_STRIDE: usize = 11;

// Row layout. Real-valued fields are quantized by `10^precision`.
pub(crate) const PROP_OFFSET: usize = 0;
pub(crate) const PROP_X: usize = 1;
pub(crate) const PROP_Y: usize = 2;
pub(crate) const PROP_SRC_W: usize = 3;
pub(crate) const PROP_SRC_H: usize = 4;
pub(crate) const PROP_DEST_W: usize = 5;
pub(crate) const PROP_DEST_H: usize = 6;
pub(crate) const PROP_ALPHA: usize = 7;
pub(crate) const PROP_Z: usize = 8;
pub(crate) const PROP_BRIGHTNESS: usize = 9;
pub(crate) const PROP_CHANNELS: usize = 10;

/// Flat device-transfer form of a clip set: one concatenated source pixel
/// buffer plus one fixed-size integer record per clip.
///
/// Rows are emitted in input order. Table order has no effect on the output
/// (stacking is governed by z-index) but is stable for reproducibility.
#[derive(Clone, Debug)]
pub struct PackedClips {
    /// All distinct source images, concatenated. Read-only for the render.
    pub pixels: Vec<u8>,
    /// Row-major property table, [`PROP_STRIDE`] integers per clip.
    pub props: Vec<i32>,
    pub clip_count: usize,
    pub precision: Precision,
}

/// Pack a clip set for kernel dispatch.
///
/// Source images are deduplicated by allocation identity, so an image
/// referenced by many clips is stored once. All quantization happens here;
/// geometry that cannot be encoded fails before any device work is issued.
pub fn pack_clips(clips: &[Clip], precision: Precision) -> MosaicResult<PackedClips> {
    if clips.is_empty() {
        return Err(MosaicError::EmptyClipSet);
    }

    let mut pixels = Vec::new();
    let mut offsets: HashMap<usize, i32> = HashMap::new();
    let mut props = Vec::with_capacity(clips.len() * PROP_STRIDE);

    for clip in clips {
        let source = &clip.source;
        let placement = &clip.placement;
        placement.validate()?;

        let identity = Arc::as_ptr(source.data()) as usize;
        let offset = match offsets.get(&identity) {
            Some(&offset) => offset,
            None => {
                let offset = i32::try_from(pixels.len()).map_err(|_| {
                    MosaicError::validation("packed source buffer exceeds i32 offsets")
                })?;
                pixels.extend_from_slice(source.data());
                offsets.insert(identity, offset);
                offset
            }
        };

        let src_w = i32::try_from(source.width())
            .map_err(|_| MosaicError::validation("source width exceeds i32"))?;
        let src_h = i32::try_from(source.height())
            .map_err(|_| MosaicError::validation("source height exceeds i32"))?;

        let mut row = [0i32; PROP_STRIDE];
        row[PROP_OFFSET] = offset;
        row[PROP_X] = precision.encode(placement.x)?;
        row[PROP_Y] = precision.encode(placement.y)?;
        row[PROP_SRC_W] = src_w;
        row[PROP_SRC_H] = src_h;
        row[PROP_DEST_W] = precision.encode(placement.width)?;
        row[PROP_DEST_H] = precision.encode(placement.height)?;
        row[PROP_ALPHA] = precision.encode(placement.alpha)?;
        row[PROP_Z] = placement.z_index;
        row[PROP_BRIGHTNESS] = precision.encode(placement.brightness)?;
        row[PROP_CHANNELS] = source.channels().byte_count() as i32;
        props.extend_from_slice(&row);
    }

    tracing::debug!(
        clips = clips.len(),
        distinct_sources = offsets.len(),
        pixel_bytes = pixels.len(),
        "packed clip set"
    );

    Ok(PackedClips {
        pixels,
        props,
        clip_count: clips.len(),
        precision,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/composition/pack.rs"]
mod tests;
