use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::composition::pack::{
    PROP_ALPHA, PROP_BRIGHTNESS, PROP_CHANNELS, PROP_DEST_H, PROP_DEST_W, PROP_OFFSET, PROP_SRC_H,
    PROP_SRC_W, PROP_STRIDE, PROP_X, PROP_Y, PROP_Z, PackedClips,
};
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::render::{CompositeBackend, FrameRgb, KernelVariant, RenderSettings};

/// CPU-resident device context.
///
/// Runs the same kernels as the accelerated context, one rayon task per clip.
/// Canvas and depth state share one atomic cell per pixel, so the per-pixel
/// read-modify-write is a compare-exchange loop and occlusion resolution is
/// race-free; the schedule of same-depth overlapping clips is still
/// unordered.
#[derive(Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CompositeBackend for CpuBackend {
    fn composite(
        &mut self,
        packed: &PackedClips,
        settings: &RenderSettings,
        base: Option<&FrameRgb>,
    ) -> MosaicResult<FrameRgb> {
        settings.validate()?;
        let cells = init_cells(settings, base)?;
        let canvas_w = settings.width as i32;
        let canvas_h = settings.height as i32;
        let multiplier = packed.precision.multiplier() as f32;

        match settings.variant {
            KernelVariant::Full => {
                packed.props.par_chunks(PROP_STRIDE).for_each(|row| {
                    composite_clip_full(row, &packed.pixels, &cells, canvas_w, canvas_h, multiplier);
                });
            }
            KernelVariant::Lite => {
                packed.props.par_chunks(PROP_STRIDE).for_each(|row| {
                    composite_clip_lite(row, &packed.pixels, &cells, canvas_w, canvas_h, multiplier);
                });
            }
        }

        Ok(assemble(&cells, settings.width, settings.height))
    }
}

/// Per-pixel cell: z-index (high 32 bits, two's complement), depth alpha,
/// then the canvas RGB in the low bytes.
#[inline]
fn pack_cell(z: i32, alpha: u8, rgb: [u8; 3]) -> u64 {
    (u64::from(z as u32) << 32)
        | (u64::from(alpha) << 24)
        | (u64::from(rgb[0]) << 16)
        | (u64::from(rgb[1]) << 8)
        | u64::from(rgb[2])
}

#[inline]
fn unpack_cell(cell: u64) -> (i32, u8, [u8; 3]) {
    let z = (cell >> 32) as u32 as i32;
    let alpha = (cell >> 24) as u8;
    let rgb = [(cell >> 16) as u8, (cell >> 8) as u8, cell as u8];
    (z, alpha, rgb)
}

fn init_cells(settings: &RenderSettings, base: Option<&FrameRgb>) -> MosaicResult<Vec<AtomicU64>> {
    let len = settings.width as usize * settings.height as usize;
    match base {
        None => Ok((0..len).map(|_| AtomicU64::new(0)).collect()),
        Some(base) => {
            if base.width != settings.width || base.height != settings.height {
                return Err(MosaicError::validation(format!(
                    "base image is {}x{}, canvas is {}x{}",
                    base.width, base.height, settings.width, settings.height
                )));
            }
            Ok(base
                .data
                .chunks_exact(3)
                .map(|px| AtomicU64::new(pack_cell(0, 0, [px[0], px[1], px[2]])))
                .collect())
        }
    }
}

/// The result assembler: read the cell buffer back into a host frame.
fn assemble(cells: &[AtomicU64], width: u32, height: u32) -> FrameRgb {
    let mut data = Vec::with_capacity(cells.len() * 3);
    for cell in cells {
        let (_, _, rgb) = unpack_cell(cell.load(Ordering::Relaxed));
        data.extend_from_slice(&rgb);
    }
    FrameRgb {
        width,
        height,
        data,
    }
}

/// Full kernel: one task per clip. Rasterizes the clip's fractionally
/// adjusted bounding box with bilinear resampling, brightness, alpha blending
/// and z-order occlusion against the shared cell buffer.
fn composite_clip_full(
    row: &[i32],
    pixels: &[u8],
    cells: &[AtomicU64],
    canvas_w: i32,
    canvas_h: i32,
    multiplier: f32,
) {
    let offset = row[PROP_OFFSET] as usize;
    let channels = row[PROP_CHANNELS] as usize;
    let w = row[PROP_SRC_W];
    let h = row[PROP_SRC_H];

    let xf = row[PROP_X] as f32 / multiplier;
    let yf = row[PROP_Y] as f32 / multiplier;
    let x = xf.floor() as i32;
    let y = yf.floor() as i32;
    let rem_x = xf - x as f32;
    let rem_y = yf - y as f32;

    let twf = row[PROP_DEST_W] as f32 / multiplier;
    let thf = row[PROP_DEST_H] as f32 / multiplier;
    // The box must cover the full sub-pixel footprint.
    let tw = (rem_x + twf).ceil() as i32;
    let th = (rem_y + thf).ceil() as i32;
    let rem_w = (rem_x + twf) - (rem_x + twf).floor();
    let rem_h = (rem_y + thf) - (rem_y + thf).floor();

    let clip_alpha = row[PROP_ALPHA] as f32 / multiplier;
    let z = row[PROP_Z];
    let brightness = row[PROP_BRIGHTNESS] as f32 / multiplier;

    for drow in 0..th {
        for dcol in 0..tw {
            let dst_x = x + dcol;
            let dst_y = y + drow;
            if dst_x < 0 || dst_x >= canvas_w || dst_y < 0 || dst_y >= canvas_h {
                continue;
            }

            let nx = norm(dcol as f32, rem_x, rem_x + twf - 1.0);
            let ny = norm(drow as f32, rem_y, rem_y + thf - 1.0);
            let mut sx = nx * (w - 1) as f32;
            let mut sy = ny * (h - 1) as f32;
            // Allow up to 1px of edge bleed instead of a hard seam.
            if nx < 0.0 {
                sx = -rem_x;
            }
            if ny < 0.0 {
                sy = -rem_y;
            }
            if nx > 1.0 {
                sx = (w - 1) as f32 + (1.0 - rem_w);
            }
            if ny > 1.0 {
                sy = (h - 1) as f32 + (1.0 - rem_h);
            }

            let mut src = sample_bilinear(pixels, offset, sx, sy, w, h, channels);
            if brightness < 1.0 {
                src = scale_brightness(src, brightness);
            }

            let idx = (dst_y * canvas_w + dst_x) as usize;
            blend_into_cell(&cells[idx], src, clip_alpha, z);
        }
    }
}

/// Lite kernel: integer positions, nearest-neighbor copy at source size,
/// no blending and no depth. Overlaps are last-writer-wins.
fn composite_clip_lite(
    row: &[i32],
    pixels: &[u8],
    cells: &[AtomicU64],
    canvas_w: i32,
    canvas_h: i32,
    multiplier: f32,
) {
    let offset = row[PROP_OFFSET] as usize;
    let channels = row[PROP_CHANNELS] as usize;
    let w = row[PROP_SRC_W];
    let h = row[PROP_SRC_H];
    let x = (row[PROP_X] as f32 / multiplier).floor() as i32;
    let y = (row[PROP_Y] as f32 / multiplier).floor() as i32;

    for drow in 0..h {
        for dcol in 0..w {
            let dst_x = x + dcol;
            let dst_y = y + drow;
            if dst_x < 0 || dst_x >= canvas_w || dst_y < 0 || dst_y >= canvas_h {
                continue;
            }
            let src = offset + (drow * w + dcol) as usize * channels;
            let idx = (dst_y * canvas_w + dst_x) as usize;
            let cell = pack_cell(0, 0, [pixels[src], pixels[src + 1], pixels[src + 2]]);
            cells[idx].store(cell, Ordering::Relaxed);
        }
    }
}

/// Resolve the depth/blend rule for one destination pixel.
///
/// An untouched cell records `(z 0, alpha 0)`, so the first writer blends
/// against the backdrop color with its own effective alpha; a later lower-z
/// clip then shows through at the remaining weight.
///
/// The whole per-pixel record (z, depth alpha, RGB) swaps in one
/// compare-exchange, so a concurrent writer forces a re-read and re-blend
/// instead of a lost update.
fn blend_into_cell(cell: &AtomicU64, src: [i32; 4], clip_alpha: f32, z: i32) {
    let src_alpha = src[3] as f32 / 255.0;
    let talpha = src_alpha * clip_alpha;
    if talpha <= 0.0 {
        return;
    }

    let mut cur = cell.load(Ordering::Relaxed);
    loop {
        let (dz, da, drgb) = unpack_cell(cur);
        let dalpha = f32::from(da) / 255.0;

        // Occluded: at or below an already fully opaque record.
        if !(z > dz || dalpha < 1.0) {
            return;
        }

        // Behind the recorded z: slot underneath using the remaining alpha.
        let weight = if z < dz {
            (1.0 - dalpha) * talpha
        } else {
            talpha
        };

        let dest = [
            i32::from(drgb[0]),
            i32::from(drgb[1]),
            i32::from(drgb[2]),
            i32::from(da),
        ];
        let blended = blend_colors(src, dest, weight);
        let rgb = [blended[0] as u8, blended[1] as u8, blended[2] as u8];
        let new = if z > dz {
            pack_cell(z, blended[3] as u8, rgb)
        } else {
            pack_cell(dz, da, rgb)
        };

        match cell.compare_exchange_weak(cur, new, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => cur = actual,
        }
    }
}

fn norm(value: f32, a: f32, b: f32) -> f32 {
    let span = b - a;
    // 1-pixel destination spans: map the pixel at the span start exactly,
    // send anything off-span to the edge-bleed branches.
    if span.abs() < 1e-6 {
        if (value - a).abs() < 1e-6 {
            return 0.0;
        }
        return if value < a { -1.0 } else { 2.0 };
    }
    (value - a) / span
}

/// Read one source pixel with edge-extend-alpha-zero semantics: out-of-bounds
/// reads return the edge color but alpha 0, so blending at the border never
/// invents opaque pixels.
fn get_pixel(pixels: &[u8], offset: usize, x: i32, y: i32, w: i32, h: i32, dim: usize) -> [i32; 4] {
    let mut visible = true;
    let x = if x < 0 {
        visible = false;
        0
    } else if x >= w {
        visible = false;
        w - 1
    } else {
        x
    };
    let y = if y < 0 {
        visible = false;
        0
    } else if y >= h {
        visible = false;
        h - 1
    } else {
        y
    };

    let idx = offset + (y * w + x) as usize * dim;
    let r = i32::from(pixels[idx]);
    let g = i32::from(pixels[idx + 1]);
    let b = i32::from(pixels[idx + 2]);
    let mut a = if dim > 3 { i32::from(pixels[idx + 3]) } else { 255 };
    if !visible {
        a = 0;
    }
    [r, g, b, a]
}

fn sample_bilinear(
    pixels: &[u8],
    offset: usize,
    sx: f32,
    sy: f32,
    w: i32,
    h: i32,
    dim: usize,
) -> [i32; 4] {
    let xf = sx.clamp(-1.0, (w + 1) as f32);
    let yf = sy.clamp(-1.0, (h + 1) as f32);

    let x0 = xf.floor() as i32;
    let x1 = xf.ceil() as i32;
    let y0 = yf.floor() as i32;
    let y1 = yf.ceil() as i32;
    let x_lerp = 1.0 - (xf - x0 as f32);
    let y_lerp = 1.0 - (yf - y0 as f32);

    let tl = get_pixel(pixels, offset, x0, y0, w, h, dim);
    let tr = get_pixel(pixels, offset, x1, y0, w, h, dim);
    let bl = get_pixel(pixels, offset, x0, y1, w, h, dim);
    let br = get_pixel(pixels, offset, x1, y1, w, h, dim);

    let top = blend_colors(tl, tr, x_lerp);
    let bottom = blend_colors(bl, br, x_lerp);
    blend_colors(top, bottom, y_lerp)
}

/// `c1 * amount + c2 * (1 - amount)`, rounded per channel.
fn blend_colors(c1: [i32; 4], c2: [i32; 4], amount: f32) -> [i32; 4] {
    let inv = 1.0 - amount;
    let mut out = [0i32; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        let v = (c1[i] as f32 * amount + c2[i] as f32 * inv).round() as i32;
        *slot = v.clamp(0, 255);
    }
    out
}

fn scale_brightness(color: [i32; 4], brightness: f32) -> [i32; 4] {
    [
        ((color[0] as f32 * brightness).round() as i32).clamp(0, 255),
        ((color[1] as f32 * brightness).round() as i32).clamp(0, 255),
        ((color[2] as f32 * brightness).round() as i32).clamp(0, 255),
        color[3], // alpha untouched
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
