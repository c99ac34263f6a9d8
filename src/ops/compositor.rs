// ============================================================================
// COMPOSITOR - bake overlays into the canonical image on the CPU
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use crate::components::layers::ComponentLayer;
use crate::error::EditError;
use crate::snapshot::Snapshot;

/// Straight-alpha "source over" of one pixel.
#[inline]
pub fn blend_over(dst: &mut [u8], src: [f32; 4]) {
    let sa = src[3] / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let v = (src[c] * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Composite an RGBA buffer onto `dst` with its top-left at `(off_x, off_y)`.
/// Parts falling outside `dst` are clipped.
pub fn composite_over(dst: &mut RgbaImage, src: &[u8], src_w: u32, src_h: u32, off_x: i32, off_y: i32) {
    if src_w == 0 || src_h == 0 || src.len() < src_w as usize * src_h as usize * 4 {
        return;
    }
    let dw = dst.width() as i32;
    let dh = dst.height() as i32;
    for sy in 0..src_h as i32 {
        let y = sy + off_y;
        if y < 0 || y >= dh {
            continue;
        }
        for sx in 0..src_w as i32 {
            let x = sx + off_x;
            if x < 0 || x >= dw {
                continue;
            }
            let si = (sy as usize * src_w as usize + sx as usize) * 4;
            let px = [
                src[si] as f32,
                src[si + 1] as f32,
                src[si + 2] as f32,
                src[si + 3] as f32,
            ];
            blend_over(&mut dst.get_pixel_mut(x as u32, y as u32).0, px);
        }
    }
}

/// Where a component lands on a base image of the given size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub center_x: f32,
    pub center_y: f32,
    pub draw_w: f32,
    pub draw_h: f32,
}

impl Placement {
    /// Center in natural pixels; width from `scale`, height keeps the
    /// component's own aspect ratio.
    pub fn for_layer(layer: &ComponentLayer, base_w: u32, base_h: u32) -> Option<Self> {
        let (cw, ch) = (layer.pixels.width(), layer.pixels.height());
        if cw == 0 || ch == 0 {
            return None;
        }
        let t = &layer.transform;
        let draw_w = base_w as f32 * t.scale;
        let draw_h = draw_w * ch as f32 / cw as f32;
        Some(Self {
            center_x: t.x * base_w as f32,
            center_y: t.y * base_h as f32,
            draw_w,
            draw_h,
        })
    }
}

/// Merge a component layer into a copy of the snapshot.
///
/// Transform order around the center: rotate, then flip-scale, then draw
/// centered. Flips therefore mirror the component in its own (already
/// rotated) frame. Sampling is inverse-mapped and bilinear.
pub fn merge_component(snapshot: &Snapshot, layer: &ComponentLayer) -> Result<Snapshot, EditError> {
    if snapshot.is_empty() {
        return Err(EditError::EmptyRaster);
    }
    let base_w = snapshot.width();
    let base_h = snapshot.height();
    let placement = Placement::for_layer(layer, base_w, base_h).ok_or(EditError::EmptyRaster)?;

    let mut out = snapshot.pixels().clone();
    if placement.draw_w < 1e-3 || placement.draw_h < 1e-3 {
        return Ok(Snapshot::new(out));
    }

    let src = layer.pixels.as_ref();
    let src_w = src.width() as f32;
    let src_h = src.height() as f32;
    let t = &layer.transform;

    let (sin, cos) = t.rotation.to_radians().sin_cos();
    let flip_x = if t.flip_h { -1.0 } else { 1.0 };
    let flip_y = if t.flip_v { -1.0 } else { 1.0 };
    let half_w = placement.draw_w * 0.5;
    let half_h = placement.draw_h * 0.5;
    let to_src_x = src_w / placement.draw_w;
    let to_src_y = src_h / placement.draw_h;

    // Only rows inside the rotated footprint need work.
    let radius = (half_w * half_w + half_h * half_h).sqrt();
    let row_min = ((placement.center_y - radius).floor().max(0.0)) as usize;
    let row_max = ((placement.center_y + radius).ceil().min(base_h as f32)) as usize;
    let col_min = ((placement.center_x - radius).floor().max(0.0)) as usize;
    let col_max = ((placement.center_x + radius).ceil().min(base_w as f32)) as usize;

    let row_bytes = base_w as usize * 4;
    out.as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .filter(|(y, _)| *y >= row_min && *y < row_max)
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - placement.center_y;
            for x in col_min..col_max {
                let dx = x as f32 + 0.5 - placement.center_x;
                // Undo the rotation, then the flip.
                let rx = cos * dx + sin * dy;
                let ry = -sin * dx + cos * dy;
                let u = rx * flip_x;
                let v = ry * flip_y;
                if u < -half_w || u >= half_w || v < -half_h || v >= half_h {
                    continue;
                }
                let sx = (u + half_w) * to_src_x;
                let sy = (v + half_h) * to_src_y;
                let px = bilinear_sample(src, sx - 0.5, sy - 0.5);
                blend_over(&mut row[x * 4..x * 4 + 4], px);
            }
        });

    Ok(Snapshot::new(out))
}

/// Bilinear sample with clamp-to-edge, `(x, y)` in pixel-center space.
fn bilinear_sample(img: &RgbaImage, x: f32, y: f32) -> [f32; 4] {
    let max_x = img.width() as i32 - 1;
    let max_y = img.height() as i32 - 1;
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let fetch = |sx: i32, sy: i32| -> [f32; 4] {
        let p = img.get_pixel(sx.clamp(0, max_x) as u32, sy.clamp(0, max_y) as u32).0;
        [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
    };

    let tl = fetch(x0, y0);
    let tr = fetch(x0 + 1, y0);
    let bl = fetch(x0, y0 + 1);
    let br = fetch(x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = tl[c] + (tr[c] - tl[c]) * fx;
        let bot = bl[c] + (br[c] - bl[c]) * fx;
        out[c] = top + (bot - top) * fy;
    }
    out
}
