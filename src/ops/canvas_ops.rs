// ============================================================================
// CANVAS-LEVEL OPERATIONS - aspect-ratio canvas expansion
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::error::EditError;
use crate::snapshot::Snapshot;

/// Largest canvas side, in pixels, an expansion may produce.
pub const MAX_CANVAS_DIM: u32 = 32_768;

/// A target aspect ratio (width / height).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AspectRatio(f64);

impl AspectRatio {
    /// `None` for non-positive or non-finite values.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn from_parts(w: f64, h: f64) -> Option<Self> {
        if h == 0.0 {
            return None;
        }
        Self::new(w / h)
    }

    /// Parse "16:9", "16/9" or a plain number such as "1.5".
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        for sep in [':', '/', 'x'] {
            if let Some((w, h)) = s.split_once(sep) {
                let w: f64 = w.trim().parse().ok()?;
                let h: f64 = h.trim().parse().ok()?;
                if w <= 0.0 || h <= 0.0 {
                    return None;
                }
                return Self::from_parts(w, h);
            }
        }
        s.parse::<f64>().ok().and_then(Self::new)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Ratio presets offered by the ratio panel.
    pub fn presets() -> &'static [(&'static str, f64, f64)] {
        &[
            ("1:1", 1.0, 1.0),
            ("4:5", 4.0, 5.0),
            ("3:4", 3.0, 4.0),
            ("4:3", 4.0, 3.0),
            ("2:3", 2.0, 3.0),
            ("3:2", 3.0, 2.0),
            ("9:16", 9.0, 16.0),
            ("16:9", 16.0, 9.0),
        ]
    }
}

/// New canvas size for a target ratio.
///
/// A wider target keeps the height and grows the width; anything else keeps
/// the width and grows the height. Results are rounded to whole pixels.
///
/// Fails with [`EditError::CanvasTooLarge`] when a side would exceed
/// [`MAX_CANVAS_DIM`].
pub fn ratio_dimensions(orig_w: u32, orig_h: u32, target: AspectRatio) -> Result<(u32, u32), EditError> {
    let original = orig_w as f64 / orig_h as f64;
    let (new_w, new_h) = if target.value() > original {
        ((orig_h as f64 * target.value()).round().max(orig_w as f64), orig_h as f64)
    } else {
        (orig_w as f64, (orig_w as f64 / target.value()).round().max(orig_h as f64))
    };
    if new_w > MAX_CANVAS_DIM as f64 || new_h > MAX_CANVAS_DIM as f64 {
        return Err(EditError::CanvasTooLarge {
            width: new_w.min(u64::MAX as f64) as u64,
            height: new_h.min(u64::MAX as f64) as u64,
        });
    }
    Ok((new_w as u32, new_h as u32))
}

/// Expand the snapshot onto a canvas of the target ratio, centered, with the
/// new area filled with `fill`.
pub fn apply_ratio(snapshot: &Snapshot, target: AspectRatio, fill: Rgba<u8>) -> Result<Snapshot, EditError> {
    if snapshot.is_empty() {
        return Err(EditError::EmptyRaster);
    }
    let old_w = snapshot.width();
    let old_h = snapshot.height();
    let (new_w, new_h) = ratio_dimensions(old_w, old_h, target)?;
    (new_w as usize)
        .checked_mul(new_h as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(EditError::CanvasTooLarge {
            width: new_w as u64,
            height: new_h as u64,
        })?;

    let offset_x = (new_w - old_w) / 2;
    let offset_y = (new_h - old_h) / 2;

    let old = snapshot.pixels();
    let mut new_img = RgbaImage::from_pixel(new_w, new_h, fill);
    for y in 0..old_h {
        for x in 0..old_w {
            new_img.put_pixel(x + offset_x, y + offset_y, *old.get_pixel(x, y));
        }
    }

    Ok(Snapshot::new(new_img))
}
