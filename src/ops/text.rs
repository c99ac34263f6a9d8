// ============================================================================
// TEXT RASTERIZATION - glyph layout, baking and font lookup
// ============================================================================

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use std::collections::HashMap;
use std::path::Path;

use crate::components::text::ActiveText;
use crate::error::EditError;
use crate::geometry::Geometry;
use crate::ops::compositor::composite_over;
use crate::snapshot::Snapshot;

/// Largest natural font size a bake rasterizes at, as a multiple of the
/// longer canvas side.
pub const MAX_FONT_TO_CANVAS: f32 = 2.0;

/// Natural font size actually used for rasterizing on a `canvas_w` x `canvas_h` image.
pub fn raster_font_size(font_size: f32, canvas_w: u32, canvas_h: u32) -> f32 {
    font_size.min(canvas_w.max(canvas_h) as f32 * MAX_FONT_TO_CANVAS)
}

/// Lay out a single line of text centered on x = 0.
/// Returns `(glyphs, total_width)`; glyph positions are `(id, x, 0.0)`.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32, f32)>, f32) {
    let scaled = font.as_scaled(font_size);

    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x, 0.0));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    let total_width = cursor_x;
    for glyph in &mut glyphs {
        glyph.1 -= total_width * 0.5;
    }

    (glyphs, total_width)
}

/// Top edge of a text block whose vertical middle sits on `anchor_y`.
///
/// A single line is centered on the middle of its ascent/descent box;
/// multiple lines are centered as one block. `descent` is negative.
pub fn block_top(anchor_y: f32, ascent: f32, descent: f32, line_height: f32, lines: usize) -> f32 {
    let lines = lines.max(1);
    let block_height = (lines - 1) as f32 * line_height + (ascent - descent);
    anchor_y - block_height * 0.5
}

/// RGBA coverage of rendered text, positioned in canvas pixels.
pub struct RasterizedText {
    pub buf: Vec<u8>,
    pub buf_w: u32,
    pub buf_h: u32,
    pub off_x: i32,
    pub off_y: i32,
}

impl RasterizedText {
    fn empty() -> Self {
        Self { buf: Vec::new(), buf_w: 0, buf_h: 0, off_x: 0, off_y: 0 }
    }
}

/// Rasterize text centered (both axes) on `(anchor_x, anchor_y)`.
///
/// Supports multi-line text via '\n'. Output is clipped to the canvas.
pub fn rasterize_text(
    font: &FontArc,
    text: &str,
    font_size: f32,
    anchor_x: f32,
    anchor_y: f32,
    color: [u8; 4],
    canvas_w: u32,
    canvas_h: u32,
) -> RasterizedText {
    if !font_size.is_finite() || font_size <= 0.0 {
        return RasterizedText::empty();
    }

    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let line_height = scaled.height();

    let lines: Vec<&str> = text.split('\n').collect();
    let top = block_top(anchor_y, ascent, descent, line_height, lines.len());

    // Absolute glyph positions (x, baseline y) in canvas space.
    let mut placed: Vec<(GlyphId, f32, f32)> = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let baseline = top + line_idx as f32 * line_height + ascent;
        let (glyphs, _) = layout_line(font, line, font_size);
        placed.extend(glyphs.into_iter().map(|(id, gx, _)| (id, anchor_x + gx, baseline)));
    }

    if placed.is_empty() {
        return RasterizedText::empty();
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for &(glyph_id, gx, gy) in &placed {
        let glyph = glyph_id.with_scale_and_position(font_size, point(gx, gy));
        let bounds = font.glyph_bounds(&glyph);
        min_x = min_x.min(bounds.min.x);
        min_y = min_y.min(bounds.min.y);
        max_x = max_x.max(bounds.max.x);
        max_y = max_y.max(bounds.max.y);
    }

    let pad = 2.0;
    let x0 = ((min_x - pad).floor() as i32).max(0);
    let y0 = ((min_y - pad).floor() as i32).max(0);
    let x1 = ((max_x + pad).ceil() as i32).min(canvas_w as i32);
    let y1 = ((max_y + pad).ceil() as i32).min(canvas_h as i32);
    if x1 <= x0 || y1 <= y0 {
        return RasterizedText::empty();
    }
    let buf_w = (x1 - x0) as u32;
    let buf_h = (y1 - y0) as u32;

    let mut coverage = vec![0.0f32; buf_w as usize * buf_h as usize];
    for &(glyph_id, gx, gy) in &placed {
        let glyph = glyph_id.with_scale_and_position(font_size, point(gx, gy));
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let b = outlined.px_bounds();
        // Glyphs entirely off the canvas are never drawn.
        if b.max.x <= x0 as f32 || b.min.x >= x1 as f32 || b.max.y <= y0 as f32 || b.min.y >= y1 as f32 {
            continue;
        }
        outlined.draw(|px, py, cov| {
            let ix = b.min.x as i32 + px as i32 - x0;
            let iy = b.min.y as i32 + py as i32 - y0;
            if ix >= 0 && iy >= 0 && (ix as u32) < buf_w && (iy as u32) < buf_h {
                let idx = iy as usize * buf_w as usize + ix as usize;
                coverage[idx] = coverage[idx].max(cov);
            }
        });
    }

    let mut buf = vec![0u8; coverage.len() * 4];
    for (i, &cov) in coverage.iter().enumerate() {
        if cov > 0.001 {
            let idx = i * 4;
            buf[idx] = color[0];
            buf[idx + 1] = color[1];
            buf[idx + 2] = color[2];
            buf[idx + 3] = (color[3] as f32 * cov.min(1.0)).round() as u8;
        }
    }

    RasterizedText { buf, buf_w, buf_h, off_x: x0, off_y: y0 }
}

/// Draw the active text into a copy of the snapshot at natural resolution.
///
/// The display font size is scaled by `geometry.scale` so the baked text is
/// exactly as large, relative to the image, as it looked on screen.
pub fn bake_text(
    snapshot: &Snapshot,
    text: &ActiveText,
    geometry: &Geometry,
    font: &FontArc,
) -> Result<Snapshot, EditError> {
    if snapshot.is_empty() {
        return Err(EditError::EmptyRaster);
    }
    let mut out = snapshot.pixels().clone();
    let requested = text.natural_font_size(geometry);
    let font_size = raster_font_size(requested, out.width(), out.height());
    if font_size < requested {
        crate::log_warn!("Text size {:.0}px capped to {:.0}px for a {}x{} image", requested, font_size, out.width(), out.height());
    }
    let rendered = rasterize_text(
        font,
        &text.text,
        font_size,
        text.x,
        text.y,
        text.style.color,
        out.width(),
        out.height(),
    );
    composite_over(
        &mut out,
        &rendered.buf,
        rendered.buf_w,
        rendered.buf_h,
        rendered.off_x,
        rendered.off_y,
    );
    Ok(Snapshot::new(out))
}

// ============================================================================
// Font lookup
// ============================================================================

/// Resolves font families to loaded faces, caching every hit.
///
/// Lookup order: cached face, system face, then each fallback family.
pub struct FontBook {
    cache: HashMap<(String, u16, bool), FontArc>,
    fallbacks: Vec<String>,
    use_system: bool,
}

impl FontBook {
    /// Font book backed by the system font database.
    pub fn system(fallbacks: Vec<String>) -> Self {
        Self {
            cache: HashMap::new(),
            fallbacks,
            use_system: true,
        }
    }

    /// Font book with no faces at all; every lookup fails.
    pub fn empty() -> Self {
        Self {
            cache: HashMap::new(),
            fallbacks: Vec::new(),
            use_system: false,
        }
    }

    /// Register a loaded face under `family`. It answers every weight and
    /// style of that family that has no better match.
    pub fn insert(&mut self, family: &str, weight: u16, italic: bool, font: FontArc) {
        self.cache.insert((family.to_lowercase(), weight, italic), font);
    }

    /// Load a TrueType/OpenType file and register it under `family`.
    pub fn load_file(&mut self, family: &str, path: &Path) -> Result<(), EditError> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| EditError::Decode(format!("{}: {}", path.display(), e)))?;
        crate::log_info!("Loaded font '{}' from {}", family, path.display());
        self.insert(family, 400, false, font);
        Ok(())
    }

    pub fn resolve(&mut self, family: &str, weight: u16, italic: bool) -> Result<FontArc, EditError> {
        if let Some(font) = self.lookup(family, weight, italic) {
            return Ok(font);
        }
        let fallbacks = self.fallbacks.clone();
        for fallback in &fallbacks {
            if let Some(font) = self.lookup(fallback, weight, italic) {
                crate::log_warn!("Font '{}' unavailable, using '{}'", family, fallback);
                return Ok(font);
            }
        }
        Err(EditError::FontUnavailable(family.to_string()))
    }

    fn lookup(&mut self, family: &str, weight: u16, italic: bool) -> Option<FontArc> {
        let key = (family.to_lowercase(), weight, italic);
        if let Some(font) = self.cache.get(&key) {
            return Some(font.clone());
        }
        // Any cached face of the family beats a miss.
        if let Some(font) = self
            .cache
            .iter()
            .find(|((f, _, _), _)| *f == key.0)
            .map(|(_, font)| font.clone())
        {
            return Some(font);
        }
        if !self.use_system {
            return None;
        }
        let font = load_system_font(family, weight, italic)?;
        self.cache.insert(key, font.clone());
        Some(font)
    }
}

/// Load a font by family name, weight, and style from the system.
/// `weight` is a CSS-style weight value (400=Regular, 700=Bold).
pub fn load_system_font(family: &str, weight: u16, italic: bool) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Style, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight as f32);
    if italic {
        props.style = Style::Italic;
    }

    let name = match family.to_lowercase().as_str() {
        "sans-serif" => FamilyName::SansSerif,
        "serif" => FamilyName::Serif,
        "monospace" => FamilyName::Monospace,
        _ => FamilyName::Title(family.to_string()),
    };

    let source = SystemSource::new();
    let handle = source.select_best_match(&[name], &props).ok()?;
    let font_data = handle.load().ok()?;
    let bytes: Vec<u8> = (*font_data.copy_font_data()?).clone();
    FontArc::try_from_vec(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_centers_on_em_box_middle() {
        // ascent 40, descent -10: box is 50 tall, top sits 25 above anchor.
        assert_eq!(block_top(100.0, 40.0, -10.0, 60.0, 1), 75.0);
        // baseline = top + ascent = anchor + (ascent + descent) / 2
        assert_eq!(block_top(100.0, 40.0, -10.0, 60.0, 1) + 40.0, 100.0 + 15.0);
    }

    #[test]
    fn multi_line_block_is_centered() {
        // Two lines: 60 + 50 = 110 tall.
        assert_eq!(block_top(100.0, 40.0, -10.0, 60.0, 2), 45.0);
        assert_eq!(block_top(100.0, 40.0, -10.0, 60.0, 0), 75.0);
    }

    fn fixture_font() -> FontArc {
        let bytes = include_bytes!("../../tests/fixtures/DejaVuSans.ttf");
        FontArc::try_from_slice(bytes).unwrap()
    }

    /// Bounding box of every pixel with any coverage: (min_x, min_y, max_x, max_y).
    fn ink_bounds(r: &RasterizedText) -> (i32, i32, i32, i32) {
        let mut b = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for y in 0..r.buf_h as i32 {
            for x in 0..r.buf_w as i32 {
                if r.buf[(y as usize * r.buf_w as usize + x as usize) * 4 + 3] > 0 {
                    b = (b.0.min(x), b.1.min(y), b.2.max(x), b.3.max(y));
                }
            }
        }
        (b.0 + r.off_x, b.1 + r.off_y, b.2 + r.off_x, b.3 + r.off_y)
    }

    #[test]
    fn text_ink_is_centered_on_anchor() {
        let font = fixture_font();
        let r = rasterize_text(&font, "HOH", 80.0, 500.0, 300.0, [255; 4], 1000, 600);
        let (x0, _, x1, _) = ink_bounds(&r);
        let cx = (x0 + x1) as f32 / 2.0;
        assert!((cx - 500.0).abs() <= 4.0, "ink centered at x={}", cx);
        // Vertical centering uses the ascent/descent box, so cap ink is not
        // symmetric about the anchor but does straddle it.
        let (_, y0, _, y1) = ink_bounds(&r);
        assert!(y0 < 300 && y1 > 280, "ink rows {}..{}", y0, y1);
    }

    #[test]
    fn offscreen_glyphs_and_huge_sizes_stay_bounded() {
        let font = fixture_font();
        // A long line mostly off the left and right edges.
        let line = "W".repeat(200);
        let r = rasterize_text(&font, &line, 120.0, 50.0, 50.0, [255; 4], 100, 100);
        assert!(r.buf_w <= 100 && r.buf_h <= 100);
        assert_eq!(raster_font_size(200_000.0, 2000, 1000), 4000.0);
        assert_eq!(raster_font_size(50.0, 2000, 1000), 50.0);
    }

    #[test]
    fn inserted_face_resolves_for_any_style() {
        let mut book = FontBook::empty();
        book.insert("Roboto", 400, false, fixture_font());
        assert!(book.resolve("roboto", 700, true).is_ok());
        assert!(book.resolve("Lato", 400, false).is_err());
    }

    #[test]
    fn unreadable_font_file_is_reported() {
        let mut book = FontBook::empty();
        let missing = std::env::temp_dir().join("studiofe_no_such_font.ttf");
        assert!(matches!(book.load_file("X", &missing), Err(EditError::Io(_))));
    }

    #[test]
    fn unknown_font_is_reported() {
        let mut book = FontBook::empty();
        match book.resolve("Roboto", 700, false) {
            Err(EditError::FontUnavailable(family)) => assert_eq!(family, "Roboto"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
