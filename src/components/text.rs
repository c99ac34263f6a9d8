// ============================================================================
// TEXT OVERLAY - the single editable text object above the image
// ============================================================================

use serde::Serialize;

use crate::geometry::Geometry;

/// Smallest display font size a resize gesture can reach.
pub const MIN_FONT_SIZE: f32 = 8.0;

/// Display pixels of font size gained per pixel of dominant-axis drag.
const RESIZE_RATE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    #[default]
    Bold,
}

impl FontWeight {
    /// CSS-style numeric weight used for font lookup.
    pub fn css_weight(&self) -> u16 {
        match self {
            FontWeight::Normal => 400,
            FontWeight::Bold => 700,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// How the text is drawn. `font_size` is in display pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub color: [u8; 4],
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Roboto".to_string(),
            font_size: 50.0,
            font_weight: FontWeight::Bold,
            font_style: FontStyle::Normal,
            color: [255, 255, 255, 255],
        }
    }
}

/// Partial edit from the text panel. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPatch {
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,
    pub color: Option<[u8; 4]>,
}

/// The text being positioned on the image.
///
/// Only the natural-image anchor is stored; the display position is always
/// derived from the current [`Geometry`], so the two can never disagree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveText {
    pub text: String,
    pub style: TextStyle,
    /// Anchor in natural-image pixels (center of the rendered text).
    pub x: f32,
    pub y: f32,
}

/// Display position captured when a drag gesture starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextDrag {
    pub start_display_x: f32,
    pub start_display_y: f32,
}

/// Font size captured when a resize gesture starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextResize {
    pub start_font_size: f32,
}

impl ActiveText {
    /// Create text at a clicked display point. `None` if the click missed the image.
    pub fn place(
        display_x: f32,
        display_y: f32,
        geometry: &Geometry,
        text: impl Into<String>,
        style: TextStyle,
    ) -> Option<Self> {
        if !geometry.contains(display_x, display_y) {
            return None;
        }
        let (x, y) = geometry.to_natural(display_x, display_y);
        Some(Self {
            text: text.into(),
            style,
            x,
            y,
        })
    }

    /// Create text centered on an image of the given natural size.
    pub fn centered(natural_width: u32, natural_height: u32, text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            x: natural_width as f32 / 2.0,
            y: natural_height as f32 / 2.0,
        }
    }

    pub fn display_position(&self, geometry: &Geometry) -> (f32, f32) {
        geometry.to_display(self.x, self.y)
    }

    /// Font size in natural pixels, matching what the display shows.
    pub fn natural_font_size(&self, geometry: &Geometry) -> f32 {
        self.style.font_size * geometry.scale
    }

    pub fn begin_drag(&self, geometry: &Geometry) -> TextDrag {
        let (start_display_x, start_display_y) = self.display_position(geometry);
        TextDrag {
            start_display_x,
            start_display_y,
        }
    }

    /// Move by the pointer delta since the drag started, clamped onto the image.
    pub fn drag(&mut self, start: &TextDrag, dx: f32, dy: f32, geometry: &Geometry) {
        let (cx, cy) = geometry.clamp_display(start.start_display_x + dx, start.start_display_y + dy);
        let (x, y) = geometry.to_natural(cx, cy);
        self.x = x;
        self.y = y;
    }

    pub fn begin_resize(&self) -> TextResize {
        TextResize {
            start_font_size: self.style.font_size,
        }
    }

    /// Grow or shrink along whichever axis moved further. Position is kept.
    pub fn resize(&mut self, start: &TextResize, dx: f32, dy: f32) {
        let delta = if dx.abs() > dy.abs() { dx } else { dy };
        self.style.font_size = (start.start_font_size + delta * RESIZE_RATE).max(MIN_FONT_SIZE);
    }

    pub fn apply(&mut self, patch: TextPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(family) = patch.font_family {
            self.style.font_family = family;
        }
        if let Some(size) = patch.font_size
            && size.is_finite()
        {
            self.style.font_size = size.max(MIN_FONT_SIZE);
        }
        if let Some(weight) = patch.font_weight {
            self.style.font_weight = weight;
        }
        if let Some(style) = patch.font_style {
            self.style.font_style = style;
        }
        if let Some(color) = patch.color {
            self.style.color = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2000x1000 image in an 800x800 box: rendered 800x400 at y offset 200, scale 2.5.
    fn geometry() -> Geometry {
        Geometry::resolve(2000.0, 1000.0, 800.0, 800.0).unwrap()
    }

    #[test]
    fn place_inside_maps_to_natural() {
        let g = geometry();
        let t = ActiveText::place(400.0, 400.0, &g, "Hi", TextStyle::default()).unwrap();
        assert_eq!((t.x, t.y), (1000.0, 500.0));
        assert_eq!(t.display_position(&g), (400.0, 400.0));
        assert_eq!(t.style.font_family, "Roboto");
        assert_eq!(t.style.font_size, 50.0);
        assert_eq!(t.style.font_weight, FontWeight::Bold);
        assert_eq!(t.style.color, [255, 255, 255, 255]);
    }

    #[test]
    fn place_outside_is_rejected() {
        let g = geometry();
        assert!(ActiveText::place(400.0, 150.0, &g, "Hi", TextStyle::default()).is_none());
        assert!(ActiveText::place(400.0, 650.0, &g, "Hi", TextStyle::default()).is_none());
    }

    #[test]
    fn drag_is_relative_to_start_and_clamped() {
        let g = geometry();
        let mut t = ActiveText::place(400.0, 400.0, &g, "Hi", TextStyle::default()).unwrap();
        let start = t.begin_drag(&g);

        t.drag(&start, 40.0, -20.0, &g);
        assert_eq!(t.display_position(&g), (440.0, 380.0));
        assert_eq!((t.x, t.y), (1100.0, 450.0));

        // Later events carry the total delta from pointer-down, not increments.
        t.drag(&start, 80.0, 0.0, &g);
        assert_eq!(t.display_position(&g), (480.0, 400.0));

        t.drag(&start, 5000.0, -5000.0, &g);
        assert_eq!(t.display_position(&g), (800.0, 200.0));
        assert_eq!((t.x, t.y), (2000.0, 0.0));
    }

    #[test]
    fn resize_uses_dominant_axis_and_floors() {
        let g = geometry();
        let mut t = ActiveText::place(400.0, 400.0, &g, "Hi", TextStyle::default()).unwrap();
        let (x, y) = (t.x, t.y);
        let start = t.begin_resize();

        t.resize(&start, 30.0, -10.0);
        assert_eq!(t.style.font_size, 65.0);
        t.resize(&start, 4.0, -20.0);
        assert_eq!(t.style.font_size, 40.0);
        t.resize(&start, 0.0, -500.0);
        assert_eq!(t.style.font_size, MIN_FONT_SIZE);
        assert_eq!((t.x, t.y), (x, y));
    }

    #[test]
    fn natural_font_size_tracks_scale() {
        let g = geometry();
        let t = ActiveText::centered(2000, 1000, "Hi", TextStyle::default());
        assert_eq!((t.x, t.y), (1000.0, 500.0));
        assert_eq!(t.natural_font_size(&g), 125.0);
    }

    #[test]
    fn patch_merges_only_given_fields() {
        let mut t = ActiveText::centered(100, 100, "Hi", TextStyle::default());
        t.apply(TextPatch {
            text: Some("Sale".to_string()),
            font_style: Some(FontStyle::Italic),
            font_size: Some(2.0),
            ..Default::default()
        });
        assert_eq!(t.text, "Sale");
        assert_eq!(t.style.font_style, FontStyle::Italic);
        assert_eq!(t.style.font_size, MIN_FONT_SIZE);
        assert_eq!(t.style.font_weight, FontWeight::Bold);
        assert_eq!((t.x, t.y), (50.0, 50.0));
    }
}
