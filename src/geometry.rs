// ============================================================================
// GEOMETRY - natural pixel space ↔ letterboxed display space
// ============================================================================

/// Where an image actually lands inside its display box.
///
/// The image is scaled to fit ("contain") and centered, so on the
/// constrained axis it fills the box and on the other axis it is offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub rendered_width: f32,
    pub rendered_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// Natural pixels per display pixel (`natural_width / rendered_width`).
    pub scale: f32,
}

impl Geometry {
    /// Resolve the letterbox for a natural image size inside a client box.
    ///
    /// Returns `None` while any dimension is non-positive or not finite
    /// (element not laid out yet); callers treat that as a no-op.
    pub fn resolve(
        natural_width: f32,
        natural_height: f32,
        client_width: f32,
        client_height: f32,
    ) -> Option<Self> {
        let dims = [natural_width, natural_height, client_width, client_height];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return None;
        }

        let natural_ratio = natural_width / natural_height;
        let client_ratio = client_width / client_height;

        let (rendered_width, rendered_height, offset_x, offset_y) = if natural_ratio > client_ratio {
            let rw = client_width;
            let rh = client_width / natural_ratio;
            (rw, rh, 0.0, (client_height - rh) / 2.0)
        } else {
            let rh = client_height;
            let rw = client_height * natural_ratio;
            (rw, rh, (client_width - rw) / 2.0, 0.0)
        };

        Some(Self {
            rendered_width,
            rendered_height,
            offset_x,
            offset_y,
            scale: natural_width / rendered_width,
        })
    }

    /// Display-space point → natural-image point.
    pub fn to_natural(&self, display_x: f32, display_y: f32) -> (f32, f32) {
        (
            (display_x - self.offset_x) * self.scale,
            (display_y - self.offset_y) * self.scale,
        )
    }

    /// Natural-image point → display-space point.
    pub fn to_display(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x / self.scale + self.offset_x,
            y / self.scale + self.offset_y,
        )
    }

    /// Whether a display point falls on the rendered image (edges inclusive).
    pub fn contains(&self, display_x: f32, display_y: f32) -> bool {
        display_x >= self.offset_x
            && display_x <= self.offset_x + self.rendered_width
            && display_y >= self.offset_y
            && display_y <= self.offset_y + self.rendered_height
    }

    /// Clamp a display point onto the rendered image rectangle.
    pub fn clamp_display(&self, display_x: f32, display_y: f32) -> (f32, f32) {
        (
            display_x.clamp(self.offset_x, self.offset_x + self.rendered_width),
            display_y.clamp(self.offset_y, self.offset_y + self.rendered_height),
        )
    }
}

/// Size of the element the image is displayed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayBox {
    pub width: f32,
    pub height: f32,
}

impl DisplayBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Geometry of an image with the given natural size inside this box.
    pub fn geometry_for(&self, natural_width: u32, natural_height: u32) -> Option<Geometry> {
        Geometry::resolve(
            natural_width as f32,
            natural_height as f32,
            self.width,
            self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Geometry;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn wide_image_is_letterboxed_vertically() {
        let g = Geometry::resolve(2000.0, 1000.0, 800.0, 800.0).unwrap();
        assert_eq!(g.rendered_width, 800.0);
        assert_eq!(g.rendered_height, 400.0);
        assert_eq!(g.offset_x, 0.0);
        assert_eq!(g.offset_y, 200.0);
        assert!(approx(g.scale, 2.5));
    }

    #[test]
    fn tall_image_is_pillarboxed() {
        let g = Geometry::resolve(600.0, 1200.0, 1000.0, 500.0).unwrap();
        assert_eq!(g.rendered_height, 500.0);
        assert_eq!(g.rendered_width, 250.0);
        assert_eq!(g.offset_x, 375.0);
        assert_eq!(g.offset_y, 0.0);
        assert!(approx(g.scale, 2.4));
    }

    #[test]
    fn one_offset_zero_and_centered() {
        let cases = [
            (1000.0, 1000.0, 640.0, 480.0),
            (4032.0, 3024.0, 390.0, 844.0),
            (1920.0, 1080.0, 1280.0, 1024.0),
            (512.0, 2048.0, 300.0, 301.0),
            (7.0, 3.0, 5.0, 11.0),
        ];
        for (nw, nh, cw, ch) in cases {
            let g = Geometry::resolve(nw, nh, cw, ch).unwrap();
            let zero_x = g.offset_x == 0.0;
            let zero_y = g.offset_y == 0.0;
            assert!(zero_x ^ zero_y, "exactly one offset must be zero: {:?}", g);
            if zero_x {
                assert!(approx(g.offset_y * 2.0 + g.rendered_height, ch));
                assert!(approx(g.rendered_width, cw));
            } else {
                assert!(approx(g.offset_x * 2.0 + g.rendered_width, cw));
                assert!(approx(g.rendered_height, ch));
            }
        }
    }

    #[test]
    fn unavailable_when_not_laid_out() {
        assert!(Geometry::resolve(100.0, 100.0, 0.0, 300.0).is_none());
        assert!(Geometry::resolve(0.0, 100.0, 300.0, 300.0).is_none());
        assert!(Geometry::resolve(100.0, 100.0, f32::NAN, 300.0).is_none());
        assert!(Geometry::resolve(100.0, -1.0, 300.0, 300.0).is_none());
    }

    #[test]
    fn natural_display_round_trip() {
        let g = Geometry::resolve(3000.0, 2000.0, 900.0, 700.0).unwrap();
        for (x, y) in [(0.0, 0.0), (1500.0, 1000.0), (2999.0, 17.5), (123.4, 1987.6)] {
            let (dx, dy) = g.to_display(x, y);
            let (nx, ny) = g.to_natural(dx, dy);
            assert!((nx - x).abs() < 0.01 && (ny - y).abs() < 0.01);
        }
    }

    #[test]
    fn contains_and_clamp() {
        let g = Geometry::resolve(2000.0, 1000.0, 800.0, 800.0).unwrap();
        assert!(g.contains(400.0, 400.0));
        assert!(g.contains(0.0, 200.0));
        assert!(!g.contains(400.0, 100.0));
        assert!(!g.contains(400.0, 700.0));
        assert_eq!(g.clamp_display(-50.0, 900.0), (0.0, 600.0));
    }
}
