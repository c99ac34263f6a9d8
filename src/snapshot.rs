// ============================================================================
// SNAPSHOT - one immutable raster in the timeline
// ============================================================================

use image::RgbaImage;
use std::sync::Arc;
use uuid::Uuid;

/// One fully rasterized state of the edited image.
///
/// Cloning is cheap: the pixels are shared and never mutated after creation.
#[derive(Clone, Debug)]
pub struct Snapshot {
    id: Uuid,
    pixels: Arc<RgbaImage>,
}

impl Snapshot {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            pixels: Arc::new(pixels),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Natural-resolution pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    /// True when both handles point at the same raster.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        self.id == other.id
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;
    use image::{Rgba, RgbaImage};

    #[test]
    fn clones_share_identity() {
        let a = Snapshot::new(RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255])));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(b.width(), 4);
        assert_eq!(b.height(), 3);

        let c = Snapshot::new(a.pixels().clone());
        assert_ne!(a, c);
    }

    #[test]
    fn zero_sized_is_empty() {
        assert!(Snapshot::new(RgbaImage::new(0, 5)).is_empty());
        assert!(!Snapshot::new(RgbaImage::new(1, 1)).is_empty());
    }
}
