// ============================================================================
// COMPONENT LAYERS - pasted images floating above the canonical image
// ============================================================================

use image::RgbaImage;
use serde::Serialize;
use std::sync::Arc;

use crate::geometry::Geometry;

/// Stable, creation-ordered layer identifier.
pub type ComponentId = u64;

/// The file a component was uploaded from.
#[derive(Clone, Debug)]
pub struct ComponentSource {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

/// Placement of a component relative to the base image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ComponentTransform {
    /// Center, as a fraction (0–1) of the base image's natural width.
    pub x: f32,
    /// Center, as a fraction (0–1) of the base image's natural height.
    pub y: f32,
    /// Drawn width as a fraction of the base image width.
    pub scale: f32,
    /// Degrees in `[0, 360)`, clockwise on screen.
    pub rotation: f32,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Default for ComponentTransform {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            scale: 0.5,
            rotation: 0.0,
            flip_h: false,
            flip_v: false,
        }
    }
}

/// Partial transform edit from the components panel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub scale: Option<f32>,
    pub rotation: Option<f32>,
    pub flip_h: Option<bool>,
    pub flip_v: Option<bool>,
}

/// Smallest scale a component can be set to.
const MIN_SCALE: f32 = 0.01;

impl ComponentTransform {
    pub fn apply(&mut self, patch: TransformPatch) {
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            self.x = x.clamp(0.0, 1.0);
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            self.y = y.clamp(0.0, 1.0);
        }
        if let Some(scale) = patch.scale.filter(|v| v.is_finite()) {
            self.scale = scale.max(MIN_SCALE);
        }
        if let Some(rotation) = patch.rotation.filter(|v| v.is_finite()) {
            self.rotation = normalize_degrees(rotation);
        }
        if let Some(flip_h) = patch.flip_h {
            self.flip_h = flip_h;
        }
        if let Some(flip_v) = patch.flip_v {
            self.flip_v = flip_v;
        }
    }
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// One uploaded image layer.
#[derive(Clone, Debug)]
pub struct ComponentLayer {
    pub id: ComponentId,
    /// Decoded pixels.
    pub pixels: Arc<RgbaImage>,
    pub source: ComponentSource,
    pub transform: ComponentTransform,
}

impl ComponentLayer {
    pub fn name(&self) -> &str {
        &self.source.file_name
    }
}

/// Ordered layer collection with a weak "active" selection.
///
/// The active layer is remembered by id only; a lookup after deletion simply
/// finds nothing.
#[derive(Clone, Debug, Default)]
pub struct ComponentStack {
    layers: Vec<ComponentLayer>,
    active: Option<ComponentId>,
    next_id: ComponentId,
}

impl ComponentStack {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            active: None,
            next_id: 1,
        }
    }

    /// Append a new layer with default placement and select it.
    pub fn add(&mut self, pixels: RgbaImage, source: ComponentSource) -> ComponentId {
        let id = self.allocate_id();
        self.layers.push(ComponentLayer {
            id,
            pixels: Arc::new(pixels),
            source,
            transform: ComponentTransform::default(),
        });
        self.active = Some(id);
        id
    }

    fn allocate_id(&mut self) -> ComponentId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: ComponentId) -> Option<&ComponentLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn get_mut(&mut self, id: ComponentId) -> Option<&mut ComponentLayer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Select a layer. Unknown ids are ignored.
    pub fn select(&mut self, id: ComponentId) -> bool {
        if self.get(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Active id, resolved against the current collection.
    pub fn active_id(&self) -> Option<ComponentId> {
        self.active.filter(|id| self.get(*id).is_some())
    }

    pub fn update_transform(&mut self, id: ComponentId, patch: TransformPatch) -> bool {
        match self.get_mut(id) {
            Some(layer) => {
                layer.transform.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Move a layer by a display-pixel delta, converted through the geometry.
    pub fn drag(&mut self, id: ComponentId, dx: f32, dy: f32, geometry: &Geometry) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        let t = &mut layer.transform;
        t.x = (t.x + dx / geometry.rendered_width).clamp(0.0, 1.0);
        t.y = (t.y + dy / geometry.rendered_height).clamp(0.0, 1.0);
        true
    }

    /// Remove a layer; clears the selection if it pointed at it.
    pub fn remove(&mut self, id: ComponentId) -> Option<ComponentLayer> {
        let idx = self.layers.iter().position(|l| l.id == id)?;
        let removed = self.layers.remove(idx);
        if self.active == Some(id) {
            self.active = None;
        }
        Some(removed)
    }

    /// Drop every layer. Ids keep counting up so old ids never come back.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.active = None;
    }

    pub fn layers(&self) -> &[ComponentLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn source(name: &str) -> ComponentSource {
        ComponentSource {
            file_name: name.to_string(),
            bytes: Arc::from(&b"raw"[..]),
        }
    }

    fn pixels() -> RgbaImage {
        RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255]))
    }

    #[test]
    fn add_appends_and_selects_with_defaults() {
        let mut stack = ComponentStack::new();
        let a = stack.add(pixels(), source("a.png"));
        let b = stack.add(pixels(), source("b.png"));
        assert!(b > a);
        assert_eq!(stack.active_id(), Some(b));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.layers()[0].name(), "a.png");
        assert_eq!(stack.get(a).unwrap().transform, ComponentTransform::default());
    }

    #[test]
    fn select_unknown_is_noop() {
        let mut stack = ComponentStack::new();
        let a = stack.add(pixels(), source("a.png"));
        assert!(!stack.select(a + 100));
        assert_eq!(stack.active_id(), Some(a));
    }

    #[test]
    fn drag_converts_display_delta() {
        let mut stack = ComponentStack::new();
        let id = stack.add(pixels(), source("a.png"));
        // 1000x1000 image in a 500x500 box -> rendered width 500.
        let g = Geometry::resolve(1000.0, 1000.0, 500.0, 500.0).unwrap();
        assert!(stack.drag(id, 50.0, 0.0, &g));
        let t = stack.get(id).unwrap().transform;
        assert!((t.x - 0.6).abs() < 1e-6);
        assert_eq!(t.y, 0.5);

        stack.drag(id, 1000.0, -1000.0, &g);
        let t = stack.get(id).unwrap().transform;
        assert_eq!((t.x, t.y), (1.0, 0.0));
    }

    #[test]
    fn delete_active_clears_selection() {
        let mut stack = ComponentStack::new();
        let a = stack.add(pixels(), source("a.png"));
        let b = stack.add(pixels(), source("b.png"));
        stack.select(a);
        assert!(stack.remove(b).is_some());
        assert_eq!(stack.active_id(), Some(a));
        assert!(stack.remove(a).is_some());
        assert_eq!(stack.active_id(), None);
        assert!(stack.remove(a).is_none());
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut stack = ComponentStack::new();
        let a = stack.add(pixels(), source("a.png"));
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.active_id(), None);
        let b = stack.add(pixels(), source("b.png"));
        assert!(b > a);
    }

    #[test]
    fn transform_patch_normalizes() {
        let mut stack = ComponentStack::new();
        let id = stack.add(pixels(), source("a.png"));
        assert!(stack.update_transform(
            id,
            TransformPatch {
                rotation: Some(-90.0),
                x: Some(1.7),
                flip_h: Some(true),
                ..Default::default()
            }
        ));
        let t = stack.get(id).unwrap().transform;
        assert_eq!(t.rotation, 270.0);
        assert_eq!(t.x, 1.0);
        assert!(t.flip_h);
        assert!(!t.flip_v);
        assert_eq!(t.scale, 0.5);

        assert!(!stack.update_transform(id + 1, TransformPatch::default()));
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
    }
}
