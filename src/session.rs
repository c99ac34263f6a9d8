// ============================================================================
// EDITOR SESSION - the single in-memory editing state machine
// ============================================================================
//
// Owns the snapshot history, the tool selection, both overlay kinds, the busy
// flag and the error slot. Every command goes through here so overlay
// clearing, busy refusal and error reporting stay in one place.

use image::RgbaImage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::components::history::SnapshotHistory;
use crate::components::layers::{
    ComponentId, ComponentSource, ComponentStack, ComponentTransform, TransformPatch,
};
use crate::components::text::{ActiveText, FontStyle, TextDrag, TextPatch, TextResize};
use crate::components::tools::EditorTool;
use crate::error::EditError;
use crate::geometry::{DisplayBox, Geometry};
use crate::io::{self, SaveFormat};
use crate::ops::ai::{
    EditRequest, ImageService, LifestyleIdeas, PendingEdit, ServiceError, validate_ideas,
    validate_suggestions,
};
use crate::ops::canvas_ops::{self, AspectRatio};
use crate::ops::compositor;
use crate::ops::text::{self as text_ops, FontBook};
use crate::settings::EditorSettings;
use crate::snapshot::Snapshot;

/// Text used when the user clicks the image without typing anything yet.
pub const DEFAULT_TEXT: &str = "Your text here";

/// Read-only picture of the session for panels, scripts and tests.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    #[serde(skip)]
    pub displayed: Option<Snapshot>,
    pub width: u32,
    pub height: u32,
    pub history_position: Option<usize>,
    pub history_len: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    /// What undo would take back, e.g. "Merge: logo.png".
    pub undo_label: Option<String>,
    pub redo_label: Option<String>,
    pub steps: Vec<String>,
    /// Bytes held by every snapshot in the timeline.
    pub history_bytes: usize,
    pub tool: EditorTool,
    pub active_text: Option<ActiveText>,
    pub components: Vec<ComponentView>,
    pub active_component: Option<ComponentId>,
    pub busy: bool,
    pub error: Option<String>,
    pub suggestions: Vec<String>,
    pub lifestyle_ideas: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComponentView {
    pub id: ComponentId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub transform: ComponentTransform,
}

pub struct EditorSession {
    id: Uuid,
    settings: EditorSettings,
    history: SnapshotHistory,
    tool: EditorTool,
    text: Option<ActiveText>,
    text_drag: Option<TextDrag>,
    text_resize: Option<TextResize>,
    components: ComponentStack,
    busy: bool,
    /// Bumped whenever in-flight edits are invalidated (reset, abandon).
    generation: u64,
    error: Option<EditError>,
    suggestions: Vec<String>,
    lifestyle: Option<LifestyleIdeas>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl EditorSession {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            history: SnapshotHistory::new(),
            tool: EditorTool::default(),
            text: None,
            text_drag: None,
            text_resize: None,
            components: ComponentStack::new(),
            busy: false,
            generation: 0,
            error: None,
            suggestions: Vec::new(),
            lifestyle: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn displayed(&self) -> Option<&Snapshot> {
        self.history.displayed()
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn tool(&self) -> EditorTool {
        self.tool
    }

    pub fn active_text(&self) -> Option<&ActiveText> {
        self.text.as_ref()
    }

    pub fn components(&self) -> &ComponentStack {
        &self.components
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&EditError> {
        self.error.as_ref()
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn lifestyle_ideas(&self) -> Option<&LifestyleIdeas> {
        self.lifestyle.as_ref()
    }

    /// Geometry of the displayed snapshot inside `display`, if both exist.
    pub fn geometry(&self, display: DisplayBox) -> Option<Geometry> {
        let snap = self.displayed()?;
        display.geometry_for(snap.width(), snap.height())
    }

    /// Where the active text sits on screen.
    pub fn text_display_position(&self, display: DisplayBox) -> Option<(f32, f32)> {
        let geometry = self.geometry(display)?;
        self.text.as_ref().map(|t| t.display_position(&geometry))
    }

    pub fn view(&self) -> SessionView {
        let displayed = self.displayed().cloned();
        let (width, height) = displayed
            .as_ref()
            .map(|s| (s.width(), s.height()))
            .unwrap_or((0, 0));
        SessionView {
            session_id: self.id.to_string(),
            displayed,
            width,
            height,
            history_position: self.history.position(),
            history_len: self.history.len(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            undo_label: self.history.undo_description().map(str::to_string),
            redo_label: self.history.redo_description().map(str::to_string),
            steps: self.history.descriptions(),
            history_bytes: self.history.memory_usage(),
            tool: self.tool,
            active_text: self.text.clone(),
            components: self
                .components
                .layers()
                .iter()
                .map(|l| ComponentView {
                    id: l.id,
                    name: l.name().to_string(),
                    width: l.pixels.width(),
                    height: l.pixels.height(),
                    transform: l.transform,
                })
                .collect(),
            active_component: self.components.active_id(),
            busy: self.busy,
            error: self.error.as_ref().map(|e| e.to_string()),
            suggestions: self.suggestions.clone(),
            lifestyle_ideas: self
                .lifestyle
                .as_ref()
                .map(|l| l.ideas.clone())
                .unwrap_or_default(),
        }
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    /// Record a reported failure in the error slot (latest wins).
    fn fail(&mut self, err: EditError) -> EditError {
        crate::log_err!("Session {}: {}", self.id, err);
        self.error = Some(err.clone());
        err
    }

    fn commit(&mut self, snapshot: Snapshot, description: impl Into<String>) {
        let description = description.into();
        crate::log_info!(
            "Commit '{}' {}x{} at step {}",
            description,
            snapshot.width(),
            snapshot.height(),
            self.history.len()
        );
        self.history.push(snapshot, description);
        self.error = None;
    }

    fn ensure_idle(&self, what: &str) -> Result<(), EditError> {
        if self.busy {
            crate::log_warn!("Refused '{}': another edit is in flight", what);
            return Err(EditError::Busy);
        }
        Ok(())
    }

    fn current(&mut self) -> Result<Snapshot, EditError> {
        match self.displayed().cloned() {
            Some(snap) => Ok(snap),
            None => Err(self.fail(EditError::NoImage)),
        }
    }

    fn clear_overlays(&mut self) {
        self.text = None;
        self.text_drag = None;
        self.text_resize = None;
        self.components.clear();
    }

    // ------------------------------------------------------------------
    // Opening and export
    // ------------------------------------------------------------------

    /// Start a fresh timeline from decoded pixels.
    pub fn open_image(&mut self, pixels: RgbaImage) -> Result<(), EditError> {
        self.ensure_idle("open")?;
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(self.fail(EditError::Decode("image has no pixels".to_string())));
        }
        self.reset();
        self.commit(Snapshot::new(pixels), "Open");
        Ok(())
    }

    /// Decode and open encoded image bytes. On failure the session is untouched.
    pub fn open_bytes(&mut self, bytes: &[u8]) -> Result<(), EditError> {
        self.ensure_idle("open")?;
        let pixels = io::decode_bytes(bytes).map_err(|e| self.fail(e))?;
        self.open_image(pixels)
    }

    pub fn open_file(&mut self, path: &Path) -> Result<(), EditError> {
        self.ensure_idle("open")?;
        let pixels = io::decode_file(path).map_err(|e| self.fail(e))?;
        crate::log_info!("Opened {}", path.display());
        self.open_image(pixels)
    }

    /// Encode the displayed snapshot ("download").
    pub fn export_bytes(&mut self, format: SaveFormat) -> Result<Vec<u8>, EditError> {
        let snap = self.current()?;
        let quality = self.settings.export_quality;
        io::encode_to_bytes(&snap, format, quality).map_err(|e| self.fail(e))
    }

    /// Write the displayed snapshot to `path`. Format defaults to the
    /// extension, then PNG.
    pub fn export_file(&mut self, path: &Path, format: Option<SaveFormat>) -> Result<(), EditError> {
        let snap = self.current()?;
        let format = format
            .or_else(|| SaveFormat::from_path(path))
            .unwrap_or_default();
        let quality = self.settings.export_quality;
        io::encode_and_write(&snap, path, format, quality).map_err(|e| self.fail(e))?;
        crate::log_info!("Exported {} as {:?}", path.display(), format);
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) {
        if let Some(step) = self.history.undo() {
            crate::log_info!("Undo '{}'", step);
            self.clear_overlays();
        }
    }

    pub fn redo(&mut self) {
        if let Some(step) = self.history.redo() {
            crate::log_info!("Redo '{}'", step);
            self.clear_overlays();
        }
    }

    /// Drop everything: timeline, overlays, flags, AI results. Tool goes back
    /// to the default.
    pub fn reset(&mut self) {
        self.history.clear();
        self.clear_overlays();
        self.busy = false;
        self.generation += 1;
        self.error = None;
        self.suggestions.clear();
        self.lifestyle = None;
        self.tool = EditorTool::default();
    }

    pub fn select_tool(&mut self, tool: EditorTool) {
        if self.tool == tool {
            return;
        }
        crate::log_info!("Tool {} -> {}", self.tool.label(), tool.label());
        self.tool = tool;
        self.clear_overlays();
    }

    // ------------------------------------------------------------------
    // Text overlay
    // ------------------------------------------------------------------

    /// Create text at a clicked display point.
    ///
    /// Ignored unless the text tool is active and no text exists yet, and
    /// when the click misses the rendered image.
    pub fn place_text(&mut self, display_x: f32, display_y: f32, display: DisplayBox) -> bool {
        if self.tool != EditorTool::Text || self.text.is_some() {
            return false;
        }
        let Some(geometry) = self.geometry(display) else {
            return false;
        };
        let style = self.settings.text_style();
        match ActiveText::place(display_x, display_y, &geometry, DEFAULT_TEXT, style) {
            Some(text) => {
                self.text = Some(text);
                true
            }
            None => {
                crate::log_info!("Text click ({}, {}) outside image", display_x, display_y);
                false
            }
        }
    }

    /// Create text directly at a natural-image point (scripts and batch use).
    pub fn place_text_natural(&mut self, x: f32, y: f32, text: &str) -> bool {
        if self.tool != EditorTool::Text || self.text.is_some() {
            return false;
        }
        let Some(snap) = self.displayed() else {
            return false;
        };
        if !(0.0..=snap.width() as f32).contains(&x) || !(0.0..=snap.height() as f32).contains(&y) {
            return false;
        }
        let mut active = ActiveText::centered(snap.width(), snap.height(), text, self.settings.text_style());
        active.x = x;
        active.y = y;
        self.text = Some(active);
        true
    }

    /// Use one of the fetched suggestions: replaces the text of the existing
    /// object, or creates one centered on the image.
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        let Some(suggestion) = self.suggestions.get(index).cloned() else {
            return false;
        };
        if let Some(text) = self.text.as_mut() {
            text.text = suggestion;
            return true;
        }
        let Some(snap) = self.displayed() else {
            return false;
        };
        self.text = Some(ActiveText::centered(
            snap.width(),
            snap.height(),
            suggestion,
            self.settings.text_style(),
        ));
        true
    }

    pub fn update_text(&mut self, patch: TextPatch) -> bool {
        match self.text.as_mut() {
            Some(text) => {
                text.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn begin_text_drag(&mut self, display: DisplayBox) -> bool {
        let Some(geometry) = self.geometry(display) else {
            return false;
        };
        match self.text.as_ref() {
            Some(text) => {
                self.text_drag = Some(text.begin_drag(&geometry));
                true
            }
            None => false,
        }
    }

    /// `(dx, dy)` is the total pointer movement since the drag started.
    pub fn drag_text(&mut self, dx: f32, dy: f32, display: DisplayBox) -> bool {
        let Some(geometry) = self.geometry(display) else {
            return false;
        };
        match (self.text.as_mut(), self.text_drag.as_ref()) {
            (Some(text), Some(start)) => {
                text.drag(start, dx, dy, &geometry);
                true
            }
            _ => false,
        }
    }

    pub fn end_text_drag(&mut self) {
        self.text_drag = None;
    }

    pub fn begin_text_resize(&mut self) -> bool {
        match self.text.as_ref() {
            Some(text) => {
                self.text_resize = Some(text.begin_resize());
                true
            }
            None => false,
        }
    }

    /// `(dx, dy)` is the total pointer movement since the resize started.
    pub fn resize_text(&mut self, dx: f32, dy: f32) -> bool {
        match (self.text.as_mut(), self.text_resize.as_ref()) {
            (Some(text), Some(start)) => {
                text.resize(start, dx, dy);
                true
            }
            _ => false,
        }
    }

    pub fn end_text_resize(&mut self) {
        self.text_resize = None;
    }

    /// Rasterize the active text into a new snapshot and drop the overlay.
    pub fn bake_text(&mut self, display: DisplayBox, fonts: &mut FontBook) -> Result<(), EditError> {
        self.ensure_idle("bake text")?;
        let Some(text) = self.text.clone() else {
            return Ok(());
        };
        let Some(geometry) = self.geometry(display) else {
            crate::log_warn!("Bake text skipped: geometry unavailable");
            return Ok(());
        };
        let snap = self.current()?;
        let font = fonts
            .resolve(
                &text.style.font_family,
                text.style.font_weight.css_weight(),
                text.style.font_style == FontStyle::Italic,
            )
            .map_err(|e| self.fail(e))?;
        let baked = text_ops::bake_text(&snap, &text, &geometry, &font).map_err(|e| self.fail(e))?;
        self.commit(baked, format!("Text: {}", text.text));
        self.text = None;
        self.text_drag = None;
        self.text_resize = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Component layers
    // ------------------------------------------------------------------

    /// Decode an uploaded file into a new, selected layer.
    pub fn upload_component(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<ComponentId, EditError> {
        let pixels = io::decode_bytes(&bytes).map_err(|e| self.fail(e))?;
        let id = self.components.add(
            pixels,
            ComponentSource {
                file_name: file_name.to_string(),
                bytes: Arc::from(bytes),
            },
        );
        crate::log_info!("Component {} uploaded from '{}'", id, file_name);
        Ok(id)
    }

    pub fn upload_component_file(&mut self, path: &Path) -> Result<ComponentId, EditError> {
        let bytes = std::fs::read(path).map_err(|e| self.fail(e.into()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("component")
            .to_string();
        self.upload_component(&name, bytes)
    }

    pub fn select_component(&mut self, id: ComponentId) -> bool {
        self.components.select(id)
    }

    pub fn update_component(&mut self, id: ComponentId, patch: TransformPatch) -> bool {
        self.components.update_transform(id, patch)
    }

    /// Move a layer by an incremental display-pixel delta.
    pub fn drag_component(&mut self, id: ComponentId, dx: f32, dy: f32, display: DisplayBox) -> bool {
        let Some(geometry) = self.geometry(display) else {
            return false;
        };
        self.components.drag(id, dx, dy, &geometry)
    }

    pub fn delete_component(&mut self, id: ComponentId) -> bool {
        self.components.remove(id).is_some()
    }

    /// Composite a layer into a new snapshot, then remove the layer.
    pub fn merge_component(&mut self, id: ComponentId) -> Result<(), EditError> {
        self.ensure_idle("merge component")?;
        let Some(layer) = self.components.get(id).cloned() else {
            return Ok(());
        };
        let snap = self.current()?;
        let merged = compositor::merge_component(&snap, &layer).map_err(|e| self.fail(e))?;
        self.commit(merged, format!("Merge: {}", layer.name()));
        self.components.remove(id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Aspect ratio
    // ------------------------------------------------------------------

    /// Expand the canvas to `target`. Overlays are kept.
    pub fn apply_ratio(&mut self, target: AspectRatio) -> Result<(), EditError> {
        self.ensure_idle("apply ratio")?;
        let snap = self.current()?;
        let fill = self.settings.ratio_fill();
        let expanded = canvas_ops::apply_ratio(&snap, target, fill).map_err(|e| self.fail(e))?;
        self.commit(expanded, format!("Ratio {:.3}", target.value()));
        Ok(())
    }

    /// `apply_ratio` from raw parts; non-positive or non-finite ratios are ignored.
    pub fn apply_ratio_parts(&mut self, width: f64, height: f64) -> Result<(), EditError> {
        match AspectRatio::from_parts(width, height) {
            Some(target) => self.apply_ratio(target),
            None => {
                crate::log_info!("Ignored ratio {}:{}", width, height);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Remote edits
    // ------------------------------------------------------------------

    /// Mark the session busy and capture the displayed snapshot for a remote
    /// edit. Pair with [`complete_edit`](Self::complete_edit).
    pub fn start_edit(&mut self, request: EditRequest) -> Result<PendingEdit, EditError> {
        let source = self.start_query()?;
        Ok(PendingEdit {
            source,
            request,
            generation: self.generation,
        })
    }

    /// Land the result of a remote edit. Success is pushed onto whatever the
    /// cursor is now; failure only fills the error slot.
    pub fn complete_edit(
        &mut self,
        pending: &PendingEdit,
        result: Result<Snapshot, ServiceError>,
    ) -> Result<(), EditError> {
        if pending.generation != self.generation {
            crate::log_warn!("Discarded '{}': superseded by a reset or abandon", pending.description());
            return Ok(());
        }
        self.busy = false;
        match result {
            Ok(snapshot) => {
                self.commit(snapshot, pending.description());
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Give up on the edit in flight, e.g. after its future was dropped.
    /// Clears the busy flag; a late `complete_edit` for it is discarded.
    pub fn abandon_edit(&mut self) {
        if self.busy {
            crate::log_warn!("Abandoned in-flight edit");
        }
        self.busy = false;
        self.generation += 1;
    }

    /// Busy check plus snapshot capture for requests that do not commit.
    fn start_query(&mut self) -> Result<Snapshot, EditError> {
        self.ensure_idle("remote request")?;
        let source = self.current()?;
        self.busy = true;
        Ok(source)
    }

    pub async fn adjust_image<S: ImageService>(&mut self, service: &S, prompt: &str) -> Result<(), EditError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            crate::log_info!("Ignored empty adjustment prompt");
            return Ok(());
        }
        let pending = self.start_edit(EditRequest::Adjust {
            prompt: prompt.to_string(),
        })?;
        let result = pending.run(service).await;
        self.complete_edit(&pending, result)
    }

    pub async fn request_lifestyle_ideas<S: ImageService>(&mut self, service: &S, hint: &str) -> Result<(), EditError> {
        let source = self.start_query()?;
        let result = service
            .request_lifestyle_ideas(&source, hint.trim())
            .await
            .and_then(validate_ideas);
        self.busy = false;
        match result {
            Ok(ideas) => {
                crate::log_info!("Received {} lifestyle ideas", ideas.ideas.len());
                self.lifestyle = Some(ideas);
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Generate a lifestyle scene from one of the fetched ideas.
    pub async fn generate_lifestyle<S: ImageService>(&mut self, service: &S, idea_index: usize) -> Result<(), EditError> {
        let Some((description, idea)) = self
            .lifestyle
            .as_ref()
            .and_then(|l| l.ideas.get(idea_index).map(|i| (l.description.clone(), i.clone())))
        else {
            crate::log_info!("Ignored lifestyle idea {}: none fetched", idea_index);
            return Ok(());
        };
        let pending = self.start_edit(EditRequest::Lifestyle { description, idea })?;
        let result = pending.run(service).await;
        self.complete_edit(&pending, result)
    }

    pub async fn request_text_suggestions<S: ImageService>(&mut self, service: &S) -> Result<(), EditError> {
        let source = self.start_query()?;
        let result = service
            .request_text_suggestions(&source)
            .await
            .and_then(validate_suggestions);
        self.busy = false;
        match result {
            Ok(suggestions) => {
                self.suggestions = suggestions;
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BOX: DisplayBox = DisplayBox {
        width: 500.0,
        height: 500.0,
    };

    fn opened(w: u32, h: u32) -> EditorSession {
        let mut s = EditorSession::default();
        s.open_image(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))).unwrap();
        s
    }

    fn png_bytes() -> Vec<u8> {
        let snap = Snapshot::new(RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255])));
        io::encode_to_bytes(&snap, SaveFormat::Png, 90).unwrap()
    }

    #[test]
    fn undo_redo_on_fresh_session_are_noops() {
        let mut s = EditorSession::default();
        s.undo();
        s.redo();
        let v = s.view();
        assert_eq!(v.history_len, 0);
        assert_eq!(v.history_position, None);
        assert!(v.error.is_none());
    }

    #[test]
    fn place_text_requires_text_tool_and_inside_click() {
        let mut s = opened(1000, 500);
        // Rendered 500x250 at offset_y 125.
        assert!(!s.place_text(250.0, 250.0, BOX));
        s.select_tool(EditorTool::Text);
        assert!(!s.place_text(250.0, 50.0, BOX));
        assert!(s.place_text(250.0, 250.0, BOX));
        let t = s.active_text().unwrap();
        assert_eq!((t.x, t.y), (500.0, 250.0));
        assert_eq!(t.text, DEFAULT_TEXT);
        // A second click does not move or replace it.
        assert!(!s.place_text(100.0, 200.0, BOX));
        assert_eq!(s.text_display_position(BOX), Some((250.0, 250.0)));
    }

    #[test]
    fn tool_change_clears_overlays_only_on_change() {
        let mut s = opened(100, 100);
        s.select_tool(EditorTool::Text);
        s.place_text(250.0, 250.0, BOX);
        s.select_tool(EditorTool::Text);
        assert!(s.active_text().is_some());
        s.select_tool(EditorTool::Components);
        assert!(s.active_text().is_none());
    }

    #[test]
    fn undo_clears_overlays() {
        let mut s = opened(100, 100);
        s.apply_ratio_parts(2.0, 1.0).unwrap();
        s.upload_component("red.png", png_bytes()).unwrap();
        assert_eq!(s.components().len(), 1);
        s.undo();
        assert!(s.components().is_empty());
        assert_eq!(s.view().width, 100);
    }

    #[test]
    fn ratio_keeps_overlays() {
        let mut s = opened(100, 100);
        let id = s.upload_component("red.png", png_bytes()).unwrap();
        s.apply_ratio_parts(16.0, 9.0).unwrap();
        assert_eq!(s.view().width, 178);
        assert_eq!(s.components().active_id(), Some(id));
    }

    #[test]
    fn invalid_ratio_is_ignored() {
        let mut s = opened(100, 100);
        s.apply_ratio_parts(0.0, 9.0).unwrap();
        s.apply_ratio_parts(f64::NAN, 1.0).unwrap();
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn merge_commits_and_removes_layer() {
        let mut s = opened(100, 100);
        let id = s.upload_component("red.png", png_bytes()).unwrap();
        s.merge_component(id).unwrap();
        assert_eq!(s.history().len(), 2);
        assert!(s.components().get(id).is_none());
        assert_eq!(*s.displayed().unwrap().pixels().get_pixel(50, 50), Rgba([255, 0, 0, 255]));
        // Unknown id: silent.
        s.merge_component(id).unwrap();
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn bad_upload_fills_error_slot() {
        let mut s = opened(10, 10);
        let err = s.upload_component("broken.png", b"nope".to_vec()).unwrap_err();
        assert!(matches!(err, EditError::Decode(_)));
        assert!(s.view().error.is_some());
        assert!(s.components().is_empty());
        // The next commit clears it.
        s.apply_ratio_parts(1.0, 2.0).unwrap();
        assert!(s.view().error.is_none());
    }

    #[test]
    fn commands_without_image_report_no_image() {
        let mut s = EditorSession::default();
        assert!(matches!(s.apply_ratio_parts(1.0, 1.0), Err(EditError::NoImage)));
        assert!(matches!(s.export_bytes(SaveFormat::Png), Err(EditError::NoImage)));
    }

    #[test]
    fn busy_refuses_commits_without_touching_error() {
        let mut s = opened(10, 10);
        let pending = s.start_edit(EditRequest::Adjust { prompt: "warmer".to_string() }).unwrap();
        assert!(s.is_busy());
        assert!(matches!(s.apply_ratio_parts(2.0, 1.0), Err(EditError::Busy)));
        assert!(s.error().is_none());
        s.complete_edit(&pending, Ok(pending.source.clone())).unwrap();
        assert!(!s.is_busy());
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = opened(10, 10);
        s.select_tool(EditorTool::Lifestyle);
        s.reset();
        let v = s.view();
        assert_eq!(v.tool, EditorTool::Adjust);
        assert_eq!(v.history_len, 0);
        assert!(!v.busy);
    }
}
