// ============================================================================
// SCRIPTING - Rhai edit scripts driving one editor session
// ============================================================================
//
// Scripts work in natural image pixels. Text is baked with a display box the
// size of the image, so `set_text_size(40)` means 40 image pixels.

use rhai::{AST, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Position, Scope};
use std::sync::{Arc, Mutex};

use crate::components::layers::TransformPatch;
use crate::components::text::{FontStyle, FontWeight, TextPatch};
use crate::components::tools::EditorTool;
use crate::geometry::DisplayBox;
use crate::ops::text::FontBook;
use crate::session::EditorSession;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|l| *l > 0),
            column: pos.position().filter(|c| *c > 0),
        }
    }

    /// Error explanation with line/column context and a hint where one helps.
    pub fn friendly_message(&self) -> String {
        let raw = &self.message;
        let mut parts = Vec::new();

        match (self.line, self.column) {
            (Some(line), Some(col)) => parts.push(format!("Error on line {}, column {}:", line, col)),
            (Some(line), None) => parts.push(format!("Error on line {}:", line)),
            _ => parts.push("Script error:".to_string()),
        }

        let cleaned = raw.split(" (line ").next().unwrap_or(raw).trim();
        if raw.contains("Function not found:") {
            parts.push(format!("  {}", cleaned));
            parts.push(String::new());
            parts.push("  Tip: Check the argument types. Numbers like 0.5 are floats,".to_string());
            parts.push("  component ids and colors are integers.".to_string());
        } else if raw.contains("Variable not found:") {
            parts.push(format!("  {}", cleaned));
            parts.push(String::new());
            parts.push("  Tip: Declare variables with 'let' before using them.".to_string());
        } else if raw.contains("Syntax error") || raw.contains("Expected") {
            parts.push(format!("  Syntax error: {}", cleaned));
            parts.push(String::new());
            parts.push("  Tip: Check for missing semicolons, brackets, or typos near this line.".to_string());
        } else if raw.contains("Too many operations") {
            parts.push("  Script exceeded the maximum operation limit.".to_string());
            parts.push(String::new());
            parts.push("  Tip: Your script may contain an infinite loop.".to_string());
        } else {
            parts.push(format!("  {}", cleaned));
        }

        parts.join("\n")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Script context - shared mutable state between engine and host functions
// ============================================================================

struct ScriptContext {
    session: EditorSession,
    fonts: FontBook,
    console_output: Vec<String>,
}

impl ScriptContext {
    /// Display box matching the natural image, so script coordinates and
    /// sizes are image pixels.
    fn natural_box(&self) -> Option<DisplayBox> {
        let snap = self.session.displayed()?;
        Some(DisplayBox::new(snap.width() as f32, snap.height() as f32))
    }
}

type SharedContext = Arc<Mutex<ScriptContext>>;

type HostResult<T> = Result<T, Box<EvalAltResult>>;

fn host_err(msg: impl std::fmt::Display) -> Box<EvalAltResult> {
    msg.to_string().into()
}

// ============================================================================
// Engine construction with sandbox + API registration
// ============================================================================

fn create_engine(ctx: SharedContext) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(5_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(1_000);

    register_canvas_api(&mut engine, ctx.clone());
    register_text_api(&mut engine, ctx.clone());
    register_component_api(&mut engine, ctx.clone());
    register_history_api(&mut engine, ctx.clone());
    register_utility_api(&mut engine, ctx);

    engine
}

// ============================================================================
// Canvas API
// ============================================================================

fn register_canvas_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("width", move || -> i64 {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.displayed().map(|s| s.width() as i64).unwrap_or(0)
    });

    let c = ctx.clone();
    engine.register_fn("height", move || -> i64 {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.displayed().map(|s| s.height() as i64).unwrap_or(0)
    });

    let c = ctx.clone();
    engine.register_fn("apply_ratio", move |w: f64, h: f64| -> HostResult<()> {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.apply_ratio_parts(w, h).map_err(host_err)
    });

    let c = ctx.clone();
    engine.register_fn("apply_ratio", move |w: i64, h: i64| -> HostResult<()> {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.apply_ratio_parts(w as f64, h as f64).map_err(host_err)
    });

    let c = ctx;
    engine.register_fn("select_tool", move |name: ImmutableString| -> HostResult<()> {
        let tool = EditorTool::parse(&name).ok_or_else(|| {
            let known: Vec<&str> = EditorTool::all().iter().map(|t| t.label()).collect();
            host_err(format!("Unknown tool '{}' (expected one of: {})", name, known.join(", ")))
        })?;
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.select_tool(tool);
        Ok(())
    });
}

// ============================================================================
// Text API
// ============================================================================

fn update_text(ctx: &SharedContext, patch: TextPatch) -> bool {
    let mut lock = ctx.lock().unwrap_or_else(|e| e.into_inner());
    lock.session.update_text(patch)
}

fn register_text_api(engine: &mut Engine, ctx: SharedContext) {
    // place_text(x, y, text): natural-pixel anchor, text tool only
    let c = ctx.clone();
    engine.register_fn("place_text", move |x: f64, y: f64, text: ImmutableString| -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.place_text_natural(x as f32, y as f32, &text)
    });
    let c = ctx.clone();
    engine.register_fn("place_text", move |x: i64, y: i64, text: ImmutableString| -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.place_text_natural(x as f32, y as f32, &text)
    });

    let c = ctx.clone();
    engine.register_fn("set_text", move |text: ImmutableString| -> bool {
        update_text(&c, TextPatch { text: Some(text.to_string()), ..Default::default() })
    });

    let c = ctx.clone();
    engine.register_fn("set_text_font", move |family: ImmutableString| -> bool {
        update_text(&c, TextPatch { font_family: Some(family.to_string()), ..Default::default() })
    });

    let c = ctx.clone();
    engine.register_fn("set_text_size", move |size: f64| -> bool {
        update_text(&c, TextPatch { font_size: Some(size as f32), ..Default::default() })
    });
    let c = ctx.clone();
    engine.register_fn("set_text_size", move |size: i64| -> bool {
        update_text(&c, TextPatch { font_size: Some(size as f32), ..Default::default() })
    });

    let c = ctx.clone();
    engine.register_fn("set_text_bold", move |bold: bool| -> bool {
        let weight = if bold { FontWeight::Bold } else { FontWeight::Normal };
        update_text(&c, TextPatch { font_weight: Some(weight), ..Default::default() })
    });

    let c = ctx.clone();
    engine.register_fn("set_text_italic", move |italic: bool| -> bool {
        let style = if italic { FontStyle::Italic } else { FontStyle::Normal };
        update_text(&c, TextPatch { font_style: Some(style), ..Default::default() })
    });

    let c = ctx.clone();
    engine.register_fn("set_text_color", move |r: i64, g: i64, b: i64, a: i64| -> bool {
        let color = [r, g, b, a].map(|v| v.clamp(0, 255) as u8);
        update_text(&c, TextPatch { color: Some(color), ..Default::default() })
    });

    let c = ctx;
    engine.register_fn("bake_text", move || -> HostResult<()> {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        let Some(display) = lock.natural_box() else {
            return Err(host_err("No image is loaded"));
        };
        let ScriptContext { session, fonts, .. } = &mut *lock;
        session.bake_text(display, fonts).map_err(host_err)
    });
}

// ============================================================================
// Component API
// ============================================================================

fn map_number(map: &Map, key: &str) -> Option<f32> {
    let value = map.get(key)?;
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
        .map(|v| v as f32)
}

fn map_bool(map: &Map, key: &str) -> Option<bool> {
    map.get(key)?.as_bool().ok()
}

/// Transform patch from a script map such as `#{ x: 0.25, rotation: 90, flip_h: true }`.
fn patch_from_map(map: &Map) -> TransformPatch {
    TransformPatch {
        x: map_number(map, "x"),
        y: map_number(map, "y"),
        scale: map_number(map, "scale"),
        rotation: map_number(map, "rotation"),
        flip_h: map_bool(map, "flip_h"),
        flip_v: map_bool(map, "flip_v"),
    }
}

fn register_component_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("upload_component", move |path: ImmutableString| -> HostResult<i64> {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        let id = lock
            .session
            .upload_component_file(std::path::Path::new(path.as_str()))
            .map_err(host_err)?;
        Ok(id as i64)
    });

    let c = ctx.clone();
    engine.register_fn("update_component", move |id: i64, map: Map| -> bool {
        if id < 0 {
            return false;
        }
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.update_component(id as u64, patch_from_map(&map))
    });

    let c = ctx.clone();
    engine.register_fn("merge_component", move |id: i64| -> HostResult<()> {
        if id < 0 {
            return Ok(());
        }
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.merge_component(id as u64).map_err(host_err)
    });

    let c = ctx;
    engine.register_fn("delete_component", move |id: i64| -> bool {
        if id < 0 {
            return false;
        }
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.delete_component(id as u64)
    });
}

// ============================================================================
// History and state API
// ============================================================================

fn register_history_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("undo", move || {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.undo();
    });

    let c = ctx.clone();
    engine.register_fn("redo", move || {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.redo();
    });

    // state() -> map mirroring the session view
    let c = ctx;
    engine.register_fn("state", move || -> HostResult<Dynamic> {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        rhai::serde::to_dynamic(lock.session.view())
    });
}

// ============================================================================
// Utility API
// ============================================================================

fn register_utility_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx;
    engine.on_print(move |msg| {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        crate::log_info!("[script] {}", msg);
        lock.console_output.push(msg.to_string());
    });
}

// ============================================================================
// Public execution API
// ============================================================================

/// Compile a script and return the AST, or a ScriptError.
pub fn compile_script(source: &str) -> Result<AST, ScriptError> {
    let engine = Engine::new();
    engine
        .compile(source)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))
}

/// Run a script against `session` on the calling thread.
///
/// Returns the lines the script printed. Edits made before a runtime error
/// stay in the session's history.
pub fn execute_script_sync(
    source: &str,
    session: &mut EditorSession,
    fonts: &mut FontBook,
) -> Result<Vec<String>, ScriptError> {
    let ctx = Arc::new(Mutex::new(ScriptContext {
        session: std::mem::take(session),
        fonts: std::mem::replace(fonts, FontBook::empty()),
        console_output: Vec::new(),
    }));

    let result = {
        let engine = create_engine(ctx.clone());
        let mut scope = Scope::new();
        match engine.compile(source) {
            Ok(ast) => engine
                .run_ast_with_scope(&mut scope, &ast)
                .map_err(|e| ScriptError::at(e.to_string(), e.position())),
            Err(e) => Err(ScriptError::at(e.to_string(), e.position())),
        }
    };

    let mut lock = ctx.lock().unwrap_or_else(|e| e.into_inner());
    *session = std::mem::take(&mut lock.session);
    *fonts = std::mem::replace(&mut lock.fonts, FontBook::empty());
    let output = std::mem::take(&mut lock.console_output);

    if let Err(e) = &result {
        crate::log_err!("Script failed: {}", e);
    }
    result.map(|_| output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn session(w: u32, h: u32) -> EditorSession {
        let mut s = EditorSession::default();
        s.open_image(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]))).unwrap();
        s
    }

    #[test]
    fn ratio_script_commits() {
        let mut s = session(1000, 1000);
        let mut fonts = FontBook::empty();
        let out = execute_script_sync(
            "print(width()); apply_ratio(16, 9); print(width());",
            &mut s,
            &mut fonts,
        )
        .unwrap();
        assert_eq!(out, vec!["1000", "1778"]);
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn state_exposes_session_view() {
        let mut s = session(20, 10);
        let mut fonts = FontBook::empty();
        let out = execute_script_sync(
            r#"select_tool("text");
               place_text(10, 5, "Sale");
               set_text_size(12.0);
               let st = state();
               print(st.tool);
               print(st.history_len);
               print(st.active_text.text);"#,
            &mut s,
            &mut fonts,
        )
        .unwrap();
        assert_eq!(out, vec!["text", "1", "Sale"]);
        assert_eq!(s.active_text().unwrap().style.font_size, 12.0);
    }

    #[test]
    fn undo_inside_script() {
        let mut s = session(10, 10);
        let mut fonts = FontBook::empty();
        execute_script_sync("apply_ratio(2, 1); undo();", &mut s, &mut fonts).unwrap();
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history().position(), Some(0));
    }

    #[test]
    fn runtime_error_keeps_earlier_edits() {
        let mut s = session(10, 10);
        let mut fonts = FontBook::empty();
        let err = execute_script_sync("apply_ratio(2, 1);\nselect_tool(\"brush\");", &mut s, &mut fonts).unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(err.message.contains("Unknown tool"));
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn missing_font_is_a_script_error() {
        let mut s = session(10, 10);
        let mut fonts = FontBook::empty();
        let err = execute_script_sync(
            r#"select_tool("text"); place_text(5, 5, "Hi"); bake_text();"#,
            &mut s,
            &mut fonts,
        )
        .unwrap_err();
        assert!(err.message.contains("not available"));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn syntax_errors_have_location() {
        let err = compile_script("let x = ;").unwrap_err();
        assert_eq!(err.line, Some(1));
        assert!(err.friendly_message().starts_with("Error on line 1"));
    }

    #[test]
    fn component_patch_accepts_ints_and_floats() {
        let mut map = Map::new();
        map.insert("x".into(), Dynamic::from(0.25_f64));
        map.insert("rotation".into(), Dynamic::from(90_i64));
        map.insert("flip_v".into(), Dynamic::from(true));
        let patch = patch_from_map(&map);
        assert_eq!(patch.x, Some(0.25));
        assert_eq!(patch.rotation, Some(90.0));
        assert_eq!(patch.flip_v, Some(true));
        assert_eq!(patch.scale, None);
    }
}
