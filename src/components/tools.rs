// ============================================================================
// EDITOR TOOLS - panel selection and name parsing
// ============================================================================

use serde::Serialize;

/// Tool panels of the editor. Switching tools discards pending overlays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorTool {
    /// Prompt-driven AI adjustment of the whole image.
    #[default]
    Adjust,
    /// Canvas expansion to a target aspect ratio.
    Ratio,
    Text,
    /// Pasted image components.
    Components,
    /// AI lifestyle-scene generation.
    Lifestyle,
}

impl EditorTool {
    pub fn label(&self) -> &'static str {
        match self {
            EditorTool::Adjust => "Adjust",
            EditorTool::Ratio => "Ratio",
            EditorTool::Text => "Text",
            EditorTool::Components => "Components",
            EditorTool::Lifestyle => "Lifestyle",
        }
    }

    pub fn all() -> &'static [EditorTool] {
        &[
            EditorTool::Adjust,
            EditorTool::Ratio,
            EditorTool::Text,
            EditorTool::Components,
            EditorTool::Lifestyle,
        ]
    }

    /// Parse a tool name as used by scripts and the CLI.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "adjust" | "adjustment" => Some(EditorTool::Adjust),
            "ratio" | "aspect" => Some(EditorTool::Ratio),
            "text" => Some(EditorTool::Text),
            "components" | "component" => Some(EditorTool::Components),
            "lifestyle" => Some(EditorTool::Lifestyle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EditorTool;

    #[test]
    fn parse_accepts_labels() {
        for tool in EditorTool::all() {
            assert_eq!(EditorTool::parse(tool.label()), Some(*tool));
        }
        assert_eq!(EditorTool::parse(" Component "), Some(EditorTool::Components));
        assert_eq!(EditorTool::parse("brush"), None);
        assert_eq!(EditorTool::default(), EditorTool::Adjust);
    }
}
