// ============================================================================
// SETTINGS - editor defaults persisted as a key=value file
// ============================================================================

use image::Rgba;
use std::path::{Path, PathBuf};

use crate::components::text::{FontStyle, FontWeight, TextStyle};

/// Editor defaults that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Family used for newly placed text.
    pub default_font_family: String,
    /// Display-pixel size for newly placed text.
    pub default_font_size: f32,
    pub default_bold: bool,
    pub default_italic: bool,
    pub default_text_color: [u8; 4],
    /// Background for the area added by aspect-ratio expansion.
    pub ratio_fill_color: [u8; 4],
    /// Families tried in order when a requested font is missing.
    pub fallback_fonts: Vec<String>,
    /// JPEG/WEBP export quality, 1–100.
    pub export_quality: u8,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_font_family: "Roboto".to_string(),
            default_font_size: 50.0,
            default_bold: true,
            default_italic: false,
            default_text_color: [255, 255, 255, 255],
            ratio_fill_color: [255, 255, 255, 255],
            fallback_fonts: vec![
                "Arial".to_string(),
                "DejaVu Sans".to_string(),
                "sans-serif".to_string(),
            ],
            export_quality: 90,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/studiofe/studiofe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\StudioFE\studiofe_settings.cfg
    /// On macOS:   ~/Library/Application Support/StudioFE/studiofe_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("studiofe");
            return Some(config_dir.join("studiofe_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("StudioFE").join("studiofe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("StudioFE")
                    .join("studiofe_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("studiofe_settings.cfg")))
        }
    }

    /// Text style new text objects start with.
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.default_font_family.clone(),
            font_size: self.default_font_size,
            font_weight: if self.default_bold {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            },
            font_style: if self.default_italic {
                FontStyle::Italic
            } else {
                FontStyle::Normal
            },
            color: self.default_text_color,
        }
    }

    pub fn ratio_fill(&self) -> Rgba<u8> {
        Rgba(self.ratio_fill_color)
    }

    /// Serialize a color as "r,g,b,a"
    fn color_to_str(c: [u8; 4]) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a color from "r,g,b,a"
    pub fn str_to_color(s: &str) -> Option<[u8; 4]> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 4 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            let a = parts[3].trim().parse::<u8>().ok()?;
            Some([r, g, b, a])
        } else {
            None
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "default_font_family={}\n\
             default_font_size={}\n\
             default_bold={}\n\
             default_italic={}\n\
             default_text_color={}\n\
             ratio_fill_color={}\n\
             fallback_fonts={}\n\
             export_quality={}\n",
            self.default_font_family,
            self.default_font_size,
            self.default_bold,
            self.default_italic,
            Self::color_to_str(self.default_text_color),
            Self::color_to_str(self.ratio_fill_color),
            self.fallback_fonts.join(","),
            self.export_quality,
        )
    }

    /// Parse settings text. Unknown keys are ignored; bad values keep defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "default_font_family" => {
                    if !val.is_empty() {
                        s.default_font_family = val.to_string();
                    }
                }
                "default_font_size" => {
                    if let Ok(size) = val.parse::<f32>()
                        && size.is_finite()
                        && size > 0.0
                    {
                        s.default_font_size = size;
                    }
                }
                "default_bold" => {
                    s.default_bold = val == "true";
                }
                "default_italic" => {
                    s.default_italic = val == "true";
                }
                "default_text_color" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.default_text_color = c;
                    }
                }
                "ratio_fill_color" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.ratio_fill_color = c;
                    }
                }
                "fallback_fonts" => {
                    s.fallback_fonts = val
                        .split(',')
                        .map(|f| f.trim().to_string())
                        .filter(|f| !f.is_empty())
                        .collect();
                }
                "export_quality" => {
                    s.export_quality = val.parse::<u8>().unwrap_or(90).clamp(1, 100);
                }
                _ => {}
            }
        }
        s
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_text_style() {
        let s = EditorSettings::default();
        assert_eq!(s.text_style(), TextStyle::default());
        assert_eq!(s.ratio_fill(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn config_text_round_trips() {
        let s = EditorSettings {
            default_font_family: "Inter".to_string(),
            default_font_size: 32.0,
            default_bold: false,
            default_italic: true,
            default_text_color: [10, 20, 30, 255],
            ratio_fill_color: [0, 0, 0, 255],
            fallback_fonts: vec!["Arial".to_string(), "serif".to_string()],
            export_quality: 75,
        };
        assert_eq!(EditorSettings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn corrupt_values_keep_defaults() {
        let s = EditorSettings::parse(
            "default_font_size=huge\n\
             default_text_color=1,2,3\n\
             export_quality=250\n\
             nonsense line\n\
             unknown_key=1\n",
        );
        let d = EditorSettings::default();
        assert_eq!(s.default_font_size, d.default_font_size);
        assert_eq!(s.default_text_color, d.default_text_color);
        assert_eq!(s.export_quality, 90);
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = std::env::temp_dir()
            .join(format!("studiofe_settings_{}", std::process::id()))
            .join("studiofe_settings.cfg");
        let s = EditorSettings {
            default_font_family: "Lato".to_string(),
            export_quality: 60,
            ..Default::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(EditorSettings::load_from(&path), s);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("studiofe_settings_does_not_exist.cfg");
        assert_eq!(EditorSettings::load_from(&path), EditorSettings::default());
    }
}
