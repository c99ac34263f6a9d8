// ============================================================================
// IO - decoding inputs and encoding the displayed snapshot for export
// ============================================================================

use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use crate::error::EditError;
use crate::snapshot::Snapshot;

/// Export formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    Bmp,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
        }
    }

    pub fn all() -> &'static [SaveFormat] {
        &[SaveFormat::Png, SaveFormat::Jpeg, SaveFormat::Webp, SaveFormat::Bmp]
    }

    /// Parse a format name or file extension (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }
}

/// Decode encoded image bytes to RGBA. Zero-sized results are rejected.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage, EditError> {
    if bytes.is_empty() {
        return Err(EditError::Decode("file is empty".to_string()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| EditError::Decode(e.to_string()))?
        .to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(EditError::Decode("image has no pixels".to_string()));
    }
    Ok(img)
}

/// Read and decode an image file.
pub fn decode_file(path: &Path) -> Result<RgbaImage, EditError> {
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes)
}

/// Encode a snapshot to bytes in the given format.
pub fn encode_to_bytes(snapshot: &Snapshot, format: SaveFormat, quality: u8) -> Result<Vec<u8>, EditError> {
    let mut cursor = Cursor::new(Vec::new());
    encode_into(snapshot.pixels(), &mut cursor, format, quality)?;
    Ok(cursor.into_inner())
}

/// Encode a snapshot and write it to `path`.
pub fn encode_and_write(snapshot: &Snapshot, path: &Path, format: SaveFormat, quality: u8) -> Result<(), EditError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let bytes = encode_to_bytes(snapshot, format, quality)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

fn encode_into(
    image: &RgbaImage,
    cursor: &mut Cursor<Vec<u8>>,
    format: SaveFormat,
    quality: u8,
) -> Result<(), EditError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EditError::EmptyRaster);
    }
    match format {
        SaveFormat::Png => {
            DynamicImage::ImageRgba8(image.clone()).write_to(cursor, ImageOutputFormat::Png)?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            DynamicImage::ImageRgb8(rgb).write_to(cursor, ImageOutputFormat::Jpeg(quality.clamp(1, 100)))?;
        }
        SaveFormat::Webp => {
            DynamicImage::ImageRgba8(image.clone()).write_to(cursor, ImageOutputFormat::WebP)?;
        }
        SaveFormat::Bmp => {
            DynamicImage::ImageRgba8(image.clone()).write_to(cursor, ImageOutputFormat::Bmp)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn snap() -> Snapshot {
        Snapshot::new(RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8 * 40, y as u8 * 60, 10, 255])))
    }

    #[test]
    fn png_export_decodes_back_identically() {
        let s = snap();
        let bytes = encode_to_bytes(&s, SaveFormat::Png, 90).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let back = decode_bytes(&bytes).unwrap();
        assert_eq!(back, *s.pixels());
    }

    #[test]
    fn jpeg_export_keeps_dimensions() {
        let bytes = encode_to_bytes(&snap(), SaveFormat::Jpeg, 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let back = decode_bytes(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (6, 4));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode_bytes(b"not an image"), Err(EditError::Decode(_))));
        assert!(matches!(decode_bytes(&[]), Err(EditError::Decode(_))));
    }

    #[test]
    fn format_parsing() {
        assert_eq!(SaveFormat::parse("JPEG"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::parse(".webp"), Some(SaveFormat::Webp));
        assert_eq!(SaveFormat::parse("tiff"), None);
        assert_eq!(SaveFormat::from_path(Path::new("out/a.BMP")), Some(SaveFormat::Bmp));
        assert_eq!(SaveFormat::from_path(Path::new("out/a")), None);
        for f in SaveFormat::all() {
            assert_eq!(SaveFormat::parse(f.extension()), Some(*f));
        }
    }
}
