// ============================================================================
// ERRORS - everything a session command can report to the caller
// ============================================================================

use crate::ops::ai::ServiceError;

/// Errors surfaced by session commands.
///
/// Silent rejections (click outside the image, unknown component id, missing
/// geometry) are not errors and never appear here.
#[derive(Debug, Clone)]
pub enum EditError {
    /// An uploaded or opened file could not be decoded into pixels.
    Decode(String),
    /// A command needed a displayed snapshot but the session has none.
    NoImage,
    /// A commit was requested while another one is still in flight.
    Busy,
    /// No usable font for the requested family (fallbacks included).
    FontUnavailable(String),
    /// A raster taking part in a composite has zero width or height.
    EmptyRaster,
    /// An operation would produce a canvas larger than the editor supports.
    CanvasTooLarge { width: u64, height: u64 },
    /// A remote collaborator declined or returned an unusable result.
    Service(ServiceError),
    /// Encoding the current snapshot for export failed.
    Encode(String),
    /// Filesystem error while reading or writing images.
    Io(String),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::Decode(e) => write!(f, "Could not read image: {}", e),
            EditError::NoImage => write!(f, "No image is loaded"),
            EditError::Busy => write!(f, "Another edit is still in progress"),
            EditError::FontUnavailable(family) => {
                write!(f, "Font '{}' is not available on this system", family)
            }
            EditError::EmptyRaster => write!(f, "Image has no pixels"),
            EditError::CanvasTooLarge { width, height } => {
                write!(f, "Resulting image {}x{} is too large", width, height)
            }
            EditError::Service(e) => write!(f, "{}", e),
            EditError::Encode(e) => write!(f, "Could not encode image: {}", e),
            EditError::Io(e) => write!(f, "File error: {}", e),
        }
    }
}

impl std::error::Error for EditError {}

impl From<ServiceError> for EditError {
    fn from(e: ServiceError) -> Self {
        EditError::Service(e)
    }
}

impl From<std::io::Error> for EditError {
    fn from(e: std::io::Error) -> Self {
        EditError::Io(e.to_string())
    }
}

impl From<image::ImageError> for EditError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => EditError::Io(io.to_string()),
            image::ImageError::Encoding(enc) => EditError::Encode(enc.to_string()),
            other => EditError::Decode(other.to_string()),
        }
    }
}
