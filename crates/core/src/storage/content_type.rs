//! Extension to MIME type resolution.

use std::path::Path;

/// Fallback content type for unrecognized extensions.
pub const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// Resolves the declared content type for a stored asset from its file
/// extension. Unrecognized or missing extensions map to
/// [`GENERIC_CONTENT_TYPE`]; this never fails.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg" | "svgz") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("zip") => "application/zip",
        _ => GENERIC_CONTENT_TYPE,
    }
}
