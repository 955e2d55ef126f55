//! Name and path clean-up for uploads and for tracing fields.

use std::path::Path;

/// Name given to an upload whose name has no usable base name.
pub const UNNAMED_UPLOAD: &str = "unnamed";

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without the actor's
/// workspace layout.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Reduces a client-supplied name to its base name.
///
/// Both `/` and `\` count as separators, whatever the host platform.
/// Names that reduce to nothing usable become [`UNNAMED_UPLOAD`].
pub fn upload_file_name(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");
    let base = base.trim();

    if base.is_empty() || base == "." || base == ".." {
        UNNAMED_UPLOAD.to_string()
    } else {
        base.to_string()
    }
}
