//! Static extension table used when no custom rule matches.

use std::path::Path;

/// Category assigned to files whose extension is not in the table.
pub const OTHERS: &str = "others";

const CATEGORY_EXTENSIONS: &[(&str, &[&str])] = &[
    (
        "images",
        &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico"],
    ),
    (
        "documents",
        &[".pdf", ".doc", ".docx", ".txt", ".odt", ".rtf", ".xlsx", ".csv"],
    ),
    (
        "videos",
        &[".mp4", ".mov", ".avi", ".mkv", ".webm", ".flv", ".wmv"],
    ),
    ("audio", &[".mp3", ".wav", ".m4a", ".flac", ".aac", ".wma"]),
    ("archives", &[".zip", ".tar", ".gz", ".rar", ".7z", ".bz2"]),
    (
        "code",
        &[".py", ".js", ".html", ".css", ".java", ".cpp", ".c", ".go", ".rs"],
    ),
    ("media", &[".psd", ".ai", ".sketch", ".fig"]),
];

/// Classifies a filename by its final extension, case-insensitively.
pub fn default_category(filename: &str) -> &'static str {
    let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
        return OTHERS;
    };
    let ext = format!(".{}", ext.to_lowercase());

    CATEGORY_EXTENSIONS
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(OTHERS)
}
