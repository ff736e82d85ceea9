//! Path and filter utilities

use std::path::Path;

/// Check if a file is OS metadata junk that happens to share an extension (e.g. `._a.gz`).
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" => true,
            // Linux
            ".directory" => true,
            _ => {
                // macOS resource fork files start with ._
                name.starts_with("._")
            }
        }
    } else {
        false
    }
}

/// True if the extension of `path` is exactly `extension` (no leading dot, case-sensitive).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let extension = extension.strip_prefix('.').unwrap_or(extension);
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Returns true if the walk should hand `path` to the pipeline.
pub fn is_candidate_file(path: &Path, extension: &str) -> bool {
    has_extension(path, extension) && !is_os_hidden_file(path)
}

/// Create `dir` (and parents) if missing. No-op when it already exists.
pub fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    use anyhow::Context;
    std::fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))
}
