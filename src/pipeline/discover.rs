//! Archive discovery: recursive walk under the input root, filtered by extension.

use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::is_candidate_file;
use crate::error::DiscoveryError;

/// Regular files under `root` whose extension is exactly `extension`, in lexical walk order.
///
/// Any walk error (missing root, unreadable directory) fails the whole discovery; no partial
/// list is returned.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| DiscoveryError {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_candidate_file(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    debug!(
        "discovered {} .{} files under {}",
        files.len(),
        extension,
        root.display()
    );
    Ok(files)
}
