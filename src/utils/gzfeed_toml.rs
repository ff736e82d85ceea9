//! Load `.gzfeed.toml` from a directory (CLI only). Lib callers pass options via GzfeedOpts.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct GzfeedToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    input: Option<String>,
    output: Option<String>,
    workers: Option<usize>,
    queue_cap: Option<usize>,
    nonblocking: Option<bool>,
    log: Option<String>,
    ext: Option<String>,
    list_failures: Option<bool>,
    progress: Option<bool>,
    verbose: Option<bool>,
    fail_on_error: Option<bool>,
}

/// Parse settings text. Errors are logged and treated as "no file".
pub fn parse_gzfeed_toml(s: &str, origin: &Path) -> Option<GzfeedToml> {
    toml::from_str(s)
        .map_err(|e| log::warn!("{}: {}", origin.display(), e))
        .ok()
}

/// Load `.gzfeed.toml` from `dir` if present. Returns None if file missing or unreadable.
pub fn load_gzfeed_toml(dir: &Path) -> Option<GzfeedToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_gzfeed_toml(&s, &path)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($idx:expr, $opts:expr, $idx_field:ident => $opts_field:ident) => {
        if let Some(v) = $idx.$idx_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &GzfeedToml, opts: &mut Opts) {
    let s = &file.settings;
    if let Some(ref p) = s.input {
        opts.input_root = PathBuf::from(p);
    }
    if let Some(ref p) = s.output {
        opts.output_dir = Some(PathBuf::from(p));
    }
    if let Some(ref p) = s.log {
        opts.log_path = Some(PathBuf::from(p));
    }
    if let Some(ref e) = s.ext {
        opts.extension = e.clone();
    }
    if s.workers.is_some() {
        opts.workers = s.workers;
    }
    if s.queue_cap.is_some() {
        opts.queue_cap = s.queue_cap;
    }
    apply_file_opt!(s, opts, nonblocking => nonblocking);
    apply_file_opt!(s, opts, list_failures => record_failures);
    apply_file_opt!(s, opts, progress => progress);
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, fail_on_error => fail_on_error);
}
