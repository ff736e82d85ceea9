//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::utils::open_files::worker_cap_from_open_files;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    log_dir_name: &'static str,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                log_dir_name: "log",
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional settings file looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn log_dir_name(&self) -> &str {
        self.log_dir_name
    }

    /// Default log file: `log/<pkg>_<unix-seconds>.log` under `base`.
    pub fn default_log_path(&self, base: &Path) -> PathBuf {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        base.join(self.log_dir_name)
            .join(format!("{}_{secs}.log", self.pkg_name))
    }
}

// ---- CLI defaults ----

pub struct DefaultPaths;

impl DefaultPaths {
    pub const INPUT_DIR: &'static str = "input_gz_files";
    pub const OUTPUT_DIR: &'static str = "output";
    pub const EXTENSION: &'static str = "gz";
}

// ---- Worker threads ----

/// Worker-count tuning. Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Workers per available thread. File decoding blocks on I/O, so oversubscribe.
    pub per_thread: usize,
    /// Minimum worker count.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            per_thread: Self::WORKERS_PER_THREAD,
            floor: Self::FLOOR_WORKERS,
        }
    }
}

impl WorkerThreadLimits {
    pub const WORKERS_PER_THREAD: usize = 2;
    pub const FLOOR_WORKERS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// `per_thread × all_threads`, capped by the open-file limit, never below `floor`.
    pub fn default_workers(&self) -> usize {
        let wanted = self.all_threads.saturating_mul(self.per_thread);
        let capped = match worker_cap_from_open_files() {
            Some(cap) => wanted.min(cap),
            None => wanted,
        };
        capped.max(self.floor)
    }
}

/// Resolve the worker count: explicit override wins, otherwise derived from the host.
pub fn resolve_workers(requested: Option<usize>) -> usize {
    match requested {
        Some(n) => n.max(WorkerThreadLimits::FLOOR_WORKERS),
        None => WorkerThreadLimits::current().default_workers(),
    }
}

// ---- Decoding ----

/// Reader buffer sizes and format constants.
pub struct DecoderConsts;

impl DecoderConsts {
    /// First two bytes of every gzip member.
    pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
    /// Buffer over the raw compressed file (bytes). 64 KB.
    pub const FILE_BUFFER_SIZE: usize = 64 * 1024;
    /// Buffer over the inflated stream feeding the JSON parser (bytes). 256 KB.
    pub const INFLATE_BUFFER_SIZE: usize = 256 * 1024;
}

// ---- Progress ----

pub struct ProgressConsts;

impl ProgressConsts {
    pub const DESC: &'static str = "files";
}
