pub mod config;
pub mod gzfeed_toml;
pub mod logger;
pub mod open_files;

pub use config::*;
pub use logger::setup_logging;
pub use open_files::{HANDLES_PER_WORKER, open_file_limit, worker_cap_from_open_files};
