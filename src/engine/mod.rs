//! Engine module: CLI surface and helpers around the pipeline

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{handle_run, resolve_opts};
pub use tools::{ensure_dir, has_extension, is_candidate_file, is_os_hidden_file};
