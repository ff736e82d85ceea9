use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::{Builder, Target};
use log::Level;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes every log line to stdout and appends it to a file.
struct TeeWriter {
    stdout: io::Stdout,
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        self.file.flush()
    }
}

/// Open `path` for appending, creating it and its parent directory if needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Install the global logger. With `log_path`, lines are timestamped, uncolored, and appended to
/// the file as well as printed to stdout.
pub fn setup_logging(verbose: bool, log_path: Option<&Path>) -> Result<()> {
    use log::LevelFilter;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::from_default_env();
    builder
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level); // Our crate: use requested level

    match log_path {
        Some(path) => {
            let file = open_log_file(path)?;
            colored::control::set_override(false);
            builder
                .target(Target::Pipe(Box::new(TeeWriter {
                    stdout: io::stdout(),
                    file,
                })))
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "{} [{} {}] {}",
                        buf.timestamp_seconds(),
                        record.level(),
                        record.target(),
                        record.args()
                    )
                });
        }
        None => {
            builder.target(Target::Stdout).format(|buf, record| {
                let name = env!("CARGO_PKG_NAME");
                let line = match record.level() {
                    Level::Error | Level::Warn => {
                        let level_str = match record.level() {
                            Level::Warn => "WARN".yellow(),
                            Level::Error => "ERROR".red(),
                            _ => unreachable!(),
                        };
                        let path = record.target().to_string().white();
                        format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                    }
                    _ => format!("[{}] {}", name.cyan(), record.args()),
                };
                writeln!(buf, "{}", line)
            });
        }
    }

    builder.try_init().context("install logger")
}
