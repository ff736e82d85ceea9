use clap::Parser;
use std::path::PathBuf;

/// Decode gzip-compressed JSON record dumps in parallel.
#[derive(Clone, Debug, Parser)]
#[command(name = "gzfeed")]
#[command(about = "Find .gz files under INPUT, decode their JSON records with a bounded worker pool, and log each record.")]
pub struct Cli {
    /// Directory tree to search. Default: `input_gz_files`.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output directory (created if missing). Default: `output`.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Worker count. Default: 2x available threads, capped by the open-file limit.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Pending-task queue capacity. Default: equal to the worker count.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub queue_cap: Option<usize>,

    /// Reject tasks when the queue is full instead of waiting (rejections count as failures).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub nonblocking: Option<bool>,

    /// Append log lines to this file. Default: `log/gzfeed_<unix-seconds>.log`.
    #[arg(long, short = 'l')]
    pub log: Option<PathBuf>,

    /// Do not write a log file; log to stdout only.
    #[arg(long)]
    pub no_log_file: bool,

    /// File extension to look for (without the dot). Default: `gz`.
    #[arg(long)]
    pub ext: Option<String>,

    /// Print each failed file and its error at the end of the run.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub list_failures: Option<bool>,

    /// Show a progress bar of completed files on stderr.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Exit with an error status when any file failed.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub fail_on_error: Option<bool>,
}
