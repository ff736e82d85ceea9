//! CLI command handler: resolve options, install logging, run the batch, report.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::engine::arg_parser::Cli;
use crate::engine::tools::ensure_dir;
use crate::pipeline::{LogSink, run};
use crate::utils::config::{DefaultPaths, PackagePaths};
use crate::utils::gzfeed_toml::{GzfeedToml, apply_file_to_opts, load_gzfeed_toml};
use crate::utils::setup_logging;
use crate::{BatchOutcome, Opts};

/// Overwrite opts field from the CLI when the flag was given.
macro_rules! apply_cli_flag {
    ($cli:expr, $opts:expr, $cli_field:ident => $opts_field:ident) => {
        if let Some(v) = $cli.$cli_field {
            $opts.$opts_field = v;
        }
    };
}

/// Layer options: built-in defaults, then `.gzfeed.toml` (if any), then CLI flags.
pub fn resolve_opts(cli: &Cli, file: Option<&GzfeedToml>) -> Opts {
    let mut opts = Opts {
        input_root: PathBuf::from(DefaultPaths::INPUT_DIR),
        output_dir: Some(PathBuf::from(DefaultPaths::OUTPUT_DIR)),
        extension: DefaultPaths::EXTENSION.to_string(),
        ..Default::default()
    };
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }

    if let Some(ref p) = cli.input {
        opts.input_root = p.clone();
    }
    if let Some(ref p) = cli.output {
        opts.output_dir = Some(p.clone());
    }
    if cli.workers.is_some() {
        opts.workers = cli.workers;
    }
    if cli.queue_cap.is_some() {
        opts.queue_cap = cli.queue_cap;
    }
    if let Some(ref e) = cli.ext {
        opts.extension = e.clone();
    }
    apply_cli_flag!(cli, opts, nonblocking => nonblocking);
    apply_cli_flag!(cli, opts, list_failures => record_failures);
    apply_cli_flag!(cli, opts, progress => progress);
    apply_cli_flag!(cli, opts, verbose => verbose);
    apply_cli_flag!(cli, opts, fail_on_error => fail_on_error);

    if cli.no_log_file {
        opts.log_path = None;
    } else if let Some(ref p) = cli.log {
        opts.log_path = Some(p.clone());
    } else if opts.log_path.is_none() {
        opts.log_path = Some(PackagePaths::get().default_log_path(std::path::Path::new(".")));
    }
    opts
}

/// Print the end-of-run summary. Per-file detail only when it was collected.
fn report_outcome(outcome: &BatchOutcome) {
    if outcome.cancelled {
        warn!(
            "Run cancelled after submitting {} files",
            outcome.total_submitted
        );
    }
    if outcome.is_success() {
        info!(
            "All {} files successfully decompressed and processed!",
            outcome.total_submitted
        );
    } else {
        error!(
            "Encountered {} errors during decompression ({} of {} files succeeded)",
            outcome.failed,
            outcome.succeeded(),
            outcome.total_submitted
        );
        for line in failure_lines(outcome) {
            error!("{}", line);
        }
    }
}

/// One `failed: <file>: <error>` line per collected failure, in path order.
fn failure_lines(outcome: &BatchOutcome) -> Vec<String> {
    outcome
        .failures
        .iter()
        .map(|(path, msg)| format!("  failed: {}: {}", path.display(), msg))
        .collect()
}

/// Run the batch described by `cli`. A discovery failure is an error; per-file failures only
/// become one with `--fail-on-error`.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let file = load_gzfeed_toml(std::path::Path::new("."));
    let mut opts = resolve_opts(cli, file.as_ref());
    setup_logging(opts.verbose, opts.log_path.as_deref())?;
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    if let Some(ref out) = opts.output_dir {
        ensure_dir(out)?;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    opts.cancel = Some(cancel);

    let start_time = Instant::now();
    let outcome = run(&opts, Arc::new(LogSink)).inspect_err(|e| {
        error!("Error during concurrent file decompression: {:#}", e);
    })?;
    report_outcome(&outcome);
    info!("Time: {:?}", start_time.elapsed());

    if opts.fail_on_error {
        outcome.into_result()?;
    }
    Ok(())
}
