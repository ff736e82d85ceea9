//! Batch coordinator: one task per discovered file, fanned out over the worker pool.

use anyhow::Result;
use kdam::Animation;
use log::{debug, info, warn};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::engine::progress::{ProgressBarConfig, create_progress_bar, finish_bar};
use crate::error::FileError;
use crate::pipeline::context::BatchContext;
use crate::pipeline::decoder::decode_file;
use crate::pipeline::discover::discover_files;
use crate::pipeline::pool::{PoolConfig, WorkerPool, panic_message};
use crate::pipeline::sink::RecordSink;
use crate::utils::config::{DefaultPaths, ProgressConsts, resolve_workers};
use crate::{BatchOutcome, Opts, Task};

/// Pool sizing from options: worker override or host default; queue defaults to one slot per worker.
pub fn pool_config_for(opts: &Opts) -> PoolConfig {
    let workers = resolve_workers(opts.workers);
    PoolConfig {
        workers,
        queue_cap: opts.queue_cap.unwrap_or(workers),
        nonblocking: opts.nonblocking,
    }
}

/// Run one task on the current worker. Panics inside decoding or the sink become a file failure.
pub fn process_task(task: &Task, sink: &dyn RecordSink) -> Result<usize, FileError> {
    match catch_unwind(AssertUnwindSafe(|| decode_file(task, sink))) {
        Ok(result) => result,
        Err(panic) => Err(FileError::Panicked {
            path: task.source_path.clone(),
            message: panic_message(&*panic),
        }),
    }
}

/// Job body: process the task and fold its outcome into the shared context.
fn run_job(task: Task, sink: Arc<dyn RecordSink>, ctx: Arc<BatchContext>) {
    match process_task(&task, sink.as_ref()) {
        Ok(n) => debug!("{}: {} records", task.source_path.display(), n),
        Err(e) => ctx.report_failure(&e),
    }
    ctx.file_done();
}

fn cancel_requested(opts: &Opts) -> bool {
    opts.cancel
        .as_ref()
        .is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Decode every file in `files` through a bounded pool and return the aggregate outcome.
///
/// Per-file errors never escape: each is logged with its path and counted. Submission
/// rejections are counted the same way and the loop moves on. The pool is shut down (all
/// queued and running tasks finish) before the outcome is built, on every path out of here.
pub fn run_batch(files: Vec<PathBuf>, opts: &Opts, sink: Arc<dyn RecordSink>) -> BatchOutcome {
    let config = pool_config_for(opts);
    let bar = opts.progress.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            files.len(),
            ProgressConsts::DESC,
            Animation::Classic,
        ))
    });
    let ctx = Arc::new(BatchContext::new(opts.record_failures, bar));
    let mut pool = WorkerPool::new(config);
    debug!(
        "dispatching {} files to {} workers",
        files.len(),
        pool.capacity()
    );

    let mut submitted = 0_usize;
    let mut cancelled = false;
    for path in files {
        if cancel_requested(opts) {
            warn!("Cancel requested; no further files will be submitted");
            cancelled = true;
            break;
        }
        info!("Processing file: {}", path.display());
        submitted += 1;
        let task = Task::new(path);
        let job_task = task.clone();
        let job_sink = Arc::clone(&sink);
        let job_ctx = Arc::clone(&ctx);
        if let Err(source) = pool.submit(move || run_job(job_task, job_sink, job_ctx)) {
            debug!(
                "submit rejected ({}); {} of {} workers busy",
                source,
                pool.in_flight(),
                pool.capacity()
            );
            ctx.report_failure(&FileError::Submission {
                path: task.source_path,
                source,
            });
            ctx.file_done();
        }
    }

    debug!(
        "{} files submitted; waiting on {} running jobs",
        submitted,
        pool.in_flight()
    );
    pool.shutdown();
    if let Some(bar) = &ctx.bar {
        finish_bar(bar, submitted);
    }

    BatchOutcome {
        total_submitted: submitted,
        failed: ctx.failed.get(),
        cancelled,
        failures: ctx.take_failures(),
    }
}

/// Discover archives under `opts.input_root` and run them as one batch.
/// A discovery failure returns before any pool is created.
pub fn run(opts: &Opts, sink: Arc<dyn RecordSink>) -> Result<BatchOutcome> {
    let extension = if opts.extension.is_empty() {
        DefaultPaths::EXTENSION
    } else {
        opts.extension.as_str()
    };
    let files = discover_files(&opts.input_root, extension)?;
    if files.is_empty() {
        warn!(
            "No .{} files found under {}",
            extension,
            opts.input_root.display()
        );
    }
    Ok(run_batch(files, opts, sink))
}

/// Same as [`run`] with an explicit root (lib convenience).
pub fn run_dir(root: &Path, opts: &Opts, sink: Arc<dyn RecordSink>) -> Result<BatchOutcome> {
    let opts = Opts {
        input_root: root.to_path_buf(),
        ..opts.clone()
    };
    run(&opts, sink)
}
