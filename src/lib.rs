//! Gzfeed: bounded-concurrency batch decoding of gzip-compressed JSON record dumps.
//!
//! Files are discovered under a root, each one is handed to a fixed-size worker pool, and every
//! worker streams its file through gzip and a JSON stream parser into a [`RecordSink`]. A bad
//! file is logged and counted; it never stops the rest of the batch.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{BatchError, DiscoveryError, FileError, PoolError};
pub use pipeline::{LogSink, RecordSink};
pub use types::*;

use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Result alias used by public gzfeed API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: decode every archive under `root` into `sink` and return the outcome.
///
/// Per-file failures are counted in [`BatchOutcome::failed`] (and listed in
/// [`BatchOutcome::failures`] when `opts.record_failures` is set); call
/// [`BatchOutcome::into_result`] to turn a nonzero count into an error. Only a failed directory
/// walk returns `Err`.
///
/// ```ignore
/// let sink = |r: &gzfeed::Record, _: &std::path::Path| println!("{}", r.doi);
/// let outcome = gzfeed::decode_dir(path, &gzfeed::GzfeedOpts::default(), sink)?;
/// ```
pub fn decode_dir<S>(root: &Path, opts: &GzfeedOpts, sink: S) -> Result<BatchOutcome>
where
    S: RecordSink + 'static,
{
    let opts = Opts::from(opts);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    pipeline::run_dir(root, &opts, Arc::new(sink))
}
