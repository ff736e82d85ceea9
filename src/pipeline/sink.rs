//! Record sinks: where decoded records go. Called concurrently from every worker.

use log::info;
use std::path::Path;

use crate::Record;

/// Consumer of decoded records. Implementations must be safe to call from many workers at once
/// and must not block indefinitely.
pub trait RecordSink: Send + Sync {
    fn accept(&self, record: &Record, source: &Path);
}

/// Logs a one-line projection of each record at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn accept(&self, record: &Record, source: &Path) {
        info!("{}", describe_record(record, source));
    }
}

/// `DOI: …, Title: […], ReferencesCount: …, Authors: …, file: …`
pub fn describe_record(record: &Record, source: &Path) -> String {
    format!(
        "DOI: {}, Title: {:?}, ReferencesCount: {}, Authors: {}, file: {}",
        record.doi,
        record.title,
        record.references_count,
        record
            .author
            .iter()
            .map(|a| format!("{} {}", a.given, a.family).trim().to_string())
            .collect::<Vec<_>>()
            .join("; "),
        source.display()
    )
}

impl<F> RecordSink for F
where
    F: Fn(&Record, &Path) + Send + Sync,
{
    fn accept(&self, record: &Record, source: &Path) {
        self(record, source)
    }
}
