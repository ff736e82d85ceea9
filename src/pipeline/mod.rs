//! Pipeline components: discovery, stream decoding, worker pool, batch coordination.

pub mod context;
pub mod coordinator;
pub mod decoder;
pub mod discover;
pub mod pool;
pub mod sink;

pub use context::BatchContext;
pub use coordinator::{pool_config_for, process_task, run, run_batch, run_dir};
pub use decoder::{RecordStream, decode_file, drain_into_sink, open_record_stream};
pub use discover::discover_files;
pub use pool::{Job, PoolConfig, WorkerPool};
pub use sink::{LogSink, RecordSink, describe_record};
