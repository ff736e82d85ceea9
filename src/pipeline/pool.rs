//! Fixed-size worker pool: N threads draining a bounded job channel.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, error};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crate::error::PoolError;

/// A unit of work handed to the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool sizing and submission behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads. Clamped to at least 1.
    pub workers: usize,
    /// Jobs that may wait in the queue while every worker is busy. Clamped to at least 1.
    pub queue_cap: usize,
    /// When true, `submit` fails with [`PoolError::Saturated`] instead of waiting for a slot.
    pub nonblocking: bool,
}

impl PoolConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_cap: workers,
            nonblocking: false,
        }
    }
}

/// Bounded set of worker threads. Dropping the pool shuts it down and waits for queued jobs.
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
    nonblocking: bool,
}

/// Single worker: run jobs until the channel is closed and drained.
fn worker_loop(id: usize, job_rx: Receiver<Job>, in_flight: Arc<AtomicUsize>) {
    while let Ok(job) = job_rx.recv() {
        in_flight.fetch_add(1, Ordering::AcqRel);
        if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
            error!("worker {}: job panicked: {}", id, panic_message(&*panic));
        }
        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
    debug!("worker {} exiting", id);
}

/// Best-effort text of a panic payload.
pub fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

impl WorkerPool {
    /// Spawn `config.workers` threads sharing one bounded job channel.
    pub fn new(config: PoolConfig) -> Self {
        let capacity = config.workers.max(1);
        let (job_tx, job_rx) = bounded::<Job>(config.queue_cap.max(1));
        let in_flight = Arc::new(AtomicUsize::new(0));

        let handles = (0..capacity)
            .map(|id| {
                let job_rx = job_rx.clone();
                let in_flight = Arc::clone(&in_flight);
                thread::spawn(move || worker_loop(id, job_rx, in_flight))
            })
            .collect();
        debug!(
            "worker pool started: {} workers, queue cap {}, nonblocking {}",
            capacity,
            config.queue_cap.max(1),
            config.nonblocking
        );

        Self {
            job_tx: Some(job_tx),
            handles,
            in_flight,
            capacity,
            nonblocking: config.nonblocking,
        }
    }

    /// Hand `job` to the pool.
    ///
    /// Blocking mode waits for a queue slot when every worker is busy and the queue is full;
    /// nonblocking mode returns [`PoolError::Saturated`] instead. A shut-down pool returns
    /// [`PoolError::Closed`].
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let job_tx = self.job_tx.as_ref().ok_or(PoolError::Closed)?;
        let job: Job = Box::new(job);
        if self.nonblocking {
            job_tx.try_send(job).map_err(|e| match e {
                TrySendError::Full(_) => PoolError::Saturated,
                TrySendError::Disconnected(_) => PoolError::Closed,
            })
        } else {
            job_tx.send(job).map_err(|_| PoolError::Closed)
        }
    }

    /// Stop accepting work and wait for every queued and running job. Safe to call twice.
    pub fn shutdown(&mut self) {
        // Dropping the last sender closes the channel so workers exit once it is drained.
        if self.job_tx.take().is_none() {
            return;
        }
        for h in self.handles.drain(..) {
            if h.join().is_err() {
                error!("worker thread panicked outside a job");
            }
        }
        debug!("worker pool shut down");
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs currently executing (not queued).
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.job_tx.is_none()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
