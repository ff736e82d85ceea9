//! Worker cap from the open-file limit. Every worker keeps exactly one archive open while it
//! decodes, so the soft `RLIMIT_NOFILE` bounds how many can run at once.

/// Handles kept back for stdio, the log file, and the directory walker.
pub const RESERVED_HANDLES: u64 = 16;

/// Archive handles each worker holds while decoding.
pub const HANDLES_PER_WORKER: u64 = 1;

/// Soft open-file limit of this process. `None` when unlimited or not reported.
#[cfg(unix)]
pub fn open_file_limit() -> Option<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `rlim` is a valid, writable rlimit for the duration of the call.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) } != 0 {
        return None;
    }
    let soft = rlim.rlim_cur as u64;
    (rlim.rlim_cur != libc::RLIM_INFINITY && soft <= i64::MAX as u64).then_some(soft)
}

#[cfg(not(unix))]
pub fn open_file_limit() -> Option<u64> {
    None
}

/// Workers that fit under `limit` once the reserved handles are set aside. Never below one.
pub fn workers_for_limit(limit: u64) -> usize {
    let spare = limit.saturating_sub(RESERVED_HANDLES);
    usize::try_from(spare / HANDLES_PER_WORKER)
        .unwrap_or(usize::MAX)
        .max(1)
}

/// Worker cap for this process, or `None` when the limit is unknown.
pub fn worker_cap_from_open_files() -> Option<usize> {
    open_file_limit().map(workers_for_limit)
}
