use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A failed OS query. Any of these aborts the whole tick.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("memory statistics unavailable: {0}")]
    Memory(#[source] io::Error),

    #[error("swap statistics unavailable: {0}")]
    Swap(#[source] io::Error),

    #[error("disk usage for {} unavailable: {source}", path.display())]
    Disk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no filesystem mounted at {}", .0.display())]
    DiskNotFound(PathBuf),

    #[error("cpu statistics unavailable")]
    CpuUnavailable,

    #[error("performance information query failed: {0}")]
    PerformanceInfo(#[source] io::Error),
}
