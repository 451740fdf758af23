//! Raw OS readings behind a trait, so the sampler can run against the real host
//! or a scripted fake.

pub mod fake;
pub mod meminfo;
pub mod perfinfo;
pub mod system;

pub use fake::FakeSource;
pub use system::SysinfoSource;

use crate::error::SamplingError;
use crate::metrics::PartitionUsage;

/// Physical memory as reported by the OS, in bytes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub free_bytes: u64,
    /// Page cache, when the platform exposes it as a statistics field.
    pub cached_bytes: Option<u64>,
    pub buffers_bytes: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwapReading {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// Usage of the root filesystem. Percent is `used / (used + available)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiskReading {
    pub used_bytes: u64,
    pub available_bytes: u64,
}

/// Result of the Windows performance-information query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PerformanceInfo {
    /// Standby/system cache size, in pages.
    pub system_cache_pages: u64,
    pub page_size: u64,
}

impl PerformanceInfo {
    pub fn cache_bytes(&self) -> u64 {
        self.system_cache_pages.saturating_mul(self.page_size)
    }
}

pub trait SystemSource {
    fn memory(&mut self) -> Result<MemoryReading, SamplingError>;

    fn swap(&mut self) -> Result<SwapReading, SamplingError>;

    fn root_disk(&mut self) -> Result<DiskReading, SamplingError>;

    /// Mounted partitions. Partitions that cannot report usage are left out.
    fn partitions(&mut self) -> Result<Vec<PartitionUsage>, SamplingError>;

    /// Global CPU usage since the previous call. Stateful: every call moves the baseline.
    fn cpu_usage(&mut self) -> Result<f64, SamplingError>;

    /// Fails on platforms without the query.
    fn performance_info(&mut self) -> Result<PerformanceInfo, SamplingError>;
}
