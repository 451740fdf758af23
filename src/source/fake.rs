use super::{DiskReading, MemoryReading, PerformanceInfo, SwapReading, SystemSource};
use crate::error::SamplingError;
use crate::metrics::PartitionUsage;
use std::collections::HashSet;
use std::io;

/// Which query a scripted failure applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FakeQuery {
    Memory,
    Swap,
    Disk,
    Cpu,
}

/// Scripted host used in tests. Readings are plain fields; failures are one-shot.
#[derive(Clone, Debug, Default)]
pub struct FakeSource {
    pub memory: MemoryReading,
    pub swap: SwapReading,
    pub disk: DiskReading,
    pub partitions: Vec<PartitionUsage>,
    pub cpu_percent: f64,
    /// `None` behaves like a host without the performance-information API.
    pub performance: Option<PerformanceInfo>,
    cpu_calls: usize,
    failing: HashSet<FakeQuery>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory with `total` bytes of which `used` are in use.
    pub fn with_memory(mut self, total: u64, used: u64) -> Self {
        self.memory.total_bytes = total;
        self.memory.used_bytes = used;
        self.memory.available_bytes = total.saturating_sub(used);
        self.memory.free_bytes = total.saturating_sub(used);
        self
    }

    pub fn with_cached(mut self, cached: u64) -> Self {
        self.memory.cached_bytes = Some(cached);
        self
    }

    pub fn with_performance(mut self, system_cache_pages: u64, page_size: u64) -> Self {
        self.performance = Some(PerformanceInfo {
            system_cache_pages,
            page_size,
        });
        self
    }

    /// Make the next call to `query` fail.
    pub fn fail_next(&mut self, query: FakeQuery) {
        self.failing.insert(query);
    }

    pub fn cpu_calls(&self) -> usize {
        self.cpu_calls
    }

    fn check(&mut self, query: FakeQuery) -> io::Result<()> {
        if self.failing.remove(&query) {
            return Err(io::Error::other(format!("injected {query:?} failure")));
        }
        Ok(())
    }
}

impl SystemSource for FakeSource {
    fn memory(&mut self) -> Result<MemoryReading, SamplingError> {
        self.check(FakeQuery::Memory).map_err(SamplingError::Memory)?;
        Ok(self.memory.clone())
    }

    fn swap(&mut self) -> Result<SwapReading, SamplingError> {
        self.check(FakeQuery::Swap).map_err(SamplingError::Swap)?;
        Ok(self.swap.clone())
    }

    fn root_disk(&mut self) -> Result<DiskReading, SamplingError> {
        self.check(FakeQuery::Disk).map_err(|source| SamplingError::Disk {
            path: "/".into(),
            source,
        })?;
        Ok(self.disk.clone())
    }

    fn partitions(&mut self) -> Result<Vec<PartitionUsage>, SamplingError> {
        Ok(self.partitions.clone())
    }

    fn cpu_usage(&mut self) -> Result<f64, SamplingError> {
        self.cpu_calls += 1;
        if self.failing.remove(&FakeQuery::Cpu) {
            return Err(SamplingError::CpuUnavailable);
        }
        Ok(self.cpu_percent)
    }

    fn performance_info(&mut self) -> Result<PerformanceInfo, SamplingError> {
        self.performance.ok_or_else(|| {
            SamplingError::PerformanceInfo(io::Error::new(
                io::ErrorKind::Unsupported,
                "no performance information on this fake host",
            ))
        })
    }
}
