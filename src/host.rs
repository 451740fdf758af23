use crate::error::SamplingError;
use crate::metrics::{percent, CacheDetails, HostDetails, RamDetails, SwapDetails};
use crate::source::SystemSource;

/// Memory, swap and per-partition breakdown. Does not read the CPU, so it
/// never disturbs a sampler's CPU baseline.
pub fn collect_host_details(source: &mut dyn SystemSource) -> Result<HostDetails, SamplingError> {
    let memory = source.memory()?;
    let swap = source.swap()?;
    let partitions = source.partitions()?;

    Ok(HostDetails {
        ram: RamDetails {
            total_bytes: memory.total_bytes,
            used_bytes: memory.used_bytes,
            available_bytes: memory.available_bytes,
            free_bytes: memory.free_bytes,
            used_pct: percent(memory.used_bytes, memory.total_bytes),
        },
        cache: CacheDetails {
            cached_bytes: memory.cached_bytes,
            buffers_bytes: memory.buffers_bytes,
        },
        swap: SwapDetails {
            total_bytes: swap.total_bytes,
            used_bytes: swap.used_bytes,
            free_bytes: swap.free_bytes,
            used_pct: percent(swap.used_bytes, swap.total_bytes),
        },
        partitions,
    })
}
