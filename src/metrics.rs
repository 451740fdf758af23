use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One fully populated sampling result. Never mutated after the sampler builds it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub ram_percent: f64,
    pub cpu_percent: f64,
    pub disk_percent: f64,
    pub swap_percent: f64,
    pub cache_percent: f64,
}

/// Detailed memory and storage breakdown of the host, collected on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostDetails {
    pub ram: RamDetails,
    pub cache: CacheDetails,
    pub swap: SwapDetails,
    pub partitions: Vec<PartitionUsage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RamDetails {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub free_bytes: u64,
    pub used_pct: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheDetails {
    /// `None` when the platform does not report a cached figure.
    pub cached_bytes: Option<u64>,
    pub buffers_bytes: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapDetails {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionUsage {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_pct: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `part / total * 100`, or 0 when `total` is 0.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Wall-clock time truncated to whole seconds.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
