use super::{meminfo, perfinfo, DiskReading, MemoryReading, PerformanceInfo, SwapReading, SystemSource};
use crate::error::SamplingError;
use crate::metrics::{percent, PartitionUsage};
use std::io;
use std::path::{Path, PathBuf};
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

/// Reads the live host through sysinfo, plus the platform-specific extras
/// sysinfo does not cover (page cache fields, root filesystem usage).
pub struct SysinfoSource {
    system: System,
    root: PathBuf,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self::with_root(default_root())
    }

    pub fn with_root(root: PathBuf) -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::everything());
        debug!("Root filesystem for disk usage: {}", root.display());
        Self {
            system: System::new_with_specifics(refresh),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSource for SysinfoSource {
    fn memory(&mut self) -> Result<MemoryReading, SamplingError> {
        self.system.refresh_memory();
        let cache = cache_fields().map_err(SamplingError::Memory)?;
        Ok(MemoryReading {
            total_bytes: self.system.total_memory(),
            used_bytes: self.system.used_memory(),
            available_bytes: self.system.available_memory(),
            free_bytes: self.system.free_memory(),
            cached_bytes: cache.cached_bytes,
            buffers_bytes: cache.buffers_bytes,
        })
    }

    fn swap(&mut self) -> Result<SwapReading, SamplingError> {
        self.system.refresh_memory();
        Ok(SwapReading {
            total_bytes: self.system.total_swap(),
            used_bytes: self.system.used_swap(),
            free_bytes: self.system.free_swap(),
        })
    }

    fn root_disk(&mut self) -> Result<DiskReading, SamplingError> {
        filesystem_usage(&self.root)
    }

    fn partitions(&mut self) -> Result<Vec<PartitionUsage>, SamplingError> {
        let disks = Disks::new_with_refreshed_list();
        let partitions = disks
            .list()
            .iter()
            .filter(|d| d.total_space() > 0)
            .map(|d| {
                let total = d.total_space();
                let free = d.available_space().min(total);
                let used = total - free;
                PartitionUsage {
                    device: d.name().to_string_lossy().into_owned(),
                    mount_point: d.mount_point().display().to_string(),
                    file_system: d.file_system().to_string_lossy().into_owned(),
                    total_bytes: total,
                    used_bytes: used,
                    free_bytes: free,
                    used_pct: percent(used, used + free),
                }
            })
            .collect();
        Ok(partitions)
    }

    fn cpu_usage(&mut self) -> Result<f64, SamplingError> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(SamplingError::CpuUnavailable);
        }
        Ok(self.system.global_cpu_usage() as f64)
    }

    fn performance_info(&mut self) -> Result<PerformanceInfo, SamplingError> {
        perfinfo::query().map_err(SamplingError::PerformanceInfo)
    }
}

#[cfg(target_os = "linux")]
fn cache_fields() -> io::Result<meminfo::CacheFields> {
    meminfo::read_cache_fields()
}

#[cfg(not(target_os = "linux"))]
fn cache_fields() -> io::Result<meminfo::CacheFields> {
    Ok(meminfo::CacheFields::default())
}

#[cfg(windows)]
fn default_root() -> PathBuf {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    PathBuf::from(format!("{drive}\\"))
}

#[cfg(not(windows))]
fn default_root() -> PathBuf {
    PathBuf::from("/")
}

#[cfg(unix)]
fn filesystem_usage(path: &Path) -> Result<DiskReading, SamplingError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let to_err = |source: io::Error| SamplingError::Disk {
        path: path.to_path_buf(),
        source,
    };
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| to_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
    // SAFETY: statvfs is plain old data; zeroed is a valid initial state.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is NUL-terminated and `stat` is a valid out pointer.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(to_err(io::Error::last_os_error()));
    }

    let frsize = stat.f_frsize as u64;
    let used_blocks = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64);
    Ok(DiskReading {
        used_bytes: used_blocks.saturating_mul(frsize),
        available_bytes: (stat.f_bavail as u64).saturating_mul(frsize),
    })
}

#[cfg(not(unix))]
fn filesystem_usage(path: &Path) -> Result<DiskReading, SamplingError> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == path)
        .ok_or_else(|| SamplingError::DiskNotFound(path.to_path_buf()))?;
    let total = disk.total_space();
    let available = disk.available_space().min(total);
    debug!("Root disk {:?}: total={} available={}", disk.name(), total, available);
    Ok(DiskReading {
        used_bytes: total - available,
        available_bytes: available,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn root_filesystem_reports_usage() {
        let reading = filesystem_usage(Path::new("/")).unwrap();
        assert!(reading.used_bytes + reading.available_bytes > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn live_host_sample_is_in_range() {
        use crate::cache::CacheStrategy;
        use crate::sampler::Sampler;

        let mut sampler = Sampler::new(SysinfoSource::new()).unwrap();
        assert_eq!(sampler.cache_strategy(), CacheStrategy::FieldBased);

        let memory = sampler.source_mut().memory().unwrap();
        assert!(memory.total_bytes > 0);
        assert!(memory.cached_bytes.is_some());

        let snap = sampler.sample().unwrap();
        for (name, value) in [
            ("ram", snap.ram_percent),
            ("cpu", snap.cpu_percent),
            ("disk", snap.disk_percent),
            ("swap", snap.swap_percent),
            ("cache", snap.cache_percent),
        ] {
            assert!((0.0..=100.0).contains(&value), "{name} = {value}");
        }
    }

    #[test]
    fn missing_path_is_a_disk_error() {
        let err = filesystem_usage(Path::new("/definitely/not/mounted/here")).unwrap_err();
        assert!(matches!(err, SamplingError::Disk { .. }));
    }
}
