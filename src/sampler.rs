use crate::cache::{self, CacheResolver, CacheStrategy};
use crate::error::SamplingError;
use crate::metrics::{now_timestamp, percent, Snapshot};
use crate::source::SystemSource;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// CPU usage deltas over a shorter span than this are mostly noise.
const MIN_CPU_INTERVAL: Duration = Duration::from_millis(200);

/// Turns raw OS readings into a [`Snapshot`] of comparable percentages.
///
/// Owns the CPU baseline: the CPU primitive is primed once in the
/// constructor and then called exactly once per [`Sampler::sample`].
pub struct Sampler<S> {
    source: S,
    resolver: Box<dyn CacheResolver>,
    last_cpu_sample: Instant,
}

impl<S: SystemSource> Sampler<S> {
    /// Probes the host for a cache strategy, then primes the CPU baseline.
    pub fn new(mut source: S) -> Result<Self, SamplingError> {
        let resolver = cache::probe(&mut source)?;
        Ok(Self::with_resolver(source, resolver))
    }

    pub fn with_resolver(mut source: S, resolver: Box<dyn CacheResolver>) -> Self {
        // First reading only establishes the baseline.
        if let Err(e) = source.cpu_usage() {
            debug!("CPU baseline priming failed: {}", e);
        }
        Self {
            source,
            resolver,
            last_cpu_sample: Instant::now(),
        }
    }

    pub fn cache_strategy(&self) -> CacheStrategy {
        self.resolver.strategy()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Take one snapshot. Any failing query fails the whole sample.
    pub fn sample(&mut self) -> Result<Snapshot, SamplingError> {
        let now = Instant::now();
        let since_last = now.saturating_duration_since(self.last_cpu_sample);
        if since_last < MIN_CPU_INTERVAL {
            warn!(
                "CPU sampled {:?} after the previous reading; value may be inaccurate",
                since_last
            );
        }
        let cpu = self.source.cpu_usage();
        self.last_cpu_sample = now;
        let cpu = cpu?;

        let memory = self.source.memory()?;
        let swap = self.source.swap()?;
        let disk = self.source.root_disk()?;
        let cache_bytes = self.resolver.cache_bytes(&mut self.source, &memory)?;

        Ok(Snapshot {
            timestamp: now_timestamp(),
            ram_percent: bounded("ram", percent(memory.used_bytes, memory.total_bytes)),
            cpu_percent: bounded("cpu", cpu),
            disk_percent: bounded(
                "disk",
                percent(disk.used_bytes, disk.used_bytes + disk.available_bytes),
            ),
            swap_percent: bounded("swap", percent(swap.used_bytes, swap.total_bytes)),
            cache_percent: bounded("cache", percent(cache_bytes, memory.total_bytes)),
        })
    }
}

/// Clamp into `[0, 100]`. Out-of-range values mean the OS misreported a total.
fn bounded(metric: &str, value: f64) -> f64 {
    if !value.is_finite() {
        warn!("Non-finite {} percentage {}, reporting 0", metric, value);
        return 0.0;
    }
    if !(0.0..=100.0).contains(&value) {
        warn!("{} percentage {:.2} out of range, clamping", metric, value);
    }
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::FakeQuery;
    use crate::source::{DiskReading, FakeSource, SwapReading};

    const GIB: u64 = 1024 * 1024 * 1024;

    fn host() -> FakeSource {
        let mut source = FakeSource::new().with_memory(16 * GIB, 4 * GIB);
        source.swap = SwapReading {
            total_bytes: 2 * GIB,
            used_bytes: GIB / 2,
            free_bytes: GIB + GIB / 2,
        };
        source.disk = DiskReading {
            used_bytes: 75 * GIB,
            available_bytes: 25 * GIB,
        };
        source.cpu_percent = 12.5;
        source
    }

    #[test]
    fn computes_all_percentages() {
        let mut sampler = Sampler::new(host().with_cached(2 * GIB)).unwrap();
        let snap = sampler.sample().unwrap();
        assert_eq!(snap.ram_percent, 25.0);
        assert_eq!(snap.cpu_percent, 12.5);
        assert_eq!(snap.disk_percent, 75.0);
        assert_eq!(snap.swap_percent, 25.0);
        assert_eq!(snap.cache_percent, 12.5);
    }

    #[test]
    fn primes_cpu_once_then_once_per_sample() {
        let mut sampler = Sampler::new(host()).unwrap();
        assert_eq!(sampler.source().cpu_calls(), 1);
        sampler.sample().unwrap();
        sampler.sample().unwrap();
        assert_eq!(sampler.source().cpu_calls(), 3);
    }

    #[test]
    fn native_api_cache_uses_pages_times_page_size() {
        // 1 GiB of standby cache in 4 KiB pages.
        let source = host().with_cached(8 * GIB).with_performance(262_144, 4096);
        let mut sampler = Sampler::new(source).unwrap();
        assert_eq!(sampler.cache_strategy(), CacheStrategy::NativeApi);
        let snap = sampler.sample().unwrap();
        assert_eq!(snap.cache_percent, 6.25);
    }

    #[test]
    fn cached_field_cache() {
        let mut sampler = Sampler::new(host().with_cached(4 * GIB)).unwrap();
        assert_eq!(sampler.cache_strategy(), CacheStrategy::FieldBased);
        assert_eq!(sampler.sample().unwrap().cache_percent, 25.0);
    }

    #[test]
    fn no_cache_source_reports_exactly_zero() {
        let mut sampler = Sampler::new(host()).unwrap();
        assert_eq!(sampler.cache_strategy(), CacheStrategy::Unavailable);
        assert_eq!(sampler.sample().unwrap().cache_percent, 0.0);
    }

    #[test]
    fn zero_total_memory_yields_zero_percentages() {
        let source = host().with_memory(0, 0).with_cached(GIB);
        let mut sampler = Sampler::new(source).unwrap();
        let snap = sampler.sample().unwrap();
        assert_eq!(snap.ram_percent, 0.0);
        assert_eq!(snap.cache_percent, 0.0);
    }

    #[test]
    fn no_swap_is_zero_not_error() {
        let mut source = host();
        source.swap = SwapReading::default();
        let mut sampler = Sampler::new(source).unwrap();
        assert_eq!(sampler.sample().unwrap().swap_percent, 0.0);
    }

    #[test]
    fn misreported_total_clamps_cache() {
        let source = host().with_memory(GIB, GIB / 2).with_cached(3 * GIB);
        let mut sampler = Sampler::new(source).unwrap();
        assert_eq!(sampler.sample().unwrap().cache_percent, 100.0);
    }

    #[test]
    fn any_failing_query_fails_the_sample() {
        for query in [FakeQuery::Memory, FakeQuery::Swap, FakeQuery::Disk, FakeQuery::Cpu] {
            let mut sampler = Sampler::new(host()).unwrap();
            sampler.source_mut().fail_next(query);
            assert!(sampler.sample().is_err(), "{query:?} should fail the sample");
            assert!(sampler.sample().is_ok(), "{query:?} failure should not persist");
        }
    }

    #[test]
    fn native_api_failure_after_probe_fails_the_sample() {
        let mut sampler = Sampler::new(host().with_performance(10, 4096)).unwrap();
        sampler.source_mut().performance = None;
        assert!(matches!(
            sampler.sample(),
            Err(SamplingError::PerformanceInfo(_))
        ));
    }

    #[test]
    fn non_finite_cpu_is_zero() {
        let mut source = host();
        source.cpu_percent = f64::NAN;
        let mut sampler = Sampler::new(source).unwrap();
        assert_eq!(sampler.sample().unwrap().cpu_percent, 0.0);
    }
}
