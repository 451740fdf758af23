use crate::bus::publish_snapshot;
use crate::error::SamplingError;
use crate::metrics::Snapshot;
use crate::sampler::Sampler;
use crate::source::SystemSource;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct MonitorConfig {
    pub interval: Duration,
}

impl MonitorConfig {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Drives sample -> publish once per tick. Ticks run one at a time on this
/// task; a tick that fires late is coalesced with the next one, never queued.
pub struct Monitor<S> {
    config: MonitorConfig,
    sampler: Sampler<S>,
}

impl<S: SystemSource> Monitor<S> {
    pub fn new(config: MonitorConfig, sampler: Sampler<S>) -> Self {
        Self { config, sampler }
    }

    pub fn sampler(&self) -> &Sampler<S> {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut Sampler<S> {
        &mut self.sampler
    }

    /// One tick. A failure publishes nothing, so the history is left untouched.
    pub fn tick(&mut self) -> Result<Snapshot, SamplingError> {
        match self.sampler.sample() {
            Ok(snapshot) => {
                debug!(
                    "Sampled ram={:.1}% cpu={:.1}% disk={:.1}% swap={:.1}% cache={:.1}%",
                    snapshot.ram_percent,
                    snapshot.cpu_percent,
                    snapshot.disk_percent,
                    snapshot.swap_percent,
                    snapshot.cache_percent
                );
                publish_snapshot(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Sampling failed, skipping tick: {}", e);
                Err(e)
            }
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Monitor started with interval {:?}, cache strategy: {}",
            self.config.interval,
            self.sampler.cache_strategy()
        );

        // The first tick waits a full interval so the primed CPU baseline has
        // something to compare against.
        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.config.interval,
            self.config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {}
            }
            // Errors are already logged; the next tick starts over.
            let _ = self.tick();
        }
        info!("Monitor stopped");
    }
}
