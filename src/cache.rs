//! Cache memory accounting differs per platform. A resolver is picked once,
//! by probing the host, and then asked for the cache size on every tick.
//!
//! Precedence: native performance-information API, then a `cached` field in
//! the memory statistics, then nothing. Only `cached` counts; `buffers` is
//! reported in the host breakdown but never folded into the percentage.

use crate::error::SamplingError;
use crate::source::{MemoryReading, SystemSource};
use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    NativeApi,
    FieldBased,
    Unavailable,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStrategy::NativeApi => "native performance API",
            CacheStrategy::FieldBased => "memory statistics field",
            CacheStrategy::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

pub trait CacheResolver: Send {
    fn strategy(&self) -> CacheStrategy;

    /// Cache size in bytes for the current tick.
    fn cache_bytes(
        &self,
        source: &mut dyn SystemSource,
        memory: &MemoryReading,
    ) -> Result<u64, SamplingError>;
}

/// Standby pages times page size, from the performance-information query.
pub struct NativeApiResolver;

impl CacheResolver for NativeApiResolver {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::NativeApi
    }

    fn cache_bytes(
        &self,
        source: &mut dyn SystemSource,
        _memory: &MemoryReading,
    ) -> Result<u64, SamplingError> {
        Ok(source.performance_info()?.cache_bytes())
    }
}

pub struct FieldBasedResolver;

impl CacheResolver for FieldBasedResolver {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::FieldBased
    }

    fn cache_bytes(
        &self,
        _source: &mut dyn SystemSource,
        memory: &MemoryReading,
    ) -> Result<u64, SamplingError> {
        // A field that was present at probe time and vanished later reads as 0.
        Ok(memory.cached_bytes.unwrap_or(0))
    }
}

pub struct UnavailableResolver;

impl CacheResolver for UnavailableResolver {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::Unavailable
    }

    fn cache_bytes(
        &self,
        _source: &mut dyn SystemSource,
        _memory: &MemoryReading,
    ) -> Result<u64, SamplingError> {
        Ok(0)
    }
}

/// Probe the host once and pick the resolver for the sampler's lifetime.
pub fn probe(source: &mut dyn SystemSource) -> Result<Box<dyn CacheResolver>, SamplingError> {
    match source.performance_info() {
        Ok(_) => return Ok(Box::new(NativeApiResolver)),
        Err(e) => debug!("Performance information probe failed: {}", e),
    }
    if source.memory()?.cached_bytes.is_some() {
        return Ok(Box::new(FieldBasedResolver));
    }
    Ok(Box::new(UnavailableResolver))
}
