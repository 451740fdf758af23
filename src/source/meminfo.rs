use std::fs;
use std::io;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Cache-related fields of `/proc/meminfo`, converted to bytes.
///
/// `cached_bytes` is page cache plus reclaimable slab, the figure `free`
/// reports in its cache column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheFields {
    pub cached_bytes: Option<u64>,
    pub buffers_bytes: Option<u64>,
}

pub fn read_cache_fields() -> io::Result<CacheFields> {
    let content = fs::read_to_string(MEMINFO_PATH)?;
    Ok(parse_cache_fields(&content))
}

/// Lines look like `Cached:          1234567 kB`.
pub fn parse_cache_fields(content: &str) -> CacheFields {
    let mut cached = None;
    let mut reclaimable = None;
    let mut buffers = None;
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "Cached" => &mut cached,
            "SReclaimable" => &mut reclaimable,
            "Buffers" => &mut buffers,
            _ => continue,
        };
        *slot = parse_kib(rest);
    }
    CacheFields {
        // Older kernels lack SReclaimable; a lone SReclaimable is not a cache figure.
        cached_bytes: cached.map(|c: u64| c.saturating_add(reclaimable.unwrap_or(0))),
        buffers_bytes: buffers,
    }
}

fn parse_kib(value: &str) -> Option<u64> {
    let mut parts = value.split_whitespace();
    let amount = parts.next()?.parse::<u64>().ok()?;
    match parts.next() {
        Some("kB") => Some(amount.saturating_mul(1024)),
        None => Some(amount),
        Some(_) => None,
    }
}
