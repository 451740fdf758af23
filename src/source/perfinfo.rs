//! `GetPerformanceInfo` from psapi. Only Windows has it; elsewhere the query
//! reports `Unsupported` so the cache strategy probe falls through.

use super::PerformanceInfo;
use std::io;

#[cfg(windows)]
mod ffi {
    /// Mirrors `PERFORMANCE_INFORMATION`. Size fields are counted in pages.
    #[repr(C)]
    #[derive(Default)]
    pub struct PerformanceInformation {
        pub cb: u32,
        pub commit_total: usize,
        pub commit_limit: usize,
        pub commit_peak: usize,
        pub physical_total: usize,
        pub physical_available: usize,
        pub system_cache: usize,
        pub kernel_total: usize,
        pub kernel_paged: usize,
        pub kernel_nonpaged: usize,
        pub page_size: usize,
        pub handle_count: u32,
        pub process_count: u32,
        pub thread_count: u32,
    }

    #[link(name = "psapi")]
    extern "system" {
        pub fn GetPerformanceInfo(info: *mut PerformanceInformation, cb: u32) -> i32;
    }
}

#[cfg(windows)]
pub fn query() -> io::Result<PerformanceInfo> {
    let mut info = ffi::PerformanceInformation::default();
    let size = std::mem::size_of::<ffi::PerformanceInformation>() as u32;
    info.cb = size;
    // SAFETY: `info` is a properly sized, writable PERFORMANCE_INFORMATION and `cb` matches it.
    let ok = unsafe { ffi::GetPerformanceInfo(&mut info, size) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(PerformanceInfo {
        system_cache_pages: info.system_cache as u64,
        page_size: info.page_size as u64,
    })
}

#[cfg(not(windows))]
pub fn query() -> io::Result<PerformanceInfo> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "GetPerformanceInfo is only available on Windows",
    ))
}
