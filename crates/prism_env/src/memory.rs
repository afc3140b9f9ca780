// memory.rs
//! Cross-platform helpers to query installed RAM and logical core count.
//! Returns `None` when a value is unavailable; callers pick the defaults.

use std::sync::OnceLock;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostResources {
    pub total_ram: Option<u64>,      // bytes
    pub logical_cores: Option<u32>,
}

impl HostResources {
    /// Detected once per process, cached afterwards.
    pub fn detect() -> Self {
        static INSTANCE: OnceLock<HostResources> = OnceLock::new();
        *INSTANCE.get_or_init(Self::detect_impl)
    }

    fn detect_impl() -> Self {
        Self {
            total_ram: total_ram_bytes(),
            logical_cores: std::thread::available_parallelism()
                .ok()
                .map(|n| n.get() as u32),
        }
    }

    /// Installed memory in GB, rounded to the power-of-two buckets browsers
    /// report (0.25, 0.5, 1, 2, 4, 8, ...).
    pub fn device_memory_gb(&self) -> Option<f32> {
        self.total_ram.map(|bytes| bucket_gb(bytes as f64 / BYTES_PER_GB))
    }
}

/// Round a raw GB figure to the nearest power of two. Kernels reserve part of
/// the installed RAM, so a 16 GB machine reports ~15.5 GB in `MemTotal`.
fn bucket_gb(gb: f64) -> f32 {
    if gb <= 0.25 {
        return 0.25;
    }
    2f64.powi(gb.log2().round() as i32) as f32
}

/* -------------------------- Windows -------------------------- */

#[cfg(target_os = "windows")]
fn total_ram_bytes() -> Option<u64> {
    use windows_sys::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};
    unsafe {
        let mut st: MEMORYSTATUSEX = std::mem::zeroed();
        st.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;
        if GlobalMemoryStatusEx(&mut st) != 0 { Some(st.ullTotalPhys) } else { None }
    }
}

/* --------------------- macOS / iOS (Darwin) --------------------- */

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn total_ram_bytes() -> Option<u64> {
    use libc::{c_void, size_t, sysctlbyname};
    let cname = std::ffi::CString::new("hw.memsize").ok()?;
    let mut val: u64 = 0;
    let mut len: size_t = std::mem::size_of::<u64>() as _;
    let rc = unsafe {
        sysctlbyname(
            cname.as_ptr(),
            &mut val as *mut _ as *mut c_void,
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc == 0 && val != 0 { Some(val) } else { None }
}

/* --------------------- Linux / Android --------------------- */

#[cfg(any(target_os = "linux", target_os = "android"))]
fn total_ram_bytes() -> Option<u64> {
    // /proc/meminfo: "MemTotal:  16367168 kB"
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_total(&text)
}

#[cfg(any(test, target_os = "linux", target_os = "android"))]
fn parse_meminfo_total(text: &str) -> Option<u64> {
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

/* --------------------- Other / WASM / Fallbacks --------------------- */

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
fn total_ram_bytes() -> Option<u64> { None }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meminfo_total_is_parsed_in_bytes() {
        let text = "MemTotal:       16367168 kB\nMemFree:         1234 kB\n";
        assert_eq!(parse_meminfo_total(text), Some(16_367_168 * 1024));
        assert_eq!(parse_meminfo_total("MemFree: 12 kB"), None);
    }

    #[test]
    fn memory_is_bucketed_like_browsers() {
        assert_eq!(bucket_gb(15.6), 16.0);
        assert_eq!(bucket_gb(16.0), 16.0);
        assert_eq!(bucket_gb(3.8), 4.0);
        assert_eq!(bucket_gb(1.95), 2.0);
        assert_eq!(bucket_gb(0.1), 0.25);
    }

    #[test]
    fn detection_is_cached() {
        assert_eq!(HostResources::detect(), HostResources::detect());
    }
}
