//! Run Measurement
//!
//! Wall-clock timing around a single child execution, and conversion of the
//! kernel's `rusage` record into a portable [`ResourceUsage`].

use std::time::{Duration, Instant};

// ─── Timer ───────────────────────────────────────────────────────────────────

/// Monotonic stopwatch for one execution
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since start
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

// ─── Resource usage ──────────────────────────────────────────────────────────

/// Resource usage of a reaped child process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    /// Peak resident set size in bytes (0 if the platform does not report it)
    pub peak_rss_bytes: u64,
}

impl ResourceUsage {
    /// Convert a raw `rusage` filled in by `wait4`
    #[cfg(unix)]
    pub fn from_rusage(usage: &libc::rusage) -> Self {
        Self {
            peak_rss_bytes: maxrss_to_bytes(usage.ru_maxrss as i64),
        }
    }
}

/// `ru_maxrss` is kilobytes on Linux and bytes on macOS
#[cfg(unix)]
fn maxrss_to_bytes(maxrss: i64) -> u64 {
    let maxrss = maxrss.max(0) as u64;
    if cfg!(target_os = "macos") {
        maxrss
    } else {
        maxrss * 1024
    }
}
