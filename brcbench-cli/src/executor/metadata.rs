//! Host description recorded in every report
//!
//! CPU model and memory come from procfs; elsewhere they report "Unknown"
//! and 0.

use brcbench_report::SystemInfo;

/// Describe the host running the benchmark
pub fn system_info() -> SystemInfo {
    let cpuinfo = read_proc("/proc/cpuinfo");
    let meminfo = read_proc("/proc/meminfo");

    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: proc_field(&cpuinfo, "model name")
            .map(str::to_string)
            .unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: std::thread::available_parallelism().map_or(1, |n| n.get() as u32),
        memory_gb: memory_gb(&meminfo).unwrap_or(0.0),
    }
}

fn read_proc(path: &str) -> String {
    if cfg!(target_os = "linux") {
        std::fs::read_to_string(path).unwrap_or_default()
    } else {
        String::new()
    }
}

/// Value of the first `key : value` line
fn proc_field<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == key).then(|| value.trim())
    })
}

/// `MemTotal` is reported in kibibytes
fn memory_gb(meminfo: &str) -> Option<f64> {
    let kib: u64 = proc_field(meminfo, "MemTotal")?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kib as f64 / (1024.0 * 1024.0))
}
