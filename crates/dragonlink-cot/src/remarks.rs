//! System stats carried as free text in a status envelope's `<remarks>`.
//!
//! WarDragon kits that only speak plain CoT put their health report in the
//! remarks, e.g.
//! `CPU Usage: 12.5%, Memory Total: 8192 MB, Memory Available: 4096 MB,
//! Disk Total: 512000 MB, Disk Used: 1024 MB, Temperature: 45.2°C,
//! Uptime: 3600 seconds`.

use crate::fields::float_to_count;
use crate::record::SystemStats;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Scrapes every recognised `Key: value` pair; unknown keys are skipped.
///
/// Memory and disk values are reported in MB and stored in bytes. Used and
/// free figures that the remarks leave out are derived from the totals.
pub fn parse_system_stats(remarks: &str) -> SystemStats {
    let mut stats = SystemStats::default();

    for part in remarks.split(',') {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let number = leading_number(value);

        match key.trim().to_ascii_lowercase().as_str() {
            "cpu usage" => stats.cpu_usage = number,
            "memory total" => stats.memory.total = megabytes(number),
            "memory available" => stats.memory.available = megabytes(number),
            "memory used" => stats.memory.used = megabytes(number),
            "disk total" => stats.disk.total = megabytes(number),
            "disk used" => stats.disk.used = megabytes(number),
            "disk free" => stats.disk.free = megabytes(number),
            "temperature" => stats.temperature = number,
            "uptime" => stats.uptime = number,
            _ => {}
        }
    }

    let memory = &mut stats.memory;
    if memory.total > 0 {
        if memory.used == 0 {
            memory.used = memory.total.saturating_sub(memory.available);
        }
        memory.percent = percent(memory.used, memory.total);
    }

    let disk = &mut stats.disk;
    if disk.total > 0 {
        if disk.free == 0 {
            disk.free = disk.total.saturating_sub(disk.used);
        }
        disk.percent = percent(disk.used, disk.total);
    }

    stats
}

fn megabytes(mb: f64) -> u64 {
    float_to_count(mb * BYTES_PER_MB)
}

fn percent(part: u64, total: u64) -> f64 {
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Numeric prefix of a value such as `45.2°C` or `3600 seconds`.
fn leading_number(value: &str) -> f64 {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    value[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
