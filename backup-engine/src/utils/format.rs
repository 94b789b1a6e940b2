//! Human-readable formatting for sizes and durations.

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format a duration in milliseconds, e.g. for completion logs
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let millis = elapsed.as_millis() as u64;
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1000.0)
    } else {
        let seconds = millis / 1000;
        format!("{}m {}s", seconds / 60, seconds % 60)
    }
}
