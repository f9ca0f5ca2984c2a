// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub fn format_optional_bytes(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) if b > 0 => format_bytes(b),
        _ => "N/A".to_string(),
    }
}

pub fn format_speed(bytes_per_second: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_second.max(0.0) as u64))
}

pub fn format_time(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

pub fn format_duration(duration: Duration) -> String {
    format_time(duration.as_secs())
}

pub fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        // Take `max_len - 3` characters to make room for "..."
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

pub fn spinner_char(frame: usize) -> char {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_bytes(2048 * 1024 * 1024 * 1024 * 1024), "2048.0 TB");
    }

    #[test]
    fn unknown_sizes_render_as_na() {
        assert_eq!(format_optional_bytes(None), "N/A");
        assert_eq!(format_optional_bytes(Some(0)), "N/A");
        assert_eq!(format_optional_bytes(Some(2048)), "2.0 KB");
    }

    #[test]
    fn time_switches_units() {
        assert_eq!(format_time(0), "0s");
        assert_eq!(format_time(59), "59s");
        assert_eq!(format_time(61), "1m 1s");
        assert_eq!(format_time(3599), "59m 59s");
        assert_eq!(format_time(3600 + 120 + 5), "1h 2m");
    }

    #[test]
    fn speed_is_bytes_per_second() {
        assert_eq!(format_speed(1000.0), "1000 B/s");
        assert_eq!(format_speed(2048.0), "2.0 KB/s");
        assert_eq!(format_speed(-5.0), "0 B/s");
    }

    #[test]
    fn truncation_adds_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a much longer title", 10), "a much ...");
    }

    #[test]
    fn spinner_cycles() {
        let frames: String = (0..6).map(spinner_char).collect();
        assert_eq!(frames, "|/-\\|/");
    }
}
