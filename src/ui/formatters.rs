use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};

/// Format a byte count in human-readable form (B, KB, MB, GB)
pub fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{}B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Local time as YYYY-MM-DD HH:MM:SS
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = (*time).into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fixed-width usage bar, colored by load
pub fn usage_bar(percent: f32, width: usize) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f32).round() as usize;
    let bar = format!("{}{}", "|".repeat(filled), " ".repeat(width.saturating_sub(filled)));
    format!("[{}]", load_color(&bar, clamped))
}

pub fn format_percent(percent: f32) -> ColoredString {
    load_color(&format!("{:5.1}%", percent), percent)
}

fn load_color(text: &str, percent: f32) -> ColoredString {
    if percent >= 90.0 {
        text.red()
    } else if percent >= 70.0 {
        text.yellow()
    } else {
        text.green()
    }
}
