//! Time formatting utilities

/// Format seconds as MM:SS.mmm, or H:MM:SS.mmm past the hour
pub fn format_seconds(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// Render a seek/duration argument for ffmpeg with microsecond precision
pub fn ffmpeg_seconds(seconds: f64) -> String {
    format!("{:.6}", seconds.max(0.0))
}
