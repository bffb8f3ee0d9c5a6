//! Common utilities and helpers

pub mod logging;
pub mod path;
pub mod time;

/// Percentage of `current` over `total`, clamped to 100 (0 when total is unknown)
pub fn percent_of(current: u64, total: u64) -> u8 {
    if total == 0 {
        0
    } else {
        ((current as f64 / total as f64) * 100.0).min(100.0) as u8
    }
}
