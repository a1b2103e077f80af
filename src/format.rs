//! Display string formatting for countdowns, clock times and coordinates.

use chrono::NaiveDateTime;

/// Format a countdown for display.
///
/// Under one hour renders as `"{m}m"`, otherwise `"{h}h {mm}m"`. Seconds are
/// floored away and negative durations render as `"0m"`.
///
/// # Example
/// ```
/// use prayer_arc_lib::format::format_countdown;
///
/// assert_eq!(format_countdown(59 * 60 * 1000), "59m");
/// assert_eq!(format_countdown((3 * 60 + 7) * 60 * 1000), "3h 07m");
/// ```
pub fn format_countdown(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

/// Canonical 24-hour `HH:MM` clock time.
pub fn format_clock(date: NaiveDateTime) -> String {
    date.format("%H:%M").to_string()
}

/// Human readable coordinate label, e.g. `"24.87°N · 67.01°E"`.
pub fn format_coords(latitude: f64, longitude: f64) -> String {
    let lat_hemi = if latitude >= 0.0 { 'N' } else { 'S' };
    let lon_hemi = if longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.2}°{} · {:.2}°{}",
        latitude.abs(),
        lat_hemi,
        longitude.abs(),
        lon_hemi
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "0m");
        assert_eq!(format_countdown(59_999), "0m");
        assert_eq!(format_countdown(60_000), "1m");
        assert_eq!(format_countdown(59 * 60_000 + 59_999), "59m");
        assert_eq!(format_countdown(60 * 60_000), "1h 00m");
        assert_eq!(format_countdown((10 * 60 + 5) * 60_000), "10h 05m");
        assert_eq!(format_countdown(-5_000), "0m");
    }

    #[test]
    fn test_format_clock() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(5, 8, 59)
            .unwrap();
        assert_eq!(format_clock(date), "05:08");
    }

    #[test]
    fn test_format_coords() {
        assert_eq!(
            format_coords(24.866793937143527, 67.01059830949353),
            "24.87°N · 67.01°E"
        );
        assert_eq!(format_coords(-33.8688, -151.2093), "33.87°S · 151.21°W");
        assert_eq!(format_coords(0.0, 0.0), "0.00°N · 0.00°E");
    }
}
