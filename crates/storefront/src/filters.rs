//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a minute count as `1h 25m` or `40m`.
///
/// Usage in templates: `{{ course.duration_minutes|duration }}`
#[askama::filter_fn]
pub fn duration(minutes: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = minutes.to_string();
    let Ok(total) = raw.parse::<u32>() else {
        return Ok(raw);
    };
    Ok(format_minutes(total))
}

fn format_minutes(total: u32) -> String {
    match (total / 60, total % 60) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(40), "40m");
        assert_eq!(format_minutes(60), "1h");
        assert_eq!(format_minutes(85), "1h 25m");
        assert_eq!(format_minutes(0), "0m");
    }
}
