/// Display helpers for prices, amounts and ages
use chrono::{DateTime, Utc};

/// Compact price / amount formatting
///
/// Sub-cent values keep their precision, large values get K/M/B suffixes.
pub fn format_price(value: f64, decimals: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value < 0.000001 {
        return "<0.000001".to_string();
    }
    if value < 0.001 {
        return format!("{:.6}", value);
    }
    if value < 1.0 {
        return format!("{:.*}", decimals, value);
    }
    if value >= 1_000_000_000.0 {
        return format!("${:.2}B", value / 1_000_000_000.0);
    }
    if value >= 1_000_000.0 {
        return format!("${:.2}M", value / 1_000_000.0);
    }
    if value >= 1_000.0 {
        return format!("${:.2}K", value / 1_000.0);
    }
    format!("${:.*}", decimals, value)
}

/// `format_price` with the default four decimals
pub fn format_usd(value: f64) -> String {
    format_price(value, 4)
}

/// Whole-number percent change, e.g. `-12%`
pub fn format_change(pct: f64) -> String {
    format!("{:.0}%", pct)
}

/// Relative age: `42s`, `5m`, `3h`, `2d`, `4M`, `1Y`; future timestamps are `now`
pub fn format_age_at(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(created).num_milliseconds().div_euclid(1000);
    if seconds < 0 {
        return "now".to_string();
    }
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }
    let months = days / 30;
    if months < 12 {
        return format!("{}M", months);
    }
    format!("{}Y", months / 12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_price_ranges() {
        assert_eq!(format_usd(0.0), "0");
        assert_eq!(format_usd(0.0000004), "<0.000001");
        assert_eq!(format_usd(0.00042), "0.000420");
        assert_eq!(format_usd(0.5), "0.5000");
        assert_eq!(format_usd(12.5), "$12.5000");
        assert_eq!(format_usd(1_500.0), "$1.50K");
        assert_eq!(format_usd(2_340_000.0), "$2.34M");
        assert_eq!(format_usd(7_000_000_000.0), "$7.00B");
        assert_eq!(format_price(3.14159, 2), "$3.14");
    }

    #[test]
    fn test_age_buckets() {
        let now = Utc::now();
        let ago = |secs: i64| format_age_at(now - Duration::seconds(secs), now);
        assert_eq!(format_age_at(now + Duration::seconds(5), now), "now");
        assert_eq!(ago(42), "42s");
        assert_eq!(ago(5 * 60), "5m");
        assert_eq!(ago(3 * 3600), "3h");
        assert_eq!(ago(2 * 86_400), "2d");
        assert_eq!(ago(95 * 86_400), "3M");
        assert_eq!(ago(400 * 86_400), "1Y");
    }

    #[test]
    fn test_change() {
        assert_eq!(format_change(-12.4), "-12%");
        assert_eq!(format_change(3.6), "4%");
    }
}
