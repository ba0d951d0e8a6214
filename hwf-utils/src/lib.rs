//! Shared utility functions for HWF crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, NaiveDate};

    /// Number of calendar days in the climatological year used for thresholds.
    /// Day 366 only exists in leap years and is handled by an explicit policy.
    pub const DAYS_PER_YEAR: u32 = 365;

    /// The leap-year-only day of year (December 31st of a leap year).
    pub const LEAP_DAY_OF_YEAR: u32 = 366;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse the leading "YYYY-MM-DD" of a timestamp such as
    /// "1979-01-01 00:00:00" or "1979-01-01T12:00:00".
    pub fn parse_day_prefix(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        let day = s.get(..10).unwrap_or(s);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Day of year, 1-based (1..=366).
    pub fn day_of_year(date: &NaiveDate) -> u32 {
        date.ordinal()
    }

    /// Wrap an arbitrary (possibly negative) day number onto 1..=365.
    ///
    /// e.g. 0 -> 365, -14 -> 351, 366 -> 1
    pub fn wrap_day_of_year(day: i64) -> u32 {
        ((day - 1).rem_euclid(DAYS_PER_YEAR as i64) + 1) as u32
    }

    /// Days of a calendar window of `width` days centred on `center`,
    /// wrapping across the year boundary.
    ///
    /// `width` is expected to be odd; an even width is treated as the next
    /// smaller odd width. A width of 365 or more yields every day once.
    pub fn circular_window(center: u32, width: u32) -> Vec<u32> {
        if width >= DAYS_PER_YEAR {
            return (1..=DAYS_PER_YEAR).collect();
        }
        let half = (width / 2) as i64;
        let center = center as i64;
        (center - half..=center + half)
            .map(wrap_day_of_year)
            .collect()
    }

    /// Point on the unit circle for a (fractional) day of year:
    /// `(sin(2πd/365), cos(2πd/365))`.
    pub fn embed_day_of_year(day: f64) -> [f64; 2] {
        let angle = std::f64::consts::TAU * day / DAYS_PER_YEAR as f64;
        [angle.sin(), angle.cos()]
    }

    /// Day of year in `(0, 365]` for the direction of an embedded point.
    ///
    /// Directions within rounding of new year map to 365, not to 0. The zero
    /// vector has no direction and also maps to 365.
    pub fn embedded_day_of_year(point: &[f64; 2]) -> f64 {
        let tau = std::f64::consts::TAU;
        let day = point[0].atan2(point[1]).rem_euclid(tau) * DAYS_PER_YEAR as f64 / tau;
        if day < 1e-9 || day > DAYS_PER_YEAR as f64 - 1e-9 {
            DAYS_PER_YEAR as f64
        } else {
            day
        }
    }

    /// Circular mean of days of year, in `(0, 365]`.
    pub fn circular_mean_day_of_year<I>(days: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let sum = days
            .into_iter()
            .map(embed_day_of_year)
            .fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]);
        embedded_day_of_year(&sum)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_wrap_day_of_year() {
            assert_eq!(wrap_day_of_year(1), 1);
            assert_eq!(wrap_day_of_year(365), 365);
            assert_eq!(wrap_day_of_year(366), 1);
            assert_eq!(wrap_day_of_year(0), 365);
            assert_eq!(wrap_day_of_year(-14), 351);
        }

        #[test]
        fn test_circular_window_wraps_year_boundary() {
            let window = circular_window(1, 31);
            assert_eq!(window.len(), 31);
            assert_eq!(window[0], 351);
            assert_eq!(window[15], 1);
            assert_eq!(window[30], 16);

            let window = circular_window(360, 31);
            assert_eq!(window[0], 345);
            assert_eq!(window[30], 10);
        }

        #[test]
        fn test_circular_window_full_year() {
            let window = circular_window(200, 400);
            assert_eq!(window.len(), 365);
        }

        #[test]
        fn test_embedding_round_trips_day() {
            for day in [0.5, 1.0, 45.5, 182.0, 300.25, 364.9, 365.0] {
                let back = embedded_day_of_year(&embed_day_of_year(day));
                assert!((back - day).abs() < 1e-9, "{day} -> {back}");
            }
            // day 0 is the same direction as day 365
            assert_eq!(embedded_day_of_year(&embed_day_of_year(0.0)), 365.0);
            assert_eq!(embedded_day_of_year(&[0.0, 0.0]), 365.0);
        }

        #[test]
        fn test_circular_mean_across_new_year() {
            assert!((circular_mean_day_of_year([360.0, 10.0]) - 2.5).abs() < 1e-9);
            // a late December / early January spell stays around new year
            let mean = circular_mean_day_of_year([365.0, 366.0, 1.0, 2.0]);
            assert!(mean > 360.0 || mean < 5.0, "mean {mean}");
            assert!((circular_mean_day_of_year([100.0, 110.0]) - 105.0).abs() < 1e-9);
        }

        #[test]
        fn test_day_of_year_leap() {
            let dec31 = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
            assert_eq!(day_of_year(&dec31), LEAP_DAY_OF_YEAR);
            let dec31 = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
            assert_eq!(day_of_year(&dec31), DAYS_PER_YEAR);
        }

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2003, 8, 4).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2003-08-04");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
            assert!(parse_date("2003/08/04").is_err());
        }

        #[test]
        fn test_parse_day_prefix() {
            let date = NaiveDate::from_ymd_opt(1979, 1, 1).unwrap();
            assert_eq!(parse_day_prefix("1979-01-01"), Some(date));
            assert_eq!(parse_day_prefix("1979-01-01 00:00:00"), Some(date));
            assert_eq!(parse_day_prefix("1979-01-01T12:00:00"), Some(date));
            assert_eq!(parse_day_prefix("n/a"), None);
        }
    }
}

/// Order statistics
pub mod stats {
    /// Percentile of an ascending-sorted slice, `q` in [0, 100].
    ///
    /// Linear interpolation between the two closest ranks (R type 7, the
    /// numpy default). Returns `None` for an empty slice or `q` out of range.
    pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
        if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
            return None;
        }
        let h = (sorted.len() - 1) as f64 * q / 100.0;
        let lo = h.floor() as usize;
        let hi = (lo + 1).min(sorted.len() - 1);
        Some(sorted[lo] + (h - h.floor()) * (sorted[hi] - sorted[lo]))
    }

    /// Percentile of an unsorted slice; sorts the slice in place.
    pub fn percentile(values: &mut [f64], q: f64) -> Option<f64> {
        values.sort_by(|a, b| a.total_cmp(b));
        percentile_sorted(values, q)
    }

}
