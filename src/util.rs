// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use serde::Serializer;

/// Day-first formats seen in the exports, tried in order. ISO dates are
/// accepted last for files re-exported by spreadsheet tools.
const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];

pub const DAYFIRST_FORMAT: &str = "%d-%m-%Y";

/// Parse a count cell.
///
/// - Blank cells are a missing value (`Ok(None)`), filled later by the cleaner.
/// - Thousands separators are stripped.
/// - Integral floats such as `12.0` are accepted since spreadsheet exports
///   write counts that way once a column has had a gap.
/// - Negative, fractional or non-numeric text is an error.
pub fn parse_count_safe(s: Option<&str>) -> Result<Option<u64>, String> {
    let Some(s) = s.map(str::trim) else {
        return Ok(None);
    };
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let cleaned = s.replace(',', "");
    if let Ok(v) = cleaned.parse::<u64>() {
        return Ok(Some(v));
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as u64)),
        _ => Err(format!("invalid count value '{s}'")),
    }
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Optional free-text cell: trimmed, with blanks mapped to `None`.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Sample standard deviation (n - 1 denominator). `None` below two values.
pub fn sample_std(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v);
    let ss: f64 = v.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (v.len() - 1) as f64).sqrt())
}

/// Population standard deviation (n denominator), as used for feature scaling.
pub fn population_std(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean = average(v);
    let ss: f64 = v.iter().map(|x| (x - mean).powi(2)).sum();
    (ss / v.len() as f64).sqrt()
}

/// Percentile with linear interpolation between closest ranks.
/// `q` is in `[0, 100]`.
pub fn percentile(v: &[f64], q: f64) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Beyond u128 the digits are kept without separators.
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => int_part.to_string(),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

pub fn serialize_dayfirst<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&date.format(DAYFIRST_FORMAT))
}

pub fn display_score(v: &f64) -> String {
    format_number(*v, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_parsing_handles_blanks_floats_and_garbage() {
        assert_eq!(parse_count_safe(Some("  ")), Ok(None));
        assert_eq!(parse_count_safe(None), Ok(None));
        assert_eq!(parse_count_safe(Some("1,204")), Ok(Some(1204)));
        assert_eq!(parse_count_safe(Some("17.0")), Ok(Some(17)));
        assert!(parse_count_safe(Some("-3")).is_err());
        assert!(parse_count_safe(Some("2.5")).is_err());
        assert!(parse_count_safe(Some("abc")).is_err());
    }

    #[test]
    fn dates_are_day_first() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert_eq!(parse_date_safe(Some("04-03-2025")), Some(d));
        assert_eq!(parse_date_safe(Some("04/03/2025")), Some(d));
        assert_eq!(parse_date_safe(Some("2025-03-04")), Some(d));
        assert_eq!(parse_date_safe(Some("31-31-2025")), None);
    }

    #[test]
    fn std_variants() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&v) - 2.0).abs() < 1e-12);
        assert!((sample_std(&v).unwrap() - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert!((percentile(&v, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.5, 1), "-0.5");
        assert_eq!(format_int(9855usize), "9,855");
    }

    #[test]
    fn number_formatting_keeps_integer_parts_past_i64() {
        assert_eq!(format_number(1e20, 0), "100,000,000,000,000,000,000");
        assert_eq!(format_number(1e40, 0).len(), 41);
    }
}
