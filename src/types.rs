use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

use crate::util::{display_score, serialize_dayfirst};

/// The three Aadhaar record families that are cleaned and analysed
/// independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Enrolment,
    Biometric,
    Demographic,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Enrolment,
        DatasetKind::Biometric,
        DatasetKind::Demographic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Enrolment => "enrolment",
            DatasetKind::Biometric => "biometric",
            DatasetKind::Demographic => "demographic",
        }
    }

    /// Sub-directory of the input root holding this kind's CSV exports.
    pub fn source_dir(self) -> &'static str {
        match self {
            DatasetKind::Enrolment => "api_data_aadhar_enrolment",
            DatasetKind::Biometric => "api_data_aadhar_biometric",
            DatasetKind::Demographic => "api_data_aadhar_demographic",
        }
    }

    /// Kind-specific count columns, in file order. `total` is their sum.
    pub fn count_columns(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Enrolment => &["age_0_5", "age_5_17", "age_18_greater"],
            DatasetKind::Biometric => &["bio_age_5_17", "bio_age_17_"],
            DatasetKind::Demographic => &["demo_age_5_17", "demo_age_17_"],
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row as read from a source file, before canonicalization.
///
/// Equality and hashing cover every column, which is what duplicate removal
/// keys on. Missing counts stay `None` until the cleaner fills them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub state: Option<String>,
    pub district: String,
    pub pincode: Option<String>,
    pub counts: Vec<Option<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRecord {
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    pub pincode: Option<String>,
    pub counts: Vec<u64>,
    pub total: u64,
}

impl CleanRecord {
    pub fn new(
        date: NaiveDate,
        state: String,
        district: String,
        pincode: Option<String>,
        counts: Vec<u64>,
    ) -> Self {
        let total = saturating_total(&counts);
        Self {
            date,
            state,
            district,
            pincode,
            counts,
            total,
        }
    }

    pub fn derived_total(&self) -> u64 {
        saturating_total(&self.counts)
    }
}

fn saturating_total(counts: &[u64]) -> u64 {
    counts.iter().fold(0u64, |acc, &c| acc.saturating_add(c))
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AnomalyRow {
    #[serde(serialize_with = "serialize_dayfirst")]
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    pub pincode: String,
    pub total: u64,
    #[tabled(display_with = "display_score")]
    pub anomaly_score: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ForecastPoint {
    #[serde(serialize_with = "serialize_dayfirst")]
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StatePredictionRow {
    pub state: String,
    #[tabled(display_with = "display_score")]
    pub predicted_daily_avg: f64,
    pub update_type: String,
    #[tabled(display_with = "display_score")]
    pub predicted_monthly: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct StateSummaryRow {
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "Enrolment")]
    #[tabled(rename = "Enrolment")]
    pub enrolment: usize,
    #[serde(rename = "Biometric")]
    #[tabled(rename = "Biometric")]
    pub biometric: usize,
    #[serde(rename = "Demographic")]
    #[tabled(rename = "Demographic")]
    pub demographic: usize,
}

/// One console line per processed kind.
#[derive(Debug, Tabled, Clone)]
pub struct KindOverviewRow {
    #[tabled(rename = "Dataset")]
    pub kind: String,
    #[tabled(rename = "Rows")]
    pub rows_read: String,
    #[tabled(rename = "UnknownState")]
    pub unknown_removed: String,
    #[tabled(rename = "Duplicates")]
    pub duplicates_removed: String,
    #[tabled(rename = "FinalRows")]
    pub final_rows: String,
    #[tabled(rename = "Anomalies")]
    pub anomalies: String,
    #[tabled(rename = "ForecastAvgPerDay")]
    pub forecast_avg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let r = CleanRecord::new(date, "Goa".into(), "North Goa".into(), None, vec![u64::MAX, 7]);
        assert_eq!(r.total, u64::MAX);
        assert_eq!(r.derived_total(), u64::MAX);

        let r = CleanRecord::new(date, "Goa".into(), "North Goa".into(), None, vec![4, 6]);
        assert_eq!(r.total, 10);
    }

    #[test]
    fn forecast_dates_serialize_day_first() {
        let point = ForecastPoint {
            date: NaiveDate::from_ymd_opt(2025, 10, 11).unwrap(),
            forecast: 12.5,
            lower_bound: 10.0,
            upper_bound: 15.0,
        };
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(&point).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(out, "date,forecast,lower_bound,upper_bound\n11-10-2025,12.5,10.0,15.0\n");
    }
}
