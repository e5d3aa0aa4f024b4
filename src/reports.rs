use chrono::Duration;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::anomaly::AnomalyResult;
use crate::types::{CleanRecord, DatasetKind, StatePredictionRow, StateSummaryRow};
use crate::util::average;

const TOP_N: usize = 5;
const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnomalyAnalysis {
    pub total_anomalies: usize,
    /// Percent of scored records.
    pub anomaly_rate: f64,
    pub mean_anomaly_value: f64,
    pub max_anomaly_value: u64,
    pub top_states: Vec<(String, usize)>,
    pub top_districts: Vec<(String, usize)>,
}

/// Where the flagged records concentrate.
pub fn generate_anomaly_analysis(records: &[CleanRecord], result: &AnomalyResult) -> AnomalyAnalysis {
    let flagged: Vec<&CleanRecord> = records
        .iter()
        .zip(&result.flags)
        .filter(|(_, f)| f.is_anomaly)
        .map(|(r, _)| r)
        .collect();

    let totals: Vec<f64> = flagged.iter().map(|r| r.total as f64).collect();
    let anomaly_rate = if records.is_empty() {
        0.0
    } else {
        flagged.len() as f64 / records.len() as f64 * 100.0
    };

    AnomalyAnalysis {
        total_anomalies: flagged.len(),
        anomaly_rate,
        mean_anomaly_value: average(&totals),
        max_anomaly_value: flagged.iter().map(|r| r.total).max().unwrap_or(0),
        top_states: top_counts(flagged.iter().map(|r| r.state.as_str())),
        top_districts: top_counts(flagged.iter().map(|r| r.district.as_str())),
    }
}

/// Most frequent keys, count descending then name ascending.
fn top_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for k in keys {
        *counts.entry(k).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_N)
        .map(|(k, n)| (k.to_string(), n))
        .collect()
}

/// Per-state mean record total over the last 30 days of data, scaled to a
/// month. States are sorted by name.
pub fn generate_state_predictions(kind: DatasetKind, records: &[CleanRecord]) -> Vec<StatePredictionRow> {
    let Some(last_date) = records.iter().map(|r| r.date).max() else {
        return Vec::new();
    };
    let cutoff = last_date - Duration::days(RECENT_WINDOW_DAYS);

    let mut by_state: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.date >= cutoff) {
        by_state.entry(r.state.as_str()).or_default().push(r.total as f64);
    }

    by_state
        .into_iter()
        .map(|(state, totals)| {
            let daily = average(&totals);
            StatePredictionRow {
                state: state.to_string(),
                predicted_daily_avg: daily,
                update_type: kind.name().to_string(),
                predicted_monthly: daily * RECENT_WINDOW_DAYS as f64,
            }
        })
        .collect()
}

/// Record counts per state across kinds, sorted by state.
pub fn generate_state_summary(datasets: &[(DatasetKind, &[CleanRecord])]) -> Vec<StateSummaryRow> {
    let mut map: BTreeMap<&str, StateSummaryRow> = BTreeMap::new();
    for (kind, records) in datasets {
        for r in records.iter() {
            let row = map.entry(r.state.as_str()).or_insert_with(|| StateSummaryRow {
                state: r.state.clone(),
                enrolment: 0,
                biometric: 0,
                demographic: 0,
            });
            match kind {
                DatasetKind::Enrolment => row.enrolment += 1,
                DatasetKind::Biometric => row.biometric += 1,
                DatasetKind::Demographic => row.demographic += 1,
            }
        }
    }
    map.into_values().collect()
}

/// States ordered by combined record count, largest first.
pub fn busiest_states(summary: &[StateSummaryRow]) -> Vec<StateSummaryRow> {
    let mut rows = summary.to_vec();
    rows.sort_by(|a, b| {
        let ta = a.enrolment + a.biometric + a.demographic;
        let tb = b.enrolment + b.biometric + b.demographic;
        tb.cmp(&ta).then_with(|| a.state.cmp(&b.state))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyFlag;
    use chrono::NaiveDate;

    fn record(day: u32, state: &str, district: &str, total: u64) -> CleanRecord {
        CleanRecord::new(
            NaiveDate::from_ymd_opt(2025, 12, day).unwrap(),
            state.into(),
            district.into(),
            None,
            vec![total],
        )
    }

    fn flags(bits: &[bool]) -> AnomalyResult {
        let flags: Vec<AnomalyFlag> = bits
            .iter()
            .map(|&b| AnomalyFlag {
                is_anomaly: b,
                anomaly_score: if b { 0.2 } else { -0.1 },
            })
            .collect();
        let flagged = bits.iter().filter(|b| **b).count();
        AnomalyResult {
            flagged,
            flagged_fraction: flagged as f64 / bits.len() as f64,
            flags,
        }
    }

    #[test]
    fn analysis_counts_flagged_records() {
        let records = vec![
            record(1, "Kerala", "Kochi", 10),
            record(1, "Kerala", "Kochi", 900),
            record(2, "Assam", "Kamrup", 700),
            record(2, "Kerala", "Idukki", 500),
        ];
        let analysis = generate_anomaly_analysis(&records, &flags(&[false, true, true, true]));
        assert_eq!(analysis.total_anomalies, 3);
        assert_eq!(analysis.anomaly_rate, 75.0);
        assert_eq!(analysis.max_anomaly_value, 900);
        assert_eq!(analysis.mean_anomaly_value, 700.0);
        assert_eq!(analysis.top_states, vec![("Kerala".to_string(), 2), ("Assam".to_string(), 1)]);
        assert_eq!(analysis.top_districts[0], ("Idukki".to_string(), 1));
    }

    #[test]
    fn state_predictions_use_recent_window() {
        let mut records = vec![record(31, "Goa", "North Goa", 40), record(31, "Goa", "South Goa", 20)];
        records.push(CleanRecord::new(
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            "Goa".into(),
            "North Goa".into(),
            None,
            vec![9_000],
        ));
        records.push(record(1, "Bihar", "Patna", 12));

        let rows = generate_state_predictions(DatasetKind::Biometric, &records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, "Bihar");
        assert_eq!(rows[1].state, "Goa");
        assert_eq!(rows[1].predicted_daily_avg, 30.0);
        assert_eq!(rows[1].predicted_monthly, 900.0);
        assert_eq!(rows[1].update_type, "biometric");
    }

    #[test]
    fn state_summary_merges_kinds() {
        let e = vec![record(1, "Goa", "a", 1), record(2, "Goa", "a", 1)];
        let b = vec![record(1, "Assam", "b", 1)];
        let summary = generate_state_summary(&[
            (DatasetKind::Enrolment, e.as_slice()),
            (DatasetKind::Biometric, b.as_slice()),
        ]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].state, "Assam");
        assert_eq!(summary[0].biometric, 1);
        assert_eq!(summary[1].enrolment, 2);
        assert_eq!(summary[1].demographic, 0);
        assert_eq!(busiest_states(&summary)[0].state, "Goa");
    }
}
