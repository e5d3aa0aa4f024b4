//! Per-record anomaly flagging over a cleaned dataset.

use clap::ValueEnum;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::isolation::{IsolationForest, IsolationForestParams, StandardScaler};
use crate::types::{AnomalyRow, CleanRecord, DatasetKind};
use crate::util::{average, sample_std};

/// Which per-record features feed the isolation forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSet {
    /// `total` and its z-score.
    Basic,
    /// Basic plus relative deviation from the state and district means.
    Grouped,
}

#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// Expected outlier fraction.
    pub contamination: f64,
    pub n_estimators: usize,
    pub max_samples: Option<usize>,
    pub seed: u64,
    pub features: FeatureSet,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.01,
            n_estimators: 100,
            max_samples: None,
            seed: 42,
            features: FeatureSet::Grouped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyFlag {
    pub is_anomaly: bool,
    /// Higher means more unusual.
    pub anomaly_score: f64,
}

/// Flags aligned index-for-index with the scored records.
#[derive(Debug, Clone)]
pub struct AnomalyResult {
    pub flags: Vec<AnomalyFlag>,
    pub flagged: usize,
    pub flagged_fraction: f64,
}

/// Score every record and flag roughly the top `contamination` share.
///
/// Fewer than two records cannot be scored; they come back unflagged with
/// a score of zero.
pub fn flag_anomalies(kind: DatasetKind, records: &[CleanRecord], config: &AnomalyConfig) -> AnomalyResult {
    if records.len() < 2 {
        debug!(%kind, rows = records.len(), "too few rows to score anomalies");
        return AnomalyResult {
            flags: vec![
                AnomalyFlag {
                    is_anomaly: false,
                    anomaly_score: 0.0,
                };
                records.len()
            ],
            flagged: 0,
            flagged_fraction: 0.0,
        };
    }

    let features = build_features(records, config.features);
    let scaled = StandardScaler::fit_transform(&features);
    let params = IsolationForestParams {
        n_estimators: config.n_estimators,
        max_samples: config.max_samples,
        contamination: config.contamination,
        seed: config.seed,
    };
    let forest = IsolationForest::fit(&scaled, &params);
    debug!(%kind, offset = forest.offset(), "isolation forest fitted");
    let flags: Vec<AnomalyFlag> = forest
        .decision_function(&scaled)
        .into_iter()
        .map(|d| AnomalyFlag {
            is_anomaly: d < 0.0,
            anomaly_score: -d,
        })
        .collect();

    let flagged = flags.iter().filter(|f| f.is_anomaly).count();
    let flagged_fraction = flagged as f64 / records.len() as f64;
    info!(
        %kind,
        rows = records.len(),
        flagged,
        rate_pct = %format!("{:.2}", flagged_fraction * 100.0),
        "anomaly detection complete"
    );

    AnomalyResult {
        flags,
        flagged,
        flagged_fraction,
    }
}

/// Feature matrix, one row per record.
pub fn build_features(records: &[CleanRecord], set: FeatureSet) -> Vec<Vec<f64>> {
    let totals: Vec<f64> = records.iter().map(|r| r.total as f64).collect();
    let mean = average(&totals);
    let std = sample_std(&totals).filter(|s| *s > 0.0 && s.is_finite());

    let group_means = match set {
        FeatureSet::Basic => None,
        FeatureSet::Grouped => Some((
            group_means(records, |r| r.state.as_str()),
            group_means(records, |r| r.district.as_str()),
        )),
    };

    records
        .iter()
        .zip(&totals)
        .map(|(r, &total)| {
            let z = std.map_or(0.0, |s| (total - mean) / s);
            let mut row = vec![total, z];
            if let Some((by_state, by_district)) = &group_means {
                row.push(relative_deviation(total, by_state[r.state.as_str()]));
                row.push(relative_deviation(total, by_district[r.district.as_str()]));
            }
            row
        })
        .collect()
}

fn group_means<'a, F>(records: &'a [CleanRecord], key: F) -> HashMap<&'a str, f64>
where
    F: Fn(&'a CleanRecord) -> &'a str,
{
    let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for r in records {
        let e = acc.entry(key(r)).or_insert((0.0, 0));
        e.0 += r.total as f64;
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

fn relative_deviation(total: f64, group_mean: f64) -> f64 {
    (total - group_mean) / group_mean.max(1.0)
}

/// Flagged records only, most anomalous first.
pub fn anomaly_rows(records: &[CleanRecord], result: &AnomalyResult) -> Vec<AnomalyRow> {
    let mut rows: Vec<AnomalyRow> = records
        .iter()
        .zip(&result.flags)
        .filter(|(_, f)| f.is_anomaly)
        .map(|(r, f)| AnomalyRow {
            date: r.date,
            state: r.state.clone(),
            district: r.district.clone(),
            pincode: r.pincode.clone().unwrap_or_default(),
            total: r.total,
            anomaly_score: f.anomaly_score,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.anomaly_score
            .partial_cmp(&a.anomaly_score)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(i: usize, total: u64) -> CleanRecord {
        let states = ["Bihar", "Kerala", "Assam"];
        CleanRecord::new(
            NaiveDate::from_ymd_opt(2025, 10, 1 + (i % 28) as u32).unwrap(),
            states[i % 3].to_string(),
            format!("District {}", i % 9),
            Some(format!("8{:05}", i)),
            vec![total, 0],
        )
    }

    fn spiked_dataset() -> Vec<CleanRecord> {
        let mut records: Vec<CleanRecord> = (0..199).map(|i| record(i, 100 + (i % 5) as u64)).collect();
        records.push(record(199, 20_300));
        records
    }

    #[test]
    fn spike_is_flagged_with_highest_score() {
        for features in [FeatureSet::Basic, FeatureSet::Grouped] {
            let records = spiked_dataset();
            let config = AnomalyConfig {
                features,
                ..Default::default()
            };
            let result = flag_anomalies(DatasetKind::Enrolment, &records, &config);
            let spike = &result.flags[199];
            assert!(spike.is_anomaly);
            let max = result
                .flags
                .iter()
                .map(|f| f.anomaly_score)
                .fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(spike.anomaly_score, max);
            assert!(result.flagged >= 1 && result.flagged <= 3);

            let rows = anomaly_rows(&records, &result);
            assert_eq!(rows[0].total, 20_300);
            assert!(rows.windows(2).all(|w| w[0].anomaly_score >= w[1].anomaly_score));
        }
    }

    #[test]
    fn flags_are_reproducible_for_a_seed() {
        let records = spiked_dataset();
        let config = AnomalyConfig::default();
        let a = flag_anomalies(DatasetKind::Biometric, &records, &config);
        let b = flag_anomalies(DatasetKind::Biometric, &records, &config);
        assert_eq!(a.flags, b.flags);
    }

    #[test]
    fn identical_totals_give_zero_z() {
        let records: Vec<CleanRecord> = (0..10).map(|i| record(i, 50)).collect();
        let features = build_features(&records, FeatureSet::Grouped);
        assert!(features.iter().all(|row| row[1] == 0.0));
        assert!(features.iter().all(|row| row[2] == 0.0 && row[3] == 0.0));
    }

    #[test]
    fn group_deviation_clips_small_means() {
        let mut records: Vec<CleanRecord> = [0, 9, 18].iter().map(|&i| record(i, 0)).collect();
        records.push(record(27, 1));
        // all in Bihar, district 0; mean 0.25 is clipped to 1
        let features = build_features(&records, FeatureSet::Grouped);
        assert!((features[3][2] - 0.75).abs() < 1e-12);
        assert!((features[3][3] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn tiny_datasets_are_not_scored() {
        let records = vec![record(0, 5)];
        let result = flag_anomalies(DatasetKind::Demographic, &records, &AnomalyConfig::default());
        assert_eq!(result.flagged, 0);
        assert_eq!(result.flags.len(), 1);
        assert_eq!(result.flags[0].anomaly_score, 0.0);
    }
}
