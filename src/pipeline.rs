//! Whole-run orchestration.
//!
//! Each dataset kind goes load -> clean -> flag -> forecast independently and
//! writes its own files. Kinds run on the rayon pool; a failure in one kind is
//! recorded and does not stop the others. Cross-kind outputs (state summary,
//! state-wise predictions, `summary.json`) are written from whatever
//! succeeded.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::anomaly::{anomaly_rows, flag_anomalies, AnomalyResult};
use crate::cleaner::{clean_dataset, CleanReport, CleanedDataset};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::forecast::{forecast_demand, Forecast, ForecastModel};
use crate::loader::{load_kind, LoadReport};
use crate::output::{write_cleaned, write_csv, write_json};
use crate::reports::{
    generate_anomaly_analysis, generate_state_predictions, generate_state_summary, AnomalyAnalysis,
};
use crate::types::{AnomalyRow, DatasetKind, KindOverviewRow, StatePredictionRow, StateSummaryRow};
use crate::util::{format_int, format_number};

/// Everything computed for one dataset kind.
#[derive(Debug, Clone)]
pub struct KindOutcome {
    pub kind: DatasetKind,
    pub load: LoadReport,
    pub dataset: CleanedDataset,
    pub anomalies: AnomalyResult,
    pub anomaly_rows: Vec<AnomalyRow>,
    pub analysis: AnomalyAnalysis,
    /// `None` when the cleaned dataset had no history to project from.
    pub forecast: Option<Forecast>,
    pub state_predictions: Vec<StatePredictionRow>,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<KindOutcome>,
    pub failures: Vec<(DatasetKind, PipelineError)>,
    pub state_summary: Vec<StateSummaryRow>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn overview_rows(&self) -> Vec<KindOverviewRow> {
        self.outcomes
            .iter()
            .map(|o| KindOverviewRow {
                kind: o.kind.to_string(),
                rows_read: format_int(o.dataset.report.original_rows),
                unknown_removed: format_int(o.dataset.report.unknown_removed),
                duplicates_removed: format_int(o.dataset.report.duplicates_removed),
                final_rows: format_int(o.dataset.report.final_rows),
                anomalies: format_int(o.anomalies.flagged),
                forecast_avg: o
                    .forecast
                    .as_ref()
                    .map_or_else(|| "insufficient history".to_string(), |f| format_number(f.mean_per_day(), 2)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastSummary {
    pub status: &'static str,
    pub model: Option<ForecastModel>,
    pub mean_per_day: Option<f64>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub kind: DatasetKind,
    pub load: LoadReport,
    pub cleaning: CleanReport,
    pub anomalies: AnomalyAnalysis,
    pub forecast: ForecastSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub kind: DatasetKind,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub kinds: Vec<KindSummary>,
    pub failures: Vec<FailureSummary>,
    pub total_records: usize,
    pub total_anomalies: usize,
    /// Percent of all analysed records.
    pub overall_anomaly_rate: f64,
}

/// Run every configured kind once, in kind order, then write the cross-kind
/// outputs.
///
/// Per-kind failures land in [`RunReport::failures`]; only a failure to write
/// the shared outputs is returned as an error. The shared CSVs are written on
/// every run, with no rows when nothing succeeded.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    let mut kinds = config.kinds.clone();
    kinds.sort();
    kinds.dedup();
    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        kinds = kinds.len(),
        "starting pipeline"
    );

    let results: Vec<(DatasetKind, Result<KindOutcome>)> = kinds
        .par_iter()
        .map(|&kind| (kind, process_kind(config, kind)))
        .collect();

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for (kind, result) in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(%kind, error = %e, "dataset processing failed");
                failures.push((kind, e));
            }
        }
    }

    let predictions: Vec<StatePredictionRow> = outcomes
        .iter()
        .flat_map(|o| o.state_predictions.iter().cloned())
        .collect();
    write_csv(&config.state_predictions_path(), &predictions)?;

    let datasets: Vec<(DatasetKind, &[_])> = outcomes
        .iter()
        .map(|o| (o.kind, o.dataset.records.as_slice()))
        .collect();
    let state_summary = generate_state_summary(&datasets);
    write_csv(&config.state_summary_path(), &state_summary)?;

    let summary = summarize(&outcomes, &failures);
    write_json(&config.summary_path(), &summary)?;
    info!(
        succeeded = outcomes.len(),
        failed = failures.len(),
        records = summary.total_records,
        anomalies = summary.total_anomalies,
        "pipeline finished"
    );

    Ok(RunReport {
        outcomes,
        failures,
        state_summary,
        summary,
    })
}

/// Load, clean, score and forecast one kind, writing its per-kind files.
pub fn process_kind(config: &PipelineConfig, kind: DatasetKind) -> Result<KindOutcome> {
    let (rows, load) = load_kind(&config.input_dir, kind)?;
    let dataset = clean_dataset(kind, rows);
    write_cleaned(&config.cleaned_path(kind), kind, &dataset.records)?;

    let anomalies = flag_anomalies(kind, &dataset.records, &config.anomaly);
    let rows = anomaly_rows(&dataset.records, &anomalies);
    write_csv(&config.anomaly_path(kind), &rows)?;
    let analysis = generate_anomaly_analysis(&dataset.records, &anomalies);

    let forecast = match forecast_demand(kind, &dataset.records, &config.forecast) {
        Ok(f) => {
            write_csv(&config.forecast_path(kind), &f.points)?;
            Some(f)
        }
        Err(PipelineError::InsufficientHistory { .. }) => {
            warn!(%kind, "no history left after cleaning; forecast skipped");
            None
        }
        Err(e) => return Err(e),
    };

    let state_predictions = generate_state_predictions(kind, &dataset.records);

    Ok(KindOutcome {
        kind,
        load,
        dataset,
        anomalies,
        anomaly_rows: rows,
        analysis,
        forecast,
        state_predictions,
    })
}

fn summarize(outcomes: &[KindOutcome], failures: &[(DatasetKind, PipelineError)]) -> RunSummary {
    let kinds: Vec<KindSummary> = outcomes
        .iter()
        .map(|o| KindSummary {
            kind: o.kind,
            load: o.load.clone(),
            cleaning: o.dataset.report.clone(),
            anomalies: o.analysis.clone(),
            forecast: match &o.forecast {
                Some(f) => ForecastSummary {
                    status: "ok",
                    model: Some(f.model.clone()),
                    mean_per_day: Some(f.mean_per_day()),
                    total: Some(f.total()),
                },
                None => ForecastSummary {
                    status: "insufficient history",
                    model: None,
                    mean_per_day: None,
                    total: None,
                },
            },
        })
        .collect();

    let total_records: usize = outcomes.iter().map(|o| o.dataset.records.len()).sum();
    let total_anomalies: usize = outcomes.iter().map(|o| o.anomalies.flagged).sum();
    let overall_anomaly_rate = if total_records == 0 {
        0.0
    } else {
        total_anomalies as f64 / total_records as f64 * 100.0
    };

    RunSummary {
        kinds,
        failures: failures
            .iter()
            .map(|(kind, e)| FailureSummary {
                kind: *kind,
                error: e.to_string(),
            })
            .collect(),
        total_records,
        total_anomalies,
        overall_anomaly_rate,
    }
}
