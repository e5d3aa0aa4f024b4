// Entry point: parse flags, run the whole pipeline once, print previews.
//
// Every dataset kind is processed even if another one fails; the exit code
// is non-zero when any kind failed or the shared outputs could not be
// written.
use std::path::PathBuf;
use std::process::ExitCode;

use aadhaar_insights::anomaly::FeatureSet;
use aadhaar_insights::config::PipelineConfig;
use aadhaar_insights::output::preview_table;
use aadhaar_insights::pipeline::{self, RunReport};
use aadhaar_insights::reports::busiest_states;
use aadhaar_insights::types::DatasetKind;
use aadhaar_insights::util::{format_int, format_number};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "aadhaar-insights",
    version,
    about = "Clean Aadhaar enrolment/update exports, flag anomalies and forecast demand"
)]
struct Cli {
    /// Directory holding one sub-directory of CSV exports per dataset kind.
    #[arg(long, default_value = "datasets")]
    input_dir: PathBuf,

    /// Where cleaned data, reports and predictions are written.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Dataset kinds to process (repeatable). Defaults to all three.
    #[arg(long = "kind", value_enum)]
    kinds: Vec<DatasetKind>,

    /// Days to forecast past the last observed date.
    #[arg(long, default_value_t = 30)]
    horizon: usize,

    /// Seed for both the anomaly model and the forecast noise.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Expected share of anomalous records.
    #[arg(long, default_value_t = 0.01)]
    contamination: f64,

    /// Number of isolation trees.
    #[arg(long, default_value_t = 100)]
    trees: usize,

    /// Score on total and z-score only, without state/district deviations.
    #[arg(long)]
    basic_features: bool,

    /// Rows shown in each console preview table.
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig {
            input_dir: self.input_dir,
            output_dir: self.output_dir,
            preview_rows: self.preview_rows,
            ..Default::default()
        };
        if !self.kinds.is_empty() {
            config.kinds = self.kinds;
        }
        config.anomaly.seed = self.seed;
        config.anomaly.contamination = self.contamination;
        config.anomaly.n_estimators = self.trees;
        if self.basic_features {
            config.anomaly.features = FeatureSet::Basic;
        }
        config.forecast.seed = self.seed;
        config.forecast.horizon = self.horizon;
        config
    }
}

fn print_report(report: &RunReport, config: &PipelineConfig) {
    let rows = config.preview_rows;
    preview_table(
        "Dataset Overview",
        Some("rows after parsing, drops from cleaning, anomalies flagged"),
        &report.overview_rows(),
        report.outcomes.len(),
    );

    for outcome in &report.outcomes {
        preview_table(
            &format!("Top {} Anomalies", outcome.kind),
            Some(
                format!(
                    "{} flagged, {}% of records",
                    format_int(outcome.anomalies.flagged),
                    format_number(outcome.anomalies.flagged_fraction * 100.0, 2)
                )
                .as_str(),
            ),
            &outcome.anomaly_rows,
            rows,
        );
    }

    preview_table(
        "Busiest States",
        Some(format!("{} states/UTs after cleaning", report.state_summary.len()).as_str()),
        &busiest_states(&report.state_summary),
        rows,
    );

    println!(
        "Records analysed: {} | anomalies flagged: {} ({}%)",
        format_int(report.summary.total_records),
        format_int(report.summary.total_anomalies),
        format_number(report.summary.overall_anomaly_rate, 2)
    );
    println!("Outputs saved under {}\n", config.output_dir.display());
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config();
    match pipeline::run(&config) {
        Ok(report) => {
            print_report(&report, &config);
            for (kind, err) in &report.failures {
                eprintln!("{kind}: {err}");
            }
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
