use std::path::PathBuf;

use crate::anomaly::AnomalyConfig;
use crate::forecast::ForecastConfig;
use crate::types::DatasetKind;

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root holding one sub-directory of CSV exports per dataset kind.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub kinds: Vec<DatasetKind>,
    pub anomaly: AnomalyConfig,
    pub forecast: ForecastConfig,
    /// Rows shown per console preview table.
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("datasets"),
            output_dir: PathBuf::from("output"),
            kinds: DatasetKind::ALL.to_vec(),
            anomaly: AnomalyConfig::default(),
            forecast: ForecastConfig::default(),
            preview_rows: 5,
        }
    }
}

impl PipelineConfig {
    pub fn cleaned_path(&self, kind: DatasetKind) -> PathBuf {
        self.output_dir
            .join("cleaned_data")
            .join(format!("aadhaar_{}_cleaned.csv", kind.name()))
    }

    pub fn anomaly_path(&self, kind: DatasetKind) -> PathBuf {
        self.output_dir
            .join("anomaly_reports")
            .join(format!("{}_anomalies.csv", kind.name()))
    }

    pub fn forecast_path(&self, kind: DatasetKind) -> PathBuf {
        self.output_dir
            .join("predictions")
            .join(format!("{}_{}day_forecast.csv", kind.name(), self.forecast.horizon))
    }

    pub fn state_predictions_path(&self) -> PathBuf {
        self.output_dir.join("predictions").join("state_wise_predictions.csv")
    }

    pub fn state_summary_path(&self) -> PathBuf {
        self.output_dir.join("state_summary.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("summary.json")
    }
}
