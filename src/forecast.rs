//! Naive demand forecasting over the daily series of a cleaned dataset.
//!
//! The level is a blend of the last-7-day and last-30-day means, shaped by a
//! day-of-week profile and jittered with seeded Gaussian noise. Bounds come
//! from a pluggable [`IntervalPolicy`]; the default is a fixed ±20% band,
//! which is a heuristic and not a prediction interval.

use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::types::{CleanRecord, DatasetKind, ForecastPoint};
use crate::util::{average, serialize_dayfirst};

/// Turns a point forecast into `(lower, upper)` bounds.
pub trait IntervalPolicy: fmt::Debug + Send + Sync {
    fn bounds(&self, forecast: f64) -> (f64, f64);
}

/// Bounds at fixed multiples of the forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBand {
    pub lower_ratio: f64,
    pub upper_ratio: f64,
}

impl Default for FixedBand {
    fn default() -> Self {
        Self {
            lower_ratio: 0.8,
            upper_ratio: 1.2,
        }
    }
}

impl IntervalPolicy for FixedBand {
    fn bounds(&self, forecast: f64) -> (f64, f64) {
        (forecast * self.lower_ratio, forecast * self.upper_ratio)
    }
}

#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub horizon: usize,
    pub seed: u64,
    /// Noise standard deviation as a fraction of the base level.
    pub noise_ratio: f64,
    pub short_window: usize,
    pub long_window: usize,
    pub short_weight: f64,
    pub interval: Arc<dyn IntervalPolicy>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            seed: 42,
            noise_ratio: 0.05,
            short_window: 7,
            long_window: 30,
            short_weight: 0.6,
            interval: Arc::new(FixedBand::default()),
        }
    }
}

/// Fitted quantities behind a forecast, kept for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastModel {
    #[serde(serialize_with = "serialize_dayfirst")]
    pub last_date: NaiveDate,
    pub avg_7_day: f64,
    pub avg_30_day: f64,
    pub base_level: f64,
    /// Monday first.
    pub weekly_factors: [f64; 7],
    pub history_days: usize,
    pub total_records: usize,
}

#[derive(Debug, Clone)]
pub struct Forecast {
    pub model: ForecastModel,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn mean_per_day(&self) -> f64 {
        average(&self.points.iter().map(|p| p.forecast).collect::<Vec<_>>())
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.forecast).sum()
    }
}

/// Sum of `total` per calendar date, ascending.
pub fn daily_series(records: &[CleanRecord]) -> Vec<(NaiveDate, f64)> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for r in records {
        *by_date.entry(r.date).or_insert(0.0) += r.total as f64;
    }
    by_date.into_iter().collect()
}

/// Mean of each weekday's daily totals divided by the mean of those means.
/// Weekdays never observed get a factor of 1.0.
pub fn weekly_factors(series: &[(NaiveDate, f64)]) -> [f64; 7] {
    let mut sums = [(0.0f64, 0usize); 7];
    for (date, value) in series {
        let slot = &mut sums[date.weekday().num_days_from_monday() as usize];
        slot.0 += value;
        slot.1 += 1;
    }
    let means: Vec<(usize, f64)> = sums
        .iter()
        .enumerate()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(dow, (sum, n))| (dow, sum / *n as f64))
        .collect();
    let overall = average(&means.iter().map(|(_, m)| *m).collect::<Vec<_>>());

    let mut factors = [1.0; 7];
    if overall > 0.0 {
        for (dow, m) in means {
            factors[dow] = m / overall;
        }
    }
    factors
}

fn tail_mean(series: &[(NaiveDate, f64)], window: usize) -> f64 {
    let start = series.len().saturating_sub(window);
    average(&series[start..].iter().map(|(_, v)| *v).collect::<Vec<_>>())
}

/// Project `config.horizon` days past the last observed date.
///
/// Fails with [`PipelineError::InsufficientHistory`] when there is no
/// history to average, and with [`PipelineError::HorizonOutOfRange`] when
/// the last forecast date cannot be represented.
pub fn forecast_demand(kind: DatasetKind, records: &[CleanRecord], config: &ForecastConfig) -> Result<Forecast> {
    let series = daily_series(records);
    let Some(&(last_date, _)) = series.last() else {
        return Err(PipelineError::InsufficientHistory { kind });
    };

    let avg_7_day = tail_mean(&series, config.short_window);
    let avg_30_day = tail_mean(&series, config.long_window);
    let base_level = config.short_weight * avg_7_day + (1.0 - config.short_weight) * avg_30_day;
    let factors = weekly_factors(&series);
    let out_of_range = || PipelineError::HorizonOutOfRange {
        kind,
        horizon: config.horizon,
    };
    let horizon_days = u64::try_from(config.horizon).map_err(|_| out_of_range())?;
    if last_date.checked_add_days(Days::new(horizon_days)).is_none() {
        return Err(out_of_range());
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, base_level * config.noise_ratio).ok();

    let mut points = Vec::with_capacity(config.horizon);
    let mut date = last_date;
    for _ in 0..config.horizon {
        date = date.succ_opt().ok_or_else(out_of_range)?;
        let factor = factors[date.weekday().num_days_from_monday() as usize];
        let jitter = noise.as_ref().map_or(0.0, |n| n.sample(&mut rng));
        let forecast = (base_level * factor + jitter).max(0.0);
        let (lower_bound, upper_bound) = config.interval.bounds(forecast);
        points.push(ForecastPoint {
            date,
            forecast,
            lower_bound,
            upper_bound,
        });
    }

    let model = ForecastModel {
        last_date,
        avg_7_day,
        avg_30_day,
        base_level,
        weekly_factors: factors,
        history_days: series.len(),
        total_records: records.len(),
    };
    info!(
        %kind,
        %last_date,
        history_days = model.history_days,
        horizon = config.horizon,
        base_level = %format!("{:.1}", base_level),
        "forecast generated"
    );

    Ok(Forecast { model, points })
}
