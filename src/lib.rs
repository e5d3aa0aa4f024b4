//! Cleaning and lightweight analytics for anonymised Aadhaar enrolment and
//! update exports.
//!
//! The binary (`aadhaar-insights`) only parses flags and prints previews;
//! everything else lives here so it can be tested without spawning processes:
//!
//! - [`canonical`]: free-text state labels to official state/UT names
//! - [`cleaner`]: canonicalize, drop unknown and duplicate rows, fill counts
//! - [`anomaly`] / [`isolation`]: seeded isolation-forest outlier flags
//! - [`forecast`]: moving-average demand forecast with weekly seasonality
//! - [`pipeline`]: per-kind orchestration and output files

pub mod anomaly;
pub mod canonical;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod forecast;
pub mod isolation;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod types;
pub mod util;
