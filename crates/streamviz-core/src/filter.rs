//! Category, value and time-range filtering of a sample series.
//!
//! Time-range presets are anchored at the newest sample in the input rather
//! than the wall clock, so a stopped stream or a historical dataset still
//! shows its last minute.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sample::{Category, Sample};

/// Named look-back windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::OneHour,
        Self::All,
    ];

    /// Look-back in milliseconds; `None` for [`TimeRange::All`].
    pub fn as_millis(self) -> Option<i64> {
        match self {
            Self::OneMinute => Some(60_000),
            Self::FiveMinutes => Some(300_000),
            Self::FifteenMinutes => Some(900_000),
            Self::OneHour => Some(3_600_000),
            Self::All => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::OneHour => "1hour",
            Self::All => "all",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::OneMinute => Self::FiveMinutes,
            Self::FiveMinutes => Self::FifteenMinutes,
            Self::FifteenMinutes => Self::OneHour,
            Self::OneHour => Self::All,
            Self::All => Self::OneMinute,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                format!("unknown time range '{s}' (expected 1min|5min|15min|1hour|all)")
            })
    }
}

/// Which samples a view keeps. The default keeps everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// Categories to keep. Empty keeps every category.
    pub categories: Vec<Category>,
    /// Inclusive `(min, max)` value bounds. An inverted or NaN bound keeps
    /// nothing.
    pub value_range: Option<(f64, f64)>,
    pub time_range: TimeRange,
}

impl FilterConfig {
    /// True when [`filter`] would return its input unchanged.
    pub fn is_pass_through(&self) -> bool {
        self.categories.is_empty() && self.value_range.is_none() && self.time_range == TimeRange::All
    }

    fn keeps_category(&self, category: Category) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }

    fn keeps_value(&self, value: f64) -> bool {
        match self.value_range {
            Some((lo, hi)) => lo <= value && value <= hi,
            None => true,
        }
    }
}

/// Samples of `samples` that pass every criterion of `config`, in input
/// order.
pub fn filter(samples: &[Sample], config: &FilterConfig) -> Vec<Sample> {
    let cutoff = config.time_range.as_millis().and_then(|span| {
        samples
            .iter()
            .map(|s| s.timestamp)
            .max()
            .map(|newest| newest.saturating_sub(span))
    });

    samples
        .iter()
        .filter(|s| cutoff.is_none_or(|c| s.timestamp >= c))
        .filter(|s| config.keeps_category(s.category))
        .filter(|s| config.keeps_value(s.value))
        .copied()
        .collect()
}

/// [`filter`] over a shared snapshot. A pass-through config hands back the
/// same allocation.
pub fn filter_snapshot(snapshot: Arc<[Sample]>, config: &FilterConfig) -> Arc<[Sample]> {
    if config.is_pass_through() {
        snapshot
    } else {
        filter(&snapshot, config).into()
    }
}
