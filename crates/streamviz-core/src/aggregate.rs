//! Bucket aggregation and downsampling.
//!
//! Both transforms are pure: they read a sample slice and allocate a new
//! series (or borrow the input unchanged when no reduction is needed).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sample::{Category, Metadata, Sample};

// ---------------------------------------------------------------------------
// Reducer / period
// ---------------------------------------------------------------------------

/// How the values of one bucket are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Avg,
    Sum,
    Min,
    Max,
}

impl Reducer {
    pub const ALL: [Reducer; 4] = [Self::Avg, Self::Sum, Self::Min, Self::Max];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// The following reducer, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Self::Avg => Self::Sum,
            Self::Sum => Self::Min,
            Self::Min => Self::Max,
            Self::Max => Self::Avg,
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reducer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avg" | "mean" => Ok(Self::Avg),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown reducer '{other}' (expected avg|sum|min|max)")),
        }
    }
}

/// Named aggregation bucket widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AggregationPeriod {
    #[default]
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "1hour")]
    OneHour,
}

impl AggregationPeriod {
    pub const ALL: [AggregationPeriod; 3] = [Self::OneMinute, Self::FiveMinutes, Self::OneHour];

    pub fn as_millis(self) -> i64 {
        match self {
            Self::OneMinute => 60_000,
            Self::FiveMinutes => 300_000,
            Self::OneHour => 3_600_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::OneHour => "1hour",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::OneMinute => Self::FiveMinutes,
            Self::FiveMinutes => Self::OneHour,
            Self::OneHour => Self::OneMinute,
        }
    }
}

impl fmt::Display for AggregationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1min" => Ok(Self::OneMinute),
            "5min" => Ok(Self::FiveMinutes),
            "1hour" => Ok(Self::OneHour),
            other => Err(format!(
                "unknown aggregation period '{other}' (expected 1min|5min|1hour)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One non-empty time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSample {
    /// Bucket start, a multiple of the period in epoch milliseconds.
    pub bucket_start: i64,
    pub value: f64,
    /// Category of the first sample that landed in the bucket.
    pub category: Category,
    pub source_count: usize,
}

impl From<AggregatedSample> for Sample {
    fn from(agg: AggregatedSample) -> Self {
        Sample {
            timestamp: agg.bucket_start,
            value: agg.value,
            category: agg.category,
            metadata: Some(Metadata {
                count: Some(agg.source_count),
                ..Default::default()
            }),
        }
    }
}

struct Bucket {
    category: Category,
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Bucket {
    fn new(first: &Sample) -> Self {
        Self {
            category: first.category,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn reduce(&self, reducer: Reducer) -> f64 {
        match reducer {
            Reducer::Avg => self.sum / self.count as f64,
            Reducer::Sum => self.sum,
            Reducer::Min => self.min,
            Reducer::Max => self.max,
        }
    }
}

/// Group samples into `period_ms`-wide buckets keyed by
/// `floor(timestamp / period_ms) * period_ms` and reduce each bucket.
///
/// Output is ascending by bucket start with one entry per non-empty bucket.
/// A non-positive period yields an empty series.
pub fn aggregate(samples: &[Sample], period_ms: i64, reducer: Reducer) -> Vec<AggregatedSample> {
    if period_ms <= 0 {
        if !samples.is_empty() {
            log::warn!("aggregate: non-positive period {period_ms} ms, returning empty series");
        }
        return Vec::new();
    }

    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for sample in samples {
        let key = sample.timestamp.div_euclid(period_ms) * period_ms;
        buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(sample))
            .add(sample.value);
    }

    buckets
        .into_iter()
        .map(|(bucket_start, bucket)| AggregatedSample {
            bucket_start,
            value: bucket.reduce(reducer),
            category: bucket.category,
            source_count: bucket.count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Downsampling
// ---------------------------------------------------------------------------

/// Reduce `samples` to at most `max_points` by averaging contiguous chunks of
/// `ceil(len / max_points)` samples.
///
/// Each output point keeps its chunk's first timestamp and category and
/// records the chunk size in `metadata.original`. Input that already fits is
/// returned borrowed and unchanged.
pub fn downsample(samples: &[Sample], max_points: usize) -> Cow<'_, [Sample]> {
    if samples.len() <= max_points {
        return Cow::Borrowed(samples);
    }
    if max_points == 0 {
        return Cow::Owned(Vec::new());
    }

    let chunk_size = samples.len().div_ceil(max_points);
    let points = samples
        .chunks(chunk_size)
        .map(|chunk| {
            let first = &chunk[0];
            let mean = chunk.iter().map(|s| s.value).sum::<f64>() / chunk.len() as f64;
            Sample {
                timestamp: first.timestamp,
                value: mean,
                category: first.category,
                metadata: Some(Metadata {
                    original: Some(chunk.len()),
                    ..Default::default()
                }),
            }
        })
        .collect();

    Cow::Owned(points)
}
