//! Dataset fetch/extend requests shared by the HTTP server and the CLI.
//!
//! These are the only operations that turn generation failures into
//! reported errors. A failed request produces no data at all.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::generator::StreamGenerator;
use crate::sample::Sample;

pub const DEFAULT_FETCH_COUNT: i64 = 10_000;
pub const DEFAULT_EXTEND_COUNT: i64 = 100;
/// Largest dataset a single request may ask for.
pub const MAX_DATASET_COUNT: usize = 1_000_000;

/// Initial dataset request. `count` defaults to [`DEFAULT_FETCH_COUNT`] and
/// `start_time` to now.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchRequest {
    pub count: Option<i64>,
    pub start_time: Option<i64>,
}

/// Continuation request. `count` defaults to [`DEFAULT_EXTEND_COUNT`]; the
/// walk continues from `last_value` (or the base value).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendRequest {
    pub count: Option<i64>,
    pub last_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub data: Vec<Sample>,
    pub count: usize,
}

impl From<Vec<Sample>> for Dataset {
    fn from(data: Vec<Sample>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

fn checked_count(requested: i64) -> Result<usize, GenerationError> {
    if requested < 0 {
        return Err(GenerationError::NegativeCount(requested));
    }
    let count = requested as u64;
    if count > MAX_DATASET_COUNT as u64 {
        return Err(GenerationError::CountTooLarge {
            requested: count,
            max: MAX_DATASET_COUNT,
        });
    }
    Ok(count as usize)
}

/// Generate an initial dataset ending just before `start_time`.
pub fn fetch_dataset(
    generator: &mut StreamGenerator,
    request: &FetchRequest,
) -> Result<Dataset, GenerationError> {
    let count = checked_count(request.count.unwrap_or(DEFAULT_FETCH_COUNT))?;
    Ok(generator.generate_initial(count, request.start_time).into())
}

/// Generate a chained batch continuing from `last_value`.
pub fn extend_dataset(
    generator: &mut StreamGenerator,
    request: &ExtendRequest,
) -> Result<Dataset, GenerationError> {
    let count = checked_count(request.count.unwrap_or(DEFAULT_EXTEND_COUNT))?;
    if let Some(value) = request.last_value {
        if !value.is_finite() {
            return Err(GenerationError::NonFinite {
                name: "lastValue",
                value,
            });
        }
    }
    Ok(generator.generate_batch(count, request.last_value).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::generator::SAMPLE_SPACING_MS;

    fn generator() -> StreamGenerator {
        StreamGenerator::with_seed(&GeneratorConfig::default(), 21).unwrap()
    }

    #[test]
    fn fetch_defaults_to_ten_thousand() {
        let ds = fetch_dataset(&mut generator(), &FetchRequest::default()).unwrap();
        assert_eq!(ds.count, 10_000);
        assert_eq!(ds.data.len(), 10_000);
    }

    #[test]
    fn fetch_honours_start_time() {
        let request = FetchRequest {
            count: Some(3),
            start_time: Some(1_000),
        };
        let ds = fetch_dataset(&mut generator(), &request).unwrap();
        let ts: Vec<i64> = ds.data.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![700, 800, 900]);
    }

    #[test]
    fn fetch_zero_is_empty() {
        let request = FetchRequest {
            count: Some(0),
            start_time: None,
        };
        let ds = fetch_dataset(&mut generator(), &request).unwrap();
        assert_eq!(ds.count, 0);
        assert!(ds.data.is_empty());
    }

    #[test]
    fn negative_count_is_a_generation_failure() {
        let request = FetchRequest {
            count: Some(-1),
            start_time: None,
        };
        assert_eq!(
            fetch_dataset(&mut generator(), &request),
            Err(GenerationError::NegativeCount(-1))
        );
    }

    #[test]
    fn oversized_count_is_rejected() {
        let request = ExtendRequest {
            count: Some(MAX_DATASET_COUNT as i64 + 1),
            last_value: None,
        };
        assert!(matches!(
            extend_dataset(&mut generator(), &request),
            Err(GenerationError::CountTooLarge { .. })
        ));
    }

    #[test]
    fn extend_defaults_to_one_hundred() {
        let ds = extend_dataset(&mut generator(), &ExtendRequest::default()).unwrap();
        assert_eq!(ds.count, 100);
        for w in ds.data.windows(2) {
            assert_eq!(w[1].timestamp - w[0].timestamp, SAMPLE_SPACING_MS);
        }
    }

    #[test]
    fn extend_continues_from_last_value() {
        let request = ExtendRequest {
            count: Some(1),
            last_value: Some(500.0),
        };
        let ds = extend_dataset(&mut generator(), &request).unwrap();
        assert!((ds.data[0].value - 500.0).abs() <= 500.0 * 0.021 + 1e-9);
    }

    #[test]
    fn extend_rejects_non_finite_last_value() {
        let request = ExtendRequest {
            count: Some(1),
            last_value: Some(f64::INFINITY),
        };
        assert!(matches!(
            extend_dataset(&mut generator(), &request),
            Err(GenerationError::NonFinite { name: "lastValue", .. })
        ));
    }

    #[test]
    fn requests_parse_camel_case() {
        let req: ExtendRequest = serde_json::from_str(r#"{"lastValue": 12.5}"#).unwrap();
        assert_eq!(req.count, None);
        assert_eq!(req.last_value, Some(12.5));
        let req: FetchRequest = serde_json::from_str(r#"{"count": 5, "startTime": 99}"#).unwrap();
        assert_eq!(req.start_time, Some(99));
    }
}
