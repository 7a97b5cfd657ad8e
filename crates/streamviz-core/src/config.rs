//! Stream configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! { "max_data_points": 20000, "generator": { "volatility": 0.05 } }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregationPeriod, Reducer};
use crate::dataset::MAX_DATASET_COUNT;
use crate::error::{ConfigError, GenerationError};

/// Random-walk parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Value the walk starts from when no previous value is given.
    pub base_value: f64,
    /// Maximum relative shock per step. Must be finite and non-negative.
    pub volatility: f64,
    /// Relative drift per step. Negative values trend downward.
    pub trend: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_value: 100.0,
            volatility: 0.02,
            trend: 0.001,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !self.base_value.is_finite() {
            return Err(GenerationError::NonFinite {
                name: "base_value",
                value: self.base_value,
            });
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(GenerationError::InvalidVolatility(self.volatility));
        }
        if !self.trend.is_finite() {
            return Err(GenerationError::NonFinite {
                name: "trend",
                value: self.trend,
            });
        }
        Ok(())
    }
}

/// Configuration knobs for a [`StreamService`](crate::StreamService) and its
/// consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Samples generated at construction and on `reset()`.
    pub initial_count: usize,
    /// Producer tick period in milliseconds.
    pub update_interval_ms: u64,
    /// Sliding window capacity.
    pub max_data_points: usize,
    /// Start the producer as soon as the service is built.
    pub auto_start: bool,
    /// Extra rows computed beyond each edge of a virtualized viewport.
    pub overscan: usize,
    pub aggregation_period: AggregationPeriod,
    pub reducer: Reducer,
    pub generator: GeneratorConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_count: 10_000,
            update_interval_ms: 100,
            max_data_points: 50_000,
            auto_start: false,
            overscan: 5,
            aggregation_period: AggregationPeriod::OneMinute,
            reducer: Reducer::Avg,
            generator: GeneratorConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        log::debug!("loaded stream config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_data_points == 0 {
            return Err(ConfigError::Invalid(
                "max_data_points must be greater than zero".into(),
            ));
        }
        if self.initial_count > MAX_DATASET_COUNT {
            return Err(ConfigError::Invalid(format!(
                "initial_count must not exceed {MAX_DATASET_COUNT} (got {})",
                self.initial_count
            )));
        }
        if self.update_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "update_interval_ms must be greater than zero".into(),
            ));
        }
        self.generator.validate()?;
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_knobs() {
        let c = StreamConfig::default();
        assert_eq!(c.initial_count, 10_000);
        assert_eq!(c.update_interval(), Duration::from_millis(100));
        assert_eq!(c.max_data_points, 50_000);
        assert!(!c.auto_start);
        assert_eq!(c.overscan, 5);
        assert_eq!(c.aggregation_period, AggregationPeriod::OneMinute);
        assert_eq!(c.reducer, Reducer::Avg);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_data_points": 2000, "reducer": "max", "aggregation_period": "5min", "generator": {{"volatility": 0.1}}}}"#
        )
        .unwrap();

        let c = StreamConfig::load(file.path()).unwrap();
        assert_eq!(c.max_data_points, 2000);
        assert_eq!(c.reducer, Reducer::Max);
        assert_eq!(c.aggregation_period, AggregationPeriod::FiveMinutes);
        assert!((c.generator.volatility - 0.1).abs() < f64::EPSILON);
        assert!((c.generator.base_value - 100.0).abs() < f64::EPSILON);
        assert_eq!(c.initial_count, 10_000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StreamConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = StreamConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_capacity_rejected() {
        let c = StreamConfig {
            max_data_points: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_initial_count_rejected() {
        let c = StreamConfig {
            initial_count: usize::MAX / 8,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let at_limit = StreamConfig {
            initial_count: MAX_DATASET_COUNT,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn bad_generator_surfaces_as_generation_error() {
        let c = StreamConfig {
            generator: GeneratorConfig {
                volatility: f64::INFINITY,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Generator(GenerationError::InvalidVolatility(_)))
        ));
    }
}
