//! Random-walk sample generator.
//!
//! Each step moves the previous value by a uniform relative shock plus a
//! constant relative drift:
//!
//! ```text
//! next = prev + U(-1, 1) · volatility · prev + trend · prev
//! ```
//!
//! The generator carries no walk state between calls; callers pass the value
//! to continue from. Only the RNG advances.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::sample::{Category, Metadata, Sample, Signal};

/// Spacing between consecutive generated samples, in milliseconds.
pub const SAMPLE_SPACING_MS: i64 = 100;

/// Exclusive upper bound of the generated `volume` metadata.
const MAX_VOLUME: u32 = 1000;

/// Random-walk producer of [`Sample`]s.
#[derive(Debug, Clone)]
pub struct StreamGenerator {
    base_value: f64,
    volatility: f64,
    trend: f64,
    rng: StdRng,
}

impl StreamGenerator {
    /// Create a generator seeded from the OS.
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a deterministic generator for reproducible runs and tests.
    pub fn with_seed(config: &GeneratorConfig, seed: u64) -> Result<Self, GenerationError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &GeneratorConfig, rng: StdRng) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(Self {
            base_value: config.base_value,
            volatility: config.volatility,
            trend: config.trend,
            rng,
        })
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// `count` samples spaced [`SAMPLE_SPACING_MS`] apart, the last one a
    /// single spacing before `start_time` (default: now).
    pub fn generate_initial(&mut self, count: usize, start_time: Option<i64>) -> Vec<Sample> {
        self.generate_initial_tail(count, count, start_time)
    }

    /// Walk the same `count` steps as [`generate_initial`](Self::generate_initial)
    /// but keep only the newest `keep` samples.
    pub fn generate_initial_tail(
        &mut self,
        count: usize,
        keep: usize,
        start_time: Option<i64>,
    ) -> Vec<Sample> {
        let now = start_time.unwrap_or_else(crate::unix_ms_now);
        let skip = count.saturating_sub(keep);
        let mut data = Vec::with_capacity(count.min(keep));
        let mut current = self.base_value;

        for i in 0..count {
            let timestamp = now.saturating_sub(spacing_offset(count - i));
            let sample = self.step(current, timestamp);
            current = sample.value;
            if i >= skip {
                data.push(sample);
            }
        }

        data
    }

    /// One walk step from `previous_value` (or the base value) at
    /// `timestamp` (or now).
    pub fn generate_one(&mut self, previous_value: Option<f64>, timestamp: Option<i64>) -> Sample {
        let timestamp = timestamp.unwrap_or_else(crate::unix_ms_now);
        let from = previous_value.unwrap_or(self.base_value);
        self.step(from, timestamp)
    }

    /// `count` chained steps starting now.
    pub fn generate_batch(&mut self, count: usize, last_value: Option<f64>) -> Vec<Sample> {
        self.generate_batch_from(count, last_value, crate::unix_ms_now())
    }

    /// `count` chained steps with timestamps `start + i * SAMPLE_SPACING_MS`.
    pub fn generate_batch_from(
        &mut self,
        count: usize,
        last_value: Option<f64>,
        start: i64,
    ) -> Vec<Sample> {
        self.generate_batch_tail(count, count, last_value, start)
    }

    /// Walk the same `count` steps as
    /// [`generate_batch_from`](Self::generate_batch_from) but keep only the
    /// newest `keep` samples.
    pub fn generate_batch_tail(
        &mut self,
        count: usize,
        keep: usize,
        last_value: Option<f64>,
        start: i64,
    ) -> Vec<Sample> {
        let skip = count.saturating_sub(keep);
        let mut data = Vec::with_capacity(count.min(keep));
        let mut current = last_value;

        for i in 0..count {
            let timestamp = start.saturating_add(spacing_offset(i));
            let sample = self.generate_one(current, Some(timestamp));
            current = Some(sample.value);
            if i >= skip {
                data.push(sample);
            }
        }

        data
    }

    fn step(&mut self, from: f64, timestamp: i64) -> Sample {
        let category = Category::ALL[self.rng.random_range(0..Category::ALL.len())];
        let shock = self.rng.random_range(-1.0..1.0) * self.volatility * from;
        let value = from + shock + self.trend * from;

        Sample {
            timestamp,
            value,
            category,
            metadata: Some(Metadata {
                volume: Some(self.rng.random_range(0..MAX_VOLUME)),
                signal: Some(if self.rng.random_bool(0.5) {
                    Signal::Buy
                } else {
                    Signal::Sell
                }),
                ..Default::default()
            }),
        }
    }
}

/// `steps` spacings in milliseconds, saturating at `i64::MAX`.
fn spacing_offset(steps: usize) -> i64 {
    i64::try_from(steps)
        .unwrap_or(i64::MAX)
        .saturating_mul(SAMPLE_SPACING_MS)
}
