//! Time-stamped samples and their typed metadata.
//!
//! A [`Sample`] is created once by the generator and never mutated. All
//! fields are `Copy`, so snapshotting a full window is a flat memory copy.

use serde::{Deserialize, Serialize};

/// Fixed label set a sample's category is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    A,
    B,
    C,
    D,
    E,
}

impl Category {
    /// Every category, in label order.
    pub const ALL: [Category; 5] = [Self::A, Self::B, Self::C, Self::D, Self::E];

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{s}' (expected A|B|C|D|E)"))
    }
}

/// Binary trading-style signal carried in generated metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Optional key/value annotations on a sample.
///
/// Serialized as a JSON object; absent keys are omitted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Random trade volume in `[0, 1000)`, set by the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    /// Random buy/sell signal, set by the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
    /// Number of samples reduced into this one by aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Size of the chunk a downsampled point was averaged from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<usize>,
}

/// One time-stamped observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub value: f64,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Sample {
    /// Sample without metadata.
    pub fn new(timestamp: i64, value: f64, category: Category) -> Self {
        Self {
            timestamp,
            value,
            category,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_are_single_letters() {
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn category_parses_either_case() {
        assert_eq!("c".parse::<Category>(), Ok(Category::C));
        assert_eq!(" E ".parse::<Category>(), Ok(Category::E));
        assert!("F".parse::<Category>().is_err());
    }

    #[test]
    fn sample_json_omits_absent_metadata() {
        let s = Sample::new(1_000, 101.5, Category::C);
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"timestamp": 1000, "value": 101.5, "category": "C"})
        );
    }

    #[test]
    fn metadata_serializes_as_sparse_map() {
        let s = Sample {
            metadata: Some(Metadata {
                volume: Some(412),
                signal: Some(Signal::Sell),
                ..Default::default()
            }),
            ..Sample::new(5, 1.0, Category::A)
        };
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(
            json["metadata"],
            serde_json::json!({"volume": 412, "signal": "sell"})
        );
    }

    #[test]
    fn sample_roundtrips_through_json() {
        let s = Sample {
            metadata: Some(Metadata {
                original: Some(7),
                ..Default::default()
            }),
            ..Sample::new(-20, -3.25, Category::E)
        };
        let text = serde_json::to_string(&s).unwrap();
        let back: Sample = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
    }
}
