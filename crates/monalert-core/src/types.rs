//! Domain types for the metrics pipeline.
//!
//! A metric is identified by its kind and name. Gauges carry an
//! instantaneous reading that replaces the previous one; counters carry a
//! delta that is added to the running total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ── Kind ──────────────────────────────────────────────────────────

/// The closed set of metric kinds.
///
/// Ordering follows declaration order so listings sorted by
/// `(name, kind)` place a gauge before a counter of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(ValidationError::UnsupportedKind(other.to_string())),
        }
    }
}

// ── Value ─────────────────────────────────────────────────────────

/// A typed metric value.
///
/// In a [`MetricSample`] a counter value is the delta to apply; in a
/// store entry it is the accumulated total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// Parse a decimal value for `kind`: a finite float for gauges, a
    /// signed 64-bit integer for counters.
    pub fn parse(kind: MetricKind, raw: &str) -> Result<Self, ValidationError> {
        match kind {
            MetricKind::Gauge => {
                let v: f64 = raw
                    .parse()
                    .map_err(|_| ValidationError::InvalidGauge(raw.to_string()))?;
                Self::gauge(v)
            }
            MetricKind::Counter => raw
                .parse::<i64>()
                .map(MetricValue::Counter)
                .map_err(|_| ValidationError::InvalidCounter(raw.to_string())),
        }
    }

    /// Build a gauge value, rejecting NaN and infinities.
    pub fn gauge(v: f64) -> Result<Self, ValidationError> {
        if v.is_finite() {
            Ok(MetricValue::Gauge(v))
        } else {
            Err(ValidationError::NonFiniteGauge(v))
        }
    }
}

/// Plain-text rendering used by the path-encoded protocol: shortest
/// decimal that round-trips, never exponent notation.
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(v) => write!(f, "{v}"),
            MetricValue::Counter(v) => write!(f, "{v}"),
        }
    }
}

// ── Sample ────────────────────────────────────────────────────────

/// A validated metric update, ready to be applied to the store.
///
/// Construction goes through [`MetricSample::parse`], [`MetricSample::gauge`]
/// or [`MetricSample::counter`], so a sample with an empty name or a
/// non-finite gauge never exists.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    name: String,
    value: MetricValue,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: MetricValue) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if let MetricValue::Gauge(v) = value {
            MetricValue::gauge(v)?;
        }
        Ok(Self { name, value })
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Result<Self, ValidationError> {
        Self::new(name, MetricValue::Gauge(value))
    }

    pub fn counter(name: impl Into<String>, delta: i64) -> Result<Self, ValidationError> {
        Self::new(name, MetricValue::Counter(delta))
    }

    /// Parse the three path segments of a path-encoded update.
    pub fn parse(kind: &str, name: &str, raw_value: &str) -> Result<Self, ValidationError> {
        let kind: MetricKind = kind.parse()?;
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let value = MetricValue::parse(kind, raw_value)?;
        Self::new(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// Gauge reading or counter delta.
    pub fn value(&self) -> MetricValue {
        self.value
    }
}

// ── Store entry ───────────────────────────────────────────────────

/// One current `(kind, name) → value` entry as read out of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEntry {
    pub name: String,
    pub value: MetricValue,
}

impl MetricEntry {
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [MetricKind::Gauge, MetricKind::Counter] {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = "histogram".parse::<MetricKind>().unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedKind("histogram".into()));
    }

    #[test]
    fn kind_is_case_sensitive() {
        assert!("Gauge".parse::<MetricKind>().is_err());
    }

    #[test]
    fn parse_gauge_sample() {
        let sample = MetricSample::parse("gauge", "temperature", "42.5").unwrap();
        assert_eq!(sample.name(), "temperature");
        assert_eq!(sample.kind(), MetricKind::Gauge);
        assert_eq!(sample.value(), MetricValue::Gauge(42.5));
    }

    #[test]
    fn parse_negative_counter() {
        let sample = MetricSample::parse("counter", "hits", "-7").unwrap();
        assert_eq!(sample.value(), MetricValue::Counter(-7));
    }

    #[test]
    fn gauge_rejects_nan_and_infinity() {
        for raw in ["nan", "NaN", "inf", "-inf", "infinity"] {
            let err = MetricSample::parse("gauge", "x", raw).unwrap_err();
            assert!(
                matches!(err, ValidationError::NonFiniteGauge(_)),
                "{raw} gave {err:?}"
            );
        }
    }

    #[test]
    fn gauge_rejects_garbage() {
        assert_eq!(
            MetricSample::parse("gauge", "x", "nat").unwrap_err(),
            ValidationError::InvalidGauge("nat".into())
        );
    }

    #[test]
    fn counter_rejects_float_and_overflow() {
        assert!(matches!(
            MetricSample::parse("counter", "x", "1.5"),
            Err(ValidationError::InvalidCounter(_))
        ));
        assert!(matches!(
            MetricSample::parse("counter", "x", "9223372036854775808"),
            Err(ValidationError::InvalidCounter(_))
        ));
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(
            MetricSample::parse("gauge", "", "1").unwrap_err(),
            ValidationError::EmptyName
        );
        assert_eq!(
            MetricSample::counter("", 1).unwrap_err(),
            ValidationError::EmptyName
        );
    }

    #[test]
    fn kind_checked_before_value() {
        assert!(matches!(
            MetricSample::parse("bogus", "x", "nan"),
            Err(ValidationError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn display_uses_plain_decimal() {
        assert_eq!(MetricValue::Gauge(42.5).to_string(), "42.5");
        assert_eq!(MetricValue::Gauge(3.0).to_string(), "3");
        assert_eq!(MetricValue::Gauge(1e20).to_string(), "100000000000000000000");
        assert_eq!(MetricValue::Counter(12).to_string(), "12");
    }
}
