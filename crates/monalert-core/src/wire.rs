//! JSON representation of a metric.
//!
//! The same object is the body of `POST /update` and `POST /value`, the
//! response of both, an element of the `GET /` listing, and a record of
//! the snapshot file:
//!
//! ```json
//! {"id": "hits", "type": "counter", "delta": 12}
//! {"id": "temperature", "type": "gauge", "value": 42.5}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{MetricEntry, MetricKind, MetricSample, MetricValue};

/// Wire/snapshot object. `value` is used for gauges, `delta` for counters.
///
/// Unknown fields are rejected at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metrics {
    pub id: String,
    #[serde(rename = "type")]
    pub mtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

impl Metrics {
    pub fn from_value(id: impl Into<String>, value: MetricValue) -> Self {
        let mtype = value.kind().to_string();
        let (value, delta) = match value {
            MetricValue::Gauge(v) => (Some(v), None),
            MetricValue::Counter(d) => (None, Some(d)),
        };
        Self {
            id: id.into(),
            mtype,
            value,
            delta,
        }
    }

    /// A query object carries only `id` and `type`.
    pub fn query(id: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            id: id.into(),
            mtype: kind.to_string(),
            value: None,
            delta: None,
        }
    }

    pub fn kind(&self) -> Result<MetricKind, ValidationError> {
        self.mtype.parse()
    }

    /// Validate `kind` and `id` for a lookup.
    pub fn query_key(&self) -> Result<(MetricKind, &str), ValidationError> {
        let kind = self.kind()?;
        if self.id.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok((kind, &self.id))
    }

    /// Validate into a sample. The field matching the kind must be present;
    /// the other one is ignored.
    pub fn to_sample(&self) -> Result<MetricSample, ValidationError> {
        let (kind, name) = self.query_key()?;
        let value = match kind {
            MetricKind::Gauge => {
                let v = self.value.ok_or(ValidationError::MissingValue {
                    kind: "gauge",
                    field: "value",
                })?;
                MetricValue::gauge(v)?
            }
            MetricKind::Counter => {
                let d = self.delta.ok_or(ValidationError::MissingValue {
                    kind: "counter",
                    field: "delta",
                })?;
                MetricValue::Counter(d)
            }
        };
        MetricSample::new(name, value)
    }
}

impl From<&MetricEntry> for Metrics {
    fn from(entry: &MetricEntry) -> Self {
        Metrics::from_value(entry.name.clone(), entry.value)
    }
}

impl From<&MetricSample> for Metrics {
    fn from(sample: &MetricSample) -> Self {
        Metrics::from_value(sample.name(), sample.value())
    }
}
