//! Attribute ingestion from an external metrics source.
//!
//! Payloads use the aggregator's camelCase layout:
//!
//! ```json
//! {
//!   "reputation": {"trust": 0.8},
//!   "directTrust": {"trust": null},
//!   "performanceMetrics": {"packetLoss": [0.01, 0.02], "latency": 42.0},
//!   "location": {"lat": 46.05, "lon": 14.47}
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};
use trustmesh_model::AttributeKind;
use trustmesh_types::{Coordinates, Did, StakeholderKind};

use crate::registry::StakeholderRegistry;
use crate::stakeholder::Stakeholder;
use crate::{EvaluationError, Result};

/// Source of fresh attribute values for a stakeholder
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeFeed: Send + Sync {
    /// Latest payload for `did`, `None` when the source has nothing for it
    async fn fetch(&self, did: &Did, kind: StakeholderKind) -> Result<Option<Value>>;
}

/// Feed serving fixed payloads from memory
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    payloads: HashMap<Did, Value>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, did: impl Into<Did>, payload: Value) -> Option<Value> {
        self.payloads.insert(did.into(), payload)
    }

    pub fn with_payload(mut self, did: impl Into<Did>, payload: Value) -> Self {
        self.insert(did, payload);
        self
    }
}

#[async_trait]
impl AttributeFeed for StaticFeed {
    async fn fetch(&self, did: &Did, _kind: StakeholderKind) -> Result<Option<Value>> {
        Ok(self.payloads.get(did).cloned())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Update {
    Signal(AttributeKind, Option<f64>),
    Observations(String, Vec<f64>),
    Location(Coordinates),
}

pub(crate) fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn number(value: &Value, field: &str) -> Result<f64> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EvaluationError::InvalidPayload(format!("{} must be a number, got {}", field, value)))
}

fn parse_signal(kind: AttributeKind, value: &Value) -> Result<Option<f64>> {
    let trust = match value {
        Value::Null => return Ok(None),
        Value::Object(fields) => match fields.get("trust") {
            None | Some(Value::Null) => return Ok(None),
            Some(trust) => number(trust, kind.as_str())?,
        },
        other => number(other, kind.as_str())?,
    };
    if !(0.0..=1.0).contains(&trust) {
        return Err(EvaluationError::InvalidPayload(format!(
            "{} must be between 0.0 and 1.0, got {}",
            kind, trust
        )));
    }
    Ok(Some(trust))
}

fn parse_performance(value: &Value, updates: &mut Vec<Update>) -> Result<()> {
    let metrics = value
        .as_object()
        .ok_or_else(|| EvaluationError::InvalidPayload("performance must be an object".to_string()))?;
    for (name, readings) in metrics {
        let metric = camel_to_snake(name);
        let values = match readings {
            Value::Array(items) => items
                .iter()
                .map(|v| number(v, &metric))
                .collect::<Result<Vec<_>>>()?,
            single => vec![number(single, &metric)?],
        };
        updates.push(Update::Observations(metric, values));
    }
    Ok(())
}

fn parse_location(value: &Value) -> Result<Coordinates> {
    let field = |name: &str| {
        value
            .get(name)
            .ok_or_else(|| EvaluationError::InvalidPayload(format!("location has no {}", name)))
            .and_then(|v| number(v, name))
    };
    Ok(Coordinates::new(field("lat")?, field("lon")?))
}

fn parse_payload(payload: &Value) -> Result<Vec<Update>> {
    let fields = payload
        .as_object()
        .ok_or_else(|| EvaluationError::InvalidPayload("payload must be an object".to_string()))?;

    let mut updates = Vec::new();
    for (key, value) in fields {
        let name = camel_to_snake(key);
        match name.as_str() {
            "performance" | "performance_metrics" => parse_performance(value, &mut updates)?,
            "location" => updates.push(Update::Location(parse_location(value)?)),
            other => match other.parse::<AttributeKind>() {
                Ok(kind) if kind.is_signal() => {
                    updates.push(Update::Signal(kind, parse_signal(kind, value)?))
                }
                _ => debug!(key = %key, "unknown payload field skipped"),
            },
        }
    }
    Ok(updates)
}

/// Apply a feed payload to `stakeholder`.
///
/// Scalars are overwritten, performance readings appended. Fields the
/// stakeholder does not carry and metrics it does not track are skipped.
/// The payload is validated as a whole before anything is applied.
/// Returns the number of fields applied.
pub fn apply_payload(stakeholder: &mut Stakeholder, payload: &Value) -> Result<usize> {
    let updates = parse_payload(payload)?;
    let mut applied = 0;

    for update in updates {
        match update {
            Update::Signal(kind, value) => {
                if stakeholder.attribute(kind).is_none() {
                    debug!(did = %stakeholder.did(), attribute = %kind, "attribute not held, skipped");
                    continue;
                }
                stakeholder.set_signal(kind, value)?;
            }
            Update::Observations(metric, values) => {
                let tracked = stakeholder
                    .performance()
                    .map(|p| p.is_tracked(&metric))
                    .unwrap_or(false);
                if !tracked {
                    debug!(did = %stakeholder.did(), metric = %metric, "metric not tracked, skipped");
                    continue;
                }
                stakeholder.record_observations(&metric, values)?;
            }
            Update::Location(at) => {
                if stakeholder.attribute(AttributeKind::Location).is_none() {
                    debug!(did = %stakeholder.did(), "location not held, skipped");
                    continue;
                }
                stakeholder.set_location(at)?;
            }
        }
        applied += 1;
    }

    debug!(did = %stakeholder.did(), applied, "payload applied");
    Ok(applied)
}

/// Fetch and apply the latest payload for one stakeholder
pub async fn refresh<F>(feed: &F, stakeholder: &mut Stakeholder) -> Result<usize>
where
    F: AttributeFeed + ?Sized,
{
    let payload = feed.fetch(stakeholder.did(), stakeholder.kind()).await?;
    match payload {
        Some(payload) => apply_payload(stakeholder, &payload),
        None => {
            warn!(did = %stakeholder.did(), "feed returned no payload");
            Ok(0)
        }
    }
}

/// Fetch payloads for every registered stakeholder concurrently, then
/// apply them in registration order.
///
/// One entry per stakeholder: fields applied, or why it was not refreshed.
pub async fn refresh_all<F>(feed: &F, registry: &mut StakeholderRegistry) -> Vec<(Did, Result<usize>)>
where
    F: AttributeFeed + ?Sized,
{
    let targets: Vec<(Did, StakeholderKind)> = registry
        .iter()
        .map(|s| (s.did().clone(), s.kind()))
        .collect();

    let fetched = join_all(targets.iter().map(|(did, kind)| feed.fetch(did, *kind))).await;

    targets
        .into_iter()
        .zip(fetched)
        .map(|((did, _), payload)| {
            let outcome = match payload {
                Ok(Some(payload)) => registry
                    .require_mut(&did)
                    .and_then(|stakeholder| apply_payload(stakeholder, &payload)),
                Ok(None) => {
                    warn!(did = %did, "feed returned no payload");
                    Ok(0)
                }
                Err(err) => Err(err),
            };
            if let Err(err) = &outcome {
                warn!(did = %did, error = %err, "refresh failed");
            }
            (did, outcome)
        })
        .collect()
}
