use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use trustmesh_types::{Coordinates, Did, GeoFence, MetricRanges, StakeholderKind, TrustCalcMode};

use crate::performance::Performance;
use crate::weights::AttributeWeights;
use crate::TrustError;

/// Trust of an attribute that has not been computed or populated yet
pub const NEUTRAL_TRUST: f64 = 0.5;

/// The nine trust signals a stakeholder can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Syntactic identifier check (gate)
    Identity,
    Reputation,
    DirectTrust,
    Compliance,
    HistoricalBehavior,
    /// Multi-metric measured performance
    Performance,
    /// Geofence check (gate)
    Location,
    ContextualFit,
    ThirdPartyValidation,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 9] = [
        Self::Identity,
        Self::Reputation,
        Self::DirectTrust,
        Self::Compliance,
        Self::HistoricalBehavior,
        Self::Performance,
        Self::Location,
        Self::ContextualFit,
        Self::ThirdPartyValidation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Reputation => "reputation",
            Self::DirectTrust => "direct_trust",
            Self::Compliance => "compliance",
            Self::HistoricalBehavior => "historical_behavior",
            Self::Performance => "performance",
            Self::Location => "location",
            Self::ContextualFit => "contextual_fit",
            Self::ThirdPartyValidation => "third_party_validation",
        }
    }

    /// Binary veto rather than a blended contributor
    pub fn is_gate(self) -> bool {
        matches!(self, Self::Identity | Self::Location)
    }

    /// Holds an externally supplied scalar trust value
    pub fn is_signal(self) -> bool {
        !self.is_gate() && self != Self::Performance
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = TrustError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TrustError::InvalidInput(format!("unknown attribute: {}", s)))
    }
}

/// State carried by each attribute kind
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Identity(Did),
    Reputation(Option<f64>),
    DirectTrust(Option<f64>),
    Compliance(Option<f64>),
    HistoricalBehavior(Option<f64>),
    Performance(Performance),
    Location(Coordinates),
    ContextualFit(Option<f64>),
    ThirdPartyValidation(Option<f64>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Identity(_) => AttributeKind::Identity,
            Self::Reputation(_) => AttributeKind::Reputation,
            Self::DirectTrust(_) => AttributeKind::DirectTrust,
            Self::Compliance(_) => AttributeKind::Compliance,
            Self::HistoricalBehavior(_) => AttributeKind::HistoricalBehavior,
            Self::Performance(_) => AttributeKind::Performance,
            Self::Location(_) => AttributeKind::Location,
            Self::ContextualFit(_) => AttributeKind::ContextualFit,
            Self::ThirdPartyValidation(_) => AttributeKind::ThirdPartyValidation,
        }
    }
}

/// Everything an attribute may need from the evaluator to compute its trust
#[derive(Debug, Clone, Copy)]
pub struct CalculationContext<'a> {
    pub mode: TrustCalcMode,
    pub ranges: &'a MetricRanges,
    pub geofence: &'a GeoFence,
}

/// One trust signal of a stakeholder
#[derive(Debug, Clone)]
pub struct Attribute {
    value: AttributeValue,
    /// Last computed trust, [`NEUTRAL_TRUST`] until first computed
    trust: f64,
    weight: Option<f64>,
}

impl Attribute {
    /// Wrap `value`, weighted for a stakeholder of kind `owner`.
    ///
    /// Scalar values must be finite and within [0, 1].
    pub fn new(value: AttributeValue, owner: StakeholderKind) -> crate::Result<Self> {
        let attribute = Self::from_parts(value, owner);
        validate_signal(attribute.kind(), attribute.signal_value())?;
        Ok(attribute)
    }

    /// Unset scalar attribute of the given variant, e.g.
    /// `Attribute::unset(AttributeValue::Reputation, owner)`
    pub fn unset(variant: fn(Option<f64>) -> AttributeValue, owner: StakeholderKind) -> Self {
        Self::from_parts(variant(None), owner)
    }

    pub fn new_identity(did: Did, owner: StakeholderKind) -> Self {
        Self::from_parts(AttributeValue::Identity(did), owner)
    }

    pub fn new_location(at: Coordinates, owner: StakeholderKind) -> Self {
        Self::from_parts(AttributeValue::Location(at), owner)
    }

    pub fn new_performance(performance: Performance, owner: StakeholderKind) -> Self {
        Self::from_parts(AttributeValue::Performance(performance), owner)
    }

    fn from_parts(value: AttributeValue, owner: StakeholderKind) -> Self {
        let weight = AttributeWeights::weight(value.kind(), owner);
        Self {
            value,
            trust: NEUTRAL_TRUST,
            weight,
        }
    }

    /// Create a scalar attribute; `None` leaves it unset (neutral trust)
    pub fn new_signal(
        kind: AttributeKind,
        owner: StakeholderKind,
        value: Option<f64>,
    ) -> crate::Result<Self> {
        validate_signal(kind, value)?;
        let value = match kind {
            AttributeKind::Reputation => AttributeValue::Reputation(value),
            AttributeKind::DirectTrust => AttributeValue::DirectTrust(value),
            AttributeKind::Compliance => AttributeValue::Compliance(value),
            AttributeKind::HistoricalBehavior => AttributeValue::HistoricalBehavior(value),
            AttributeKind::ContextualFit => AttributeValue::ContextualFit(value),
            AttributeKind::ThirdPartyValidation => AttributeValue::ThirdPartyValidation(value),
            other => {
                return Err(TrustError::AttributeMismatch(format!(
                    "{} does not hold a scalar trust value",
                    other
                )))
            }
        };
        Ok(Self::from_parts(value, owner))
    }

    pub fn kind(&self) -> AttributeKind {
        self.value.kind()
    }

    pub fn trust(&self) -> f64 {
        self.trust
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// Stored scalar of a signal attribute, `None` when unset or not a signal
    pub fn signal_value(&self) -> Option<f64> {
        match self.value {
            AttributeValue::Reputation(v)
            | AttributeValue::DirectTrust(v)
            | AttributeValue::Compliance(v)
            | AttributeValue::HistoricalBehavior(v)
            | AttributeValue::ContextualFit(v)
            | AttributeValue::ThirdPartyValidation(v) => v,
            _ => None,
        }
    }

    /// Overwrite the scalar of a signal attribute
    pub fn set_signal(&mut self, value: Option<f64>) -> crate::Result<()> {
        let kind = self.kind();
        validate_signal(kind, value)?;
        match &mut self.value {
            AttributeValue::Reputation(v)
            | AttributeValue::DirectTrust(v)
            | AttributeValue::Compliance(v)
            | AttributeValue::HistoricalBehavior(v)
            | AttributeValue::ContextualFit(v)
            | AttributeValue::ThirdPartyValidation(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(TrustError::AttributeMismatch(format!(
                "{} does not hold a scalar trust value",
                kind
            ))),
        }
    }

    pub fn did(&self) -> Option<&Did> {
        match &self.value {
            AttributeValue::Identity(did) => Some(did),
            _ => None,
        }
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        match &self.value {
            AttributeValue::Location(at) => Some(at),
            _ => None,
        }
    }

    pub fn set_coordinates(&mut self, at: Coordinates) -> crate::Result<()> {
        match &mut self.value {
            AttributeValue::Location(current) => {
                *current = at;
                Ok(())
            }
            _ => Err(TrustError::AttributeMismatch(format!(
                "{} does not hold coordinates",
                self.kind()
            ))),
        }
    }

    pub fn as_performance(&self) -> Option<&Performance> {
        match &self.value {
            AttributeValue::Performance(performance) => Some(performance),
            _ => None,
        }
    }

    pub fn as_performance_mut(&mut self) -> Option<&mut Performance> {
        match &mut self.value {
            AttributeValue::Performance(performance) => Some(performance),
            _ => None,
        }
    }

    /// Recompute and store this attribute's trust.
    ///
    /// Idempotent for every kind except Performance, whose buffers are
    /// drained by the computation. On error the stored trust is unchanged.
    pub fn calculate_trust(&mut self, ctx: &CalculationContext<'_>) -> crate::Result<f64> {
        let trust = match &mut self.value {
            AttributeValue::Identity(did) => {
                if did.is_valid() {
                    1.0
                } else {
                    warn!(did = %did, "identifier is not a valid DID");
                    0.0
                }
            }
            AttributeValue::Location(at) => {
                if ctx.geofence.contains(at) {
                    1.0
                } else {
                    warn!(lat = at.lat, lon = at.lon, "location outside the eligibility region");
                    0.0
                }
            }
            AttributeValue::Performance(performance) => performance.aggregate(ctx.mode, ctx.ranges)?,
            AttributeValue::Reputation(v)
            | AttributeValue::DirectTrust(v)
            | AttributeValue::Compliance(v)
            | AttributeValue::HistoricalBehavior(v)
            | AttributeValue::ContextualFit(v)
            | AttributeValue::ThirdPartyValidation(v) => v.unwrap_or(NEUTRAL_TRUST),
        };

        self.trust = trust;
        debug!(attribute = %self.kind(), trust, "attribute trust computed");
        Ok(trust)
    }
}

fn validate_signal(kind: AttributeKind, value: Option<f64>) -> crate::Result<()> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(TrustError::InvalidAttributeValue(format!(
            "{} must be between 0.0 and 1.0, got {}",
            kind, v
        ))),
        _ => Ok(()),
    }
}
