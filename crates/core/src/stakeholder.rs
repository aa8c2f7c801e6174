//! Stakeholders and their attribute sets.
//!
//! Every stakeholder carries Identity, Reputation and DirectTrust. The
//! three concrete shapes add the attributes their kind is judged on.

use serde::{Deserialize, Serialize};
use tracing::debug;
use trustmesh_model::{Attribute, AttributeKind, AttributeValue, Performance};
use trustmesh_types::{Coordinates, Did, StakeholderKind, StakeholderRef};

use crate::{EvaluationError, Result};

macro_rules! signal {
    ($kind:ident, $owner:expr) => {
        Attribute::unset(AttributeValue::$kind, $owner)
    };
}

/// State shared by every stakeholder kind
#[derive(Debug, Clone)]
struct StakeholderBase {
    name: String,
    did: Did,
    identity: Attribute,
    reputation: Attribute,
    direct_trust: Attribute,
    trust: f64,
}

impl StakeholderBase {
    fn new(name: String, did: Did, owner: StakeholderKind) -> Self {
        Self {
            identity: Attribute::new_identity(did.clone(), owner),
            reputation: signal!(Reputation, owner),
            direct_trust: signal!(DirectTrust, owner),
            name,
            did,
            trust: 0.0,
        }
    }

    fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        match kind {
            AttributeKind::Identity => Some(&self.identity),
            AttributeKind::Reputation => Some(&self.reputation),
            AttributeKind::DirectTrust => Some(&self.direct_trust),
            _ => None,
        }
    }

    fn attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        match kind {
            AttributeKind::Identity => Some(&mut self.identity),
            AttributeKind::Reputation => Some(&mut self.reputation),
            AttributeKind::DirectTrust => Some(&mut self.direct_trust),
            _ => None,
        }
    }
}

/// Offers compute and network resources
#[derive(Debug, Clone)]
pub struct ResourceProvider {
    base: StakeholderBase,
    compliance: Attribute,
    historical_behavior: Attribute,
}

impl ResourceProvider {
    const KIND: StakeholderKind = StakeholderKind::ResourceProvider;

    pub fn new(name: impl Into<String>, did: impl Into<Did>) -> Self {
        Self {
            base: StakeholderBase::new(name.into(), did.into(), Self::KIND),
            compliance: signal!(Compliance, Self::KIND),
            historical_behavior: signal!(HistoricalBehavior, Self::KIND),
        }
    }

    fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        match kind {
            AttributeKind::Compliance => Some(&self.compliance),
            AttributeKind::HistoricalBehavior => Some(&self.historical_behavior),
            other => self.base.attribute(other),
        }
    }

    fn attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        match kind {
            AttributeKind::Compliance => Some(&mut self.compliance),
            AttributeKind::HistoricalBehavior => Some(&mut self.historical_behavior),
            other => self.base.attribute_mut(other),
        }
    }
}

/// A single resource instance, offered by a provider referenced by DID
#[derive(Debug, Clone)]
pub struct ResourceCapacity {
    base: StakeholderBase,
    provider: Did,
    performance: Attribute,
    location: Attribute,
    historical_behavior: Attribute,
    contextual_fit: Attribute,
    third_party_validation: Attribute,
}

impl ResourceCapacity {
    const KIND: StakeholderKind = StakeholderKind::ResourceCapacity;

    pub fn new(name: impl Into<String>, did: impl Into<Did>, provider: impl Into<Did>) -> Self {
        Self {
            base: StakeholderBase::new(name.into(), did.into(), Self::KIND),
            provider: provider.into(),
            performance: Attribute::new_performance(Performance::with_default_metrics(), Self::KIND),
            location: Attribute::new_location(Coordinates::default(), Self::KIND),
            historical_behavior: signal!(HistoricalBehavior, Self::KIND),
            contextual_fit: signal!(ContextualFit, Self::KIND),
            third_party_validation: signal!(ThirdPartyValidation, Self::KIND),
        }
    }

    /// Replace the performance attribute, e.g. to track other metrics or tune the estimators
    pub fn with_performance(mut self, performance: Performance) -> Self {
        self.performance = Attribute::new_performance(performance, Self::KIND);
        self
    }

    pub fn provider(&self) -> &Did {
        &self.provider
    }

    fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        match kind {
            AttributeKind::Performance => Some(&self.performance),
            AttributeKind::Location => Some(&self.location),
            AttributeKind::HistoricalBehavior => Some(&self.historical_behavior),
            AttributeKind::ContextualFit => Some(&self.contextual_fit),
            AttributeKind::ThirdPartyValidation => Some(&self.third_party_validation),
            other => self.base.attribute(other),
        }
    }

    fn attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        match kind {
            AttributeKind::Performance => Some(&mut self.performance),
            AttributeKind::Location => Some(&mut self.location),
            AttributeKind::HistoricalBehavior => Some(&mut self.historical_behavior),
            AttributeKind::ContextualFit => Some(&mut self.contextual_fit),
            AttributeKind::ThirdPartyValidation => Some(&mut self.third_party_validation),
            other => self.base.attribute_mut(other),
        }
    }
}

/// Consumes resources
#[derive(Debug, Clone)]
pub struct ApplicationProvider {
    base: StakeholderBase,
    compliance: Attribute,
    location: Attribute,
}

impl ApplicationProvider {
    const KIND: StakeholderKind = StakeholderKind::ApplicationProvider;

    pub fn new(name: impl Into<String>, did: impl Into<Did>) -> Self {
        Self {
            base: StakeholderBase::new(name.into(), did.into(), Self::KIND),
            compliance: signal!(Compliance, Self::KIND),
            location: Attribute::new_location(Coordinates::default(), Self::KIND),
        }
    }

    fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        match kind {
            AttributeKind::Compliance => Some(&self.compliance),
            AttributeKind::Location => Some(&self.location),
            other => self.base.attribute(other),
        }
    }

    fn attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        match kind {
            AttributeKind::Compliance => Some(&mut self.compliance),
            AttributeKind::Location => Some(&mut self.location),
            other => self.base.attribute_mut(other),
        }
    }
}

/// A participant with a trust score
#[derive(Debug, Clone)]
pub enum Stakeholder {
    ResourceProvider(ResourceProvider),
    ResourceCapacity(ResourceCapacity),
    ApplicationProvider(ApplicationProvider),
}

impl From<ResourceProvider> for Stakeholder {
    fn from(provider: ResourceProvider) -> Self {
        Self::ResourceProvider(provider)
    }
}

impl From<ResourceCapacity> for Stakeholder {
    fn from(capacity: ResourceCapacity) -> Self {
        Self::ResourceCapacity(capacity)
    }
}

impl From<ApplicationProvider> for Stakeholder {
    fn from(app: ApplicationProvider) -> Self {
        Self::ApplicationProvider(app)
    }
}

impl Stakeholder {
    fn base(&self) -> &StakeholderBase {
        match self {
            Self::ResourceProvider(s) => &s.base,
            Self::ResourceCapacity(s) => &s.base,
            Self::ApplicationProvider(s) => &s.base,
        }
    }

    fn base_mut(&mut self) -> &mut StakeholderBase {
        match self {
            Self::ResourceProvider(s) => &mut s.base,
            Self::ResourceCapacity(s) => &mut s.base,
            Self::ApplicationProvider(s) => &mut s.base,
        }
    }

    pub fn kind(&self) -> StakeholderKind {
        match self {
            Self::ResourceProvider(_) => StakeholderKind::ResourceProvider,
            Self::ResourceCapacity(_) => StakeholderKind::ResourceCapacity,
            Self::ApplicationProvider(_) => StakeholderKind::ApplicationProvider,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn did(&self) -> &Did {
        &self.base().did
    }

    /// The (name, DID) pair the trusted set is keyed by
    pub fn stakeholder_ref(&self) -> StakeholderRef {
        StakeholderRef::new(self.name(), self.did().clone())
    }

    /// Last computed trust; 0 before the first evaluation
    pub fn trust(&self) -> f64 {
        self.base().trust
    }

    pub(crate) fn set_trust(&mut self, trust: f64) {
        self.base_mut().trust = trust;
    }

    /// Providing stakeholder of a resource capacity
    pub fn provider(&self) -> Option<&Did> {
        match self {
            Self::ResourceCapacity(s) => Some(&s.provider),
            _ => None,
        }
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<&Attribute> {
        match self {
            Self::ResourceProvider(s) => s.attribute(kind),
            Self::ResourceCapacity(s) => s.attribute(kind),
            Self::ApplicationProvider(s) => s.attribute(kind),
        }
    }

    pub fn attribute_mut(&mut self, kind: AttributeKind) -> Option<&mut Attribute> {
        match self {
            Self::ResourceProvider(s) => s.attribute_mut(kind),
            Self::ResourceCapacity(s) => s.attribute_mut(kind),
            Self::ApplicationProvider(s) => s.attribute_mut(kind),
        }
    }

    fn require_mut(&mut self, kind: AttributeKind) -> Result<&mut Attribute> {
        let owner = self.kind();
        self.attribute_mut(kind)
            .ok_or_else(|| EvaluationError::MissingAttribute(format!("{} ({})", kind, owner)))
    }

    /// Overwrite a scalar attribute; `None` resets it to neutral trust
    pub fn set_signal(&mut self, kind: AttributeKind, value: Option<f64>) -> Result<()> {
        self.require_mut(kind)?.set_signal(value)?;
        Ok(())
    }

    /// Builder form of [`Stakeholder::set_signal`] for several values at once
    pub fn with_signals<I>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (AttributeKind, f64)>,
    {
        for (kind, value) in values {
            self.set_signal(kind, Some(value))?;
        }
        Ok(self)
    }

    pub fn set_location(&mut self, at: Coordinates) -> Result<()> {
        self.require_mut(AttributeKind::Location)?.set_coordinates(at)?;
        Ok(())
    }

    pub fn performance(&self) -> Option<&Performance> {
        self.attribute(AttributeKind::Performance)
            .and_then(Attribute::as_performance)
    }

    fn performance_mut(&mut self) -> Result<&mut Performance> {
        let owner = self.kind();
        self.attribute_mut(AttributeKind::Performance)
            .and_then(Attribute::as_performance_mut)
            .ok_or_else(|| {
                EvaluationError::MissingAttribute(format!("{} ({})", AttributeKind::Performance, owner))
            })
    }

    /// Append one raw reading to a performance metric buffer
    pub fn record_observation(&mut self, metric: &str, value: f64) -> Result<()> {
        self.performance_mut()?.record(metric, value)?;
        Ok(())
    }

    /// Append a batch of raw readings; nothing is appended if any is rejected
    pub fn record_observations<I>(&mut self, metric: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        self.performance_mut()?.record_all(metric, values)?;
        Ok(())
    }

    /// Materialize a stakeholder from its persisted row
    pub fn from_record(record: &StakeholderRecord) -> Result<Self> {
        let kind = StakeholderKind::try_from(record.kind)?;
        let mut stakeholder: Stakeholder = match kind {
            StakeholderKind::ResourceProvider => {
                ResourceProvider::new(record.name.clone(), record.did.clone()).into()
            }
            StakeholderKind::ResourceCapacity => {
                let provider = record.provider.clone().ok_or_else(|| {
                    EvaluationError::InvalidRecord(format!(
                        "resource capacity {} has no provider",
                        record.did
                    ))
                })?;
                ResourceCapacity::new(record.name.clone(), record.did.clone(), provider).into()
            }
            StakeholderKind::ApplicationProvider => {
                ApplicationProvider::new(record.name.clone(), record.did.clone()).into()
            }
        };

        for (attribute, value) in record.signals() {
            let Some(value) = value else { continue };
            if stakeholder.attribute(attribute).is_none() {
                debug!(did = %record.did, attribute = %attribute, "record value ignored for {}", kind);
                continue;
            }
            stakeholder.set_signal(attribute, Some(value))?;
        }

        if stakeholder.attribute(AttributeKind::Location).is_some() {
            let fallback = Coordinates::default();
            stakeholder.set_location(Coordinates::new(
                record.location_lat.unwrap_or(fallback.lat),
                record.location_lon.unwrap_or(fallback.lon),
            ))?;
        }

        Ok(stakeholder)
    }

    /// The persisted row for this stakeholder
    pub fn to_record(&self) -> StakeholderRecord {
        let signal = |kind| self.attribute(kind).and_then(Attribute::signal_value);
        let at = self
            .attribute(AttributeKind::Location)
            .and_then(Attribute::coordinates);

        StakeholderRecord {
            did: self.did().clone(),
            kind: self.kind().code(),
            name: self.name().to_string(),
            provider: self.provider().cloned(),
            reputation: signal(AttributeKind::Reputation),
            direct_trust: signal(AttributeKind::DirectTrust),
            compliance: signal(AttributeKind::Compliance),
            historical_behavior: signal(AttributeKind::HistoricalBehavior),
            location_lat: at.map(|c| c.lat),
            location_lon: at.map(|c| c.lon),
            contextual_fit: signal(AttributeKind::ContextualFit),
            third_party_validation: signal(AttributeKind::ThirdPartyValidation),
        }
    }
}

/// Flat stakeholder row as stored by the registry service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderRecord {
    pub did: Did,
    /// Stakeholder kind code: 0 provider, 1 resource capacity, 2 application provider
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    #[serde(default)]
    pub provider: Option<Did>,
    #[serde(default)]
    pub reputation: Option<f64>,
    #[serde(default)]
    pub direct_trust: Option<f64>,
    #[serde(default)]
    pub compliance: Option<f64>,
    #[serde(default)]
    pub historical_behavior: Option<f64>,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lon: Option<f64>,
    #[serde(default)]
    pub contextual_fit: Option<f64>,
    #[serde(default)]
    pub third_party_validation: Option<f64>,
}

impl StakeholderRecord {
    fn signals(&self) -> [(AttributeKind, Option<f64>); 6] {
        [
            (AttributeKind::Reputation, self.reputation),
            (AttributeKind::DirectTrust, self.direct_trust),
            (AttributeKind::Compliance, self.compliance),
            (AttributeKind::HistoricalBehavior, self.historical_behavior),
            (AttributeKind::ContextualFit, self.contextual_fit),
            (AttributeKind::ThirdPartyValidation, self.third_party_validation),
        ]
    }
}
