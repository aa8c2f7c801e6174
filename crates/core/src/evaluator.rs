//! Trust evaluator and its trusted set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trustmesh_model::{AttributeKind, CalculationContext, TrustConfig};
use trustmesh_types::{Did, MetricRanges, StakeholderKind, StakeholderRef, TrustCalcMode};

use crate::registry::StakeholderRegistry;
use crate::stakeholder::Stakeholder;
use crate::{EvaluationError, Result};

/// A trusted-set member and when it was admitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedEntry {
    pub stakeholder: StakeholderRef,
    pub admitted_at: DateTime<Utc>,
}

/// Stakeholders whose latest trust passed the threshold.
///
/// `version` increases on every membership change, so callers holding a
/// snapshot can tell whether it is stale.
#[derive(Debug, Clone, Default)]
pub struct TrustedSet {
    entries: Vec<TrustedEntry>,
    version: u64,
}

impl TrustedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, stakeholder: &StakeholderRef) -> bool {
        self.entries.iter().any(|e| &e.stakeholder == stakeholder)
    }

    /// Membership by identifier only, as used by the provider gate
    pub fn contains_did(&self, did: &Did) -> bool {
        self.entries.iter().any(|e| &e.stakeholder.did == did)
    }

    /// Returns false if already a member
    pub fn insert(&mut self, stakeholder: StakeholderRef) -> bool {
        if self.contains(&stakeholder) {
            return false;
        }
        self.entries.push(TrustedEntry {
            stakeholder,
            admitted_at: Utc::now(),
        });
        self.version += 1;
        true
    }

    /// Returns false if not a member
    pub fn remove(&mut self, stakeholder: &StakeholderRef) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.stakeholder != stakeholder);
        if self.entries.len() == before {
            return false;
        }
        self.version += 1;
        true
    }

    pub fn get(&self, stakeholder: &StakeholderRef) -> Option<&TrustedEntry> {
        self.entries.iter().find(|e| &e.stakeholder == stakeholder)
    }

    /// Members in admission order
    pub fn snapshot(&self) -> Vec<StakeholderRef> {
        self.entries.iter().map(|e| e.stakeholder.clone()).collect()
    }

    pub fn entries(&self) -> &[TrustedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Binary checks that force trust to 0 when they fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Identity,
    Location,
    /// The resource's provider is a member of the trusted set
    ProviderTrusted,
}

/// Gates checked for a stakeholder of `kind`, in order
pub fn gates(kind: StakeholderKind) -> &'static [Gate] {
    match kind {
        StakeholderKind::ResourceProvider => &[Gate::Identity],
        StakeholderKind::ResourceCapacity => &[Gate::Identity, Gate::Location, Gate::ProviderTrusted],
        StakeholderKind::ApplicationProvider => &[Gate::Identity, Gate::Location],
    }
}

/// Attributes blended into the trust of a stakeholder of `kind`
pub fn weighted_attributes(kind: StakeholderKind) -> &'static [AttributeKind] {
    match kind {
        StakeholderKind::ResourceProvider => &[
            AttributeKind::Compliance,
            AttributeKind::HistoricalBehavior,
            AttributeKind::Reputation,
            AttributeKind::DirectTrust,
        ],
        StakeholderKind::ResourceCapacity => &[
            AttributeKind::Performance,
            AttributeKind::HistoricalBehavior,
            AttributeKind::ContextualFit,
            AttributeKind::ThirdPartyValidation,
            AttributeKind::Reputation,
            AttributeKind::DirectTrust,
        ],
        StakeholderKind::ApplicationProvider => &[
            AttributeKind::Compliance,
            AttributeKind::Reputation,
            AttributeKind::DirectTrust,
        ],
    }
}

/// Result of evaluating one stakeholder in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub stakeholder: StakeholderRef,
    pub kind: StakeholderKind,
    /// Computed trust, or the error that left the prior trust in place
    pub trust: std::result::Result<f64, EvaluationError>,
    pub trusted: bool,
}

/// Outcome of [`TrustEvaluator::evaluate_registry`]
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub evaluated_at: DateTime<Utc>,
    /// One entry per stakeholder, in evaluation order
    pub outcomes: Vec<EvaluationOutcome>,
    pub trusted: Vec<StakeholderRef>,
    pub trusted_set_version: u64,
}

impl EvaluationReport {
    pub fn failures(&self) -> impl Iterator<Item = &EvaluationOutcome> {
        self.outcomes.iter().filter(|o| o.trust.is_err())
    }

    pub fn outcome(&self, did: &Did) -> Option<&EvaluationOutcome> {
        self.outcomes.iter().find(|o| &o.stakeholder.did == did)
    }
}

/// Computes stakeholder trust and maintains the trusted set
#[derive(Debug, Clone)]
pub struct TrustEvaluator {
    config: TrustConfig,
    ranges: MetricRanges,
    trusted: TrustedSet,
}

impl Default for TrustEvaluator {
    fn default() -> Self {
        Self::new(TrustConfig::default())
    }
}

impl TrustEvaluator {
    pub fn new(config: TrustConfig) -> Self {
        let ranges = config.effective_ranges();
        Self {
            config,
            ranges,
            trusted: TrustedSet::new(),
        }
    }

    pub fn with_mode(mode: TrustCalcMode) -> Self {
        Self::new(TrustConfig::default().with_mode(mode))
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    pub fn mode(&self) -> TrustCalcMode {
        self.config.mode
    }

    pub fn ranges(&self) -> &MetricRanges {
        &self.ranges
    }

    fn context(&self) -> CalculationContext<'_> {
        CalculationContext {
            mode: self.config.mode,
            ranges: &self.ranges,
            geofence: &self.config.geofence,
        }
    }

    fn gate_passes(&self, gate: Gate, stakeholder: &mut Stakeholder) -> Result<bool> {
        let kind = match gate {
            Gate::Identity => AttributeKind::Identity,
            Gate::Location => AttributeKind::Location,
            Gate::ProviderTrusted => {
                return match stakeholder.provider() {
                    Some(provider) => Ok(self.trusted.contains_did(provider)),
                    None => Err(EvaluationError::MissingAttribute("provider".to_string())),
                };
            }
        };
        let attribute = stakeholder
            .attribute_mut(kind)
            .ok_or_else(|| EvaluationError::MissingAttribute(kind.to_string()))?;
        Ok(attribute.calculate_trust(&self.context())? >= 1.0)
    }

    /// Recompute and store the stakeholder's trust.
    ///
    /// A failed gate yields `Ok(0.0)` without touching the weighted
    /// attributes. On `Err` the stakeholder's prior trust is left as it was;
    /// performance buffers may already have been drained.
    pub fn compute_trust(&self, stakeholder: &mut Stakeholder) -> Result<f64> {
        let kind = stakeholder.kind();

        for &gate in gates(kind) {
            if !self.gate_passes(gate, stakeholder)? {
                info!(
                    stakeholder = %stakeholder.stakeholder_ref(),
                    gate = ?gate,
                    "gate failed, trust forced to 0"
                );
                stakeholder.set_trust(0.0);
                return Ok(0.0);
            }
        }

        let ctx = self.context();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for &attribute_kind in weighted_attributes(kind) {
            let attribute = stakeholder
                .attribute_mut(attribute_kind)
                .ok_or_else(|| EvaluationError::MissingAttribute(attribute_kind.to_string()))?;
            let weight = attribute.weight().ok_or_else(|| {
                EvaluationError::Internal(format!("{} has no weight for {}", attribute_kind, kind))
            })?;
            let trust = attribute.calculate_trust(&ctx)?;
            weighted_sum += weight * trust;
            weight_total += weight;
        }

        if weight_total <= 0.0 {
            return Err(EvaluationError::Internal(format!(
                "no weighted attributes for {}",
                kind
            )));
        }

        let trust = (weighted_sum / weight_total).clamp(0.0, 1.0);
        stakeholder.set_trust(trust);
        debug!(stakeholder = %stakeholder.stakeholder_ref(), trust, "stakeholder trust computed");
        Ok(trust)
    }

    /// Update trusted-set membership from the stakeholder's current trust.
    ///
    /// Returns whether the stakeholder is trusted afterwards.
    pub fn trust_evaluation(&mut self, stakeholder: &Stakeholder) -> bool {
        let key = stakeholder.stakeholder_ref();
        if stakeholder.trust() > self.config.trust_threshold {
            if self.trusted.insert(key.clone()) {
                info!(stakeholder = %key, trust = stakeholder.trust(), "stakeholder trusted");
            }
            true
        } else {
            if self.trusted.remove(&key) {
                info!(stakeholder = %key, trust = stakeholder.trust(), "stakeholder no longer trusted");
            }
            false
        }
    }

    /// `compute_trust` followed by `trust_evaluation`.
    ///
    /// When the computation fails, membership is left unchanged.
    pub fn evaluate(&mut self, stakeholder: &mut Stakeholder) -> Result<f64> {
        let trust = self.compute_trust(stakeholder)?;
        self.trust_evaluation(stakeholder);
        Ok(trust)
    }

    /// Current members as (name, DID) pairs
    pub fn trusted_stakeholders(&self) -> Vec<StakeholderRef> {
        self.trusted.snapshot()
    }

    pub fn trusted_set(&self) -> &TrustedSet {
        &self.trusted
    }

    pub fn is_trusted(&self, stakeholder: &Stakeholder) -> bool {
        self.trusted.contains(&stakeholder.stakeholder_ref())
    }

    /// Evaluate every registered stakeholder: providers first, then
    /// resource capacities, then application providers.
    pub fn evaluate_registry(&mut self, registry: &mut StakeholderRegistry) -> EvaluationReport {
        let mut outcomes = Vec::with_capacity(registry.len());

        for kind in StakeholderKind::ALL {
            for stakeholder in registry.iter_mut().filter(|s| s.kind() == kind) {
                let trust = self.evaluate(stakeholder);
                if let Err(err) = &trust {
                    warn!(stakeholder = %stakeholder.stakeholder_ref(), error = %err, "evaluation failed");
                }
                outcomes.push(EvaluationOutcome {
                    stakeholder: stakeholder.stakeholder_ref(),
                    kind,
                    trusted: self.is_trusted(stakeholder),
                    trust,
                });
            }
        }

        info!(
            evaluated = outcomes.len(),
            trusted = self.trusted.len(),
            "registry evaluation finished"
        );

        EvaluationReport {
            evaluated_at: Utc::now(),
            outcomes,
            trusted: self.trusted.snapshot(),
            trusted_set_version: self.trusted.version(),
        }
    }
}
