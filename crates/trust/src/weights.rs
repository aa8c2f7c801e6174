use trustmesh_types::StakeholderKind;

use crate::AttributeKind;

/// Per-kind blend weights, indexed by [`StakeholderKind::code`]:
/// resource provider, resource capacity, application provider.
///
/// Identity and Location are gates and carry no weight.
pub struct AttributeWeights;

impl AttributeWeights {
    pub const REPUTATION: [f64; 3] = [0.5, 0.6, 0.7];
    pub const DIRECT_TRUST: [f64; 3] = [0.5, 0.6, 0.7];
    pub const COMPLIANCE: [f64; 3] = [1.2, 0.6, 0.7];
    pub const HISTORICAL_BEHAVIOR: [f64; 3] = [0.1, 0.2, 0.3];
    pub const PERFORMANCE: [f64; 3] = [0.1, 1.6, 0.3];
    pub const CONTEXTUAL_FIT: [f64; 3] = [0.1, 0.2, 0.3];
    pub const THIRD_PARTY_VALIDATION: [f64; 3] = [0.1, 0.2, 0.3];

    /// Weight of `attribute` when it belongs to a `stakeholder` of the given kind
    pub fn weight(attribute: AttributeKind, stakeholder: StakeholderKind) -> Option<f64> {
        let row = match attribute {
            AttributeKind::Identity | AttributeKind::Location => return None,
            AttributeKind::Reputation => &Self::REPUTATION,
            AttributeKind::DirectTrust => &Self::DIRECT_TRUST,
            AttributeKind::Compliance => &Self::COMPLIANCE,
            AttributeKind::HistoricalBehavior => &Self::HISTORICAL_BEHAVIOR,
            AttributeKind::Performance => &Self::PERFORMANCE,
            AttributeKind::ContextualFit => &Self::CONTEXTUAL_FIT,
            AttributeKind::ThirdPartyValidation => &Self::THIRD_PARTY_VALIDATION,
        };
        Some(row[stakeholder.code() as usize])
    }
}
