//! Per-attribute trust model for TrustMesh
//!
//! This crate computes the trust contribution of a single stakeholder
//! attribute:
//! - Normalization of raw metric readings onto [0, 1]
//! - Adaptive Beta-distribution estimation for streamed metrics
//! - The nine attribute kinds and their trust rules
//! - Per-stakeholder-kind blend weights
//!
//! Combining attributes into a stakeholder decision lives in `trustmesh-core`.

mod attributes;
mod error;
mod estimator;
mod normalize;
mod performance;
mod weights;

pub use attributes::{
    Attribute, AttributeKind, AttributeValue, CalculationContext, NEUTRAL_TRUST,
};
pub use error::TrustError;
pub use estimator::{AdaptiveEstimator, EstimatorParams, WINDOW_SIZE};
pub use normalize::{normalize, prob_transform};
pub use performance::{ObservationBuffer, Performance};
pub use weights::AttributeWeights;

use serde::{Deserialize, Serialize};
use trustmesh_types::{GeoFence, MetricRanges, TrustCalcMode};

/// Result type for trust model operations
pub type Result<T> = std::result::Result<T, TrustError>;

/// Trust evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// How performance observations become trust
    pub mode: TrustCalcMode,
    /// A stakeholder is trusted only when its trust is strictly above this
    pub trust_threshold: f64,
    /// Overrides the default metric range table when set
    pub ranges: Option<MetricRanges>,
    /// Eligibility region for location checks
    pub geofence: GeoFence,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            mode: TrustCalcMode::default(),
            trust_threshold: 0.5,
            ranges: None,
            geofence: GeoFence::default(),
        }
    }
}

impl TrustConfig {
    /// Parse a configuration document, missing fields take their defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_mode(mut self, mode: TrustCalcMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_threshold(mut self, trust_threshold: f64) -> Self {
        self.trust_threshold = trust_threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.trust_threshold) {
            return Err(TrustError::ConfigError(format!(
                "trust threshold must be between 0.0 and 1.0, got {}",
                self.trust_threshold
            )));
        }

        let fence = &self.geofence;
        let bounds = [fence.min_lat, fence.max_lat, fence.min_lon, fence.max_lon];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(TrustError::ConfigError(format!(
                "geofence bounds must be finite, got {:?}",
                fence
            )));
        }
        if fence.min_lat > fence.max_lat || fence.min_lon > fence.max_lon {
            return Err(TrustError::ConfigError(format!(
                "geofence minimum exceeds maximum: {:?}",
                fence
            )));
        }
        Ok(())
    }

    /// Metric ranges in effect: the override, or the default table
    pub fn effective_ranges(&self) -> MetricRanges {
        self.ranges.clone().unwrap_or_default()
    }
}
