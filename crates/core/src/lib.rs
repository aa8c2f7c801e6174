//! Stakeholder trust evaluation for TrustMesh.
//!
//! This crate combines per-attribute trust from `trustmesh-model` into a
//! single score per stakeholder, gates it on identity, location and
//! provider trust, and keeps the evaluator's set of trusted stakeholders.

use thiserror::Error;
use trustmesh_model::TrustError;

pub mod evaluator;
pub mod ingest;
pub mod registry;
pub mod stakeholder;

pub use evaluator::{EvaluationOutcome, EvaluationReport, TrustEvaluator, TrustedEntry, TrustedSet};
pub use ingest::{apply_payload, refresh, refresh_all, AttributeFeed, StaticFeed};
pub use registry::StakeholderRegistry;
pub use stakeholder::{
    ApplicationProvider, ResourceCapacity, ResourceProvider, Stakeholder, StakeholderRecord,
};

/// Errors that can occur while evaluating stakeholders
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Trust model error: {0}")]
    Trust(#[from] TrustError),

    #[error("Unknown stakeholder kind: {0}")]
    UnknownStakeholderKind(String),

    #[error("Stakeholder has no {0} attribute")]
    MissingAttribute(String),

    #[error("Duplicate stakeholder: {0}")]
    DuplicateStakeholder(String),

    #[error("Unknown stakeholder: {0}")]
    UnknownStakeholder(String),

    #[error("Invalid stakeholder record: {0}")]
    InvalidRecord(String),

    #[error("Attribute feed error: {0}")]
    FeedError(String),

    #[error("Invalid attribute payload: {0}")]
    InvalidPayload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for EvaluationError {
    fn from(err: serde_json::Error) -> Self {
        EvaluationError::InvalidPayload(err.to_string())
    }
}

impl From<trustmesh_types::TypesError> for EvaluationError {
    fn from(err: trustmesh_types::TypesError) -> Self {
        match err {
            trustmesh_types::TypesError::InvalidStakeholderKind(kind) => {
                EvaluationError::UnknownStakeholderKind(kind)
            }
            other => EvaluationError::Trust(other.into()),
        }
    }
}

/// Result type for evaluation operations
pub type Result<T> = std::result::Result<T, EvaluationError>;
