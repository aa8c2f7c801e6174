use thiserror::Error;

/// Errors that can occur while computing attribute trust
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrustError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid attribute value: {0}")]
    InvalidAttributeValue(String),

    #[error("Aggregate of an empty set: {0}")]
    EmptyAggregate(String),

    #[error("No declared range for metric: {0}")]
    MissingMetricRange(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Attribute kind mismatch: {0}")]
    AttributeMismatch(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for TrustError {
    fn from(err: serde_json::Error) -> Self {
        TrustError::ConfigError(err.to_string())
    }
}

impl From<trustmesh_types::TypesError> for TrustError {
    fn from(err: trustmesh_types::TypesError) -> Self {
        match err {
            trustmesh_types::TypesError::UnknownMetric(name) => TrustError::UnknownMetric(name),
            other => TrustError::InvalidInput(other.to_string()),
        }
    }
}
