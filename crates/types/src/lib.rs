//! Shared types and traits for TrustMesh

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scheme tag every syntactically valid identifier starts with
pub const DID_PREFIX: &str = "did:";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    #[error("Invalid stakeholder kind: {0}")]
    InvalidStakeholderKind(String),
    #[error("Invalid behavior code: {0}")]
    InvalidBehavior(String),
    #[error("Invalid metric range: {0}")]
    InvalidRange(String),
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
    #[error("Invalid calculation mode: {0}")]
    InvalidMode(String),
}

pub type Result<T> = std::result::Result<T, TypesError>;

// Identifiers
/// Decentralized identifier, kept as the raw string it was issued as
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Syntactic check only; signatures are verified elsewhere
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(DID_PREFIX)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Did {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Did {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// The three kinds of participant that carry a trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeholderKind {
    /// Offers compute/network resources
    ResourceProvider,
    /// A single resource instance offered by a provider
    ResourceCapacity,
    /// Consumes resources
    ApplicationProvider,
}

impl StakeholderKind {
    pub const ALL: [StakeholderKind; 3] = [
        Self::ResourceProvider,
        Self::ResourceCapacity,
        Self::ApplicationProvider,
    ];

    /// Numeric code used by persisted records
    pub fn code(self) -> u8 {
        match self {
            Self::ResourceProvider => 0,
            Self::ResourceCapacity => 1,
            Self::ApplicationProvider => 2,
        }
    }
}

impl TryFrom<u8> for StakeholderKind {
    type Error = TypesError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::ResourceProvider),
            1 => Ok(Self::ResourceCapacity),
            2 => Ok(Self::ApplicationProvider),
            other => Err(TypesError::InvalidStakeholderKind(format!(
                "code {} does not name a stakeholder kind",
                other
            ))),
        }
    }
}

impl FromStr for StakeholderKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "resource_provider" => Ok(Self::ResourceProvider),
            "resource_capacity" => Ok(Self::ResourceCapacity),
            "application_provider" => Ok(Self::ApplicationProvider),
            other => Err(TypesError::InvalidStakeholderKind(other.to_string())),
        }
    }
}

impl fmt::Display for StakeholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceProvider => write!(f, "resource_provider"),
            Self::ResourceCapacity => write!(f, "resource_capacity"),
            Self::ApplicationProvider => write!(f, "application_provider"),
        }
    }
}

/// Name and identifier pair; the key of the evaluator's trusted set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StakeholderRef {
    pub name: String,
    pub did: Did,
}

impl StakeholderRef {
    pub fn new(name: impl Into<String>, did: Did) -> Self {
        Self {
            name: name.into(),
            did,
        }
    }
}

impl fmt::Display for StakeholderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.did)
    }
}

// Location types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            lat: 46.0,
            lon: 15.0,
        }
    }
}

/// Rectangular latitude/longitude eligibility region, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoFence {
    pub fn contains(&self, at: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&at.lat)
            && (self.min_lon..=self.max_lon).contains(&at.lon)
    }
}

impl Default for GeoFence {
    fn default() -> Self {
        Self {
            min_lat: 45.42,
            max_lat: 46.88,
            min_lon: 13.38,
            max_lon: 16.60,
        }
    }
}

// Metric types
/// The fixed performance metric vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Availability,
    Reliability,
    EnergyEfficiency,
    Latency,
    Throughput,
    Bandwidth,
    Jitter,
    PacketLoss,
    UtilizationRate,
}

impl MetricName {
    pub const ALL: [MetricName; 9] = [
        Self::Availability,
        Self::Reliability,
        Self::EnergyEfficiency,
        Self::Latency,
        Self::Throughput,
        Self::Bandwidth,
        Self::Jitter,
        Self::PacketLoss,
        Self::UtilizationRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Availability => "availability",
            Self::Reliability => "reliability",
            Self::EnergyEfficiency => "energy_efficiency",
            Self::Latency => "latency",
            Self::Throughput => "throughput",
            Self::Bandwidth => "bandwidth",
            Self::Jitter => "jitter",
            Self::PacketLoss => "packet_loss",
            Self::UtilizationRate => "utilization_rate",
        }
    }

    /// Range and direction used when no override is configured
    pub fn default_range(self) -> MetricRange {
        let (minimum, maximum, behavior) = match self {
            Self::Availability => (0.0, 1.0, Behavior::HigherIsBetter),
            Self::Reliability => (0.0, 1.0, Behavior::HigherIsBetter),
            Self::EnergyEfficiency => (0.0, 1.0, Behavior::HigherIsBetter),
            // milliseconds
            Self::Latency => (0.0, 500.0, Behavior::LowerIsBetter),
            // Mbit/s
            Self::Throughput => (0.0, 1000.0, Behavior::HigherIsBetter),
            Self::Bandwidth => (0.0, 1000.0, Behavior::HigherIsBetter),
            // milliseconds
            Self::Jitter => (0.0, 100.0, Behavior::LowerIsBetter),
            Self::PacketLoss => (0.0, 1.0, Behavior::LowerIsBetter),
            Self::UtilizationRate => (0.0, 1.0, Behavior::HigherIsBetter),
        };
        MetricRange {
            minimum,
            maximum,
            behavior,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| TypesError::UnknownMetric(s.to_string()))
    }
}

/// Which direction of a raw metric reading counts as better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Behavior {
    /// Code `1`
    HigherIsBetter,
    /// Code `-1`
    LowerIsBetter,
    /// Code `0`
    CloserToMidpoint,
}

impl Behavior {
    pub fn code(self) -> i8 {
        match self {
            Self::HigherIsBetter => 1,
            Self::LowerIsBetter => -1,
            Self::CloserToMidpoint => 0,
        }
    }
}

impl TryFrom<i8> for Behavior {
    type Error = TypesError;

    fn try_from(code: i8) -> Result<Self> {
        match code {
            1 => Ok(Self::HigherIsBetter),
            -1 => Ok(Self::LowerIsBetter),
            0 => Ok(Self::CloserToMidpoint),
            other => Err(TypesError::InvalidBehavior(format!(
                "behavior must be 1, -1, or 0, got {}",
                other
            ))),
        }
    }
}

impl From<Behavior> for i8 {
    fn from(behavior: Behavior) -> Self {
        behavior.code()
    }
}

#[derive(Deserialize)]
struct RawMetricRange {
    minimum: f64,
    maximum: f64,
    behavior: Behavior,
}

/// Declared valid range of a metric plus its better-direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMetricRange")]
pub struct MetricRange {
    pub minimum: f64,
    pub maximum: f64,
    pub behavior: Behavior,
}

impl MetricRange {
    pub fn new(minimum: f64, maximum: f64, behavior: Behavior) -> Result<Self> {
        if !minimum.is_finite() || !maximum.is_finite() || minimum >= maximum {
            return Err(TypesError::InvalidRange(format!(
                "minimum {} must be finite and below maximum {}",
                minimum, maximum
            )));
        }
        Ok(Self {
            minimum,
            maximum,
            behavior,
        })
    }

    pub fn midpoint(&self) -> f64 {
        (self.minimum + self.maximum) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.maximum - self.minimum
    }
}

impl TryFrom<RawMetricRange> for MetricRange {
    type Error = TypesError;

    fn try_from(raw: RawMetricRange) -> Result<Self> {
        Self::new(raw.minimum, raw.maximum, raw.behavior)
    }
}

/// Metric name to range table consumed by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRanges(BTreeMap<String, MetricRange>);

impl MetricRanges {
    /// An empty table; every metric is then fed unnormalized
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, metric: impl Into<String>, range: MetricRange) -> Option<MetricRange> {
        self.0.insert(metric.into(), range)
    }

    pub fn with_range(mut self, metric: impl Into<String>, range: MetricRange) -> Self {
        self.insert(metric, range);
        self
    }

    pub fn get(&self, metric: &str) -> Option<&MetricRange> {
        self.0.get(metric)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.0.contains_key(metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricRange)> {
        self.0.iter().map(|(name, range)| (name.as_str(), range))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MetricRanges {
    fn default() -> Self {
        Self(
            MetricName::ALL
                .into_iter()
                .map(|name| (name.as_str().to_string(), name.default_range()))
                .collect(),
        )
    }
}

/// How the performance attribute turns observations into trust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustCalcMode {
    /// Normalize and average every buffered value
    Deterministic,
    /// Feed normalized values through one adaptive estimator per metric
    #[default]
    Probabilistic,
}

impl FromStr for TrustCalcMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deterministic" => Ok(Self::Deterministic),
            "probabilistic" => Ok(Self::Probabilistic),
            other => Err(TypesError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for TrustCalcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deterministic => write!(f, "deterministic"),
            Self::Probabilistic => write!(f, "probabilistic"),
        }
    }
}
