use std::collections::BTreeMap;

use tracing::{debug, warn};
use trustmesh_types::{MetricName, MetricRanges, TrustCalcMode};

use crate::estimator::{AdaptiveEstimator, EstimatorParams};
use crate::normalize::prob_transform;
use crate::TrustError;

/// Append-only store of raw readings collected since the last evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationBuffer {
    values: Vec<f64>,
}

impl ObservationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Hand over every buffered reading and leave the buffer empty
    pub fn take_and_clear(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.values)
    }
}

#[derive(Debug, Clone)]
struct MetricTrack {
    buffer: ObservationBuffer,
    estimator: AdaptiveEstimator,
}

impl MetricTrack {
    fn new(params: EstimatorParams) -> Self {
        Self {
            buffer: ObservationBuffer::new(),
            estimator: AdaptiveEstimator::with_params(params),
        }
    }
}

/// Multi-metric performance state of a resource.
///
/// Every tracked metric owns a buffer and its own estimator. Aggregation
/// drains the buffers, so each reading contributes to exactly one
/// evaluation.
#[derive(Debug, Clone)]
pub struct Performance {
    metrics: BTreeMap<String, MetricTrack>,
    params: EstimatorParams,
}

impl Performance {
    pub fn new<I, S>(metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_params(metrics, EstimatorParams::default())
    }

    pub fn with_params<I, S>(metrics: I, params: EstimatorParams) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metrics: metrics
                .into_iter()
                .map(|name| (name.into(), MetricTrack::new(params)))
                .collect(),
            params,
        }
    }

    /// Tracks the full metric vocabulary
    pub fn with_default_metrics() -> Self {
        Self::new(MetricName::ALL.into_iter().map(MetricName::as_str))
    }

    /// Start tracking `metric`; returns false if it was already tracked
    pub fn track(&mut self, metric: impl Into<String>) -> bool {
        let params = self.params;
        let metric = metric.into();
        if self.metrics.contains_key(&metric) {
            return false;
        }
        self.metrics.insert(metric, MetricTrack::new(params));
        true
    }

    pub fn is_tracked(&self, metric: &str) -> bool {
        self.metrics.contains_key(metric)
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Append one raw reading for a tracked metric
    pub fn record(&mut self, metric: &str, value: f64) -> crate::Result<()> {
        self.record_all(metric, [value])
    }

    /// Append a batch of raw readings; nothing is appended if any is invalid
    pub fn record_all<I>(&mut self, metric: &str, values: I) -> crate::Result<()>
    where
        I: IntoIterator<Item = f64>,
    {
        let track = self
            .metrics
            .get_mut(metric)
            .ok_or_else(|| TrustError::UnknownMetric(metric.to_string()))?;

        let values: Vec<f64> = values.into_iter().collect();
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(TrustError::InvalidAttributeValue(format!(
                "observation for {} must be finite, got {}",
                metric, bad
            )));
        }
        for value in values {
            track.buffer.push(value);
        }
        Ok(())
    }

    /// Readings buffered for `metric` since the last aggregation
    pub fn pending(&self, metric: &str) -> Option<&[f64]> {
        self.metrics.get(metric).map(|track| track.buffer.values())
    }

    pub fn pending_count(&self) -> usize {
        self.metrics.values().map(|track| track.buffer.len()).sum()
    }

    pub fn estimator(&self, metric: &str) -> Option<&AdaptiveEstimator> {
        self.metrics.get(metric).map(|track| &track.estimator)
    }

    /// Drain every metric buffer, returning what was pending per metric
    pub fn take_and_clear(&mut self) -> BTreeMap<String, Vec<f64>> {
        self.metrics
            .iter_mut()
            .map(|(name, track)| (name.clone(), track.buffer.take_and_clear()))
            .collect()
    }

    /// Turn the pending readings into one trust value and drain the buffers.
    ///
    /// Deterministic mode pools every normalized reading across metrics and
    /// averages them; it requires a declared range for every metric holding
    /// readings. Probabilistic mode feeds each reading through its metric's
    /// estimator and averages the adjusted scores of all tracked metrics.
    pub fn aggregate(&mut self, mode: TrustCalcMode, ranges: &MetricRanges) -> crate::Result<f64> {
        match mode {
            TrustCalcMode::Deterministic => self.aggregate_deterministic(ranges),
            TrustCalcMode::Probabilistic => self.aggregate_probabilistic(ranges),
        }
    }

    fn aggregate_deterministic(&mut self, ranges: &MetricRanges) -> crate::Result<f64> {
        // validate before draining so a rejected call loses nothing
        if let Some(name) = self
            .metrics
            .iter()
            .find(|(name, track)| !track.buffer.is_empty() && !ranges.contains(name))
            .map(|(name, _)| name)
        {
            return Err(TrustError::MissingMetricRange(name.clone()));
        }

        let drained = self.take_and_clear();
        let normalized: Vec<f64> = drained
            .iter()
            .filter_map(|(name, values)| ranges.get(name).map(|range| (range, values)))
            .flat_map(|(range, values)| values.iter().map(move |v| prob_transform(range, *v)))
            .collect();

        debug!(observations = normalized.len(), "deterministic performance aggregate");
        mean(&normalized, "no performance observations since the last evaluation")
    }

    fn aggregate_probabilistic(&mut self, ranges: &MetricRanges) -> crate::Result<f64> {
        for (name, track) in self.metrics.iter_mut() {
            let range = ranges.get(name);
            for value in track.buffer.take_and_clear() {
                let x = match range {
                    Some(range) => prob_transform(range, value),
                    None => {
                        if !(0.0..=1.0).contains(&value) {
                            warn!(
                                metric = %name,
                                value,
                                "unnormalized observation outside [0, 1], clamping"
                            );
                        }
                        value.clamp(0.0, 1.0)
                    }
                };
                track.estimator.observe(x);
            }
        }

        let scores: Vec<f64> = self
            .metrics
            .values()
            .map(|track| track.estimator.adjusted_trust_score())
            .collect();

        debug!(metrics = scores.len(), "probabilistic performance aggregate");
        mean(&scores, "no performance metrics are tracked")
    }
}

impl Default for Performance {
    fn default() -> Self {
        Self::with_default_metrics()
    }
}

fn mean(values: &[f64], context: &str) -> crate::Result<f64> {
    if values.is_empty() {
        return Err(TrustError::EmptyAggregate(context.to_string()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustmesh_types::{Behavior, MetricRange};

    fn unit_ranges() -> MetricRanges {
        MetricRanges::empty()
            .with_range(
                "throughput",
                MetricRange::new(0.0, 1.0, Behavior::HigherIsBetter).unwrap(),
            )
            .with_range(
                "latency",
                MetricRange::new(0.0, 1.0, Behavior::LowerIsBetter).unwrap(),
            )
    }

    #[test]
    fn test_buffer_take_and_clear() {
        let mut buffer = ObservationBuffer::new();
        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.take_and_clear(), vec![1.0, 2.0]);
        assert!(buffer.is_empty());
        assert!(buffer.take_and_clear().is_empty());
    }

    #[test]
    fn test_record_rejects_unknown_and_non_finite() {
        let mut performance = Performance::new(["throughput"]);
        assert!(matches!(
            performance.record("temperature", 1.0),
            Err(TrustError::UnknownMetric(_))
        ));
        assert!(performance
            .record_all("throughput", [0.5, f64::INFINITY])
            .is_err());
        assert_eq!(performance.pending_count(), 0);
        performance.record_all("throughput", [0.5, 0.6]).unwrap();
        assert_eq!(performance.pending("throughput"), Some(&[0.5, 0.6][..]));
    }

    #[test]
    fn test_deterministic_pools_across_metrics() {
        let mut performance = Performance::new(["throughput", "latency"]);
        // three throughput readings at the upper bound, one latency reading at the worst bound
        performance.record_all("throughput", [1.0, 1.0, 1.0]).unwrap();
        performance.record("latency", 1.0).unwrap();

        let trust = performance
            .aggregate(TrustCalcMode::Deterministic, &unit_ranges())
            .unwrap();
        // pooled mean (1 + 1 + 1 + 0) / 4, not the per-metric mean 0.5
        assert!((trust - 0.75).abs() < 1e-12);
        assert_eq!(performance.pending_count(), 0);
    }

    #[test]
    fn test_deterministic_empty_is_error() {
        let mut performance = Performance::new(["throughput"]);
        assert!(matches!(
            performance.aggregate(TrustCalcMode::Deterministic, &unit_ranges()),
            Err(TrustError::EmptyAggregate(_))
        ));
    }

    #[test]
    fn test_deterministic_second_call_without_data_is_error() {
        let mut performance = Performance::new(["throughput"]);
        performance.record("throughput", 0.5).unwrap();
        assert!(performance
            .aggregate(TrustCalcMode::Deterministic, &unit_ranges())
            .is_ok());
        assert!(performance
            .aggregate(TrustCalcMode::Deterministic, &unit_ranges())
            .is_err());
    }

    #[test]
    fn test_deterministic_missing_range_keeps_buffers() {
        let mut performance = Performance::new(["throughput", "jitter"]);
        performance.record("throughput", 0.5).unwrap();
        performance.record("jitter", 3.0).unwrap();
        assert!(matches!(
            performance.aggregate(TrustCalcMode::Deterministic, &unit_ranges()),
            Err(TrustError::MissingMetricRange(name)) if name == "jitter"
        ));
        assert_eq!(performance.pending_count(), 2);
    }

    #[test]
    fn test_probabilistic_feeds_estimators() {
        let mut performance = Performance::new(["throughput", "latency"]);
        performance.record_all("throughput", [1.0; 3]).unwrap();
        performance.record_all("latency", [0.0; 3]).unwrap();

        let trust = performance
            .aggregate(TrustCalcMode::Probabilistic, &unit_ranges())
            .unwrap();
        assert_eq!(performance.pending_count(), 0);

        let throughput = performance.estimator("throughput").unwrap();
        let latency = performance.estimator("latency").unwrap();
        // low latency normalizes to 1, so both estimators moved upward
        assert!(throughput.trust_score() > 0.5);
        assert!(latency.trust_score() > 0.5);
        let expected = (throughput.adjusted_trust_score() + latency.adjusted_trust_score()) / 2.0;
        assert!((trust - expected).abs() < 1e-12);
    }

    #[test]
    fn test_probabilistic_repeat_uses_estimator_state() {
        let mut performance = Performance::new(["throughput"]);
        performance.record_all("throughput", [0.9; 5]).unwrap();
        let first = performance
            .aggregate(TrustCalcMode::Probabilistic, &unit_ranges())
            .unwrap();
        let second = performance
            .aggregate(TrustCalcMode::Probabilistic, &unit_ranges())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_probabilistic_without_range_feeds_raw_value() {
        let mut performance = Performance::new(["availability"]);
        performance.record("availability", 1.0).unwrap();
        performance
            .aggregate(TrustCalcMode::Probabilistic, &MetricRanges::empty())
            .unwrap();
        let estimator = performance.estimator("availability").unwrap();
        assert!((estimator.trust_score() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_probabilistic_no_metrics_is_error() {
        let mut performance = Performance::new(Vec::<String>::new());
        assert!(matches!(
            performance.aggregate(TrustCalcMode::Probabilistic, &MetricRanges::default()),
            Err(TrustError::EmptyAggregate(_))
        ));
    }

    #[test]
    fn test_default_metrics_and_tracking() {
        let mut performance = Performance::default();
        assert_eq!(performance.metric_names().count(), MetricName::ALL.len());
        assert!(!performance.track("latency"));
        assert!(performance.track("temperature"));
        assert!(performance.is_tracked("temperature"));
    }
}
