//! Adaptive Beta-distribution trust estimator.
//!
//! One estimator tracks one performance metric. Every normalized
//! observation is blended into a Beta(`alpha`, `beta`) belief whose
//! forgetting factor grows with the volatility of the recent window and
//! whose effective sample size grows more slowly when observations are
//! noisy.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, ContinuousCDF};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Number of recent observations used to estimate volatility
pub const WINDOW_SIZE: usize = 5;

const INITIAL_PSEUDO_COUNT: f64 = 1.0;
const INITIAL_N_EFF: f64 = 2.0;
/// Below this effective sample size the variance estimate is not used
const MIN_N_EFF_FOR_PENALTY: f64 = 4.0;

/// Tuning constants of an [`AdaptiveEstimator`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// Forgetting factor applied when the window is perfectly stable
    pub base_lambda: f64,
    /// How quickly the effective sample size grows per observation
    pub growth_rate: f64,
    /// Weight of the standard deviation in the adjusted score
    pub uncertainty_penalty: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            base_lambda: 0.1,
            growth_rate: 0.8,
            uncertainty_penalty: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveEstimator {
    params: EstimatorParams,
    window: VecDeque<f64>,
    alpha: f64,
    beta: f64,
    n_eff: f64,
}

impl AdaptiveEstimator {
    pub fn new() -> Self {
        Self::with_params(EstimatorParams::default())
    }

    pub fn with_params(params: EstimatorParams) -> Self {
        Self {
            params,
            window: VecDeque::with_capacity(WINDOW_SIZE + 1),
            alpha: INITIAL_PSEUDO_COUNT,
            beta: INITIAL_PSEUDO_COUNT,
            n_eff: INITIAL_N_EFF,
        }
    }

    /// Ingest one normalized observation in [0, 1].
    pub fn observe(&mut self, x: f64) {
        self.window.push_back(x);
        if self.window.len() > WINDOW_SIZE {
            self.window.pop_front();
        }

        let volatility = self.volatility();
        let lambda = (self.params.base_lambda * (1.0 + 2.5 * volatility)).clamp(0.0, 1.0);

        // back to unit mass before re-weighting by the new sample size
        self.alpha /= self.n_eff;
        self.beta /= self.n_eff;
        self.n_eff += self.params.growth_rate / (volatility + 1.0);

        self.alpha = ((1.0 - lambda) * self.alpha + lambda * x) * self.n_eff;
        self.beta = ((1.0 - lambda) * self.beta + lambda * (1.0 - x)) * self.n_eff;

        debug!(
            observation = x,
            volatility,
            lambda,
            n_eff = self.n_eff,
            alpha = self.alpha,
            beta = self.beta,
            "estimator updated"
        );
    }

    /// Population standard deviation of the window, 0 with fewer than two samples
    pub fn volatility(&self) -> f64 {
        let n = self.window.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.window.iter().sum::<f64>() / n as f64;
        let squared = self.window.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        (squared / n as f64).sqrt()
    }

    /// Posterior mean `alpha / (alpha + beta)`
    pub fn trust_score(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let sum = self.alpha + self.beta;
        let denom = sum * sum * (sum + 1.0);
        if denom > 0.0 {
            self.alpha * self.beta / denom
        } else {
            0.0
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Trust discounted by its uncertainty once enough evidence exists
    pub fn adjusted_trust_score(&self) -> f64 {
        let score = self.trust_score();
        if self.n_eff < MIN_N_EFF_FOR_PENALTY {
            return score;
        }
        (score * (1.0 - self.params.uncertainty_penalty * self.stddev())).clamp(0.0, 1.0)
    }

    /// Two-sided interval holding `confidence` of the Beta posterior mass
    pub fn confidence_interval(&self, confidence: f64) -> crate::Result<(f64, f64)> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(crate::TrustError::InvalidInput(format!(
                "confidence level must lie strictly between 0 and 1, got {}",
                confidence
            )));
        }

        let dist = Beta::new(self.alpha, self.beta).map_err(|err| {
            crate::TrustError::InternalError(format!(
                "Beta({}, {}) is not a valid distribution: {}",
                self.alpha, self.beta, err
            ))
        })?;

        let tail = (1.0 - confidence) / 2.0;
        Ok((dist.inverse_cdf(tail), dist.inverse_cdf(1.0 - tail)))
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn n_eff(&self) -> f64 {
        self.n_eff
    }

    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }
}

impl Default for AdaptiveEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AdaptiveEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AdaptiveEstimator(trust={:.4}, adjusted={:.4}, n_eff={:.1}, std={:.4}",
            self.trust_score(),
            self.adjusted_trust_score(),
            self.n_eff,
            self.stddev()
        )?;
        match self.confidence_interval(0.95) {
            Ok((low, high)) => write!(f, ", CI95=({:.4}, {:.4}))", low, high),
            Err(_) => write!(f, ")"),
        }
    }
}
