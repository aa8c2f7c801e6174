//! Raw metric reading to [0, 1] trust contribution.

use trustmesh_types::{Behavior, MetricRange};

/// Map `value` onto [0, 1] according to the declared range and direction.
///
/// Higher/lower-is-better metrics follow a logistic curve centred on the
/// range midpoint with spread `width / 6`, saturating at the bounds.
/// Closer-to-midpoint metrics decay quadratically from 1 at the midpoint
/// to 0 at either bound.
pub fn prob_transform(range: &MetricRange, value: f64) -> f64 {
    let MetricRange {
        minimum, maximum, ..
    } = *range;

    match range.behavior {
        Behavior::HigherIsBetter => {
            if value <= minimum {
                0.0
            } else if value >= maximum {
                1.0
            } else {
                logistic(range, value)
            }
        }
        Behavior::LowerIsBetter => {
            if value <= minimum {
                1.0
            } else if value >= maximum {
                0.0
            } else {
                1.0 - logistic(range, value)
            }
        }
        Behavior::CloserToMidpoint => {
            if value <= minimum || value >= maximum {
                return 0.0;
            }
            let half_width = range.width() / 2.0;
            let offset = (value - range.midpoint()) / half_width;
            (1.0 - offset * offset).max(0.0)
        }
    }
}

/// Same as [`prob_transform`] for callers holding the raw range triple.
///
/// `behavior` must be `1`, `-1` or `0`; anything else is rejected without
/// computing a partial result.
pub fn normalize(minimum: f64, maximum: f64, behavior: i8, value: f64) -> crate::Result<f64> {
    let behavior = Behavior::try_from(behavior)?;
    let range = MetricRange::new(minimum, maximum, behavior)?;
    if !value.is_finite() {
        return Err(crate::TrustError::InvalidInput(format!(
            "metric value must be finite, got {}",
            value
        )));
    }
    Ok(prob_transform(&range, value))
}

fn logistic(range: &MetricRange, value: f64) -> f64 {
    let scale = range.width() / 6.0;
    1.0 / (1.0 + (-(value - range.midpoint()) / scale).exp())
}
