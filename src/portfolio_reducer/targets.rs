use itertools::Itertools;

use crate::datastructures::TargetRange;

const TARGETS_PER_DECADE: f64 = 5.0;
const SMALLEST_TARGET: f64 = 1e-8;
const ABS_TOLERANCE: f64 = 1e-11;
const REL_TOLERANCE: f64 = 1e-11;

/// Target precisions spaced uniformly on a log scale, five per decade.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSet {
    values: Vec<f64>,
}

impl TargetSet {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Targets from `max(1e-8, lb)` up to `ub`, each snapped to the nearest
    /// `10^(k/5)`.
    pub fn log_uniform(range: TargetRange) -> Self {
        let step = 1.0 / TARGETS_PER_DECADE;
        let start = range.lb.max(SMALLEST_TARGET).log10();
        let stop = range.ub.log10() + 1e-9;
        if !(start.is_finite() && stop.is_finite()) {
            return Self::new(vec![]);
        }
        let values = (0..)
            .map(|k| start + k as f64 * step)
            .take_while(|&exponent| exponent < stop)
            .map(|exponent| {
                10f64.powf((exponent * TARGETS_PER_DECADE).round() / TARGETS_PER_DECADE)
            })
            .dedup()
            .collect_vec();
        Self::new(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Whether `target` matches one of the targets up to rounding noise:
    /// `|target - value| <= 1e-11 + 1e-11 * |value|`.
    pub fn contains_approximately(&self, target: f64) -> bool {
        self.values.iter().any(|&value| {
            (target - value).abs() <= ABS_TOLERANCE + REL_TOLERANCE * value.abs()
        })
    }
}
