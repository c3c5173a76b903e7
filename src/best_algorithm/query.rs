use itertools::Itertools;
use ndarray::Array1;

use super::BestAlgorithmSet;
use crate::datastructures::{Algorithm, RunRecord};

impl BestAlgorithmSet {
    /// Expected running time to reach each of `targets`.
    ///
    /// Looks up the first grid row whose target is at most the requested one.
    /// Targets stricter than every grid target were never reached and map to
    /// infinity.
    pub fn running_time_at(&self, targets: &[f64]) -> Vec<f64> {
        targets
            .iter()
            .map(|&f| {
                self.target
                    .iter()
                    .position(|&t| t <= f)
                    .map_or(f64::INFINITY, |i| self.ert[i])
            })
            .collect_vec()
    }

    /// Evaluation counts per run and the winning algorithm for each of
    /// `targets`.
    ///
    /// Unreached targets yield a NaN vector with one entry per run of the
    /// best final function values and no algorithm.
    pub fn evals_at(
        &self,
        targets: &[f64],
    ) -> (Vec<Array1<f64>>, Vec<Option<Algorithm>>) {
        targets
            .iter()
            .map(|&f| {
                match self.evals_curve.iter().position(|row| row.target <= f) {
                    Some(i) => (
                        self.evals_curve[i].runs.clone(),
                        Some(self.winning_algorithm[i].clone()),
                    ),
                    None => (
                        Array1::from_elem(
                            self.best_final_funvals.len(),
                            f64::NAN,
                        ),
                        None,
                    ),
                }
            })
            .unzip()
    }
}

impl RunRecord {
    /// Expected running time of this algorithm alone to reach `target`:
    /// the value at the largest recorded target that is at most `target`,
    /// whatever order the rows are stored in. The earlier row wins among
    /// equal targets.
    pub fn running_time_at(&self, target: f64) -> f64 {
        self.target
            .iter()
            .zip(&self.ert)
            .filter(|&(&t, _)| t <= target)
            .fold(None, |reached: Option<(f64, f64)>, (&t, &ert)| match reached {
                Some((reached_target, _)) if reached_target >= t => reached,
                _ => Some((t, ert)),
            })
            .map_or(f64::INFINITY, |(_, ert)| ert)
    }
}
