use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1};

/// `(target, value)` columns of one algorithm's curve.
pub type Curve<'a> = (ArrayView1<'a, f64>, ArrayView1<'a, f64>);

/// Resamples several curves onto one common target grid.
///
/// The returned grid has one row per aligned target. Column 0 holds the
/// target, column `j + 1` the value of `curves[j]` at that target, or NaN if
/// the curve never reaches it. Targets are ordered by decreasing value, which
/// is the direction evaluation-count cursors walk in.
pub trait CurveAligner: Sync {
    /// Aligns `curves` onto a common grid.
    fn align(&self, curves: &[Curve<'_>]) -> Array2<f64>;
}

/// Aligns curves on the union of their targets.
///
/// A curve's value at target `t` is the value of its first row, in decreasing
/// target order, whose target is at most `t`: the value recorded when the curve
/// passed `t`. Only targets with a defined value in at least one curve are put
/// on the grid, so every grid row has a defined value in some column.
#[derive(Debug, Default, Clone, Copy)]
pub struct HorizontalAligner;

impl CurveAligner for HorizontalAligner {
    fn align(&self, curves: &[Curve<'_>]) -> Array2<f64> {
        let sorted_curves = curves
            .iter()
            .map(|(targets, values)| {
                targets
                    .iter()
                    .copied()
                    .zip(values.iter().copied())
                    .filter(|(target, _)| !target.is_nan())
                    .sorted_by(|a, b| b.0.total_cmp(&a.0))
                    .collect_vec()
            })
            .collect_vec();
        let axis = sorted_curves
            .iter()
            .flatten()
            .filter(|(target, value)| target.is_finite() && !value.is_nan())
            .map(|&(target, _)| target)
            .sorted_by(|a, b| b.total_cmp(a))
            .dedup()
            .collect_vec();

        let mut grid =
            Array2::from_elem((axis.len(), curves.len() + 1), f64::NAN);
        grid.column_mut(0).assign(&Array1::from(axis.clone()));
        for (column, curve) in sorted_curves.iter().enumerate() {
            let mut position = 0;
            for (row, &target) in axis.iter().enumerate() {
                while position < curve.len() && curve[position].0 > target {
                    position += 1;
                }
                if let Some(&(_, value)) = curve.get(position) {
                    grid[(row, column + 1)] = value;
                }
            }
        }
        grid
    }
}
