use ndarray::{ArrayView1, ArrayView2, Axis};

/// Forward-only cursor over the evaluation-count rows of one algorithm.
///
/// Rows are ordered by decreasing alignment value (column 0). The cursor
/// starts before the first row and never moves backwards, so walking a
/// decreasing sequence of targets visits every row at most once.
#[derive(Debug, Clone)]
pub struct EvalsCursor<'a> {
    rows: ArrayView2<'a, f64>,
    position: Option<usize>,
}

impl<'a> EvalsCursor<'a> {
    pub fn new(rows: ArrayView2<'a, f64>) -> Self {
        Self {
            rows,
            position: None,
        }
    }

    /// Moves forward while the current row's alignment value exceeds
    /// `target` and returns the row the cursor stops on.
    ///
    /// The cursor stays on the last row once all rows are used up. Returns
    /// `None` only if there are no rows.
    pub fn advance_until(&mut self, target: f64) -> Option<ArrayView1<'a, f64>> {
        if self.rows.nrows() == 0 || self.rows.ncols() == 0 {
            return None;
        }
        let last = self.rows.nrows() - 1;
        let mut position = self.position.unwrap_or(0);
        while position < last && self.rows[(position, 0)] > target {
            position += 1;
        }
        self.position = Some(position);
        let rows = self.rows;
        Some(rows.index_axis_move(Axis(0), position))
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2, Array2};

    use super::EvalsCursor;

    #[test]
    fn test_advance_until() {
        let rows = arr2(&[
            [1e1, 2.0, 3.0],
            [1e0, 10.0, 12.0],
            [1e-1, 40.0, 35.0],
            [1e-2, 90.0, f64::NAN],
        ]);
        let mut cursor = EvalsCursor::new(rows.view());
        assert_eq!(cursor.position(), None);
        assert_eq!(cursor.advance_until(1e2).unwrap(), arr1(&[1e1, 2.0, 3.0]));
        assert_eq!(cursor.advance_until(1e0).unwrap(), arr1(&[1e0, 10.0, 12.0]));
        assert_eq!(cursor.advance_until(5e-1).unwrap()[0], 1e-1);
        assert_eq!(cursor.position(), Some(2));
        // targets easier than the current row do not move the cursor back
        assert_eq!(cursor.advance_until(1e1).unwrap()[0], 1e-1);
        // exhausted: stays on the last row
        assert_eq!(cursor.advance_until(1e-5).unwrap()[0], 1e-2);
        assert_eq!(cursor.position(), Some(3));
    }

    #[test]
    fn test_monotone_counts() {
        let rows = arr2(&[[1e0, 5.0], [1e-1, 8.0], [1e-2, 20.0], [1e-3, 21.0]]);
        let mut cursor = EvalsCursor::new(rows.view());
        let counts = [1e0, 3e-1, 1e-2, 1e-3, 1e-4]
            .iter()
            .map(|&target| cursor.advance_until(target).unwrap()[1])
            .collect::<Vec<_>>();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(counts, vec![5.0, 8.0, 20.0, 21.0, 21.0]);
    }

    #[test]
    fn test_no_rows() {
        let rows = Array2::<f64>::zeros((0, 3));
        let mut cursor = EvalsCursor::new(rows.view());
        assert!(cursor.advance_until(1.0).is_none());
        assert_eq!(cursor.position(), None);
    }
}
