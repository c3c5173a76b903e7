use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use log::{debug, warn};
use ndarray::{s, Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::aligner::CurveAligner;
use crate::datastructures::{float_serde, Algorithm, ProblemKey, RunRecord};

mod cursor;
mod query;

pub use cursor::EvalsCursor;

/// Identifier of every virtual best algorithm.
pub const VIRTUAL_BEST_ALGORITHM: &str = "Virtual Best Algorithm";

/// Best algorithm data of every problem, keyed by `(dimension, function_id)`.
pub type BestAlgorithmMap = BTreeMap<ProblemKey, BestAlgorithmSet>;

/// Run records of the algorithms on one problem, in tie-break order.
pub type ProblemRecords<'a> = [(&'a str, Vec<&'a RunRecord>)];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BestAlgorithmError {
    #[error(
        "Expected the data of algorithms for only one function and one \
         dimension, got functions {functions:?} and dimensions {dimensions:?}"
    )]
    MixedProblems {
        functions: Vec<u32>,
        dimensions: Vec<u32>,
    },
    #[error("No algorithm has exactly one run record for the problem")]
    EmptyCell,
    #[error("The aligned grid has {found} columns, expected {expected}")]
    MisalignedGrid { expected: usize, found: usize },
    #[error("No algorithm has a defined running time at target {target:e}")]
    UndefinedRow { target: f64 },
}

/// Evaluation counts of the winning algorithm at one grid target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalsRow {
    #[serde(with = "float_serde::scalar")]
    pub target: f64,
    #[serde(with = "float_serde::array1")]
    pub runs: Array1<f64>,
}

/// The virtual best algorithm of one function in one dimension.
///
/// For every target of the aligned grid it records which algorithm reached
/// the target with the smallest expected running time. Ties go to the
/// algorithm that comes first in the order the algorithms were passed in;
/// this is a policy choice and not derived from the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestAlgorithmSet {
    function_id: u32,
    dimension: u32,
    algorithm_id: String,
    comment: String,
    #[serde(with = "float_serde::array1")]
    target: Array1<f64>,
    winning_algorithm: Vec<Algorithm>,
    #[serde(with = "float_serde::array1")]
    ert: Array1<f64>,
    evals_curve: Vec<EvalsRow>,
    #[serde(with = "float_serde::array1_map")]
    max_evals_by_algorithm: BTreeMap<Algorithm, Array1<f64>>,
    #[serde(with = "float_serde::array1_map")]
    final_funvals_by_algorithm: BTreeMap<Algorithm, Array1<f64>>,
    #[serde(with = "float_serde::array1_map")]
    funvals_no_fail_by_algorithm: BTreeMap<Algorithm, Array1<f64>>,
    #[serde(with = "float_serde::array1")]
    best_final_funvals: Array1<f64>,
    best_final_funvals_algorithm: Option<Algorithm>,
}

impl BestAlgorithmSet {
    /// Builds the virtual best algorithm from the records of one problem.
    ///
    /// Algorithms without exactly one record are skipped with a warning. The
    /// remaining records must all belong to the same function and dimension.
    pub fn new<A>(
        records: &ProblemRecords<'_>,
        aligner: &A,
    ) -> Result<Self, BestAlgorithmError>
    where
        A: CurveAligner + ?Sized,
    {
        let mut retained: Vec<(&str, &RunRecord)> = Vec::new();
        let mut skipped: Vec<(&str, &[&RunRecord])> = Vec::new();
        for (algorithm, algorithm_records) in records {
            match algorithm_records.as_slice() {
                [record] => retained.push((*algorithm, *record)),
                other => skipped.push((*algorithm, other)),
            }
        }
        let problem = retained
            .iter()
            .map(|(_, record)| *record)
            .chain(skipped.iter().flat_map(|(_, others)| others.iter().copied()))
            .next()
            .map_or_else(
                || "an unknown problem".to_string(),
                |r| format!("f{} {}-D", r.function_id, r.dimension),
            );
        for (algorithm, algorithm_records) in &skipped {
            if algorithm_records.is_empty() {
                warn!("Algorithm {algorithm} was not tested on {problem}.");
            } else {
                warn!(
                    "Algorithm {algorithm} has a problem on {problem}: {} run records.",
                    algorithm_records.len()
                );
            }
        }

        let functions: BTreeSet<u32> =
            retained.iter().map(|(_, r)| r.function_id).collect();
        let dimensions: BTreeSet<u32> =
            retained.iter().map(|(_, r)| r.dimension).collect();
        if functions.len() > 1 || dimensions.len() > 1 {
            return Err(BestAlgorithmError::MixedProblems {
                functions: functions.into_iter().collect(),
                dimensions: dimensions.into_iter().collect(),
            });
        }
        let (Some(&function_id), Some(&dimension)) =
            (functions.first(), dimensions.first())
        else {
            return Err(BestAlgorithmError::EmptyCell);
        };

        let curves = retained
            .iter()
            .map(|(_, record)| (record.target.view(), record.ert.view()))
            .collect_vec();
        let grid = aligner.align(&curves);
        if grid.ncols() != retained.len() + 1 {
            return Err(BestAlgorithmError::MisalignedGrid {
                expected: retained.len() + 1,
                found: grid.ncols(),
            });
        }

        let mut winners = Vec::with_capacity(grid.nrows());
        let mut erts = Vec::with_capacity(grid.nrows());
        for row in grid.rows() {
            let (index, ert) = select_best(row.slice(s![1..]))
                .ok_or(BestAlgorithmError::UndefinedRow { target: row[0] })?;
            winners.push(index);
            erts.push(ert);
        }
        let target = grid.column(0).to_owned();

        let mut cursors: BTreeMap<&str, EvalsCursor> = BTreeMap::new();
        let evals_curve = target
            .iter()
            .zip(&winners)
            .map(|(&target, &index)| {
                let (algorithm, record) = retained[index];
                let cursor = cursors
                    .entry(algorithm)
                    .or_insert_with(|| EvalsCursor::new(record.evals.view()));
                let runs = match cursor.advance_until(target) {
                    Some(row) => row.slice(s![1..]).to_owned(),
                    None => {
                        Array1::from_elem(record.finalfunvals.len(), f64::NAN)
                    }
                };
                EvalsRow { target, runs }
            })
            .collect_vec();

        let winning_records: BTreeMap<Algorithm, &RunRecord> = winners
            .iter()
            .map(|&index| (retained[index].0.to_string(), retained[index].1))
            .collect();
        let by_winner = |field: fn(&RunRecord) -> Array1<f64>| {
            winning_records
                .iter()
                .map(|(algorithm, record)| (algorithm.clone(), field(record)))
                .collect::<BTreeMap<_, _>>()
        };
        let max_evals_by_algorithm = by_winner(|r| r.maxevals.clone());
        let final_funvals_by_algorithm = by_winner(|r| r.finalfunvals.clone());
        let funvals_no_fail_by_algorithm = by_winner(funvals_no_fail);

        let mut best_final_funvals = Array1::from_elem(1, f64::INFINITY);
        let mut best_median = f64::INFINITY;
        let mut best_final_funvals_algorithm = None;
        for (algorithm, record) in &retained {
            let algorithm_median = median(record.finalfunvals.view());
            if algorithm_median < best_median {
                best_median = algorithm_median;
                best_final_funvals = record.finalfunvals.clone();
                best_final_funvals_algorithm = Some(algorithm.to_string());
            }
        }

        debug!(
            "Virtual best algorithm on f{function_id} {dimension}-D: {} targets, {} winning algorithms",
            target.len(),
            winning_records.len()
        );
        Ok(Self {
            function_id,
            dimension,
            algorithm_id: VIRTUAL_BEST_ALGORITHM.to_string(),
            comment: format!(
                "Combination of {}",
                retained.iter().map(|(algorithm, _)| algorithm).join(", ")
            ),
            target,
            winning_algorithm: winners
                .into_iter()
                .map(|index| retained[index].0.to_string())
                .collect(),
            ert: Array1::from(erts),
            evals_curve,
            max_evals_by_algorithm,
            final_funvals_by_algorithm,
            funvals_no_fail_by_algorithm,
            best_final_funvals,
            best_final_funvals_algorithm,
        })
    }

    pub fn function_id(&self) -> u32 {
        self.function_id
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn problem(&self) -> ProblemKey {
        (self.dimension, self.function_id)
    }

    pub fn algorithm_id(&self) -> &str {
        &self.algorithm_id
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Aligned targets, by decreasing value.
    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn winning_algorithm(&self) -> &[Algorithm] {
        &self.winning_algorithm
    }

    pub fn ert(&self) -> &Array1<f64> {
        &self.ert
    }

    pub fn evals_curve(&self) -> &[EvalsRow] {
        &self.evals_curve
    }

    /// Distinct algorithms that win at least one target.
    pub fn winners(&self) -> BTreeSet<&str> {
        self.winning_algorithm.iter().map(String::as_str).collect()
    }

    pub fn max_evals_by_algorithm(&self) -> &BTreeMap<Algorithm, Array1<f64>> {
        &self.max_evals_by_algorithm
    }

    pub fn final_funvals_by_algorithm(
        &self,
    ) -> &BTreeMap<Algorithm, Array1<f64>> {
        &self.final_funvals_by_algorithm
    }

    pub fn funvals_no_fail_by_algorithm(
        &self,
    ) -> &BTreeMap<Algorithm, Array1<f64>> {
        &self.funvals_no_fail_by_algorithm
    }

    pub fn best_final_funvals(&self) -> &Array1<f64> {
        &self.best_final_funvals
    }

    pub fn best_final_funvals_algorithm(&self) -> Option<&str> {
        self.best_final_funvals_algorithm.as_deref()
    }
}

impl PartialEq for BestAlgorithmSet {
    fn eq(&self, other: &Self) -> bool {
        self.function_id == other.function_id
            && self.dimension == other.dimension
            && self.algorithm_id == other.algorithm_id
            && self.comment == other.comment
    }
}

impl fmt::Display for BestAlgorithmSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{alg: {}, F{}, dim: {}}}",
            self.algorithm_id, self.function_id, self.dimension
        )
    }
}

/// Index and value of the smallest defined running time; the first one wins
/// on ties.
fn select_best(erts: ArrayView1<f64>) -> Option<(usize, f64)> {
    erts.iter()
        .enumerate()
        .filter(|(_, ert)| !ert.is_nan())
        .fold(None, |best, (index, &ert)| match best {
            Some((_, best_ert)) if ert >= best_ert => best,
            _ => Some((index, ert)),
        })
}

/// First trajectory snapshot whose per-run values differ from the final
/// values, or the last snapshot if none does.
fn funvals_no_fail(record: &RunRecord) -> Array1<f64> {
    if record.funvals.ncols() == 0 {
        return Array1::zeros(0);
    }
    let mut chosen = None;
    for row in record.funvals.rows() {
        let tail = row.slice_move(s![1..]);
        chosen = Some(tail);
        if tail != record.finalfunvals {
            break;
        }
    }
    chosen.map_or_else(|| Array1::zeros(0), |tail| tail.to_owned())
}

/// Median with NaN propagation; NaN for an empty input.
pub(crate) fn median(values: ArrayView1<f64>) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let sorted = values
        .iter()
        .copied()
        .sorted_by(|a, b| a.total_cmp(b))
        .collect_vec();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
