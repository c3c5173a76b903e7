use anyhow::Result;
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;

use crate::aligner::CurveAligner;
use crate::best_algorithm::{BestAlgorithmMap, BestAlgorithmSet, ProblemRecords};
use crate::dataset::{build_problem, generate, load_algorithms, problems, DatasetProvider};
use crate::datastructures::{Algorithm, Ranking, RunRecord, Tally, TargetRange};

mod targets;

pub use targets::TargetSet;

/// Counts, per dimension and algorithm, the targets in `targets` at which the
/// algorithm is the best one.
///
/// Every algorithm that wins any target of a problem gets an entry, even if
/// none of its targets lies in the range.
pub fn count_contributions(entries: &BestAlgorithmMap, targets: TargetRange) -> Tally {
    let mut tally = Tally::new();
    for (&(dimension, function_id), best) in entries {
        debug!("dimension: {dimension}, function: {function_id}");
        for algorithm in best.winners() {
            tally.entry((dimension, algorithm.to_string())).or_insert(0);
        }
        for (&target, algorithm) in best.target().iter().zip(best.winning_algorithm()) {
            if targets.contains(target) {
                *tally.entry((dimension, algorithm.clone())).or_insert(0) += 1;
            }
        }
    }
    tally
}

/// Ranks the algorithms contributing to the virtual best algorithm of
/// `algorithms`, per dimension, by the number of function/target pairs with
/// a target in `[target_lb, target_ub]` where they are the best.
pub fn rank_contributing_algorithms<P, A>(
    provider: &P,
    algorithms: &[Algorithm],
    target_lb: f64,
    target_ub: f64,
    aligner: &A,
) -> Result<Ranking>
where
    P: DatasetProvider + ?Sized,
    A: CurveAligner + ?Sized,
{
    info!("Generating best algorithm data from given algorithm list...");
    let dataset = load_algorithms(provider, algorithms)?;
    let entries = generate(&dataset, aligner)?;
    let ranking = Ranking::from_tally(count_contributions(
        &entries,
        TargetRange {
            lb: target_lb,
            ub: target_ub,
        },
    ));
    info!("Contributing algorithms:\n{ranking}");
    Ok(ranking)
}

/// Algorithms credited on one problem, one entry per credit.
///
/// For every grid target in `targets` the best algorithm is credited, then
/// every other algorithm whose own running time is within `f_factor` of the
/// best one. If there is no such algorithm, the second best is credited.
pub fn near_best_credits(
    best: &BestAlgorithmSet,
    records: &ProblemRecords<'_>,
    f_factor: f64,
    targets: &TargetSet,
) -> Vec<Algorithm> {
    let candidates: Vec<(&str, &RunRecord)> = records
        .iter()
        .filter_map(|(algorithm, algorithm_records)| match algorithm_records.as_slice() {
            [record] => Some((*algorithm, *record)),
            _ => None,
        })
        .collect_vec();
    let mut credits = Vec::new();
    for (i, &target) in best.target().iter().enumerate() {
        if !targets.contains_approximately(target) {
            continue;
        }
        let winner = best.winning_algorithm()[i].as_str();
        let best_ert = best.ert()[i];
        credits.push(winner.to_string());

        let mut second_best: Option<(&str, f64)> = None;
        let mut within_factor = false;
        for &(algorithm, record) in &candidates {
            if algorithm == winner {
                continue;
            }
            let ert = record.running_time_at(target);
            if ert < second_best.map_or(f64::INFINITY, |(_, e)| e) {
                second_best = Some((algorithm, ert));
            }
            if ert <= best_ert * f_factor {
                credits.push(algorithm.to_string());
                within_factor = true;
            }
        }
        if !within_factor {
            if let Some((algorithm, _)) = second_best {
                credits.push(algorithm.to_string());
            }
        }
    }
    credits
}

/// Ranks, per dimension, the algorithms of `dataset` that are the best, within
/// `f_factor` of the best, or second best when no algorithm is within
/// `f_factor`, on some function/target pair with a target in `targets`.
pub fn extract_best_algorithms<A>(
    dataset: &[(Algorithm, Vec<RunRecord>)],
    f_factor: f64,
    targets: &TargetSet,
    aligner: &A,
) -> Result<Ranking>
where
    A: CurveAligner + ?Sized,
{
    let credits_per_problem = problems(dataset)
        .into_iter()
        .collect_vec()
        .into_par_iter()
        .filter_map(|(dimension, function_id)| -> Option<Result<(u32, Vec<Algorithm>)>> {
            let (records, best) =
                match build_problem(dataset, (dimension, function_id), aligner) {
                    Ok(Some(built)) => built,
                    Ok(None) => return None,
                    Err(err) => return Some(Err(err)),
                };
            let credits = near_best_credits(&best, &records, f_factor, targets);
            debug!(
                "f{function_id} {dimension}-D: {} credits for {} algorithms",
                credits.len(),
                credits.iter().unique().count()
            );
            Some(Ok((dimension, credits)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tally = Tally::new();
    for (dimension, credits) in credits_per_problem {
        for algorithm in credits {
            *tally.entry((dimension, algorithm)).or_insert(0) += 1;
        }
    }
    Ok(Ranking::from_tally(tally))
}

/// Proposes a portfolio per dimension from `algorithms`: see
/// [`extract_best_algorithms`]. Targets are the log-uniform set between
/// `target_lb` and `target_ub`.
pub fn extract_portfolio<P, A>(
    provider: &P,
    algorithms: &[Algorithm],
    f_factor: f64,
    target_lb: f64,
    target_ub: f64,
    aligner: &A,
) -> Result<Ranking>
where
    P: DatasetProvider + ?Sized,
    A: CurveAligner + ?Sized,
{
    let targets = TargetSet::log_uniform(TargetRange {
        lb: target_lb,
        ub: target_ub,
    });
    info!("Loading algorithm data from given algorithm list...");
    let dataset = load_algorithms(provider, algorithms)?;
    info!("This may take a while (depending on the number of algorithms)");
    let ranking = extract_best_algorithms(&dataset, f_factor, &targets, aligner)?;
    info!("Portfolio:\n{ranking}");
    Ok(ranking)
}
