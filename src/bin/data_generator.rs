use clap::Parser;
use itertools::Itertools;
use log::info;
use ndarray::{Array1, Array2};
use std::{fs, path::PathBuf};

use anyhow::Result;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use virtual_best::dataset::JsonDirProvider;
use virtual_best::datastructures::{RunRecord, TargetRange};
use virtual_best::portfolio_reducer::TargetSet;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AlgorithmConfig {
    name: String,
    /// Mean evaluations per dimension to improve by one target
    cost: f64,
    /// Relative noise on the cost and on the depth
    spread: f64,
    /// Mean number of decades below 1 the algorithm gets to
    depth: f64,
    /// Evaluations per dimension before a run stops
    budget: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct DataGeneratorConfig {
    algorithms: Vec<AlgorithmConfig>,
    functions: Vec<u32>,
    dimensions: Vec<u32>,
    runs: usize,
    targets: TargetRange,
    seed: u64,
    out_dir: PathBuf,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the json config
    #[arg(short, long)]
    pub config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config: DataGeneratorConfig =
        serde_json::from_str(&fs::read_to_string(args.config)?)?;
    let provider = JsonDirProvider::new(&config.out_dir);
    for (algorithm, records) in generate_data(&config)? {
        provider.store(&algorithm, &records)?;
        info!("Wrote {} run records to {:?}", records.len(), provider.path(&algorithm));
    }
    Ok(())
}

fn generate_data(config: &DataGeneratorConfig) -> Result<Vec<(String, Vec<RunRecord>)>> {
    let targets = TargetSet::log_uniform(config.targets)
        .values()
        .iter()
        .rev()
        .copied()
        .collect_vec();
    config
        .algorithms
        .iter()
        .enumerate()
        .map(|(algo_idx, algorithm)| -> Result<(String, Vec<RunRecord>)> {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed + algo_idx as u64);
            let records = config
                .dimensions
                .iter()
                .cartesian_product(config.functions.iter())
                .map(|(&dimension, &function_id)| {
                    generate_record(
                        algorithm,
                        function_id,
                        dimension,
                        config.runs,
                        &targets,
                        &mut rng,
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((algorithm.name.clone(), records))
        })
        .collect()
}

fn generate_record(
    algorithm: &AlgorithmConfig,
    function_id: u32,
    dimension: u32,
    runs: usize,
    targets: &[f64],
    rng: &mut ChaCha8Rng,
) -> Result<RunRecord> {
    let noise = Normal::new(1.0, algorithm.spread.abs())?;
    let budget = algorithm.budget * dimension as f64;
    let start = 10.0 * targets.first().copied().unwrap_or(1.0);
    let mut evals = Array2::from_elem((targets.len(), runs + 1), f64::NAN);
    evals.column_mut(0).assign(&Array1::from(targets.to_vec()));
    let mut finalfunvals = Array1::zeros(runs);
    let mut maxevals = Array1::zeros(runs);
    for run in 0..runs {
        let depth = algorithm.depth * noise.sample(rng);
        let mut used = 0.0;
        let mut last_reached = None;
        for (i, &target) in targets.iter().enumerate() {
            if target.log10() < -depth {
                break;
            }
            let step = algorithm.cost * dimension as f64 * noise.sample(rng).abs();
            if used + step > budget {
                break;
            }
            used += step;
            evals[(i, run + 1)] = used.ceil().max(1.0);
            last_reached = Some(target);
        }
        let all_reached = last_reached == targets.last().copied();
        maxevals[run] = if all_reached { used.ceil().max(1.0) } else { budget };
        finalfunvals[run] = last_reached.unwrap_or(start);
    }

    let ert = evals
        .rows()
        .into_iter()
        .map(|row| {
            let run_evals = row.slice(ndarray::s![1..]);
            let successes = run_evals.iter().filter(|e| !e.is_nan()).count();
            if successes == 0 {
                return f64::NAN;
            }
            let spent = run_evals
                .iter()
                .zip(&maxevals)
                .map(|(&e, &max)| if e.is_nan() { max } else { e })
                .sum::<f64>();
            spent / successes as f64
        })
        .collect::<Array1<f64>>();

    let last_evaluation = maxevals.iter().copied().fold(1.0, f64::max);
    let funvals = Array2::from_shape_fn((2, runs + 1), |(i, j)| match (i, j) {
        (0, 0) => 1.0,
        (0, _) => start,
        (_, 0) => last_evaluation,
        (_, run) => finalfunvals[run - 1],
    });

    let target = Array1::from(targets.to_vec());
    let mut record = RunRecord::new(function_id, dimension, target, ert)
        .with_evals(evals)
        .with_final_funvals(finalfunvals)
        .with_max_evals(maxevals)
        .with_funvals(funvals);
    record.algorithm_id = algorithm.name.clone();
    record.comment = "synthetic".to_string();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use virtual_best::{aligner::HorizontalAligner, dataset, datastructures::TargetRange};

    use crate::{generate_data, AlgorithmConfig, DataGeneratorConfig};

    fn config() -> DataGeneratorConfig {
        DataGeneratorConfig {
            algorithms: vec![
                AlgorithmConfig {
                    name: "fast".to_string(),
                    cost: 10.0,
                    spread: 0.1,
                    depth: 3.0,
                    budget: 1e4,
                },
                AlgorithmConfig {
                    name: "deep".to_string(),
                    cost: 50.0,
                    spread: 0.1,
                    depth: 9.0,
                    budget: 1e5,
                },
            ],
            functions: vec![1, 2, 3],
            dimensions: vec![2, 5],
            runs: 4,
            targets: TargetRange { lb: 1e-8, ub: 1e2 },
            seed: 42,
            out_dir: PathBuf::new(),
        }
    }

    #[test]
    fn test_generate_data() {
        let data = generate_data(&config()).unwrap();
        assert_eq!(data.len(), 2);
        for (_, records) in &data {
            assert_eq!(records.len(), 6);
            for record in records {
                assert_eq!(record.ert.len(), 51);
                assert_eq!(record.evals.dim(), (51, 5));
                assert_eq!(record.finalfunvals.len(), 4);
                for run in record.evals.columns().into_iter().skip(1) {
                    let reached = run.iter().filter(|e| !e.is_nan()).collect::<Vec<_>>();
                    assert!(reached.windows(2).all(|w| w[0] <= w[1]));
                }
            }
        }
        // same seed, same data
        assert_eq!(
            serde_json::to_string(&data).unwrap(),
            serde_json::to_string(&generate_data(&config()).unwrap()).unwrap()
        );

        let entries = dataset::generate(&data, &HorizontalAligner).unwrap();
        assert_eq!(entries.len(), 6);
    }
}
