use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;

use crate::aligner::CurveAligner;
use crate::best_algorithm::{BestAlgorithmError, BestAlgorithmMap, BestAlgorithmSet};
use crate::datastructures::{Algorithm, ProblemKey, RunRecord};

/// Run records of several algorithms, in tie-break order.
pub type AlgorithmDataset = Vec<(Algorithm, Vec<RunRecord>)>;

/// Source of the run records of an algorithm.
pub trait DatasetProvider {
    /// All run records of `algorithm`, over every function and dimension.
    fn load(&self, algorithm: &str) -> Result<Vec<RunRecord>>;
}

/// Keeps run records in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    records: BTreeMap<Algorithm, Vec<RunRecord>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, algorithm: impl Into<Algorithm>, records: Vec<RunRecord>) {
        self.records.entry(algorithm.into()).or_default().extend(records);
    }
}

impl<S: Into<Algorithm>> FromIterator<(S, Vec<RunRecord>)> for InMemoryProvider {
    fn from_iter<I: IntoIterator<Item = (S, Vec<RunRecord>)>>(iter: I) -> Self {
        let mut provider = Self::new();
        for (algorithm, records) in iter {
            provider.insert(algorithm, records);
        }
        provider
    }
}

impl DatasetProvider for InMemoryProvider {
    fn load(&self, algorithm: &str) -> Result<Vec<RunRecord>> {
        self.records
            .get(algorithm)
            .cloned()
            .with_context(|| format!("No data for algorithm {algorithm}"))
    }
}

/// Reads `<algorithm>.json` files holding a list of run records.
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
    dir: PathBuf,
}

impl JsonDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, algorithm: &str) -> PathBuf {
        self.dir.join(format!("{algorithm}.json"))
    }

    /// Writes the records of `algorithm`, replacing earlier ones.
    pub fn store(&self, algorithm: &str, records: &[RunRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(algorithm);
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {path:?}"))?;
        serde_json::to_writer(BufWriter::new(file), records)?;
        Ok(())
    }
}

impl DatasetProvider for JsonDirProvider {
    fn load(&self, algorithm: &str) -> Result<Vec<RunRecord>> {
        let path = self.path(algorithm);
        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to open {path:?}"))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse run records in {path:?}"))
    }
}

impl<P: DatasetProvider + ?Sized> DatasetProvider for &P {
    fn load(&self, algorithm: &str) -> Result<Vec<RunRecord>> {
        (**self).load(algorithm)
    }
}

/// Loads the records of `algorithms`, keeping their order.
pub fn load_algorithms<P>(
    provider: &P,
    algorithms: &[Algorithm],
) -> Result<AlgorithmDataset>
where
    P: DatasetProvider + ?Sized,
{
    info!("Loading algorithm data of {} algorithms", algorithms.len());
    algorithms
        .iter()
        .map(|algorithm| -> Result<(Algorithm, Vec<RunRecord>)> {
            Ok((algorithm.clone(), provider.load(algorithm)?))
        })
        .collect()
}

/// Every problem some algorithm has a record for.
pub fn problems(dataset: &[(Algorithm, Vec<RunRecord>)]) -> BTreeSet<ProblemKey> {
    dataset
        .iter()
        .flat_map(|(_, records)| records.iter().map(RunRecord::problem))
        .collect()
}

/// Records of every algorithm on `problem`, in dataset order. Algorithms
/// without a record keep an empty entry.
pub fn records_for_problem(
    dataset: &[(Algorithm, Vec<RunRecord>)],
    problem: ProblemKey,
) -> Vec<(&str, Vec<&RunRecord>)> {
    dataset
        .iter()
        .map(|(algorithm, records)| {
            (
                algorithm.as_str(),
                records.iter().filter(|r| r.problem() == problem).collect_vec(),
            )
        })
        .collect()
}

/// Builds the best algorithm of one problem along with the records it was
/// built from.
///
/// A problem on which no algorithm has exactly one record is skipped with a
/// warning and yields `None`. Other construction errors are returned.
pub fn build_problem<'a, A>(
    dataset: &'a [(Algorithm, Vec<RunRecord>)],
    (dimension, function_id): ProblemKey,
    aligner: &A,
) -> Result<Option<(Vec<(&'a str, Vec<&'a RunRecord>)>, BestAlgorithmSet)>>
where
    A: CurveAligner + ?Sized,
{
    let records = records_for_problem(dataset, (dimension, function_id));
    match BestAlgorithmSet::new(&records, aligner) {
        Ok(best) => Ok(Some((records, best))),
        Err(BestAlgorithmError::EmptyCell) => {
            warn!("Skipping f{function_id} {dimension}-D: no algorithm has exactly one run record.");
            Ok(None)
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!(
            "Failed to build the best algorithm on f{function_id} {dimension}-D"
        ))),
    }
}

/// Builds the best algorithm data of every problem in `dataset`.
///
/// Problems are processed in parallel; each one only reads its own records.
pub fn generate<A>(
    dataset: &[(Algorithm, Vec<RunRecord>)],
    aligner: &A,
) -> Result<BestAlgorithmMap>
where
    A: CurveAligner + ?Sized,
{
    problems(dataset)
        .into_iter()
        .collect_vec()
        .into_par_iter()
        .filter_map(|problem| -> Option<Result<(ProblemKey, BestAlgorithmSet)>> {
            build_problem(dataset, problem, aligner)
                .map(|built| built.map(|(_, best)| (problem, best)))
                .transpose()
        })
        .collect()
}

/// Loads `algorithms` from `provider` and builds their best algorithm data.
pub fn generate_from_provider<P, A>(
    provider: &P,
    algorithms: &[Algorithm],
    aligner: &A,
) -> Result<BestAlgorithmMap>
where
    P: DatasetProvider + ?Sized,
    A: CurveAligner + ?Sized,
{
    let dataset = load_algorithms(provider, algorithms)?;
    generate(&dataset, aligner)
}

/// Reads every json file in a directory as the records of the algorithm
/// named after the file, sorted by name.
pub fn load_dir(dir: &Path) -> Result<AlgorithmDataset> {
    let provider = JsonDirProvider::new(dir);
    let algorithms = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {dir:?}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .filter_map(|path| Some(path.file_stem()?.to_str()?.to_string()))
        .sorted()
        .collect_vec();
    load_algorithms(&provider, &algorithms)
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use super::*;
    use crate::aligner::HorizontalAligner;

    fn record(function_id: u32, dimension: u32, ert: f64) -> RunRecord {
        RunRecord::new(function_id, dimension, arr1(&[1e-1]), arr1(&[ert]))
    }

    #[test]
    fn test_records_for_problem() {
        let dataset: AlgorithmDataset = vec![
            ("A".into(), vec![record(1, 2, 10.0), record(2, 2, 10.0)]),
            ("B".into(), vec![record(1, 3, 10.0)]),
        ];
        assert_eq!(
            problems(&dataset).into_iter().collect_vec(),
            vec![(2, 1), (2, 2), (3, 1)]
        );
        let records = records_for_problem(&dataset, (3, 1));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "A");
        assert!(records[0].1.is_empty());
        assert_eq!(records[1].1, vec![&dataset[1].1[0]]);
    }

    #[test]
    fn test_generate() {
        let dataset: AlgorithmDataset = vec![
            ("A".into(), vec![record(1, 2, 10.0), record(2, 2, 30.0)]),
            ("B".into(), vec![record(1, 2, 20.0), record(2, 2, 20.0)]),
        ];
        let entries = generate(&dataset, &HorizontalAligner).unwrap();
        assert_eq!(entries.keys().copied().collect_vec(), vec![(2, 1), (2, 2)]);
        assert_eq!(entries[&(2, 1)].winning_algorithm(), &["A"]);
        assert_eq!(entries[&(2, 2)].winning_algorithm(), &["B"]);
    }

    #[test]
    fn test_generate_unreachable_problem() {
        let mut broken = record(1, 2, 10.0);
        broken.ert = arr1(&[f64::NAN]);
        let dataset: AlgorithmDataset = vec![("A".into(), vec![broken])];
        // nothing is reachable, so the problem has an empty grid
        let entries = generate(&dataset, &HorizontalAligner).unwrap();
        assert!(entries[&(2, 1)].target().is_empty());
    }

    #[test]
    fn test_generate_skips_problem_without_single_records() {
        let dataset: AlgorithmDataset = vec![
            (
                "A".into(),
                vec![record(1, 2, 10.0), record(2, 2, 10.0), record(2, 2, 20.0)],
            ),
            ("B".into(), vec![record(1, 2, 20.0)]),
        ];
        let entries = generate(&dataset, &HorizontalAligner).unwrap();
        assert_eq!(entries.keys().copied().collect_vec(), vec![(2, 1)]);
        assert_eq!(entries[&(2, 1)].winning_algorithm(), &["A"]);
        assert!(build_problem(&dataset, (2, 2), &HorizontalAligner)
            .unwrap()
            .is_none());
    }

    /// Puts every curve on one target no curve defines.
    struct UndefinedAligner;

    impl CurveAligner for UndefinedAligner {
        fn align(&self, curves: &[crate::aligner::Curve<'_>]) -> ndarray::Array2<f64> {
            let mut grid = ndarray::Array2::from_elem((1, curves.len() + 1), f64::NAN);
            grid[(0, 0)] = 1e-5;
            grid
        }
    }

    #[test]
    fn test_generate_fails_on_undefined_row() {
        let dataset: AlgorithmDataset = vec![
            ("A".into(), vec![record(1, 2, 10.0)]),
            ("B".into(), vec![record(1, 2, 20.0), record(2, 2, 20.0)]),
        ];
        let error = generate(&dataset, &UndefinedAligner).unwrap_err();
        assert_eq!(
            error.root_cause().to_string(),
            "No algorithm has a defined running time at target 1e-5"
        );
    }

    #[test]
    fn test_in_memory_provider() {
        let provider: InMemoryProvider =
            [("A", vec![record(1, 2, 10.0)])].into_iter().collect();
        assert_eq!(provider.load("A").unwrap().len(), 1);
        assert!(provider.load("B").is_err());
        let dataset = load_algorithms(&provider, &["A".to_string()]).unwrap();
        assert_eq!(dataset[0].0, "A");
    }
}
