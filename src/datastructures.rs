use core::fmt;
use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use itertools::Itertools;
use ndarray::{Array1, Array2};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

pub(crate) mod float_serde;

/// Name of an algorithm. The order in which algorithm names are handed to the
/// library is the tie-break priority between algorithms.
pub type Algorithm = String;

/// Key of a benchmark problem: `(dimension, function_id)`.
pub type ProblemKey = (u32, u32);

/// Number of credits per `(dimension, algorithm)`.
pub type Tally = BTreeMap<(u32, Algorithm), usize>;

/// Results of one algorithm on one function in one dimension.
///
/// `evals` and `funvals` share the same layout: column 0 is the value a row is
/// aligned on, the remaining columns hold one value per independent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub function_id: u32,
    pub dimension: u32,
    #[serde(default)]
    pub algorithm_id: String,
    #[serde(default)]
    pub comment: String,
    #[serde(with = "float_serde::array1")]
    pub target: Array1<f64>,
    #[serde(with = "float_serde::array1")]
    pub ert: Array1<f64>,
    #[serde(with = "float_serde::array2", default)]
    pub evals: Array2<f64>,
    #[serde(with = "float_serde::array1", default)]
    pub finalfunvals: Array1<f64>,
    #[serde(with = "float_serde::array1", default)]
    pub maxevals: Array1<f64>,
    #[serde(with = "float_serde::array2", default)]
    pub funvals: Array2<f64>,
}

impl RunRecord {
    pub fn new(
        function_id: u32,
        dimension: u32,
        target: Array1<f64>,
        ert: Array1<f64>,
    ) -> Self {
        Self {
            function_id,
            dimension,
            algorithm_id: String::new(),
            comment: String::new(),
            target,
            ert,
            evals: Array2::zeros((0, 0)),
            finalfunvals: Array1::zeros(0),
            maxevals: Array1::zeros(0),
            funvals: Array2::zeros((0, 0)),
        }
    }

    pub fn with_evals(mut self, evals: Array2<f64>) -> Self {
        self.evals = evals;
        self
    }

    pub fn with_final_funvals(mut self, finalfunvals: Array1<f64>) -> Self {
        self.finalfunvals = finalfunvals;
        self
    }

    pub fn with_max_evals(mut self, maxevals: Array1<f64>) -> Self {
        self.maxevals = maxevals;
        self
    }

    pub fn with_funvals(mut self, funvals: Array2<f64>) -> Self {
        self.funvals = funvals;
        self
    }

    pub fn problem(&self) -> ProblemKey {
        (self.dimension, self.function_id)
    }
}

/// Number of credits one algorithm collected in one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmCount {
    pub count: usize,
    pub algorithm: Algorithm,
}

/// Algorithms ranked per dimension by the number of credits they collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub per_dimension: BTreeMap<u32, Vec<AlgorithmCount>>,
}

impl Ranking {
    /// Orders each dimension by descending `(count, algorithm)`.
    pub fn from_tally(tally: Tally) -> Self {
        let mut per_dimension: BTreeMap<u32, Vec<AlgorithmCount>> =
            BTreeMap::new();
        for ((dimension, algorithm), count) in tally {
            per_dimension
                .entry(dimension)
                .or_default()
                .push(AlgorithmCount { count, algorithm });
        }
        for counts in per_dimension.values_mut() {
            counts.sort_by(|a, b| {
                (b.count, &b.algorithm).cmp(&(a.count, &a.algorithm))
            });
        }
        Self { per_dimension }
    }

    pub fn dimensions(&self) -> impl Iterator<Item = u32> + '_ {
        self.per_dimension.keys().copied()
    }

    pub fn algorithms(&self, dimension: u32) -> Vec<&str> {
        self.per_dimension
            .get(&dimension)
            .map(|counts| {
                counts.iter().map(|c| c.algorithm.as_str()).collect_vec()
            })
            .unwrap_or_default()
    }

    pub fn count(&self, dimension: u32, algorithm: &str) -> Option<usize> {
        self.per_dimension
            .get(&dimension)?
            .iter()
            .find(|c| c.algorithm == algorithm)
            .map(|c| c.count)
    }

    pub fn total(&self, dimension: u32) -> usize {
        self.per_dimension
            .get(&dimension)
            .map_or(0, |counts| counts.iter().map(|c| c.count).sum())
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (dimension, counts) in &self.per_dimension {
            writeln!(f, "{dimension}D:")?;
            for AlgorithmCount { count, algorithm } in counts {
                writeln!(f, "{count} {algorithm}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Closed interval of target precisions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TargetRange {
    pub lb: f64,
    pub ub: f64,
}

impl TargetRange {
    pub fn contains(&self, target: f64) -> bool {
        target >= self.lb && target <= self.ub
    }
}

/// Algorithm lists of the BBOB workshops.
#[derive(
    Serialize, Deserialize, clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmPreset {
    Bbob2009,
    Bbob2010,
    Bbob2012,
}

const BBOB_2009: &[&str] = &[
    "ALPS", "AMALGAM", "BAYEDA", "BFGS", "Cauchy-EDA", "BIPOP-CMA-ES",
    "CMA-ESPLUSSEL", "DASA", "DE-PSO", "DIRECT", "EDA-PSO", "FULLNEWUOA",
    "G3PCX", "GA", "GLOBAL", "iAMALGAM", "IPOP-SEP-CMA-ES", "LSfminbnd",
    "LSstep", "MA-LS-CHAIN", "MCS", "NELDER", "NELDERDOERR", "NEWUOA",
    "ONEFIFTH", "POEMS", "PSO", "PSO_Bounds", "RANDOMSEARCH", "Rosenbrock",
    "SNOBFIT", "VNS",
];

// NEWUOA is also a 2009 entry; the 2010 one is the noisy variant.
const BBOB_2010: &[&str] = &[
    "1komma2", "1komma2mir", "1komma2mirser", "1komma2ser", "1komma4",
    "1komma4mir", "1komma4mirser", "1komma4ser", "1plus1", "1plus2mirser",
    "ABC", "AVGNEWUOA", "CMAEGS", "DE-F-AUC", "DEuniform", "IPOP-ACTCMA-ES",
    "BIPOP-CMA-ES", "MOS", "NBC-CMA", "NEWUOA", "PM-AdapSS-DE", "RCGA",
    "SPSA", "oPOEMS", "pPOEMS",
];

const BBOB_2012: &[&str] = &[
    "ACOR", "BIPOPaCMA", "BIPOPsaACM", "aCMA", "CMAES", "aCMAa", "aCMAm",
    "aCMAma", "aCMAmah", "aCMAmh", "DBRCGA", "DE", "DEAE", "DEb", "DEctpb",
    "IPOPsaACM", "JADE", "JADEb", "JADEctpb", "NBIPOPaCMA", "NIPOPaCMA",
    "DE-AUTO", "DE-BFGS", "DE-ROLL", "DE-SIMPLEX", "MVDE", "PSO-BFGS", "xNES",
    "xNESas", "SNES",
];

impl AlgorithmPreset {
    /// The algorithms of the preset, in tie-break order.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        let names = match self {
            AlgorithmPreset::Bbob2009 => BBOB_2009,
            AlgorithmPreset::Bbob2010 => BBOB_2010,
            AlgorithmPreset::Bbob2012 => BBOB_2012,
        };
        names.iter().map(|name| name.to_string()).collect()
    }
}

pub static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Directory with one `<algorithm>.json` file per algorithm
    pub data_dir: PathBuf,
    /// Algorithms in tie-break order
    #[serde(default)]
    pub algorithms: Vec<Algorithm>,
    /// Used when `algorithms` is empty
    #[serde(default)]
    pub preset: Option<AlgorithmPreset>,
    /// Read the best algorithm data from a snapshot instead of generating it
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    pub out_dir: PathBuf,
    #[serde(default = "default_f_factor")]
    pub f_factor: f64,
    #[serde(default = "default_contribution_targets")]
    pub contribution_targets: TargetRange,
    #[serde(default = "default_portfolio_targets")]
    pub portfolio_targets: TargetRange,
}

impl Config {
    pub fn global() -> &'static Config {
        CONFIG.get().expect("Config is not initialized")
    }

    pub fn from_cli(args: &Args) -> Result<Config> {
        let config_path = &args.config;
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {config_path:?}"))?;
        let mut config: Config = serde_json::from_str(&config_str)?;
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = data_dir.to_path_buf();
        }
        if let Some(preset) = args.preset {
            config.preset = Some(preset);
            config.algorithms.clear();
        }
        if let Some(algorithms) = &args.algorithms {
            config.algorithms = algorithms.to_vec();
        }
        if config.algorithms.is_empty() {
            if let Some(preset) = config.preset {
                config.algorithms = preset.algorithms();
            }
        }
        if config.algorithms.is_empty() {
            anyhow::bail!("No algorithms given and no preset to take them from");
        }
        if let Some(snapshot) = &args.snapshot {
            config.snapshot = Some(snapshot.to_path_buf());
        }
        if let Some(out_dir) = &args.out_dir {
            config.out_dir = out_dir.to_path_buf();
        }
        if let Some(f_factor) = args.f_factor {
            config.f_factor = f_factor;
        }
        if let Some(target_lb) = args.target_lb {
            config.contribution_targets.lb = target_lb;
            config.portfolio_targets.lb = target_lb;
        }
        if let Some(target_ub) = args.contribution_target_ub {
            config.contribution_targets.ub = target_ub;
        }
        if let Some(target_ub) = args.portfolio_target_ub {
            config.portfolio_targets.ub = target_ub;
        }
        if config.f_factor < 1.0 {
            anyhow::bail!("f_factor must be at least 1, got {}", config.f_factor);
        }
        Ok(config)
    }
}

fn default_f_factor() -> f64 {
    2.0
}

fn default_contribution_targets() -> TargetRange {
    TargetRange { lb: 1e-8, ub: 1e2 }
}

fn default_portfolio_targets() -> TargetRange {
    TargetRange { lb: 1e-8, ub: 1e22 }
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Path to the json config
    #[arg(short, long)]
    pub config: PathBuf,
    /// Directory containing one json file of run records per algorithm
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Algorithms to combine, in tie-break order
    #[arg(short, long, value_delimiter = ' ', num_args = 0..)]
    pub algorithms: Option<Vec<Algorithm>>,
    /// Take the algorithms of a BBOB workshop
    #[arg(long, value_enum)]
    pub preset: Option<AlgorithmPreset>,
    /// Load the best algorithm data from a json snapshot
    #[arg(short, long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
    /// Path to the output directory
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
    /// Algorithms whose running time is within this factor of the best
    /// are part of the portfolio
    #[arg(short, long)]
    pub f_factor: Option<f64>,
    /// Smallest target precision taken into account
    #[arg(long)]
    pub target_lb: Option<f64>,
    /// Largest target precision for counting contributing algorithms
    #[arg(long)]
    pub contribution_target_ub: Option<f64>,
    /// Largest target precision for the portfolio extraction
    #[arg(long)]
    pub portfolio_target_ub: Option<f64>,
    #[command(flatten)]
    pub verbosity: Verbosity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_order() {
        let tally = Tally::from([
            ((2, "algo1".to_string()), 3),
            ((2, "algo2".to_string()), 5),
            ((2, "algo3".to_string()), 3),
            ((3, "algo1".to_string()), 0),
        ]);
        let ranking = Ranking::from_tally(tally);
        assert_eq!(ranking.algorithms(2), vec!["algo2", "algo3", "algo1"]);
        assert_eq!(ranking.total(2), 11);
        assert_eq!(ranking.count(3, "algo1"), Some(0));
        assert_eq!(ranking.count(3, "algo2"), None);
        assert_eq!(
            ranking.to_string(),
            "2D:\n5 algo2\n3 algo3\n3 algo1\n\n3D:\n0 algo1\n\n"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"data_dir": "data", "algorithms": ["a", "b"], "out_dir": "out"}"#,
        )
        .unwrap();
        assert_eq!(config.f_factor, 2.0);
        assert_eq!(config.contribution_targets, TargetRange { lb: 1e-8, ub: 1e2 });
        assert_eq!(config.portfolio_targets.ub, 1e22);
        assert!(config.snapshot.is_none());
        assert!(config.preset.is_none());
    }

    #[test]
    fn test_presets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"data_dir": "data", "preset": "bbob2012", "out_dir": "out"}"#)
            .unwrap();
        let path = path.to_str().unwrap();

        let config = Config::from_cli(&Args::parse_from(["virtual_best", "-c", path])).unwrap();
        assert_eq!(config.algorithms.len(), 30);
        assert_eq!(config.algorithms[0], "ACOR");

        let args = Args::parse_from(["virtual_best", "-c", path, "--preset", "bbob2009"]);
        let config = Config::from_cli(&args).unwrap();
        assert_eq!(config.algorithms, AlgorithmPreset::Bbob2009.algorithms());
        assert_eq!(config.algorithms.len(), 32);

        let args = Args::parse_from(["virtual_best", "-c", path, "-a", "A B"]);
        assert_eq!(Config::from_cli(&args).unwrap().algorithms, vec!["A", "B"]);

        fs::write(dir.path().join("empty.json"), r#"{"data_dir": "data", "out_dir": "out"}"#)
            .unwrap();
        let empty = dir.path().join("empty.json");
        let args = Args::parse_from(["virtual_best", "-c", empty.to_str().unwrap()]);
        assert!(Config::from_cli(&args).is_err());
    }
}
