#![warn(missing_docs)]
//! Build the virtual best algorithm of a set of benchmarked optimizers and
//! reduce the set to a small portfolio.
//!
//! For every benchmark function and dimension, the virtual best algorithm
//! combines the results of all given algorithms: at each target precision it
//! takes the running time of the algorithm that reached the target with the
//! fewest expected function evaluations. Ties go to the algorithm listed first.
//!
//! On top of that, two analyses rank the algorithms per dimension: how often
//! each one is the best, and how often each one is within a factor of the best
//! (or second best when no algorithm is close).
//!
//! This project also contains 2 executables: `virtual_best` runs the whole
//! pipeline from a json config, `data_generator` writes synthetic run records
//! to experiment with.
//!
//! Example
//! ```rust
//! use virtual_best::aligner::HorizontalAligner;
//! use virtual_best::dataset::{self, JsonDirProvider};
//! use virtual_best::export;
//! use virtual_best::portfolio_reducer;
//! # use anyhow::Result;
//!
//! fn example() -> Result<()> {
//!     // one <algorithm>.json file with a list of run records per algorithm
//!     let provider = JsonDirProvider::new("data");
//!     // the order of the algorithms is the tie-break priority
//!     let algorithms = vec!["BIPOP-CMA-ES".to_string(), "NEWUOA".into()];
//!
//!     let entries =
//!         dataset::generate_from_provider(&provider, &algorithms, &HorizontalAligner)?;
//!     for best in entries.values() {
//!         println!("{best}: {:?}", best.running_time_at(&[1e-8]));
//!     }
//!     export::write_snapshot(&entries, "bestalg.json")?;
//!
//!     let portfolio = portfolio_reducer::extract_portfolio(
//!         &provider,
//!         &algorithms,
//!         2.0,  // factor to the best running time
//!         1e-8, // hardest target
//!         1e22, // easiest target
//!         &HorizontalAligner,
//!     )?;
//!     println!("{portfolio}");
//!     Ok(())
//! }
//! ```

/// Resampling of per-algorithm curves onto a common target grid.
pub mod aligner;

/// The virtual best algorithm of one function in one dimension and queries on it.
pub mod best_algorithm;

/// Lazily loaded best algorithm data of all problems.
pub mod cache;

/// Sources of run records and batch generation over all problems.
pub mod dataset;

/// Data structures shared by the library and the executables.
pub mod datastructures;

/// Snapshots, flat data files and ranking tables.
pub mod export;

/// Ranking of the algorithms contributing to the virtual best algorithm.
pub mod portfolio_reducer;
