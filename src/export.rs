use std::{
    collections::BTreeMap,
    fs,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use polars::prelude::*;

use crate::best_algorithm::{BestAlgorithmMap, BestAlgorithmSet};
use crate::datastructures::Ranking;

const DATA_FILE_HEADER: &str = "% Artificial instance";

/// Writes all entries as a json list.
pub fn write_snapshot(entries: &BestAlgorithmMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create snapshot {path:?}"))?;
    serde_json::to_writer(BufWriter::new(file), &entries.values().collect_vec())?;
    info!("Saved {} best algorithm entries in {path:?}", entries.len());
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<BestAlgorithmMap> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open snapshot {path:?}"))?;
    let entries: Vec<BestAlgorithmSet> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse snapshot {path:?}"))?;
    Ok(entries
        .into_iter()
        .map(|best| (best.problem(), best))
        .collect())
}

/// `%10.9e` as printf writes it: two-digit exponent with explicit sign.
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{value:.9e}");
    let formatted = match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    };
    format!("{formatted:>10}")
}

/// Lines of the flat data file of one entry: a header, then
/// `<evaluations> <target> <target>` by increasing evaluation count.
///
/// Targets sharing the same integral running time keep the hardest one.
/// Unreached targets are left out.
pub fn data_file_lines(best: &BestAlgorithmSet) -> Vec<String> {
    let mut target_by_evaluations = BTreeMap::new();
    for (&ert, &target) in best.ert().iter().zip(best.target()) {
        if ert.is_finite() {
            target_by_evaluations.insert(ert as i64, target);
        }
    }
    std::iter::once(DATA_FILE_HEADER.to_string())
        .chain(target_by_evaluations.into_iter().map(|(evaluations, target)| {
            let target = format_scientific(target);
            format!("{evaluations} {target} {target}")
        }))
        .collect()
}

pub fn data_file_name(best: &BestAlgorithmSet, extension: &str) -> String {
    format!(
        "bbob-bestalg1_f{:02}_d{:02}.{extension}",
        best.function_id(),
        best.dimension()
    )
}

/// Writes one data file per entry into `out_dir` and returns their paths.
pub fn write_data_files(
    entries: &BestAlgorithmMap,
    out_dir: impl AsRef<Path>,
    extension: &str,
) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    entries
        .values()
        .map(|best| -> Result<PathBuf> {
            let path = out_dir.join(data_file_name(best, extension));
            let mut file = BufWriter::new(
                fs::File::create(&path)
                    .with_context(|| format!("Failed to create {path:?}"))?,
            );
            for line in data_file_lines(best) {
                writeln!(file, "{line}")?;
            }
            file.flush()?;
            Ok(path)
        })
        .collect()
}

/// One row per ranked algorithm with columns
/// `dimension`, `rank`, `algorithm` and `count`.
pub fn ranking_frame(ranking: &Ranking) -> Result<DataFrame> {
    let rows = ranking
        .per_dimension
        .iter()
        .flat_map(|(&dimension, counts)| {
            counts
                .iter()
                .enumerate()
                .map(move |(rank, c)| {
                    (dimension, rank as u32 + 1, c.algorithm.as_str(), c.count as u64)
                })
        })
        .collect_vec();
    Ok(df! {
        "dimension" => rows.iter().map(|r| r.0).collect_vec(),
        "rank" => rows.iter().map(|r| r.1).collect_vec(),
        "algorithm" => rows.iter().map(|r| r.2).collect_vec(),
        "count" => rows.iter().map(|r| r.3).collect_vec(),
    }?)
}

pub fn write_ranking_csv(ranking: &Ranking, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut df = ranking_frame(ranking)?;
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create {path:?}"))?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
