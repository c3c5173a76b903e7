use std::fs;

use virtual_best::{
    aligner::HorizontalAligner,
    dataset::generate_from_provider,
    export::{write_data_files, write_ranking_csv},
    portfolio_reducer::rank_contributing_algorithms,
};
mod common;
use common::*;

#[test]
fn test_data_files() {
    let dir = tempfile::tempdir().unwrap();
    let entries = generate_from_provider(
        &fixture_provider(),
        &algorithms(&["A", "B", "C"]),
        &HorizontalAligner,
    )
    .unwrap();
    let files = write_data_files(&entries, dir.path(), "dat").unwrap();
    let names = files
        .iter()
        .map(|path| path.file_name().unwrap().to_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            "bbob-bestalg1_f01_d02.dat",
            "bbob-bestalg1_f02_d02.dat",
            "bbob-bestalg1_f01_d03.dat",
        ]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("bbob-bestalg1_f01_d02.dat")).unwrap(),
        "% Artificial instance\n\
         100 1.000000000e-01 1.000000000e-01\n\
         300 1.000000000e-02 1.000000000e-02\n"
    );
    // ert 10 at 1e0 is written before ert 80 at 1e-1
    assert_eq!(
        fs::read_to_string(&files[1]).unwrap(),
        "% Artificial instance\n\
         10 1.000000000e+00 1.000000000e+00\n\
         80 1.000000000e-01 1.000000000e-01\n"
    );
}

#[test]
fn test_ranking_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contributions.csv");
    let ranking = rank_contributing_algorithms(
        &fixture_provider(),
        &algorithms(&["A", "B", "C"]),
        1e-8,
        1e2,
        &HorizontalAligner,
    )
    .unwrap();
    write_ranking_csv(&ranking, &path).unwrap();
    let csv = fs::read_to_string(&path).unwrap();
    let lines = csv.lines().collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec![
            "dimension,rank,algorithm,count",
            "2,1,B,2",
            "2,2,A,2",
            "3,1,C,1",
        ]
    );
}
