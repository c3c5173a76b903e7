#![allow(dead_code)]
use ndarray::arr1;
use virtual_best::{
    dataset::JsonDirProvider,
    datastructures::{Algorithm, RunRecord},
};

pub const TEST_DATA_DIR: &str = "data/test";

pub fn fixture_provider() -> JsonDirProvider {
    JsonDirProvider::new(TEST_DATA_DIR)
}

pub fn algorithms(names: &[&str]) -> Vec<Algorithm> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn record(
    function_id: u32,
    dimension: u32,
    targets: &[f64],
    erts: &[f64],
) -> RunRecord {
    RunRecord::new(function_id, dimension, arr1(targets), arr1(erts))
}
