use virtual_best::{
    aligner::HorizontalAligner,
    dataset::InMemoryProvider,
    portfolio_reducer::{extract_portfolio, rank_contributing_algorithms},
};
mod common;
use common::*;

#[test]
fn test_near_best_scenario() {
    let provider: InMemoryProvider = [
        ("W", vec![record(1, 2, &[1e-1], &[100.0])]),
        ("S", vec![record(1, 2, &[1e-1], &[150.0])]),
        ("T", vec![record(1, 2, &[1e-1], &[500.0])]),
    ]
    .into_iter()
    .collect();
    let portfolio = extract_portfolio(
        &provider,
        &algorithms(&["W", "S", "T"]),
        2.0,
        1e-8,
        1e22,
        &HorizontalAligner,
    )
    .unwrap();
    // S is within the factor, so T is not credited as fallback
    assert_eq!(portfolio.algorithms(2), vec!["W", "S"]);
    assert_eq!(portfolio.count(2, "T"), None);
    assert_eq!(portfolio.total(2), 2);
}

#[test]
fn test_contributions_on_fixtures() {
    let ranking = rank_contributing_algorithms(
        &fixture_provider(),
        &algorithms(&["A", "B", "C"]),
        1e-8,
        1e2,
        &HorizontalAligner,
    )
    .unwrap();
    assert_eq!(ranking.dimensions().collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(ranking.algorithms(2), vec!["B", "A"]);
    assert_eq!(ranking.count(2, "A"), Some(2));
    assert_eq!(ranking.count(2, "B"), Some(2));
    assert_eq!(ranking.count(2, "C"), None);
    assert_eq!(ranking.algorithms(3), vec!["C"]);
    assert_eq!(ranking.to_string(), "2D:\n2 B\n2 A\n\n3D:\n1 C\n\n");
}

#[test]
fn test_portfolio_on_fixtures() {
    let portfolio = extract_portfolio(
        &fixture_provider(),
        &algorithms(&["A", "B", "C"]),
        2.0,
        1e-8,
        1e22,
        &HorizontalAligner,
    )
    .unwrap();
    // f1: A, B and C at 1e-1, B and A at 1e-2
    // f2: B and A at 1e0, A and B as second best at 1e-1
    assert_eq!(portfolio.count(2, "A"), Some(4));
    assert_eq!(portfolio.count(2, "B"), Some(4));
    assert_eq!(portfolio.count(2, "C"), Some(1));
    // 3-D: C wins and A is within the factor
    assert_eq!(portfolio.algorithms(3), vec!["C", "A"]);
}

#[test]
fn test_unknown_algorithm() {
    let result = extract_portfolio(
        &fixture_provider(),
        &algorithms(&["A", "D"]),
        2.0,
        1e-8,
        1e22,
        &HorizontalAligner,
    );
    assert!(result.is_err());
}
