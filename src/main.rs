use anyhow::Result;
use clap::Parser;
use log::info;
use std::fs;

use virtual_best::cache::BestAlgorithmCache;
use virtual_best::dataset::JsonDirProvider;
use virtual_best::datastructures::*;
use virtual_best::export;
use virtual_best::portfolio_reducer;

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();
    let config = {
        let Ok(config) = Config::from_cli(&args) else { std::process::exit(exitcode::CONFIG); };
        CONFIG.set(config).ok();
        Config::global()
    };
    let out_dir = &config.out_dir;
    fs::create_dir_all(out_dir)?;
    let provider = JsonDirProvider::new(&config.data_dir);

    let mut cache = match &config.snapshot {
        Some(snapshot) => BestAlgorithmCache::from_snapshot(snapshot),
        None => BestAlgorithmCache::from_provider(
            provider.clone(),
            config.algorithms.clone(),
        ),
    };
    let entries = cache.get_or_load(false)?;
    info!("Best algorithm data for {} problems", entries.len());

    export::write_snapshot(entries, out_dir.join("bestalg.json"))?;
    let data_dir = out_dir.join("bestCustomAlg");
    for extension in ["dat", "tdat"] {
        let files = export::write_data_files(entries, &data_dir, extension)?;
        info!("Wrote {} .{extension} files to {data_dir:?}", files.len());
    }

    let contributions = Ranking::from_tally(portfolio_reducer::count_contributions(
        entries,
        config.contribution_targets,
    ));
    info!("Contributing algorithms:\n{contributions}");
    export::write_ranking_csv(&contributions, out_dir.join("contributions.csv"))?;

    let portfolio = portfolio_reducer::extract_portfolio(
        &provider,
        &config.algorithms,
        config.f_factor,
        config.portfolio_targets.lb,
        config.portfolio_targets.ub,
        &virtual_best::aligner::HorizontalAligner,
    )?;
    export::write_ranking_csv(&portfolio, out_dir.join("portfolio.csv"))?;
    serde_json::to_writer_pretty(
        fs::File::create(out_dir.join("portfolio.json"))?,
        &portfolio,
    )?;
    Ok(())
}
