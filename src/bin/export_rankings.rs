use std::path::PathBuf;

use anyhow::{Context, Result};

use bar_leaderboard::config::{DataSources, ServerConfig, parse_path_arg};
use bar_leaderboard::data_manager::Snapshot;
use bar_leaderboard::export::export_rankings;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let sources = match parse_path_arg(&args, "--data-dir") {
        Some(dir) => DataSources::in_dir(dir),
        None => ServerConfig::from_env()?.sources,
    };
    let out = parse_path_arg(&args, "--out").unwrap_or_else(|| PathBuf::from("rankings.xlsx"));

    let snapshot = Snapshot::load_all(&sources, 1).context("startup data error")?;
    let report = export_rankings(&snapshot, &out)?;

    println!("Export complete");
    println!("Workbook: {}", out.display());
    println!(
        "Leaderboard sheets: {} ({} players)",
        report.leaderboard_sheets, report.players
    );
    println!(
        "Nation sheets: {} ({} nations)",
        report.nation_sheets, report.nations
    );
    if snapshot.nations.is_none() {
        println!("Nation rankings unavailable; no nation sheets written");
    }
    Ok(())
}
