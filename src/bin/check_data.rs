use std::collections::BTreeMap;

use anyhow::{Context, Result};

use bar_leaderboard::config::{DataSources, ServerConfig, parse_path_arg};
use bar_leaderboard::data_manager::Snapshot;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let sources = match parse_path_arg(&args, "--data-dir") {
        Some(dir) => DataSources::in_dir(dir),
        None => ServerConfig::from_env()?.sources,
    };

    let snapshot = Snapshot::load_all(&sources, 1).context("startup data error")?;

    println!("Data check");
    for status in &snapshot.sources {
        let state = if status.loaded { "ok" } else { "unavailable" };
        let required = if status.required { "required" } else { "optional" };
        println!(
            "{:<22} {:<11} {:<8} rows={} skipped={} {}",
            status.source, state, required, status.rows, status.skipped_rows, status.path
        );
        if let Some(err) = &status.error {
            println!("  error: {err}");
        }
    }

    let mut per_game: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (key, rows) in snapshot.leaderboards.iter() {
        let entry = per_game.entry(key.game_type.as_str()).or_default();
        entry.0 += 1;
        if key.scope.as_str() == bar_leaderboard::model::GLOBAL_SCOPE {
            entry.1 = rows.len();
        }
    }
    println!("Cache entries: {}", snapshot.leaderboards.len());
    for (game_type, (entries, global_players)) in per_game {
        println!("  {game_type}: {entries} scopes, {global_players} players globally");
    }
    if let Some(nations) = &snapshot.nations {
        for game_type in nations.game_types() {
            println!(
                "  nations {game_type}: {} ranked, avg games {:.1}",
                nations.get(game_type).map_or(0, <[_]>::len),
                nations.average_games(game_type)
            );
        }
    }
    println!("Last updated: {}", snapshot.last_updated);
    Ok(())
}
