use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::data_manager::Snapshot;
use crate::model::Scope;
use crate::table::Cell;

const MAX_SHEET_NAME: usize = 31;

pub struct ExportReport {
    pub leaderboard_sheets: usize,
    pub nation_sheets: usize,
    pub players: usize,
    pub nations: usize,
}

/// One sheet per global leaderboard and one per nation-ranking game type.
pub fn export_rankings(snapshot: &Snapshot, path: &Path) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    let mut used_names = HashSet::new();
    let mut report = ExportReport {
        leaderboard_sheets: 0,
        nation_sheets: 0,
        players: 0,
        nations: 0,
    };

    for game_type in snapshot.leaderboards.game_types() {
        let Some(players) = snapshot.leaderboards.get(&Scope::Global, game_type) else {
            continue;
        };
        let mut rows = vec![header(&["rank", "user_id", "name", "countryCode", "rating", "games_played"])];
        rows.extend(players.iter().map(|p| {
            vec![
                Cell::Int(p.rank as i64),
                Cell::Int(p.player_id),
                Cell::Text(p.player_name.clone()),
                Cell::Text(p.country_code.clone()),
                Cell::Float(p.rating),
                p.games_played.map_or(Cell::Null, |g| Cell::Int(g as i64)),
            ]
        }));
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name("LB", game_type, &mut used_names))?;
        write_rows(sheet, &rows)?;
        report.leaderboard_sheets += 1;
        report.players += players.len();
    }

    if let Some(nations) = &snapshot.nations {
        for game_type in nations.game_types() {
            let Some(ranked) = nations.get(game_type) else {
                continue;
            };
            let mut rows = vec![header(&[
                "rank",
                "countryCode",
                "country_name",
                "total_score",
                "total_games",
                "total_players",
                "confidence_factor",
            ])];
            rows.extend(ranked.iter().map(|n| {
                vec![
                    Cell::Int(n.rank as i64),
                    Cell::Text(n.country_code.clone()),
                    Cell::Text(n.country_name.clone()),
                    Cell::Float(n.total_score),
                    Cell::Int(n.total_games as i64),
                    n.total_players.map_or(Cell::Null, |p| Cell::Int(p as i64)),
                    n.confidence_factor.map_or(Cell::Null, Cell::Float),
                ]
            }));
            let sheet = workbook.add_worksheet();
            sheet.set_name(sheet_name("Nations", game_type, &mut used_names))?;
            write_rows(sheet, &rows)?;
            report.nation_sheets += 1;
            report.nations += ranked.len();
        }
    }

    if report.leaderboard_sheets + report.nation_sheets == 0 {
        workbook.add_worksheet().set_name("Empty")?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(report)
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::Text(n.to_string())).collect()
}

/// Excel sheet names: at most 31 chars, none of `[]:*?/\`, unique per workbook.
fn sheet_name(prefix: &str, game_type: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = format!("{prefix} {game_type}")
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let mut name = cleaned.clone();
    let mut n = 2;
    while !used.insert(name.to_lowercase()) {
        let suffix = format!("~{n}");
        let keep = MAX_SHEET_NAME - suffix.len();
        name = format!("{}{suffix}", cleaned.chars().take(keep).collect::<String>());
        n += 1;
    }
    name
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            match value {
                Cell::Int(v) => worksheet.write_number(r, c, *v as f64),
                Cell::Float(v) if v.is_finite() => worksheet.write_number(r, c, *v),
                other => match other.as_text() {
                    Some(text) => worksheet.write_string(r, c, text),
                    None => continue,
                },
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
