use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use bar_leaderboard::confidence::{self, Handicap, NationTally, PlayerDistribution};
use bar_leaderboard::json_safe::safe_json_convert;
use bar_leaderboard::leaderboard::preprocess_leaderboard;
use bar_leaderboard::model::{PlayerLeaderboardRow, Scope};
use bar_leaderboard::table::Cell;

const SCOPES: [&str; 8] = ["DE", "FR", "SE", "PL", "US", "Benelux", "Nordics", "global"];
const GAME_TYPES: [&str; 4] = ["Duel", "Small Team", "Large Team", "FFA"];

fn sample_rows(count: usize) -> Vec<PlayerLeaderboardRow> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let player_id = rng.gen_range(1..20_000i64);
            let scope = SCOPES[rng.gen_range(0..SCOPES.len())];
            PlayerLeaderboardRow {
                player_id,
                player_name: format!("Player_{player_id}"),
                country_code: Some(SCOPES[rng.gen_range(0..5)].to_string()),
                game_type: GAME_TYPES[rng.gen_range(0..GAME_TYPES.len())].to_string(),
                scope: Scope::parse(scope).unwrap_or(Scope::Global),
                rating: rng.gen_range(800.0..2600.0),
                games_played: Some(rng.gen_range(1..500)),
                start_time: Some(rng.gen_range(0..1_000)),
            }
        })
        .collect()
}

fn bench_preprocess(c: &mut Criterion) {
    let rows = sample_rows(100_000);
    c.bench_function("preprocess_leaderboard_100k", |b| {
        b.iter(|| {
            let cache = preprocess_leaderboard(black_box(&rows));
            black_box(cache.len());
        })
    });
}

fn bench_nation_score(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let scores: Vec<i64> = (0..2_000).map(|_| rng.gen_range(-40..40)).collect();
    let handicap = Handicap::from_average_games(180.0);
    c.bench_function("nation_score_breakdown", |b| {
        b.iter(|| {
            let tally = NationTally::from_scores(black_box(&scores).iter().copied(), 12_000);
            let distribution = PlayerDistribution::from_scores(scores.iter().copied());
            black_box(confidence::score(&tally, &handicap, distribution));
        })
    });
}

fn bench_json_convert(c: &mut Criterion) {
    let contributors = Cell::List(
        (0..50)
            .map(|idx| {
                Cell::Record(vec![
                    ("user_id".into(), Cell::Int(idx)),
                    ("name".into(), Cell::Text(format!("Player_{idx}"))),
                    (
                        "score".into(),
                        if idx % 7 == 0 { Cell::Float(f64::NAN) } else { Cell::Float(idx as f64 * 1.5) },
                    ),
                ])
            })
            .collect(),
    );
    c.bench_function("safe_json_convert_contributors", |b| {
        b.iter(|| black_box(safe_json_convert(black_box(&contributors))))
    });
}

criterion_group!(perf, bench_preprocess, bench_nation_score, bench_json_convert);
criterion_main!(perf);
