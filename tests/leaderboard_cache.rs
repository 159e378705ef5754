mod common;

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bar_leaderboard::data_manager::Snapshot;
use bar_leaderboard::error::QueryError;
use bar_leaderboard::leaderboard::preprocess_leaderboard;
use bar_leaderboard::model::{PlayerLeaderboardRow, Scope};

use common::DataDir;

#[test]
fn three_duel_players_rank_by_rating() {
    let data = DataDir::empty();
    data.write_leaderboard(&[
        vec!["1", "A", "DE", "global", "duel", "1500", ""],
        vec!["2", "B", "DE", "global", "duel", "1800", ""],
        vec!["3", "C", "DE", "global", "duel", "1200", ""],
    ]);
    data.write_countries();

    let snapshot = Snapshot::load_all(&data.sources, 1).expect("loads");
    let rows = snapshot
        .get_leaderboard(&Scope::Global, "duel")
        .expect("global duel entry");
    let got: Vec<(&str, usize, f64)> = rows
        .iter()
        .map(|p| (p.player_name.as_str(), p.rank, p.rating))
        .collect();
    assert_eq!(got, vec![("B", 1, 1800.0), ("A", 2, 1500.0), ("C", 3, 1200.0)]);
    assert_eq!(snapshot.leaderboards.len(), 1);
}

#[test]
fn unknown_game_type_is_not_found_not_empty() {
    let data = DataDir::required_only();
    let snapshot = Snapshot::load_all(&data.sources, 1).expect("loads");
    let err = snapshot
        .get_leaderboard(&Scope::Global, "unknown_mode")
        .expect_err("no such game type");
    assert!(matches!(err, QueryError::NotFound(_)));
}

#[test]
fn regions_and_countries_each_get_entries() {
    let data = DataDir::required_only();
    let snapshot = Snapshot::load_all(&data.sources, 1).expect("loads");
    let cache = &snapshot.leaderboards;

    let region = cache
        .get(&Scope::Named("Western Europe".into()), "Duel")
        .expect("region entry");
    assert_eq!(region.len(), 1);

    let global = cache.get(&Scope::Global, "Duel").expect("global duel");
    let ids: Vec<i64> = global.iter().map(|p| p.player_id).collect();
    assert_eq!(ids, vec![2, 4, 1, 3]);
    assert!(cache.get(&Scope::Named("SE".into()), "Duel").is_none());
    assert_eq!(
        cache.game_types().into_iter().collect::<Vec<_>>(),
        vec!["Duel", "Large Team"]
    );
}

#[test]
fn malformed_rows_are_skipped_and_counted() {
    let data = DataDir::empty();
    data.write_leaderboard(&[
        vec!["1", "A", "DE", "DE", "Duel", "1500", ""],
        vec!["x", "B", "DE", "DE", "Duel", "1600", ""],
        vec!["3", "C", "DE", "DE", "", "1700", ""],
        vec!["4", "D", "DE", "DE", "Duel", "NaN", ""],
        vec!["5", "", "DE", "DE", "Duel", "1400", ""],
    ]);
    data.write_countries();

    let snapshot = Snapshot::load_all(&data.sources, 1).expect("loads");
    let status = &snapshot.sources[0];
    assert_eq!((status.rows, status.skipped_rows), (2, 3));
    let global = snapshot
        .get_leaderboard(&Scope::Global, "Duel")
        .expect("global duel");
    assert_eq!(global[1].player_name, "Player_5");
}

fn random_rows(rng: &mut StdRng, count: usize) -> Vec<PlayerLeaderboardRow> {
    let scopes = ["DE", "FR", "SE", "Benelux", "global"];
    let game_types = ["Duel", "Small Team", "Large Team"];
    (0..count)
        .map(|_| {
            let player_id = rng.gen_range(1..200);
            PlayerLeaderboardRow {
                player_id,
                player_name: format!("p{player_id}"),
                country_code: Some("DE".into()),
                game_type: game_types[rng.gen_range(0..game_types.len())].to_string(),
                scope: Scope::parse(scopes[rng.gen_range(0..scopes.len())]).expect("scope"),
                // Coarse ratings so ties are common.
                rating: f64::from(rng.gen_range(10..40u32)) * 50.0,
                games_played: None,
                start_time: Some(rng.gen_range(0..5)),
            }
        })
        .collect()
}

#[test]
fn every_entry_is_contiguously_ranked_and_ordered() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let rows = random_rows(&mut rng, 400);
        let cache = preprocess_leaderboard(&rows);

        let expected_keys: HashSet<(Scope, String)> = rows
            .iter()
            .flat_map(|r| {
                [
                    (r.scope.clone(), r.game_type.clone()),
                    (Scope::Global, r.game_type.clone()),
                ]
            })
            .collect();
        assert_eq!(cache.len(), expected_keys.len());

        for (key, players) in cache.iter() {
            assert!(!players.is_empty(), "{key:?} is empty");
            let mut seen = HashSet::new();
            for (idx, player) in players.iter().enumerate() {
                assert_eq!(player.rank, idx + 1);
                assert!(seen.insert(player.player_id), "duplicate player in {key:?}");
            }
            for pair in players.windows(2) {
                assert!(pair[0].rating >= pair[1].rating);
                if pair[0].rating == pair[1].rating {
                    assert!(pair[0].player_id < pair[1].player_id);
                }
            }
        }
    }
}

#[test]
fn preprocessing_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(11);
    let rows = random_rows(&mut rng, 300);
    let a = preprocess_leaderboard(&rows);
    let b = preprocess_leaderboard(&rows);
    let flat = |cache: &bar_leaderboard::leaderboard::LeaderboardCache| {
        cache
            .iter()
            .map(|(key, players)| (key.clone(), players.to_vec()))
            .collect::<Vec<_>>()
    };
    assert_eq!(flat(&a), flat(&b));
}
