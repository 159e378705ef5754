mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use bar_leaderboard::config::QuerySettings;
use bar_leaderboard::data_manager::DataManager;
use bar_leaderboard::http::{AppState, router};

use common::DataDir;

struct Server {
    addr: SocketAddr,
    client: reqwest::Client,
    _data: DataDir,
}

impl Server {
    async fn start(data: DataDir, settings: QuerySettings) -> Self {
        let manager = DataManager::load_all(data.sources.clone()).expect("data loads");
        let state = AppState::new(Arc::new(manager), settings);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.expect("server runs");
        });
        Self {
            addr,
            client: reqwest::Client::new(),
            _data: data,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("request");
        let status = resp.status();
        (status, resp.json().await.expect("json body"))
    }

    async fn post(&self, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("request");
        let status = resp.status();
        (status, resp.json().await.expect("json body"))
    }
}

#[tokio::test]
async fn health_and_status() {
    let server = Server::start(DataDir::full(), QuerySettings::default()).await;
    let (status, body) = server.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = server.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("online"));
    assert_eq!(body["generation"], json!(1));
    assert_eq!(body["datasets"]["player_contributions"], json!(true));
}

#[tokio::test]
async fn leaderboard_routes() {
    let server = Server::start(DataDir::full(), QuerySettings::default()).await;

    let (status, body) = server.get("/api/leaderboard/global/Large%20Team").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["players"]
        .as_array()
        .expect("players")
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Echo", "Foxtrot"]);

    let (status, body) = server.get("/api/leaderboard/de/Duel?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["players"][0]["name"], json!("Bravo"));
    assert_eq!(body["has_more"], json!(true));

    let (status, body) = server.get("/api/leaderboard/global/unknown_mode").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["found"], json!(false));
    assert_eq!(body["kind"], json!("not_found"));

    let (status, _) = server.get("/api/leaderboard/global/Duel?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = server.get("/api/leaderboard/global/Duel?limit=5000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.get("/api/leaderboards").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_types"], json!(["Duel", "Large Team"]));
}

#[tokio::test]
async fn nation_routes() {
    let server = Server::start(DataDir::full(), QuerySettings::default()).await;

    let (status, body) = server.get("/api/nation-rankings/Duel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["countryCode"], json!("DE"));

    let (status, body) = server.get("/api/nation-score-breakdown/DE/Duel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["adjusted_score"], json!(13.33));
    assert_eq!(body["ranking_score"], json!(1333.0));

    let (status, body) = server.get("/api/search-player/Duel/alp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["player_name"], json!("Alpha"));
    assert_eq!(body[0]["global_rank"], json!(3));

    let (status, body) = server.get("/api/player-contributions/Large%20Team").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], json!("Echo"));
    assert_eq!(body[0]["country_name"], json!("Sweden"));
}

#[tokio::test]
async fn malformed_requests_answer_with_json_errors() {
    let server = Server::start(DataDir::full(), QuerySettings::default()).await;

    let (status, body) = server.get("/api/leaderboard/global/Duel?limit=1&limit=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("bad_request"));
    assert!(body["error"].as_str().is_some_and(|e| e.contains("limit")));

    let (status, body) = server.get("/api/search-player/Duel/%FF").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], json!("bad_request"));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn non_finite_nation_values_are_served_as_null() {
    let data = DataDir::full();
    common::write_csv(
        &data.sources.nation_rankings,
        &["game_type", "countryCode", "total_score", "total_games", "win_rate"],
        &[
            vec!["Duel", "DE", "1333", "100", "NaN"],
            vec!["Duel", "FR", "-500", "50", "inf"],
            vec!["Duel", "SE", "800", "100", "0.61"],
        ],
    );
    let server = Server::start(data, QuerySettings::default()).await;

    let (status, body) = server.get("/api/nation-rankings/Duel").await;
    assert_eq!(status, StatusCode::OK);
    let nation = |code: &str| {
        body.as_array()
            .expect("nation list")
            .iter()
            .find(|n| n["countryCode"] == json!(code))
            .cloned()
            .expect("nation present")
    };
    assert_eq!(nation("DE").get("win_rate"), Some(&Value::Null));
    assert_eq!(nation("FR")["win_rate"], Value::Null);
    assert_eq!(nation("SE")["win_rate"], json!(0.61));
}

#[tokio::test]
async fn missing_optional_data_is_unavailable() {
    let server = Server::start(DataDir::required_only(), QuerySettings::default()).await;

    let (status, body) = server.get("/api/search-player/Duel/alpha").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["available"], json!(false));

    let (status, _) = server.get("/api/team-rankings").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Leaderboards keep working without the optional artifacts.
    let (status, _) = server.get("/api/leaderboard/global/Duel").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn team_routes() {
    let server = Server::start(DataDir::full(), QuerySettings::default()).await;

    let (status, body) = server.get("/api/player-suggestions/ech").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], json!(["Echelon", "Echo", "Echoes"]));

    let (status, body) = server.get("/api/search-teams/Echo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items_found"], json!(2));
    assert_eq!(body["teams"][0]["team_name"], json!("Northern Lights"));

    let (status, _) = server.get("/api/search-teams/Echo/clans").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.get("/api/team-rankings/frequent_teammates").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "frequent_teammates": [] }));
}

#[tokio::test]
async fn reload_route_respects_settings() {
    let server = Server::start(DataDir::required_only(), QuerySettings::default()).await;
    let (status, _) = server.post("/api/reload").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let data = DataDir::required_only();
    let sources = data.sources.clone();
    let settings = QuerySettings {
        allow_reload: true,
        ..QuerySettings::default()
    };
    let server = Server::start(data, settings).await;

    let (status, body) = server.post("/api/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], json!(2));

    std::fs::remove_file(&sources.countries).expect("remove countries");
    let (status, body) = server.post("/api/reload").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], json!("reload_failed"));
    assert_eq!(body["generation"], json!(2));
}
