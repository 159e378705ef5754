use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::QuerySettings;
use crate::data_manager::DataManager;
use crate::error::QueryError;
use crate::json_safe::{safe_json_convert, to_json};
use crate::query::{self, Page};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DataManager>,
    pub settings: QuerySettings,
}

impl AppState {
    pub fn new(manager: Arc<DataManager>, settings: QuerySettings) -> Self {
        Self { manager, settings }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.to_string(), "kind": self.kind() });
        let status = match self {
            QueryError::NotFound(_) => {
                body["found"] = Value::Bool(false);
                StatusCode::NOT_FOUND
            }
            QueryError::Unavailable(_) => {
                body["available"] = Value::Bool(false);
                StatusCode::SERVICE_UNAVAILABLE
            }
            QueryError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(body)).into_response()
    }
}

// Extractor failures answer with the same JSON error body as query errors.
impl From<PathRejection> for QueryError {
    fn from(rejection: PathRejection) -> Self {
        QueryError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for QueryError {
    fn from(rejection: QueryRejection) -> Self {
        QueryError::BadRequest(rejection.body_text())
    }
}

type ApiResult = Result<Json<Value>, QueryError>;
type PathParam<T> = Result<Path<T>, PathRejection>;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/leaderboards", get(leaderboards))
        .route("/api/leaderboard/:scope/:game_type", get(leaderboard))
        .route("/api/nation-rankings/:game_type", get(nation_rankings))
        .route("/api/player-contributions/:game_type", get(player_contributions))
        .route("/api/search-player/:game_type/:query", get(search_player))
        .route(
            "/api/nation-score-breakdown/:country/:game_type",
            get(nation_score_breakdown),
        )
        .route("/api/team-rankings", get(team_rankings))
        .route("/api/team-rankings/:team_type", get(team_rankings_by_type))
        .route("/api/player-suggestions/:partial", get(player_suggestions))
        .route("/api/search-teams/:player", get(search_teams))
        .route("/api/search-teams/:player/:search_type", get(search_teams_typed))
        .route("/api/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "serving leaderboard API");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {e}"))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.manager.snapshot();
    Json(to_json(&query::status(&snapshot)))
}

async fn leaderboards(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.manager.snapshot();
    Json(to_json(&query::available_leaderboards(&snapshot)))
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    limit: Option<String>,
    offset: Option<String>,
}

async fn leaderboard(
    State(state): State<AppState>,
    path: PathParam<(String, String)>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult {
    let Path((scope, game_type)) = path?;
    let Query(params) = params?;
    let page = Page::parse(
        params.limit.as_deref(),
        params.offset.as_deref(),
        state.settings.max_page_size,
    )?;
    let snapshot = state.manager.snapshot();
    let body = query::leaderboard(&snapshot, &scope, &game_type, page)?;
    Ok(Json(to_json(&body)))
}

async fn nation_rankings(
    State(state): State<AppState>,
    path: PathParam<String>,
) -> ApiResult {
    let Path(game_type) = path?;
    let snapshot = state.manager.snapshot();
    Ok(Json(to_json(query::nation_rankings(&snapshot, &game_type)?)))
}

async fn player_contributions(
    State(state): State<AppState>,
    path: PathParam<String>,
) -> ApiResult {
    let Path(game_type) = path?;
    let snapshot = state.manager.snapshot();
    Ok(Json(to_json(&query::player_contributions(&snapshot, &game_type)?)))
}

async fn search_player(
    State(state): State<AppState>,
    path: PathParam<(String, String)>,
) -> ApiResult {
    let Path((game_type, text)) = path?;
    let snapshot = state.manager.snapshot();
    let found = query::search_players(&snapshot, &game_type, &text, state.settings.search_limit)?;
    Ok(Json(to_json(&found)))
}

async fn nation_score_breakdown(
    State(state): State<AppState>,
    path: PathParam<(String, String)>,
) -> ApiResult {
    let Path((country, game_type)) = path?;
    let snapshot = state.manager.snapshot();
    let breakdown = query::nation_score_breakdown(&snapshot, &country, &game_type)?;
    Ok(Json(to_json(&breakdown)))
}

async fn team_rankings(State(state): State<AppState>) -> ApiResult {
    let snapshot = state.manager.snapshot();
    Ok(Json(to_json(&query::team_rankings(&snapshot)?)))
}

async fn team_rankings_by_type(
    State(state): State<AppState>,
    path: PathParam<String>,
) -> ApiResult {
    let Path(team_type) = path?;
    let snapshot = state.manager.snapshot();
    let ranked = query::team_rankings_by_type(&snapshot, &team_type)?;
    Ok(Json(safe_json_convert(ranked)))
}

async fn player_suggestions(
    State(state): State<AppState>,
    path: PathParam<String>,
) -> ApiResult {
    let Path(partial) = path?;
    let snapshot = state.manager.snapshot();
    let suggestions = query::player_suggestions(&snapshot, &partial)?;
    Ok(Json(safe_json_convert(suggestions)))
}

async fn search_teams(State(state): State<AppState>, path: PathParam<String>) -> ApiResult {
    let Path(player) = path?;
    let snapshot = state.manager.snapshot();
    Ok(Json(to_json(&query::search_teams(&snapshot, &player, None)?)))
}

async fn search_teams_typed(
    State(state): State<AppState>,
    path: PathParam<(String, String)>,
) -> ApiResult {
    let Path((player, search_type)) = path?;
    let snapshot = state.manager.snapshot();
    let found = query::search_teams(&snapshot, &player, Some(&search_type))?;
    Ok(Json(to_json(&found)))
}

async fn reload(State(state): State<AppState>) -> Response {
    if !state.settings.allow_reload {
        return QueryError::NotFound("reload is disabled".into()).into_response();
    }
    let manager = Arc::clone(&state.manager);
    match tokio::task::spawn_blocking(move || manager.reload()).await {
        Ok(Ok(snapshot)) => Json(json!({
            "reloaded": true,
            "generation": snapshot.generation,
            "last_updated": snapshot.last_updated,
        }))
        .into_response(),
        Ok(Err(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "reloaded": false,
                "error": err.to_string(),
                "kind": "reload_failed",
                "generation": state.manager.generation(),
            })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "reload task did not complete");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "reloaded": false,
                    "error": "reload task did not complete",
                    "kind": "reload_failed",
                    "generation": state.manager.generation(),
                })),
            )
                .into_response()
        }
    }
}
