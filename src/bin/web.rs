//! Single binary web server: JSON API over the session manager.
//! Run with: cargo run --bin web
//! Override with env: HOST, PORT, DATABASE_PATH, DEFAULT_GROUP.

use actix_web::{
    delete, get, post, put,
    web::{self, Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;
use volley_manager::{
    AppError, AppResult, CsvKind, Gender, PlayerId, SessionError, Settings, Side, SqliteStore,
    VolleyManager,
};

type Manager = VolleyManager<SqliteStore>;

/// One manager for the whole process; every intent goes through it.
type AppState = Data<Mutex<Manager>>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct AddPlayerBody {
    name: String,
    rating: Option<f64>,
    gender: Option<Gender>,
    #[serde(default)]
    is_setter: bool,
}

#[derive(Deserialize)]
struct RenamePlayerBody {
    name: String,
}

#[derive(Deserialize)]
struct SetterBody {
    is_setter: bool,
}

#[derive(Deserialize)]
struct GenderBody {
    gender: Option<Gender>,
}

#[derive(Deserialize)]
struct PresenceBody {
    present: bool,
}

#[derive(Deserialize)]
struct ManualMatchBody {
    team_a: Vec<PlayerId>,
    team_b: Vec<PlayerId>,
    #[serde(default)]
    bench: Vec<PlayerId>,
}

#[derive(Deserialize)]
struct FinishBody {
    winner: Side,
}

#[derive(Deserialize)]
struct SubstituteBody {
    out: PlayerId,
    incoming: PlayerId,
}

#[derive(Deserialize)]
struct GroupBody {
    name: String,
}

#[derive(Deserialize)]
struct RenameGroupBody {
    new_name: String,
}

#[derive(Deserialize)]
struct ConfigBody {
    team_size: usize,
    victory_limit: u32,
    gender_priority: bool,
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<NaiveDate>,
}

/// `players` is a comma-separated list of ids; empty means everyone.
#[derive(Deserialize)]
struct SeriesQuery {
    players: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct PlayerPath {
    id: PlayerId,
}

#[derive(Deserialize)]
struct GroupPath {
    name: String,
}

#[derive(Deserialize)]
struct KindPath {
    kind: CsvKind,
}

fn error_response(e: &AppError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        AppError::Session(SessionError::PlayerNotFound(_)) => HttpResponse::NotFound().json(body),
        AppError::Session(_) | AppError::Transfer(_) => HttpResponse::BadRequest().json(body),
        AppError::Store(_) => HttpResponse::InternalServerError().json(body),
    }
}

/// Lock the manager, run `f`, and answer with its result as JSON.
fn with_manager<T: Serialize>(
    state: &AppState,
    f: impl FnOnce(&mut Manager) -> AppResult<T>,
) -> HttpResponse {
    let mut g = match state.lock() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match f(&mut g) {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

/// Like [`with_manager`] but answers with the session snapshot after the intent.
fn intent(state: &AppState, f: impl FnOnce(&mut Manager) -> AppResult<()>) -> HttpResponse {
    with_manager(state, |m| {
        f(m)?;
        Ok(m.snapshot())
    })
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "volley-manager",
    })
}

#[get("/api/session")]
async fn api_get_session(state: AppState) -> HttpResponse {
    with_manager(&state, |m| Ok(m.snapshot()))
}

// --- players ---

#[get("/api/players")]
async fn api_list_players(state: AppState) -> HttpResponse {
    with_manager(&state, |m| m.players())
}

/// Players ordered for the presence checklist (most games on the latest day first).
#[get("/api/players/presence-order")]
async fn api_presence_order(state: AppState) -> HttpResponse {
    with_manager(&state, |m| m.presence_order())
}

#[post("/api/players")]
async fn api_add_player(state: AppState, body: Json<AddPlayerBody>) -> HttpResponse {
    let body = body.into_inner();
    with_manager(&state, |m| {
        m.add_player(&body.name, body.rating, body.gender, body.is_setter)
    })
}

#[put("/api/players/{id}/name")]
async fn api_rename_player(
    state: AppState,
    path: Path<PlayerPath>,
    body: Json<RenamePlayerBody>,
) -> HttpResponse {
    with_manager(&state, |m| m.rename_player(path.id, &body.name))
}

#[put("/api/players/{id}/setter")]
async fn api_set_setter(state: AppState, path: Path<PlayerPath>, body: Json<SetterBody>) -> HttpResponse {
    with_manager(&state, |m| m.set_setter(path.id, body.is_setter))
}

#[put("/api/players/{id}/gender")]
async fn api_set_gender(state: AppState, path: Path<PlayerPath>, body: Json<GenderBody>) -> HttpResponse {
    with_manager(&state, |m| m.set_gender(path.id, body.gender))
}

#[delete("/api/players/{id}")]
async fn api_delete_player(state: AppState, path: Path<PlayerPath>) -> HttpResponse {
    intent(&state, |m| m.delete_player(path.id))
}

#[post("/api/players/{id}/presence")]
async fn api_toggle_presence(state: AppState, path: Path<PlayerPath>) -> HttpResponse {
    intent(&state, |m| m.toggle_presence(path.id).map(|_| ()))
}

#[post("/api/presence")]
async fn api_set_all_present(state: AppState, body: Json<PresenceBody>) -> HttpResponse {
    intent(&state, |m| m.set_all_present(body.present))
}

// --- match flow ---

#[post("/api/match/auto")]
async fn api_start_automatic(state: AppState) -> HttpResponse {
    intent(&state, |m| m.start_automatic_match())
}

#[post("/api/match/manual")]
async fn api_start_manual(state: AppState, body: Json<ManualMatchBody>) -> HttpResponse {
    intent(&state, |m| m.start_manual_match(&body.team_a, &body.team_b, &body.bench))
}

/// Role-balanced suggestion for manual setup. Does not change the session.
#[get("/api/match/proposal")]
async fn api_propose_teams(state: AppState) -> HttpResponse {
    with_manager(&state, |m| m.propose_role_teams())
}

#[post("/api/match/cancel")]
async fn api_cancel_match(state: AppState) -> HttpResponse {
    intent(&state, |m| {
        m.cancel_match();
        Ok(())
    })
}

#[post("/api/match/finish")]
async fn api_finish_match(state: AppState, body: Json<FinishBody>) -> HttpResponse {
    intent(&state, |m| m.finish_match(body.winner).map(|_| ()))
}

#[post("/api/match/substitute")]
async fn api_substitute(state: AppState, body: Json<SubstituteBody>) -> HttpResponse {
    intent(&state, |m| m.substitute(body.out, body.incoming))
}

#[post("/api/match/next-round")]
async fn api_next_round(state: AppState) -> HttpResponse {
    intent(&state, |m| m.start_next_round())
}

// --- groups ---

#[get("/api/groups")]
async fn api_list_groups(state: AppState) -> HttpResponse {
    with_manager(&state, |m| m.group_names())
}

#[post("/api/groups/active")]
async fn api_load_group(state: AppState, body: Json<GroupBody>) -> HttpResponse {
    intent(&state, |m| m.load_group(&body.name))
}

#[put("/api/groups/active/config")]
async fn api_update_config(state: AppState, body: Json<ConfigBody>) -> HttpResponse {
    intent(&state, |m| {
        m.update_config(body.team_size, body.victory_limit, body.gender_priority)
    })
}

#[put("/api/groups/{name}")]
async fn api_rename_group(
    state: AppState,
    path: Path<GroupPath>,
    body: Json<RenameGroupBody>,
) -> HttpResponse {
    intent(&state, |m| m.rename_group(&path.name, &body.new_name))
}

#[delete("/api/groups/{name}")]
async fn api_delete_group(state: AppState, path: Path<GroupPath>) -> HttpResponse {
    intent(&state, |m| m.delete_group(&path.name))
}

// --- ranking and history ---

#[get("/api/ranking")]
async fn api_ranking(state: AppState, query: Query<DateQuery>) -> HttpResponse {
    with_manager(&state, |m| m.ranking_for_date(query.date))
}

#[get("/api/ranking/dates")]
async fn api_ranking_dates(state: AppState) -> HttpResponse {
    with_manager(&state, |m| m.ranking_dates())
}

#[get("/api/history")]
async fn api_history(state: AppState, query: Query<DateQuery>) -> HttpResponse {
    with_manager(&state, |m| m.history_for_date(query.date))
}

#[get("/api/history/dates")]
async fn api_history_dates(state: AppState) -> HttpResponse {
    with_manager(&state, |m| m.history_dates())
}

#[get("/api/rating-series")]
async fn api_rating_series(state: AppState, query: Query<SeriesQuery>) -> HttpResponse {
    let ids: Result<Vec<PlayerId>, _> = query
        .players
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Uuid::parse_str)
        .collect();
    let ids = match ids {
        Ok(ids) => ids,
        Err(e) => {
            return HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() }))
        }
    };
    with_manager(&state, |m| m.rating_series(&ids, query.from, query.to))
}

// --- import / export ---

#[get("/api/export/{kind}")]
async fn api_export_csv(state: AppState, path: Path<KindPath>) -> HttpResponse {
    let g = match state.lock() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.export_csv(path.kind) {
        Ok(csv) => HttpResponse::Ok().content_type("text/csv; charset=utf-8").body(csv),
        Err(e) => error_response(&e),
    }
}

#[post("/api/import/{kind}")]
async fn api_import_csv(state: AppState, path: Path<KindPath>, body: String) -> HttpResponse {
    with_manager(&state, |m| {
        let inserted = m.import_csv(path.kind, &body)?;
        Ok(serde_json::json!({ "inserted": inserted }))
    })
}

#[get("/api/backup")]
async fn api_export_backup(state: AppState) -> HttpResponse {
    let g = match state.lock() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.export_backup() {
        Ok(json) => HttpResponse::Ok().content_type("application/json").body(json),
        Err(e) => error_response(&e),
    }
}

#[post("/api/backup")]
async fn api_import_backup(state: AppState, body: String) -> HttpResponse {
    with_manager(&state, |m| {
        let inserted = m.import_backup(&body)?;
        Ok(serde_json::json!({ "inserted": inserted }))
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env();
    let store = SqliteStore::open(&settings.database_path).map_err(std::io::Error::other)?;
    let manager =
        VolleyManager::open(store, &settings.default_group).map_err(std::io::Error::other)?;
    log::info!(
        "Opened {} with group {}",
        settings.database_path,
        manager.config().group
    );

    // Background task: trace every published session change
    let mut updates = manager.subscribe();
    actix_web::rt::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            log::debug!(
                "Session {:?}: {} vs {} players, {} waiting, streak {}",
                snapshot.phase,
                snapshot.team_a.len(),
                snapshot.team_b.len(),
                snapshot.waiting.len(),
                snapshot.streak.count
            );
        }
    });

    let state = Data::new(Mutex::new(manager));
    let bind = (settings.host.clone(), settings.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(8 * 1024 * 1024))
            .service(api_health)
            .service(api_get_session)
            .service(api_list_players)
            .service(api_presence_order)
            .service(api_add_player)
            .service(api_rename_player)
            .service(api_set_setter)
            .service(api_set_gender)
            .service(api_delete_player)
            .service(api_toggle_presence)
            .service(api_set_all_present)
            .service(api_start_automatic)
            .service(api_start_manual)
            .service(api_propose_teams)
            .service(api_cancel_match)
            .service(api_finish_match)
            .service(api_substitute)
            .service(api_next_round)
            .service(api_list_groups)
            .service(api_load_group)
            .service(api_update_config)
            .service(api_rename_group)
            .service(api_delete_group)
            .service(api_ranking)
            .service(api_ranking_dates)
            .service(api_history)
            .service(api_history_dates)
            .service(api_rating_series)
            .service(api_export_csv)
            .service(api_import_csv)
            .service(api_export_backup)
            .service(api_import_backup)
    })
    .bind(bind)?
    .run()
    .await
}
