//! Shell integration tests against an in-process fake API.
//!
//! Commands run end to end through the session store and API client; output
//! is captured in memory.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fipp21::realtime::{Frame, events};
use fipp21::{ApiClient, ConnectionState, Dispatcher, MemoryStorage, ReconnectPolicy, SessionStore};
use fipp21_client::commands::{Command, WatchTarget, parse_command};
use fipp21_client::shell::{Flow, Shell};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

type TestShell = Shell<MemoryStorage, Vec<u8>>;

#[derive(Clone, Default)]
struct Api {
    revoked: Arc<AtomicBool>,
}

impl Api {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        !self.revoked.load(Ordering::SeqCst)
            && headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == "Bearer tok123")
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "token expired" })),
    )
        .into_response()
}

async fn sign_in(Json(body): Json<Value>) -> Response {
    if body["email"] == "a@b.com" && body["senha"] == "x" {
        Json(json!({
            "token": "tok123",
            "usuario": { "id": 7, "nome": "Ana", "email": "a@b.com" }
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "bad credentials" })),
        )
            .into_response()
    }
}

async fn my_rooms(State(api): State<Api>, headers: HeaderMap) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([{ "id": 1, "nome": "Mesa", "codigo": "ABC123", "criador_id": 7 }])).into_response()
}

async fn joined_rooms(State(api): State<Api>, headers: HeaderMap) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([])).into_response()
}

async fn participants(Path(_room_id): Path<i64>) -> Json<Value> {
    Json(json!([{ "id": 7, "nome": "Ana" }, { "id": 8, "nome": "Bia" }]))
}

async fn active_round(Path(room_id): Path<i64>) -> Response {
    if room_id == 1 {
        Json(json!({ "id": 9, "sala_id": 1, "status": "apostas" })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn bets(Path(_round_id): Path<i64>) -> Json<Value> {
    Json(json!([{ "id": 1, "valor": 25.0, "participante_nome": "Ana" }]))
}

async fn place_bet(Path(_round_id): Path<i64>, Json(body): Json<Value>) -> Response {
    if body["valor"].as_f64().unwrap_or(0.0) > 100.0 {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Saldo insuficiente" })),
        )
            .into_response()
    } else {
        StatusCode::OK.into_response()
    }
}

async fn game_state(Path(_round_id): Path<i64>) -> Json<Value> {
    Json(json!({
        "cartasJogador": [
            { "id": 1, "naipe": "copas", "valor": "A" },
            { "id": 2, "naipe": "espadas", "valor": "10" }
        ],
        "cartasDealer": [{ "id": 3, "naipe": "ouros", "valor": "7" }],
        "totalJogador": 21,
        "totalDealer": 7,
        "status": "em_andamento"
    }))
}

async fn ok(Path(_id): Path<i64>) -> StatusCode {
    StatusCode::OK
}

async fn spawn_api(api: Api) -> String {
    let app = Router::new()
        .route("/autenticacao/token", post(sign_in))
        .route("/sala/minhas", get(my_rooms))
        .route("/sala/participando", get(joined_rooms))
        .route("/sala/{id}/participantes", get(participants))
        .route("/rodada/sala/{id}/ativa", get(active_round))
        .route("/aposta/rodada/{id}", get(bets).post(place_bet))
        .route("/jogo/rodada/{id}/estado", get(game_state))
        .route("/jogo/rodada/{id}/hit", post(ok))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A push dispatcher that never reaches a server and waits a long time
/// between attempts.
fn idle_dispatcher() -> Dispatcher {
    Dispatcher::new(
        "ws://127.0.0.1:9",
        ReconnectPolicy::fixed(Duration::from_secs(60)),
    )
}

async fn shell_with(api: Api, dispatcher: Dispatcher) -> TestShell {
    let base_url = spawn_api(api).await;
    let mut session = SessionStore::new(ApiClient::new(base_url), MemoryStorage::default());
    session.restore();
    let (shell, _notices) = Shell::new(session, dispatcher, Vec::new());
    shell
}

async fn signed_in(api: Api, dispatcher: Dispatcher) -> TestShell {
    let mut shell = shell_with(api, dispatcher).await;
    run(&mut shell, "login a@b.com x").await;
    assert!(shell.session().is_authenticated());
    shell
}

async fn run(shell: &mut TestShell, line: &str) -> Flow {
    let command = parse_command(line).unwrap();
    shell.execute(command).await.unwrap()
}

fn output(shell: &TestShell) -> String {
    String::from_utf8_lossy(shell.output()).into_owned()
}

#[tokio::test]
async fn test_commands_require_sign_in() {
    let mut shell = shell_with(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "rooms").await;
    assert!(output(&shell).contains("Sign in first"));
}

#[tokio::test]
async fn test_login_and_list_rooms() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "rooms").await;

    let out = output(&shell);
    assert!(out.contains("Welcome, Ana!"));
    assert!(out.contains("Your rooms:\n  #1 Mesa (code ABC123)"));
    assert!(out.contains("Joined rooms:\n  (none)"));
}

#[tokio::test]
async fn test_failed_login_shows_server_message() {
    let mut shell = shell_with(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "login a@b.com wrong").await;

    assert!(output(&shell).contains("Sign-in failed: bad credentials"));
    assert!(!shell.session().is_authenticated());
}

#[tokio::test]
async fn test_active_round_lookup() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "round 1").await;
    run(&mut shell, "round 2").await;

    let out = output(&shell);
    assert!(out.contains("Active round #9 (apostas)"));
    assert!(out.contains("No active round in room #2."));
}

#[tokio::test]
async fn test_rejected_bet_shows_server_message() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "bet 9 500").await;
    run(&mut shell, "bet 9 25").await;

    let out = output(&shell);
    assert!(out.contains("Saldo insuficiente"));
    assert!(out.contains("Bet of 25.00 placed on round #9."));
}

#[tokio::test]
async fn test_hit_then_stand() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "hit 9").await;
    run(&mut shell, "stand").await;
    run(&mut shell, "hit 9").await;

    let out = output(&shell);
    assert!(out.contains("You:    A copas, 10 espadas (21)"));
    assert!(out.contains("Dealer: 7 ouros (7)"));
    assert!(out.contains("You stand on round #9."));
    assert!(out.contains("You already stand on round #9."));
}

#[tokio::test]
async fn test_stand_without_round() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "stand").await;
    assert!(output(&shell).contains("No round in play."));
}

#[tokio::test]
async fn test_expired_session_signs_out() {
    let api = Api::default();
    let mut shell = signed_in(api.clone(), idle_dispatcher()).await;
    run(&mut shell, "watch room 1").await;

    api.revoked.store(true, Ordering::SeqCst);
    run(&mut shell, "rooms").await;

    assert!(output(&shell).contains("Your session has expired"));
    assert!(!shell.session().is_authenticated());
    assert_eq!(shell.watching(), None);
}

#[tokio::test]
async fn test_watch_registers_and_unwatch_removes() {
    let dispatcher = idle_dispatcher();
    let mut shell = signed_in(Api::default(), dispatcher.clone()).await;

    run(&mut shell, "watch game 9").await;
    assert_eq!(shell.watching(), Some(WatchTarget::Game(9)));
    for event_type in events::GAME_EVENTS {
        assert_eq!(dispatcher.subscriber_count(event_type), 1);
    }

    // Switching views replaces the registrations.
    run(&mut shell, "watch room 1").await;
    for event_type in events::GAME_EVENTS {
        assert_eq!(dispatcher.subscriber_count(event_type), 0);
    }
    for event_type in events::ROOM_EVENTS {
        assert_eq!(dispatcher.subscriber_count(event_type), 1);
    }

    run(&mut shell, "unwatch").await;
    for event_type in events::ROOM_EVENTS {
        assert_eq!(dispatcher.subscriber_count(event_type), 0);
    }
    assert!(output(&shell).contains("Stopped watching."));
}

#[tokio::test]
async fn test_notice_refreshes_watched_round() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "watch game 9").await;

    let frame = Frame::parse(r#"{"type":"aposta_realizada","rodada_id":9}"#).unwrap();
    shell.handle_notice(frame).await.unwrap();

    let out = output(&shell);
    assert!(out.contains("A bet was placed."));
    assert!(out.contains("Bets on round #9:\n  Ana: 25.00"));
    assert!(out.contains("Status: em_andamento"));
}

#[tokio::test]
async fn test_notice_for_other_round_is_ignored() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "watch game 9").await;
    let before = output(&shell);

    let frame = Frame::parse(r#"{"type":"estado_atualizado","rodada_id":4}"#).unwrap();
    shell.handle_notice(frame).await.unwrap();

    assert_eq!(output(&shell), before);
}

#[tokio::test]
async fn test_notice_refreshes_watched_room() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "watch room 1").await;

    let frame =
        Frame::parse(r#"{"type":"rodada_iniciada","sala_id":1,"rodada":{"id":9}}"#).unwrap();
    shell.handle_notice(frame).await.unwrap();

    let out = output(&shell);
    assert!(out.contains("Round #9 started."));
    assert!(out.contains("Players: Ana, Bia"));
    assert!(out.contains("Active round #9 (apostas)"));
}

#[tokio::test]
async fn test_quit_disconnects() {
    let dispatcher = idle_dispatcher();
    let mut shell = signed_in(Api::default(), dispatcher.clone()).await;
    run(&mut shell, "watch room 1").await;

    assert_eq!(shell.execute(Command::Quit).await.unwrap(), Flow::Quit);
    assert_eq!(dispatcher.state(), ConnectionState::Closed);
    assert_eq!(dispatcher.subscriber_count(events::PARTICIPANT_JOINED), 0);
}

#[tokio::test]
async fn test_logout_forgets_session() {
    let mut shell = signed_in(Api::default(), idle_dispatcher()).await;
    run(&mut shell, "logout").await;
    run(&mut shell, "whoami").await;

    let out = output(&shell);
    assert!(out.contains("Signed out."));
    assert!(out.ends_with("Not signed in.\n"));
}
