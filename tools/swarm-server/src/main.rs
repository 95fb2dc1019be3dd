//! WebSocket game server for the swarm game.
//!
//! Protocol: every frame is a self-tagged JSON object — `Query` flows
//! client -> server, `Response` flows server -> client. One connection per
//! session; a session joins an open seat (`S0`/`S1`) or watches as a
//! spectator. Every session connected to the same coordinator sees every
//! `Response`, not just the one answering its own request.
//!
//!   { "type": "do_board_action", "board_idx": 0, "action": <BoardAction>, "action_id": "c1-7" }
//!   { "type": "heartbeat", "idx": 3 }
//!
//!   { "type": "report_board_action", "board_idx": 0, "action": <BoardAction>, "sequence": 7 }
//!   { "type": "report_error", "text": "..." }

mod config;
mod coordinator;
mod protocol_error;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query as AxumQuery, State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use clap::Parser;
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use coordinator::{CoordinatorHandle, SeatRegistry, SessionId};
use swarm_types::{Query as WireQuery, Response};

#[derive(Clone)]
struct AppState {
    coordinator: Arc<CoordinatorHandle>,
    seats: Arc<Mutex<SeatRegistry>>,
    password: Option<String>,
    idle_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    username: Option<String>,
    #[serde(rename = "gameHash")]
    game_hash: Option<String>,
    password: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumQuery(params): AxumQuery<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, params: ConnectParams) {
    if let Some(expected) = &state.password {
        if params.password.as_deref() != Some(expected.as_str()) {
            let _ = socket.send(frame(&Response::ReportError { text: "invalid password".into() })).await;
            return;
        }
    }

    let session_id = SessionId::new(
        params
            .username
            .or(params.game_hash)
            .unwrap_or_else(|| format!("anon-{}", anon_suffix())),
    );

    let side = state.seats.lock().await.join(session_id.clone());
    tracing::info!(session = %session_id, ?side, "session connected");

    let snapshot = match state.coordinator.submit(None, WireQuery::RequestGeneralState).await {
        Some(Response::Initialize { snapshot }) => snapshot,
        _ => {
            let _ = socket.send(frame(&Response::ReportError { text: "failed to load game state".into() })).await;
            return;
        }
    };

    let board_names = snapshot.boards.iter().map(|b| b.name.clone()).collect();
    let hello = [
        Response::Version { version: env!("CARGO_PKG_VERSION").to_string() },
        Response::ClientNumbers { your_side: side, num_boards: snapshot.boards.len(), board_names },
        Response::Initialize { snapshot },
    ];
    for r in &hello {
        if socket.send(frame(r)).await.is_err() {
            state.seats.lock().await.leave(&session_id);
            return;
        }
    }

    let mut outbound = state.coordinator.subscribe();
    loop {
        tokio::select! {
            broadcasted = outbound.recv() => {
                match broadcasted {
                    Ok(response) => {
                        if socket.send(frame(&response)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = tokio::time::timeout(state.idle_timeout, socket.recv()) => {
                let Ok(incoming) = incoming else {
                    tracing::info!(session = %session_id, "closing idle connection");
                    break;
                };
                let Some(Ok(msg)) = incoming else { break };
                let text = match msg {
                    Message::Text(t) => t,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let query: WireQuery = match serde_json::from_str(&text) {
                    Ok(q) => q,
                    Err(e) => {
                        let _ = socket.send(frame(&Response::ReportError { text: format!("invalid frame: {e}") })).await;
                        continue;
                    }
                };
                if let Some(direct) = state.coordinator.submit(side, query).await {
                    if socket.send(frame(&direct)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    state.seats.lock().await.leave(&session_id);
    tracing::info!(session = %session_id, "session disconnected");
}

fn frame(response: &Response) -> Message {
    Message::Text(serde_json::to_string(response).expect("Response always serializes").into())
}

/// A short, dependency-free per-connection suffix for anonymous sessions —
/// not cryptographically unique, only enough to tell concurrent anonymous
/// spectators apart in logs.
fn anon_suffix() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(0)
}

async fn health() -> &'static str {
    "swarm-server ok"
}

async fn index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html><head><title>Swarm Server</title></head>
<body>
<h1>Swarm game coordinator</h1>
<p>Connect via WebSocket at <code>/ws?username=you&gameHash=optional</code></p>
<pre>
const ws = new WebSocket("ws://localhost:3030/ws?username=alice");
ws.onmessage = (e) => console.log(JSON.parse(e.data));
ws.onopen = () => ws.send(JSON.stringify({ type: "heartbeat", idx: 1 }));
</pre>
</body></html>"#,
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = config::Cli::parse();
    let cfg = config::load(&cli).unwrap_or_else(|e| {
        eprintln!("failed to load configuration: {e}");
        std::process::exit(2);
    });

    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], cfg.metrics_port))
        .install()
    {
        tracing::warn!("metrics exporter disabled: {e}");
    }

    if let Err(e) = std::fs::create_dir_all(&cfg.rundir) {
        tracing::warn!(rundir = %cfg.rundir, "failed to create rundir: {e}");
    }

    let match_options = swarm_engine::setup::MatchOptions {
        num_boards: cfg.num_boards,
        target_num_wins: cfg.target_num_wins,
        starting_souls: swarm_types::SideArray::new(
            cfg.s0_starting_souls_per_board,
            cfg.s1_starting_souls_per_board,
        ),
        extra_souls_per_turn: swarm_types::SideArray::new(
            cfg.s0_extra_souls_per_turn,
            cfg.s1_extra_souls_per_turn,
        ),
        randomize_tech_line: cfg.randomize_tech_line,
        num_fixed_techs: cfg.num_fixed_techs,
        rand_seed: cfg.rand_seed,
    };
    let (game, boards) = swarm_engine::setup::new_match_with_options(&match_options);
    let turn_seconds_per_side = swarm_types::SideArray::new(cfg.s0_seconds_per_turn, cfg.s1_seconds_per_turn);
    let coordinator = Arc::new(CoordinatorHandle::spawn(game, boards, turn_seconds_per_side));
    let state = AppState {
        coordinator,
        seats: Arc::new(Mutex::new(SeatRegistry::new())),
        password: cfg.password.clone(),
        idle_timeout: Duration::from_secs(cfg.idle_timeout),
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap_or_else(|e| {
        eprintln!("failed to bind to {bind_addr}: {e}");
        std::process::exit(3);
    });
    tracing::info!(addr = %bind_addr, boards = cfg.num_boards, "swarm-server listening");
    axum::serve(listener, app).await.unwrap();
}
