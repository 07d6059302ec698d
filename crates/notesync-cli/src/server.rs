//! GET endpoints mirroring the CLI subcommands.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use notesync::checkpoint::CheckpointError;
use notesync::{invoke, Command, Config, NotesyncError, Response, Status};
use serde::Deserialize;
use tracing::{error, info};

struct ServerState {
    config: Config,
}

#[derive(Debug, Deserialize)]
struct ProcessParams {
    temp_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveParams {
    result_id: Option<String>,
    original_id: Option<String>,
}

type Reply = (StatusCode, Json<Response>);

pub fn router(config: Config) -> Router {
    let state = Arc::new(ServerState { config });
    Router::new()
        .route("/api/index", get(index))
        .route("/api/distill_text", get(distill_text))
        .route("/api/queue", get(queue))
        .route("/api/process_queued", get(process_queued))
        .route("/api/save_processed", get(save_processed))
        .route("/api/check_token", get(check_token))
        .with_state(state)
}

pub async fn serve(config: Config, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down");
}

fn reply(response: Response) -> Reply {
    let code = StatusCode::from_u16(response.status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(response))
}

/// Runs the invocation on the blocking pool; the HTTP clients it builds are blocking.
async fn run(state: Arc<ServerState>, command: Command) -> Reply {
    let config = state.config.clone();
    let response = match tokio::task::spawn_blocking(move || invoke(config, command)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Invocation task failed: {}", e);
            Response::new(500, Status::Error, format!("invocation task failed: {}", e))
        }
    };
    reply(response)
}

async fn index(State(state): State<Arc<ServerState>>) -> Reply {
    run(state, Command::Import).await
}

async fn distill_text(State(state): State<Arc<ServerState>>) -> Reply {
    run(state, Command::Distill).await
}

async fn queue(State(state): State<Arc<ServerState>>) -> Reply {
    run(state, Command::Queue).await
}

async fn process_queued(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ProcessParams>,
) -> Reply {
    run(
        state,
        Command::Process {
            temp_id: params.temp_id,
        },
    )
    .await
}

async fn save_processed(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SaveParams>,
) -> Reply {
    // Over HTTP both ids are required; the CLI lets original_id be looked up.
    if params
        .original_id
        .as_deref()
        .map_or(true, |id| id.trim().is_empty())
    {
        let error = NotesyncError::from(CheckpointError::MissingParameter("original_id"));
        return reply(Response::from_error(&error));
    }
    run(
        state,
        Command::Finalize {
            result_id: params.result_id,
            original_id: params.original_id,
        },
    )
    .await
}

async fn check_token(State(state): State<Arc<ServerState>>) -> Reply {
    run(state, Command::CheckToken).await
}
