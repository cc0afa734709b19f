//! HTTP and WebSocket gateway.
//!
//! Routes:
//!
//! - `GET /ws`: WebSocket upgrade. Each text frame is one JSON command.
//! - `GET /health`: liveness plus room and connection counts.
//! - `GET /api/rooms/{room}`: room snapshot with word frequencies.
//! - `GET /api/topic`: a random topic suggestion.
//! - anything else: static files, when a static directory is configured.
//!
//! Each WebSocket connection runs a reader and a writer task. The reader
//! decodes frames, screens `add-word` text, and forwards commands to the event
//! loop in receipt order. The writer drains the connection's outbound queue
//! onto the socket. When either side ends, the other is stopped and the
//! disconnect is reported after the last forwarded command.

use std::{path::Path, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path as UrlPath, State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use wordpulse_core::{SessionId, WordCount, env::Environment, word_counts};
use wordpulse_proto::ClientCommand;

use crate::{
    event_loop::{LoopHandle, RoomView},
    moderation::{CheckOutcome, ProfanityCheck},
    system_env::SystemEnv,
    topic::{TopicError, TopicSource},
};

/// Shared state passed to handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event loop sender
    pub events: LoopHandle,
    /// Session ID source
    pub env: SystemEnv,
    /// Screening for submitted words
    pub profanity: Arc<dyn ProfanityCheck>,
    /// Topic suggestions
    pub topics: Arc<dyn TopicSource>,
    /// Per-connection outbound queue capacity
    pub send_queue: usize,
}

/// Build the router with all routes.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/rooms/{room}", get(room_handler))
        .route("/api/topic", get(topic_handler))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection until either side ends.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = state.env.random_u64();
    let (outbound, mut queue) = mpsc::channel::<Arc<str>>(state.send_queue);

    // A refused ID may belong to a live connection, so no disconnect follows
    if let Err(e) = state.events.connect(session_id, outbound).await {
        tracing::warn!(session_id, "websocket not registered: {}", e);
        return;
    }
    tracing::info!(session_id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = queue.recv().await {
            if ws_tx.send(Message::Text(Utf8Bytes::from(payload.to_string()))).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader_state = state.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::warn!(session_id, "non-UTF-8 binary frame dropped");
                        continue;
                    },
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(session_id, "websocket read error: {}", e);
                    break;
                },
            };

            if !reader_state.handle_frame(session_id, &text).await {
                break;
            }
        }
    });

    let reason = tokio::select! {
        _ = &mut writer => {
            reader.abort();
            "outbound closed"
        },
        _ = &mut reader => {
            writer.abort();
            "client disconnect"
        },
    };

    tracing::info!(session_id, reason, "websocket disconnected");
    let _ = state.events.disconnect(session_id, reason).await;
}

impl AppState {
    /// Decode, screen and forward one frame. Returns false once the event
    /// loop is gone.
    async fn handle_frame(&self, session_id: SessionId, text: &str) -> bool {
        let command = match ClientCommand::decode(text) {
            Ok(command) => command,
            Err(e) if e.is_unknown_type() => {
                tracing::warn!(session_id, "unknown message type ignored: {}", e);
                return true;
            },
            Err(e) => {
                tracing::warn!(session_id, "malformed command dropped: {}", e);
                return true;
            },
        };

        if let ClientCommand::AddWord { room, words } = &command {
            match self.profanity.check(words).await {
                CheckOutcome::Profane => {
                    tracing::info!(session_id, room = %room, "profanity detected, words dropped");
                    return true;
                },
                CheckOutcome::ServiceError(e) => {
                    tracing::warn!(session_id, "profanity check failed, accepting words: {}", e);
                },
                CheckOutcome::TimedOut => {
                    tracing::warn!(session_id, "profanity check timed out, accepting words");
                },
                CheckOutcome::Clean => {},
            }
        }

        self.events.command(session_id, command).await.is_ok()
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    rooms: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.events.stats().await {
        Ok(stats) => Json(HealthBody {
            status: "healthy",
            rooms: stats.rooms,
            connections: stats.connections,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}

#[derive(Serialize)]
struct RoomBody {
    room: String,
    name: String,
    participants: usize,
    words: Vec<String>,
    counts: Vec<WordCount>,
    age_secs: u64,
}

async fn room_handler(State(state): State<AppState>, UrlPath(room): UrlPath<String>) -> Response {
    match state.events.inspect(room).await {
        Ok(Some(RoomView { snapshot, age })) => {
            let counts = word_counts(&snapshot.words);
            Json(RoomBody {
                room: snapshot.room,
                name: snapshot.name,
                participants: snapshot.participants,
                words: snapshot.words,
                counts,
                age_secs: age.as_secs(),
            })
            .into_response()
        },
        Ok(None) => error_response(StatusCode::NOT_FOUND, "room not found"),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}

#[derive(Serialize)]
struct TopicBody {
    title: String,
    summary: String,
    prompt: String,
}

async fn topic_handler(State(state): State<AppState>) -> Response {
    match state.topics.suggest().await {
        Ok(topic) => {
            let prompt = topic.prompt();
            Json(TopicBody { title: topic.title, summary: topic.summary, prompt }).into_response()
        },
        Err(e) => {
            tracing::warn!("topic suggestion failed: {}", e);
            let status = match e {
                TopicError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                TopicError::Service(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, &e.to_string())
        },
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
