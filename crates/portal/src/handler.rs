//! HTTP handlers: room creation, existence checks, and the WebSocket
//! upgrade.
//!
//! The upgrade handler validates the requested room *before* accepting the
//! handshake. A refused room therefore never opens, which is how clients
//! tell "no such room" apart from a dropped connection.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portal_protocol::{CreateRoomResponse, RoomCode, RoomExistsResponse};
use portal_session::{ClientSession, SessionError};
use portal_transport::WebSocketConnection;
use serde::Deserialize;

use crate::server::ServerState;

/// `?room=NNNNNN`
#[derive(Debug, Deserialize)]
pub(crate) struct RoomQuery {
    room: Option<String>,
}

/// `GET|POST /create`
pub(crate) async fn create_room(State(state): State<Arc<ServerState>>) -> Response {
    let created = state.rooms.lock().await.create_room();
    match created {
        Ok(code) => Json(CreateRoomResponse {
            room_id: Some(code),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "room creation failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// `GET /exists?room=NNNNNN`
///
/// A malformed code simply doesn't exist; only a missing parameter is a
/// bad request.
pub(crate) async fn room_exists(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RoomQuery>,
) -> Response {
    let Some(raw) = query.room else {
        return (StatusCode::BAD_REQUEST, "missing room parameter").into_response();
    };
    let exists = match RoomCode::parse(&raw) {
        Ok(code) => state.rooms.lock().await.contains(code),
        Err(_) => false,
    };
    Json(RoomExistsResponse { exists }).into_response()
}

/// `GET /ws?room=NNNNNN`
pub(crate) async fn join_room(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RoomQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let mut session = ClientSession::new(query.room);
    let validated = {
        let rooms = state.rooms.lock().await;
        session.validate(&rooms)
    };
    if let Err(e) = validated {
        tracing::info!(session = %session.id(), error = %e, "join refused");
        return refusal(&e).into_response();
    }

    ws.on_upgrade(move |socket| async move {
        let session_id = session.id();
        let conn = WebSocketConnection::new(socket);
        if let Err(e) = session.run(conn).await {
            tracing::debug!(session = %session_id, error = %e, "session ended with error");
        }
    })
}

fn refusal(err: &SessionError) -> (StatusCode, String) {
    let status = match err {
        SessionError::MalformedIdentifier(_) => StatusCode::BAD_REQUEST,
        SessionError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
