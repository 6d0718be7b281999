//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::room::valid_room_name;
use crate::game::ArenaRoom;
use crate::http::routes::AppError;
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::session::Session;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// WebSocket upgrade into the default room
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let room = state.config.default_room.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, room, state))
}

/// WebSocket upgrade into a named room
pub async fn ws_room_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if !valid_room_name(&room) {
        return Err(AppError::BadRequest(format!("invalid room name: {room}")));
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, room, state)))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, room_name: String, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let room = match state.rooms.join(&room_name) {
        Ok(room) => room,
        Err(e) => {
            error!(room = %room_name, error = %e, "Failed to join room");
            let _ = send_msg(&mut ws_sink, &ServerMsg::error("room_unavailable", e.to_string())).await;
            return;
        }
    };

    // Subscribe before the greeting so no tick falls between the two.
    let updates = room.subscribe();
    let session = Session::new(room.clone());
    let session_id = session.id();
    info!(
        session = %session_id,
        room = %room_name,
        connections = room.connections(),
        "New WebSocket connection"
    );

    run_session(session, &room, ws_sink, ws_stream, updates).await;

    state.rooms.leave(&room);
    info!(
        session = %session_id,
        room = %room_name,
        connections = room.connections(),
        "WebSocket connection closed"
    );
}

/// Pump client messages into the session and room updates out to the client
async fn run_session(
    mut session: Session,
    room: &ArenaRoom,
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut updates: broadcast::Receiver<ServerMsg>,
) {
    let session_id = session.id();

    let greeting = ServerMsg::Info {
        snapshot: room.snapshot(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &greeting).await {
        debug!(session = %session_id, error = %e, "Failed to send initial snapshot");
        return;
    }

    loop {
        tokio::select! {
            incoming = ws_stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMsg>(&text) {
                        Ok(msg) => {
                            if let Some(reply) = session.receive(msg) {
                                if let Err(e) = send_msg(&mut ws_sink, &reply).await {
                                    debug!(session = %session_id, error = %e, "WebSocket send failed");
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            warn!(session = %session_id, error = %e, "Failed to parse client message");
                        }
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!(session = %session_id, "Received binary message, ignoring");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    info!(session = %session_id, "Client initiated close");
                    break;
                }
                Some(Err(e)) => {
                    debug!(session = %session_id, error = %e, "WebSocket error");
                    break;
                }
            },
            update = updates.recv() => match update {
                Ok(msg) => {
                    session.on_broadcast(&msg);
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(session = %session_id, lagged_count = n, "Client lagged, skipped updates");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session = %session_id, "Update channel closed");
                    break;
                }
            },
        }
    }

    session.close();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
