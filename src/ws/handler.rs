//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::arena::ParticipantInput;
use crate::util::rate_limit::ParticipantRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session to attach to
    pub session: Uuid,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Reject unknown sessions before upgrading
    if state.registry.get(&query.session).is_none() {
        warn!(session_id = %query.session, "WebSocket upgrade for unknown session");
        return Response::builder()
            .status(404)
            .body("Unknown session".into())
            .unwrap();
    }

    info!(session_id = %query.session, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, query.session, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, session_id: Uuid, state: AppState) {
    let participant_id = Uuid::new_v4();
    info!(participant_id = %participant_id, session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        participant_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(participant_id = %participant_id, error = %e, "Failed to send welcome");
        return;
    }

    // Attach to the session to get channels. The match may have finished
    // between the upgrade check and now.
    let (input_tx, sync_rx) = match state.sessions.register_participant(participant_id, session_id)
    {
        Ok(channels) => channels,
        Err(e) => {
            warn!(participant_id = %participant_id, error = %e, "Session gone before attach");
            let _ = send_msg(
                &mut ws_sink,
                &ServerMsg::Error {
                    code: "unknown_session".to_string(),
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    // Run the session with split read/write
    run_session(participant_id, ws_sink, ws_stream, input_tx, sync_rx).await;

    // Cleanup on disconnect
    state.sessions.unregister_participant(&participant_id);

    info!(participant_id = %participant_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    participant_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<ParticipantInput>,
    mut sync_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ParticipantRateLimiter::new();

    // Spawn writer task: broadcast phase syncs -> WebSocket
    let writer_participant_id = participant_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match sync_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(participant_id = %writer_participant_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        participant_id = %writer_participant_id,
                        lagged_count = n,
                        "Client lagged, skipping {} syncs", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(participant_id = %writer_participant_id, "Sync channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> match loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(participant_id = %participant_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        let input = ParticipantInput {
                            participant_id,
                            msg: client_msg,
                            received_at: unix_millis(),
                        };

                        if input_tx.send(input).await.is_err() {
                            debug!(participant_id = %participant_id, "Input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(participant_id = %participant_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(participant_id = %participant_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(participant_id = %participant_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(participant_id = %participant_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(participant_id = %participant_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(participant_id = %participant_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Signal disconnect to match loop
    let _ = input_tx
        .send(ParticipantInput {
            participant_id,
            msg: ClientMsg::LeaveMatch,
            received_at: unix_millis(),
        })
        .await;

    // Abort writer task
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
