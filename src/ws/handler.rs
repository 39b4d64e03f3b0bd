//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::session::{Broadcast, Connection, ConnectionController, Livery};
use crate::util::rate_limit::InboundThrottle;
use crate::ws::protocol::{ClientMsg, ConnectionId, ServerMsg};

/// Messages addressed to this connection only (welcome, roster)
const DIRECT_CAPACITY: usize = 16;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let controller = state.controller.clone();
    let mut connection = controller.open();
    let connection_id = connection.id.clone();

    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    // Subscribe before anything can be broadcast on our behalf
    let broadcast_rx = controller.subscribe();
    let (direct_tx, direct_rx) = mpsc::channel::<ServerMsg>(DIRECT_CAPACITY);

    if direct_tx
        .send(ServerMsg::Welcome {
            id: connection_id.clone(),
        })
        .await
        .is_err()
    {
        error!(connection_id = %connection_id, "Failed to queue welcome");
        return;
    }

    let writer_handle = tokio::spawn(run_writer(
        connection_id.clone(),
        ws_sink,
        direct_rx,
        broadcast_rx,
    ));

    run_reader(&controller, &mut connection, ws_stream, &direct_tx).await;

    // Cleanup on disconnect
    controller.handle_close(&mut connection);
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> controller
async fn run_reader(
    controller: &ConnectionController,
    connection: &mut Connection,
    mut ws_stream: SplitStream<WebSocket>,
    direct_tx: &mpsc::Sender<ServerMsg>,
) {
    let throttle = InboundThrottle::new();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(connection_id = %connection.id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                if !throttle.admit(&msg) {
                    warn!(connection_id = %connection.id, "Rate limited move");
                    continue;
                }

                match msg {
                    ClientMsg::Join { name, color, car } => {
                        let livery = Livery::from_parts(color, car);
                        if let Some(roster) =
                            controller.handle_join(connection, name.as_deref(), livery)
                        {
                            if direct_tx.send(roster).await.is_err() {
                                debug!(connection_id = %connection.id, "Writer gone");
                                break;
                            }
                        }
                    }
                    ClientMsg::Move { position } => {
                        controller.handle_move(connection, &position);
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection.id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(connection_id = %connection.id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(connection_id = %connection.id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection.id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection.id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer task: direct messages and broadcasts from others -> WebSocket
async fn run_writer(
    connection_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut direct_rx: mpsc::Receiver<ServerMsg>,
    mut broadcast_rx: broadcast::Receiver<Broadcast>,
) {
    loop {
        let msg = tokio::select! {
            biased;

            direct = direct_rx.recv() => match direct {
                Some(msg) => msg,
                None => break,
            },
            fanned = broadcast_rx.recv() => match fanned {
                Ok(b) if b.is_for(&connection_id) => b.msg,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        connection_id = %connection_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Positions are superseded by later ones, keep going
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(connection_id = %connection_id, "Broadcast channel closed");
                    break;
                }
            },
        };

        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
