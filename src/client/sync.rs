//! Client side of the position sync protocol

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::ws::protocol::{ClientMsg, ConnectionId, PlayerState, RawPosition, ServerMsg};

/// How long `disconnect` waits for the close handshake
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Transport failures inside the connection task
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Events republished to local observers
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The server assigned us an id; the join has been sent
    Connected { id: ConnectionId },
    /// Everyone else already in the session
    Roster(HashMap<ConnectionId, PlayerState>),
    PlayerJoined(PlayerState),
    PlayerMoved { id: ConnectionId, position: [f64; 3] },
    PlayerLeft { id: ConnectionId },
    /// The connection could not be established
    ConnectionError(String),
    /// The transport went away after connecting
    Disconnected(String),
}

/// An observer feed
pub type SyncEvents = mpsc::UnboundedReceiver<SyncEvent>;

/// Name and cosmetics announced on join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub name: String,
    pub color: String,
    pub car: String,
}

impl PlayerIdentity {
    pub fn new(name: impl Into<String>, color: impl Into<String>, car: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            car: car.into(),
        }
    }

    fn join_msg(&self) -> ClientMsg {
        ClientMsg::Join {
            name: Some(self.name.clone()),
            color: Some(self.color.clone()),
            car: Some(self.car.clone()),
        }
    }
}

/// Drops events that only echo our own actions back to us
#[derive(Debug, Clone, Default)]
pub struct EchoFilter {
    own_id: Option<ConnectionId>,
}

impl EchoFilter {
    pub fn set_own_id(&mut self, id: ConnectionId) {
        self.own_id = Some(id);
    }

    pub fn own_id(&self) -> Option<&ConnectionId> {
        self.own_id.as_ref()
    }

    /// Turn a server message into an observer event, or `None` to drop it
    pub fn admit(&self, msg: ServerMsg) -> Option<SyncEvent> {
        if let (Some(own), Some(subject)) = (&self.own_id, msg.subject()) {
            if own == subject {
                return None;
            }
        }

        match msg {
            ServerMsg::Welcome { .. } => None,
            ServerMsg::Roster { mut players } => {
                if let Some(own) = &self.own_id {
                    players.remove(own);
                }
                Some(SyncEvent::Roster(players))
            }
            ServerMsg::Joined { player } => Some(SyncEvent::PlayerJoined(player)),
            ServerMsg::Moved { id, position } => Some(SyncEvent::PlayerMoved { id, position }),
            ServerMsg::Left { id } => Some(SyncEvent::PlayerLeft { id }),
        }
    }
}

/// Registered observer feeds
#[derive(Default)]
struct ObserverSet {
    senders: Mutex<Vec<mpsc::UnboundedSender<SyncEvent>>>,
}

impl ObserverSet {
    fn subscribe(&self) -> SyncEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        rx
    }

    fn publish(&self, event: SyncEvent) {
        // Receivers that were dropped are forgotten
        self.senders
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn clear(&self) {
        self.senders.lock().clear();
    }
}

/// Exactly three finite coordinates, or `None`
pub fn validate_position(position: &[f64]) -> Option<[f64; 3]> {
    match position {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => Some([*x, *y, *z]),
        _ => None,
    }
}

/// Owns one websocket connection to the sync server for its lifetime.
///
/// Delivery is fire-and-forget: nothing is acknowledged or retried, and a
/// failed connection is reported once and never re-attempted.
pub struct NetworkSyncClient {
    identity: PlayerIdentity,
    own_id: Arc<RwLock<Option<ConnectionId>>>,
    observers: Arc<ObserverSet>,
    outbound_tx: Option<mpsc::UnboundedSender<ClientMsg>>,
    task: JoinHandle<()>,
}

impl NetworkSyncClient {
    /// Start connecting in the background. Returns the client together with
    /// its first observer feed so no early event is missed.
    pub fn connect(ws_url: impl Into<String>, identity: PlayerIdentity) -> (Self, SyncEvents) {
        let ws_url = ws_url.into();
        let observers = Arc::new(ObserverSet::default());
        let events = observers.subscribe();
        let own_id = Arc::new(RwLock::new(None));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_connection(
            ws_url,
            identity.clone(),
            own_id.clone(),
            observers.clone(),
            outbound_rx,
        ));

        let client = Self {
            identity,
            own_id,
            observers,
            outbound_tx: Some(outbound_tx),
            task,
        };

        (client, events)
    }

    /// Register another observer feed
    pub fn subscribe(&self) -> SyncEvents {
        self.observers.subscribe()
    }

    /// Id assigned by the server, once the welcome frame has arrived
    pub fn own_id(&self) -> Option<ConnectionId> {
        self.own_id.read().clone()
    }

    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    /// Report the local position. Invalid positions are dropped with a
    /// diagnostic and never sent. Returns whether the update was queued.
    pub fn send_movement(&self, position: &[f64]) -> bool {
        let Some(position) = validate_position(position) else {
            warn!(?position, "Invalid position, not sending");
            return false;
        };

        let Some(tx) = &self.outbound_tx else {
            return false;
        };

        if tx
            .send(ClientMsg::Move {
                position: RawPosition::from(position),
            })
            .is_err()
        {
            debug!("Connection task gone, movement dropped");
            return false;
        }
        true
    }

    /// Drop every observer, then close the transport
    pub async fn disconnect(mut self) {
        self.observers.clear();

        // Closing the outbound queue makes the task send a close frame
        drop(self.outbound_tx.take());

        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.task).await.is_err() {
            warn!("Close handshake timed out, aborting connection task");
            self.task.abort();
        }
    }
}

/// Connection task: owns the socket for the client's lifetime
async fn run_connection(
    ws_url: String,
    identity: PlayerIdentity,
    own_id: Arc<RwLock<Option<ConnectionId>>>,
    observers: Arc<ObserverSet>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientMsg>,
) {
    let stream = match connect_async(ws_url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let e = SyncError::from(e);
            error!(url = %ws_url, error = %e, "Failed to connect to server");
            observers.publish(SyncEvent::ConnectionError(e.to_string()));
            return;
        }
    };

    info!(url = %ws_url, "Connected to server");

    let (mut sink, mut source) = stream.split();
    let mut filter = EchoFilter::default();

    let reason = loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMsg>(&text) {
                    Ok(ServerMsg::Welcome { id }) => {
                        info!(connection_id = %id, "Assigned connection id");
                        filter.set_own_id(id.clone());
                        *own_id.write() = Some(id.clone());
                        observers.publish(SyncEvent::Connected { id });

                        if let Err(e) = send_client_msg(&mut sink, &identity.join_msg()).await {
                            break e.to_string();
                        }
                    }
                    Ok(msg) => {
                        if let Some(event) = filter.admit(msg) {
                            observers.publish(event);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to parse server message");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "server closed the connection".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "connection closed".to_string(),
            },
            outgoing = outbound_rx.recv() => match outgoing {
                Some(msg) => {
                    if let Err(e) = send_client_msg(&mut sink, &msg).await {
                        break e.to_string();
                    }
                }
                None => {
                    // Local disconnect: nobody is listening any more
                    let _ = sink.send(Message::Close(None)).await;
                    debug!("Client closed the connection");
                    return;
                }
            },
        }
    };

    warn!(reason = %reason, "Disconnected from server");
    observers.publish(SyncEvent::Disconnected(reason));
}

async fn send_client_msg(sink: &mut WsSink, msg: &ClientMsg) -> Result<(), SyncError> {
    let json = serde_json::to_string(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str) -> PlayerState {
        PlayerState {
            id: ConnectionId::from(id),
            name: id.to_uppercase(),
            position: [0.0, 2.0, 0.0],
            color: "red".to_string(),
            car: "default".to_string(),
        }
    }

    fn filter_for(id: &str) -> EchoFilter {
        let mut filter = EchoFilter::default();
        filter.set_own_id(ConnectionId::from(id));
        filter
    }

    #[test]
    fn roster_never_contains_self() {
        let filter = filter_for("me");
        let players: HashMap<_, _> = [player("me"), player("other")]
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let event = filter.admit(ServerMsg::Roster { players }).unwrap();
        let SyncEvent::Roster(players) = event else {
            panic!("expected roster");
        };
        assert_eq!(players.len(), 1);
        assert!(players.contains_key(&ConnectionId::from("other")));
    }

    #[test]
    fn own_events_are_suppressed() {
        let filter = filter_for("me");
        let me = ConnectionId::from("me");

        assert_eq!(filter.admit(ServerMsg::Joined { player: player("me") }), None);
        assert_eq!(
            filter.admit(ServerMsg::Moved {
                id: me.clone(),
                position: [1.0, 2.0, 3.0]
            }),
            None
        );
        assert_eq!(filter.admit(ServerMsg::Left { id: me }), None);
    }

    #[test]
    fn other_events_pass_unchanged() {
        let filter = filter_for("me");
        let other = ConnectionId::from("other");

        assert_eq!(
            filter.admit(ServerMsg::Moved {
                id: other.clone(),
                position: [1.0, 2.0, 3.0]
            }),
            Some(SyncEvent::PlayerMoved {
                id: other.clone(),
                position: [1.0, 2.0, 3.0]
            })
        );
        assert_eq!(
            filter.admit(ServerMsg::Joined {
                player: player("other")
            }),
            Some(SyncEvent::PlayerJoined(player("other")))
        );
        assert_eq!(
            filter.admit(ServerMsg::Left { id: other.clone() }),
            Some(SyncEvent::PlayerLeft { id: other })
        );
    }

    #[test]
    fn nothing_is_suppressed_before_welcome() {
        let filter = EchoFilter::default();
        assert!(filter
            .admit(ServerMsg::Left {
                id: ConnectionId::from("x")
            })
            .is_some());
    }

    #[test]
    fn position_validation() {
        assert_eq!(validate_position(&[1.0, 2.0, 3.0]), Some([1.0, 2.0, 3.0]));
        assert_eq!(validate_position(&[1.0, 2.0]), None);
        assert_eq!(validate_position(&[1.0, 2.0, 3.0, 4.0]), None);
        assert_eq!(validate_position(&[1.0, f64::NAN, 3.0]), None);
        assert_eq!(validate_position(&[f64::INFINITY, 0.0, 0.0]), None);
    }

    #[test]
    fn observers_receive_and_can_be_cleared() {
        let observers = ObserverSet::default();
        let mut first = observers.subscribe();
        let mut second = observers.subscribe();

        observers.publish(SyncEvent::Disconnected("bye".to_string()));
        assert_eq!(
            first.try_recv().unwrap(),
            SyncEvent::Disconnected("bye".to_string())
        );
        assert!(second.try_recv().is_ok());

        observers.clear();
        observers.publish(SyncEvent::Disconnected("again".to_string()));
        assert!(first.try_recv().is_err());
    }

    #[tokio::test]
    async fn unreachable_server_reports_connection_error() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (client, mut events) = NetworkSyncClient::connect(
            format!("ws://{}/ws", addr),
            PlayerIdentity::new("Nobody", "red", "default"),
        );

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SyncEvent::ConnectionError(_)));
        assert!(!client.send_movement(&[f64::NAN, 0.0, 0.0]));
        client.disconnect().await;
    }
}
