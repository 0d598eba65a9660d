//! WebSocket Game Server
//!
//! Accepts WebSocket connections, decodes client commands, routes them
//! through the [`SessionRegistry`] and hands the resulting events to the
//! [`BroadcastGateway`].

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::game::error::GameError;
use crate::game::events::{GameEvent, Outbound};
use crate::game::state::ConnectionId;
use crate::network::gateway::BroadcastGateway;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
use crate::network::session::SessionRegistry;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Per-connection outbound channel capacity.
    pub outbound_buffer: usize,
    /// Fixed registry seed; random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            outbound_buffer: 64,
            rng_seed: None,
        }
    }
}

impl ServerConfig {
    /// Read overrides from `BROADSIDE_*` environment variables.
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GameServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BROADSIDE_BIND_ADDR") {
            config.bind_addr = parse_var("BROADSIDE_BIND_ADDR", &addr)?;
        }
        if let Some(max) = lookup("BROADSIDE_MAX_CONNECTIONS") {
            config.max_connections = parse_var("BROADSIDE_MAX_CONNECTIONS", &max)?;
        }
        if let Some(buffer) = lookup("BROADSIDE_OUTBOUND_BUFFER") {
            let buffer: usize = parse_var("BROADSIDE_OUTBOUND_BUFFER", &buffer)?;
            if buffer == 0 {
                return Err(GameServerError::InvalidConfig {
                    key: "BROADSIDE_OUTBOUND_BUFFER",
                    value: "0".to_string(),
                });
            }
            config.outbound_buffer = buffer;
        }
        if let Some(seed) = lookup("BROADSIDE_RNG_SEED") {
            config.rng_seed = Some(parse_var("BROADSIDE_RNG_SEED", &seed)?);
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, GameServerError> {
    value.trim().parse().map_err(|_| GameServerError::InvalidConfig {
        key,
        value: value.to_string(),
    })
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,

    /// Environment variable could not be parsed.
    #[error("Invalid value {value:?} for {key}")]
    InvalidConfig {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Live matches.
    registry: Arc<SessionRegistry>,
    /// Outbound channels.
    gateway: Arc<BroadcastGateway>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = match config.rng_seed {
            Some(seed) => SessionRegistry::with_seed(seed),
            None => SessionRegistry::new(),
        };

        Self {
            config,
            registry: Arc::new(registry),
            gateway: Arc::new(BroadcastGateway::new()),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if let Err(e) = self.admit().await {
                                warn!("{}, rejecting {}", e, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn admit(&self) -> Result<(), GameServerError> {
        if self.gateway.connection_count().await >= self.config.max_connections {
            Err(GameServerError::ConnectionLimitReached)
        } else {
            Ok(())
        }
    }

    /// Spawn the task that owns one WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let registry = Arc::clone(&self.registry);
        let gateway = Arc::clone(&self.gateway);
        let buffer = self.config.outbound_buffer;
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, addr, registry, gateway, buffer, shutdown_rx).await {
                error!("Connection {} failed: {}", addr, e);
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.gateway.connection_count().await
    }

    /// Get live match count.
    pub async fn match_count(&self) -> usize {
        self.registry.match_count().await
    }

    /// Shared registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    gateway: Arc<BroadcastGateway>,
    buffer: usize,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), GameServerError> {
    let ws_stream = accept_async(stream).await?;
    let connection = ConnectionId::new_v4();
    debug!(%connection, "WebSocket established for {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);
    gateway.register(connection, msg_tx).await;

    let writer = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                let parsed = match msg {
                    Some(Ok(Message::Text(text))) => ClientMessage::from_json(&text),
                    Some(Ok(Message::Binary(data))) => ClientMessage::from_slice(&data),
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", addr, e);
                        break;
                    }
                    Some(Ok(_)) => continue,
                };

                match parsed {
                    Ok(command) => handle_message(&registry, &gateway, connection, command).await,
                    Err(e) => {
                        debug!("Invalid message from {}: {}", addr, e);
                        gateway.send_to(connection, ServerMessage::Error(ServerError {
                            code: ErrorCode::InvalidMessage,
                            message: "Invalid message format".to_string(),
                        })).await;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                gateway.send_to(connection, ServerMessage::Shutdown {
                    reason: "Server shutting down".to_string(),
                }).await;
                break;
            }
        }
    }

    let outbound = registry.disconnect(connection).await;
    gateway.unregister(connection).await;
    gateway.deliver(outbound).await;

    // Unregistering dropped the last sender; the writer drains and exits
    let _ = writer.await;
    info!("Client {} cleaned up", addr);

    Ok(())
}

async fn handle_message(
    registry: &SessionRegistry,
    gateway: &BroadcastGateway,
    connection: ConnectionId,
    command: ClientMessage,
) {
    if let ClientMessage::Ping { timestamp } = command {
        gateway.send_to(connection, ServerMessage::Pong {
            timestamp,
            server_time: chrono::Utc::now().timestamp_millis(),
        }).await;
        return;
    }

    let outbound = dispatch(registry, connection, command).await;
    gateway.deliver(outbound).await;
}

/// Run one client command against the registry.
///
/// Lobby rejections become targeted events. Every other rejection is
/// logged and has no visible effect.
pub async fn dispatch(
    registry: &SessionRegistry,
    connection: ConnectionId,
    command: ClientMessage,
) -> Vec<Outbound> {
    let result = match command {
        ClientMessage::JoinQuickMatch(req) => registry
            .quick_match(connection, &req.player_name)
            .await
            .map(|joined| joined.outbound),
        ClientMessage::CreateRoom(req) => registry
            .create_room(connection, &req.player_name)
            .await
            .map(|joined| joined.outbound),
        ClientMessage::JoinRoom(req) => registry
            .join_room(connection, &req.player_name, &req.room_code)
            .await
            .map(|joined| joined.outbound),
        ClientMessage::PlaceShip(req) => registry.place_ship(connection, &req.to_placement()).await,
        ClientMessage::PlaceShips(req) => registry.submit_fleet(connection, &req.to_layouts()).await,
        ClientMessage::Attack(req) => registry.attack(connection, req.row, req.col).await,
        ClientMessage::Leave => Ok(registry.leave(connection).await),
        ClientMessage::Ping { .. } => Ok(Vec::new()),
    };

    match result {
        Ok(outbound) => outbound,
        Err(e) => match rejection_event(&e) {
            Some(event) => vec![Outbound::to(connection, event)],
            None => {
                debug!(%connection, error = %e, "Command rejected");
                Vec::new()
            }
        },
    }
}

fn rejection_event(error: &GameError) -> Option<GameEvent> {
    match error {
        GameError::RoomNotFound => Some(GameEvent::RoomNotFound),
        GameError::RoomFull => Some(GameEvent::RoomFull),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::{AttackRequest, JoinRequest, JoinRoomRequest};

    const ALICE: ConnectionId = ConnectionId::from_u128(1);
    const BOB: ConnectionId = ConnectionId::from_u128(2);

    fn join(name: &str) -> JoinRequest {
        JoinRequest { player_name: name.to_string() }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.outbound_buffer, 64);
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = ServerConfig::from_lookup(|key| match key {
            "BROADSIDE_BIND_ADDR" => Some("127.0.0.1:9000".to_string()),
            "BROADSIDE_RNG_SEED" => Some(" 42 ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.max_connections, 1000);
    }

    #[test]
    fn test_config_rejects_garbage() {
        let err = ServerConfig::from_lookup(|key| {
            (key == "BROADSIDE_MAX_CONNECTIONS").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, GameServerError::InvalidConfig { key: "BROADSIDE_MAX_CONNECTIONS", .. }));

        let err = ServerConfig::from_lookup(|key| {
            (key == "BROADSIDE_OUTBOUND_BUFFER").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, GameServerError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            rng_seed: Some(1),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.match_count().await, 0);
        assert_eq!(server.registry().seed(), 1);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = GameServer::new(ServerConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        // serve subscribes on its first poll
        let serve = server.serve(listener);
        tokio::pin!(serve);
        tokio::select! {
            _ = &mut serve => panic!("serve returned without a signal"),
            _ = tokio::task::yield_now() => {}
        }
        server.shutdown();
        assert!(serve.await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_room_rejections() {
        let registry = SessionRegistry::with_seed(3);

        let out = dispatch(
            &registry,
            ALICE,
            ClientMessage::JoinRoom(JoinRoomRequest {
                player_name: "Alice".to_string(),
                room_code: "ZZZZZZ".to_string(),
            }),
        )
        .await;
        assert_eq!(out, vec![Outbound::to(ALICE, GameEvent::RoomNotFound)]);
    }

    #[tokio::test]
    async fn test_dispatch_silent_rejections() {
        let registry = SessionRegistry::with_seed(3);

        // No match yet
        let out = dispatch(&registry, ALICE, ClientMessage::Attack(AttackRequest { row: 0, col: 0 })).await;
        assert!(out.is_empty());

        dispatch(&registry, ALICE, ClientMessage::JoinQuickMatch(join("Alice"))).await;
        let out = dispatch(&registry, ALICE, ClientMessage::JoinQuickMatch(join("Alice"))).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_pairs_players() {
        let registry = SessionRegistry::with_seed(3);

        let out = dispatch(&registry, ALICE, ClientMessage::JoinQuickMatch(join("Alice"))).await;
        assert_eq!(out, vec![Outbound::to(ALICE, GameEvent::WaitingForOpponent)]);

        let out = dispatch(&registry, BOB, ClientMessage::JoinQuickMatch(join("Bob"))).await;
        assert!(out[0].reaches(ALICE) && out[0].reaches(BOB));

        let out = dispatch(&registry, BOB, ClientMessage::Leave).await;
        assert_eq!(out, vec![Outbound::to(ALICE, GameEvent::PlayerDisconnected { player: BOB })]);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_extreme_fleet_coordinates() {
        let registry = SessionRegistry::with_seed(3);
        dispatch(&registry, ALICE, ClientMessage::JoinQuickMatch(join("Alice"))).await;
        dispatch(&registry, BOB, ClientMessage::JoinQuickMatch(join("Bob"))).await;

        let fleet = ClientMessage::from_json(
            r#"{"type":"place-ships","ships":[{"id":"destroyer","size":2,"positions":[{"row":0,"col":2147483647},{"row":0,"col":2147483647}]}]}"#,
        )
        .unwrap();
        assert!(dispatch(&registry, BOB, fleet).await.is_empty());

        let single = ClientMessage::from_json(
            r#"{"type":"place-ship","shipId":"carrier","row":0,"col":2147483647,"orientation":"horizontal"}"#,
        )
        .unwrap();
        assert!(dispatch(&registry, BOB, single).await.is_empty());

        // Cleanup still runs for the rejected sender
        let out = registry.disconnect(BOB).await;
        assert_eq!(out, vec![Outbound::to(ALICE, GameEvent::PlayerDisconnected { player: BOB })]);
    }
}
