//! End-to-end match flows through the public API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use broadside::game::events::GameEvent;
use broadside::game::fleet::{ShipKind, ShipLayout};
use broadside::network::protocol::ServerMessage;
use broadside::{ConnectionId, GameError, GameServer, MatchPhase, ServerConfig, SessionRegistry};

const ALICE: ConnectionId = ConnectionId::from_u128(0xA);
const BOB: ConnectionId = ConnectionId::from_u128(0xB);

/// Ships stacked in rows 0..5, flush left.
fn layouts() -> Vec<ShipLayout> {
    ShipKind::ALL
        .iter()
        .enumerate()
        .map(|(row, kind)| ShipLayout {
            kind: *kind,
            size: kind.size(),
            cells: (0..kind.size() as i32).map(|c| (row as i32, c)).collect(),
        })
        .collect()
}

fn occupied() -> Vec<(i32, i32)> {
    layouts().into_iter().flat_map(|l| l.cells).collect()
}

#[tokio::test]
async fn full_quick_match_to_game_over() {
    let registry = SessionRegistry::with_seed(2024);

    let alice = registry.quick_match(ALICE, "Alice").await.unwrap();
    let bob = registry.quick_match(BOB, "Bob").await.unwrap();
    assert_eq!(alice.match_id, bob.match_id);

    registry.submit_fleet(ALICE, &layouts()).await.unwrap();
    let out = registry.submit_fleet(BOB, &layouts()).await.unwrap();
    let first = match &out.last().unwrap().event {
        GameEvent::BattleStart { current_turn, .. } => *current_turn,
        other => panic!("expected battle-start, got {:?}", other),
    };
    let second = if first == ALICE { BOB } else { ALICE };

    let targets = occupied();
    let water: Vec<(i32, i32)> = (5..10).flat_map(|r| (0..10).map(move |c| (r, c))).collect();
    let mut last_event = None;

    for (i, &(row, col)) in targets.iter().enumerate() {
        let out = registry.attack(first, row, col).await.unwrap();
        last_event = Some(out[0].event.clone());
        if i + 1 == targets.len() {
            break;
        }
        assert!(matches!(out[0].event, GameEvent::AttackResult { is_hit: true, .. }));

        let (wr, wc) = water[i];
        registry.attack(second, wr, wc).await.unwrap();
    }

    match last_event {
        Some(GameEvent::GameOver { winner, .. }) => assert_eq!(winner, first),
        other => panic!("expected game-over, got {:?}", other),
    }

    let snapshot = registry.snapshot(alice.match_id).await.unwrap();
    assert_eq!(snapshot.phase(), MatchPhase::Finished);
    assert_eq!(snapshot.winner(), Some(first));
    assert_eq!(registry.attack(second, 9, 9).await.unwrap_err(), GameError::WrongPhase);
}

#[tokio::test]
async fn sinking_a_ship_is_reported() {
    let registry = SessionRegistry::with_seed(5);
    registry.quick_match(ALICE, "Alice").await.unwrap();
    registry.quick_match(BOB, "Bob").await.unwrap();
    registry.submit_fleet(ALICE, &layouts()).await.unwrap();
    let out = registry.submit_fleet(BOB, &layouts()).await.unwrap();
    let first = match &out.last().unwrap().event {
        GameEvent::BattleStart { current_turn, .. } => *current_turn,
        other => panic!("expected battle-start, got {:?}", other),
    };
    let second = if first == ALICE { BOB } else { ALICE };

    // Destroyer sits on row 4
    registry.attack(first, 4, 0).await.unwrap();
    registry.attack(second, 9, 9).await.unwrap();
    let out = registry.attack(first, 4, 1).await.unwrap();

    assert!(matches!(
        out[0].event,
        GameEvent::AttackResult { is_hit: true, sunk: Some(ShipKind::Destroyer), .. }
    ));
}

// =============================================================================
// WEBSOCKET
// =============================================================================

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (Arc<GameServer>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(GameServer::new(ServerConfig {
        bind_addr: addr,
        rng_seed: Some(11),
        ..Default::default()
    }));

    let serving = Arc::clone(&server);
    tokio::spawn(async move { serving.serve(listener).await });

    (server, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    ws
}

async fn send(ws: &mut Client, json: &str) {
    ws.send(Message::Text(json.to_string())).await.unwrap();
}

async fn recv(ws: &mut Client) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return ServerMessage::from_json(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn websocket_room_session() {
    let (server, addr) = start_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    let mut carl = connect(addr).await;

    send(&mut alice, r#"{"type":"create-room","playerName":"Alice"}"#).await;
    let code = match recv(&mut alice).await {
        ServerMessage::RoomCreated(info) => info.room_code,
        other => panic!("expected room-created, got {:?}", other),
    };

    send(&mut bob, &format!(r#"{{"type":"join-room","playerName":"Bob","roomCode":"{}"}}"#, code)).await;
    for ws in [&mut alice, &mut bob] {
        match recv(ws).await {
            ServerMessage::GameStart(info) => {
                assert_eq!(info.players.len(), 2);
                assert_eq!(info.room_code.as_deref(), Some(code.as_str()));
            }
            other => panic!("expected game-start, got {:?}", other),
        }
    }

    send(&mut carl, &format!(r#"{{"type":"join-room","playerName":"Carl","roomCode":"{}"}}"#, code)).await;
    assert_eq!(recv(&mut carl).await, ServerMessage::RoomFull);

    send(&mut carl, "not json").await;
    assert!(matches!(recv(&mut carl).await, ServerMessage::Error(_)));

    send(&mut alice, r#"{"type":"ping","timestamp":77}"#).await;
    assert!(matches!(recv(&mut alice).await, ServerMessage::Pong { timestamp: 77, .. }));

    bob.close(None).await.unwrap();
    assert!(matches!(recv(&mut alice).await, ServerMessage::PlayerDisconnected(_)));
    assert_eq!(server.match_count().await, 1);

    server.shutdown();
    assert!(matches!(recv(&mut alice).await, ServerMessage::Shutdown { .. }));
}

#[tokio::test]
async fn websocket_out_of_range_fleet_keeps_connection_alive() {
    let (server, addr) = start_server().await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    send(&mut alice, r#"{"type":"join-quick-match","playerName":"Alice"}"#).await;
    assert_eq!(recv(&mut alice).await, ServerMessage::WaitingForOpponent);

    send(&mut bob, r#"{"type":"join-quick-match","playerName":"Bob"}"#).await;
    for ws in [&mut alice, &mut bob] {
        assert!(matches!(recv(ws).await, ServerMessage::GameStart(_)));
    }

    send(
        &mut bob,
        r#"{"type":"place-ships","ships":[{"id":"destroyer","size":2,"positions":[{"row":0,"col":2147483647},{"row":0,"col":2147483647}]}]}"#,
    )
    .await;

    // Bob's task must survive the rejected fleet to answer this
    send(&mut bob, r#"{"type":"ping","timestamp":5}"#).await;
    assert!(matches!(recv(&mut bob).await, ServerMessage::Pong { timestamp: 5, .. }));

    bob.close(None).await.unwrap();
    assert!(matches!(recv(&mut alice).await, ServerMessage::PlayerDisconnected(_)));
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(server.match_count().await, 1);
}
