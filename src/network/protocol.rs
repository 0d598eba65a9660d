//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON object tagged by `"type"` (kebab-case) with
//! camelCase fields, e.g. `{"type":"attack","row":3,"col":4}`.

use serde::{Serialize, Deserialize};

use crate::game::board::{Orientation, Position, ShipPlacement};
use crate::game::events::{GameEvent, PlayerSummary};
use crate::game::fleet::{ShipKind, ShipLayout};
use crate::game::state::{ConnectionId, MatchId, MatchPhase};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Pair with any waiting stranger.
    JoinQuickMatch(JoinRequest),

    /// Open a private room and get a shareable code.
    CreateRoom(JoinRequest),

    /// Join a private room by code.
    JoinRoom(JoinRoomRequest),

    /// Stage (or move) a single ship during setup.
    PlaceShip(PlaceShipRequest),

    /// Submit the complete fleet.
    PlaceShips(PlaceShipsRequest),

    /// Fire at the opponent's grid.
    Attack(AttackRequest),

    /// Leave the current match but keep the connection.
    Leave,

    /// Ping for latency measurement.
    Ping {
        /// Client clock, echoed back in the pong.
        timestamp: u64,
    },
}

/// Quick-match or create-room request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Name shown to the opponent.
    pub player_name: String,
}

/// Join-room request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Name shown to the opponent.
    pub player_name: String,
    /// Code handed out by `room-created`.
    pub room_code: String,
}

/// Single-ship placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceShipRequest {
    /// Ship to place.
    pub ship_id: ShipKind,
    /// Origin row.
    pub row: i32,
    /// Origin column.
    pub col: i32,
    /// Direction from the origin.
    pub orientation: Orientation,
}

impl PlaceShipRequest {
    /// Convert to a board placement.
    pub fn to_placement(&self) -> ShipPlacement {
        ShipPlacement {
            kind: self.ship_id,
            row: self.row,
            col: self.col,
            orientation: self.orientation,
        }
    }
}

/// Full fleet submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceShipsRequest {
    /// All five ships.
    pub ships: Vec<WireShip>,
}

impl PlaceShipsRequest {
    /// Convert to layouts for validation.
    pub fn to_layouts(&self) -> Vec<ShipLayout> {
        self.ships.iter().map(WireShip::to_layout).collect()
    }
}

/// One ship as drawn by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireShip {
    /// Ship type.
    pub id: ShipKind,
    /// Declared size.
    pub size: usize,
    /// Occupied cells.
    pub positions: Vec<WirePosition>,
    /// Client-side hit flags; ignored by the server.
    #[serde(default)]
    pub hits: Vec<bool>,
}

impl WireShip {
    /// Convert to a layout. Hit flags are dropped.
    pub fn to_layout(&self) -> ShipLayout {
        ShipLayout {
            kind: self.id,
            size: self.size,
            cells: self.positions.iter().map(|p| (p.row, p.col)).collect(),
        }
    }
}

/// A grid coordinate on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePosition {
    /// Row.
    pub row: i32,
    /// Column.
    pub col: i32,
}

impl From<Position> for WirePosition {
    fn from(pos: Position) -> Self {
        Self { row: pos.row() as i32, col: pos.col() as i32 }
    }
}

/// Attack request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Target row.
    pub row: i32,
    /// Target column.
    pub col: i32,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Seated in quick-match, waiting for a second player.
    WaitingForOpponent,

    /// Private room created.
    RoomCreated(RoomCreatedInfo),

    /// No room has that code.
    RoomNotFound,

    /// Room already has two players.
    RoomFull,

    /// Both players seated; setup begins.
    GameStart(GameStartInfo),

    /// One ship staged on your board.
    ShipPlaced(ShipPlacedInfo),

    /// Your fleet was accepted.
    ShipsPlaced,

    /// Both fleets in; battle begins.
    BattleStart(BattleStartInfo),

    /// A shot was resolved.
    AttackResult(AttackResultInfo),

    /// Match over.
    GameOver(GameOverInfo),

    /// Opponent's connection went away.
    PlayerDisconnected(PlayerDisconnectedInfo),

    /// Pong response.
    Pong {
        /// Echo of the ping timestamp.
        timestamp: u64,
        /// Server clock in Unix milliseconds.
        #[serde(rename = "serverTime")]
        server_time: i64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Human-readable reason.
        reason: String,
    },
}

/// Player as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Connection id.
    pub id: ConnectionId,
    /// Display name.
    pub name: String,
}

impl From<&PlayerSummary> for PlayerInfo {
    fn from(summary: &PlayerSummary) -> Self {
        Self { id: summary.id, name: summary.name.clone() }
    }
}

/// Room created payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedInfo {
    /// Shareable code.
    pub room_code: String,
    /// Match the room belongs to.
    pub match_id: MatchId,
}

/// Game start payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartInfo {
    /// Match identifier.
    pub match_id: MatchId,
    /// Both players, in join order.
    pub players: Vec<PlayerInfo>,
    /// Always `setup`.
    pub phase: MatchPhase,
    /// Present for private rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
}

/// Ship staged payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipPlacedInfo {
    /// Ship that moved.
    pub ship_id: ShipKind,
    /// Cells it now covers.
    pub positions: Vec<WirePosition>,
}

/// Battle start payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleStartInfo {
    /// Who fires first.
    pub current_turn: ConnectionId,
    /// Both players.
    pub players: Vec<PlayerInfo>,
}

/// Attack result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackResultInfo {
    /// Target row.
    pub row: i32,
    /// Target column.
    pub col: i32,
    /// Struck a ship.
    pub is_hit: bool,
    /// Who fires next.
    pub current_turn: ConnectionId,
    /// Who fired.
    pub attacker_id: ConnectionId,
    /// Ship sunk by this shot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunk_ship: Option<ShipKind>,
}

/// Game over payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverInfo {
    /// Winning connection.
    pub winner: ConnectionId,
    /// Winner's display name.
    pub winner_name: String,
    /// Row of the final shot.
    pub row: i32,
    /// Column of the final shot.
    pub col: i32,
}

/// Disconnect payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDisconnectedInfo {
    /// Departed connection.
    pub player_id: ConnectionId,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame was not a valid client message.
    InvalidMessage,
}

// =============================================================================
// EVENT CONVERSION
// =============================================================================

fn players(summaries: &[PlayerSummary]) -> Vec<PlayerInfo> {
    summaries.iter().map(PlayerInfo::from).collect()
}

impl From<&GameEvent> for ServerMessage {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::WaitingForOpponent => ServerMessage::WaitingForOpponent,
            GameEvent::RoomCreated { room_code, match_id } => ServerMessage::RoomCreated(RoomCreatedInfo {
                room_code: room_code.clone(),
                match_id: *match_id,
            }),
            GameEvent::RoomNotFound => ServerMessage::RoomNotFound,
            GameEvent::RoomFull => ServerMessage::RoomFull,
            GameEvent::GameStart { match_id, players: summaries, phase, room_code } => {
                ServerMessage::GameStart(GameStartInfo {
                    match_id: *match_id,
                    players: players(summaries),
                    phase: *phase,
                    room_code: room_code.clone(),
                })
            }
            GameEvent::ShipPlaced { ship, cells } => ServerMessage::ShipPlaced(ShipPlacedInfo {
                ship_id: *ship,
                positions: cells.iter().copied().map(WirePosition::from).collect(),
            }),
            GameEvent::ShipsPlaced => ServerMessage::ShipsPlaced,
            GameEvent::BattleStart { current_turn, players: summaries } => {
                ServerMessage::BattleStart(BattleStartInfo {
                    current_turn: *current_turn,
                    players: players(summaries),
                })
            }
            GameEvent::AttackResult { target, is_hit, sunk, current_turn, attacker } => {
                ServerMessage::AttackResult(AttackResultInfo {
                    row: target.row() as i32,
                    col: target.col() as i32,
                    is_hit: *is_hit,
                    current_turn: *current_turn,
                    attacker_id: *attacker,
                    sunk_ship: *sunk,
                })
            }
            GameEvent::GameOver { winner, winner_name, target } => ServerMessage::GameOver(GameOverInfo {
                winner: *winner,
                winner_name: winner_name.clone(),
                row: target.row() as i32,
                col: target.col() as i32,
            }),
            GameEvent::PlayerDisconnected { player } => {
                ServerMessage::PlayerDisconnected(PlayerDisconnectedInfo { player_id: *player })
            }
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Deserialize from a binary frame carrying UTF-8 JSON.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const ALICE: ConnectionId = ConnectionId::from_u128(1);
    const BOB: ConnectionId = ConnectionId::from_u128(2);

    fn to_value(msg: &ServerMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_parse_lobby_commands() {
        let msg = ClientMessage::from_json(r#"{"type":"join-quick-match","playerName":"Alice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinQuickMatch(JoinRequest { ref player_name }) if player_name == "Alice"));

        let msg = ClientMessage::from_json(r#"{"type":"create-room","playerName":"Bob"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::CreateRoom(_)));

        let msg = ClientMessage::from_json(r#"{"type":"join-room","playerName":"Carl","roomCode":"AB12CD"}"#).unwrap();
        match msg {
            ClientMessage::JoinRoom(req) => assert_eq!(req.room_code, "AB12CD"),
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_parse_place_ships() {
        let raw = json!({
            "type": "place-ships",
            "ships": [
                {"id": "destroyer", "size": 2, "positions": [{"row": 0, "col": 0}, {"row": 0, "col": 1}], "hits": [true, false]}
            ]
        });
        let msg = ClientMessage::from_json(&raw.to_string()).unwrap();

        let ClientMessage::PlaceShips(req) = msg else {
            panic!("Wrong message type");
        };
        let layouts = req.to_layouts();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].kind, ShipKind::Destroyer);
        assert_eq!(layouts[0].cells, vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn test_hits_are_optional() {
        let raw = r#"{"type":"place-ships","ships":[{"id":"submarine","size":3,"positions":[]}]}"#;
        assert!(ClientMessage::from_json(raw).is_ok());
    }

    #[test]
    fn test_parse_place_ship_and_attack() {
        let msg = ClientMessage::from_json(
            r#"{"type":"place-ship","shipId":"carrier","row":1,"col":2,"orientation":"vertical"}"#,
        )
        .unwrap();
        let ClientMessage::PlaceShip(req) = msg else {
            panic!("Wrong message type");
        };
        let placement = req.to_placement();
        assert_eq!(placement.kind, ShipKind::Carrier);
        assert_eq!(placement.orientation, Orientation::Vertical);

        let msg = ClientMessage::from_json(r#"{"type":"attack","row":3,"col":-1}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Attack(AttackRequest { row: 3, col: -1 })));
    }

    #[test]
    fn test_unknown_ship_rejected() {
        let raw = r#"{"type":"place-ship","shipId":"rowboat","row":0,"col":0,"orientation":"horizontal"}"#;
        assert!(ClientMessage::from_json(raw).is_err());
    }

    #[test]
    fn test_binary_frame() {
        let msg = ClientMessage::from_slice(br#"{"type":"leave"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Leave));
    }

    #[test]
    fn test_attack_result_shape() {
        let event = GameEvent::AttackResult {
            target: Position::new(3, 4).unwrap(),
            is_hit: true,
            sunk: Some(ShipKind::Destroyer),
            current_turn: BOB,
            attacker: ALICE,
        };
        let value = to_value(&ServerMessage::from(&event));

        assert_eq!(value["type"], "attack-result");
        assert_eq!(value["row"], 3);
        assert_eq!(value["col"], 4);
        assert_eq!(value["isHit"], true);
        assert_eq!(value["attackerId"], ALICE.to_string());
        assert_eq!(value["currentTurn"], BOB.to_string());
        assert_eq!(value["sunkShip"], "destroyer");
    }

    #[test]
    fn test_game_start_shape() {
        let match_id = MatchId::from_random_bytes([3; 16]);
        let event = GameEvent::GameStart {
            match_id,
            players: vec![
                PlayerSummary { id: ALICE, name: "Alice".into() },
                PlayerSummary { id: BOB, name: "Bob".into() },
            ],
            phase: MatchPhase::Setup,
            room_code: None,
        };
        let value = to_value(&ServerMessage::from(&event));

        assert_eq!(value["type"], "game-start");
        assert_eq!(value["matchId"], match_id.to_string());
        assert_eq!(value["phase"], "setup");
        assert_eq!(value["players"][1]["name"], "Bob");
        assert!(value.get("roomCode").is_none());
    }

    #[test]
    fn test_unit_events() {
        assert_eq!(to_value(&ServerMessage::WaitingForOpponent), json!({"type": "waiting-for-opponent"}));
        assert_eq!(to_value(&ServerMessage::RoomNotFound), json!({"type": "room-not-found"}));
        assert_eq!(to_value(&ServerMessage::RoomFull), json!({"type": "room-full"}));
        assert_eq!(to_value(&ServerMessage::ShipsPlaced), json!({"type": "ships-placed"}));
    }

    #[test]
    fn test_game_over_and_disconnect_shape() {
        let over = GameEvent::GameOver {
            winner: ALICE,
            winner_name: "Alice".into(),
            target: Position::new(9, 0).unwrap(),
        };
        let value = to_value(&ServerMessage::from(&over));
        assert_eq!(value["type"], "game-over");
        assert_eq!(value["winnerName"], "Alice");

        let gone = GameEvent::PlayerDisconnected { player: BOB };
        let value = to_value(&ServerMessage::from(&gone));
        assert_eq!(value, json!({"type": "player-disconnected", "playerId": BOB.to_string()}));
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::Error(ServerError {
            code: ErrorCode::InvalidMessage,
            message: "Invalid message format".to_string(),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("invalid_message"));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }
}
