//! Game Events
//!
//! Match operations return events as data instead of sending them.
//! Each [`Outbound`] names its recipients; the transport decides delivery.

use crate::game::board::Position;
use crate::game::fleet::ShipKind;
use crate::game::state::{ConnectionId, MatchId, MatchPhase};

/// Public view of a seated player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSummary {
    /// Connection that owns the slot.
    pub id: ConnectionId,
    /// Display name chosen at join.
    pub name: String,
}

/// Something that happened in a match (or to a lobby request).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// First quick-match player is seated and waiting.
    WaitingForOpponent,

    /// Private room created for the caller.
    RoomCreated {
        /// Shareable code.
        room_code: String,
        /// Match behind the room.
        match_id: MatchId,
    },

    /// Join-room with an unknown code.
    RoomNotFound,

    /// Join-room on a room that already has two players.
    RoomFull,

    /// Second player seated; setup begins.
    GameStart {
        /// Match identifier.
        match_id: MatchId,
        /// Both players, in join order.
        players: Vec<PlayerSummary>,
        /// Phase after the join (always `Setup`).
        phase: MatchPhase,
        /// Set for private rooms.
        room_code: Option<String>,
    },

    /// A single ship was staged on the caller's board.
    ShipPlaced {
        /// Ship that moved.
        ship: ShipKind,
        /// Cells it now covers.
        cells: Vec<Position>,
    },

    /// Caller's full fleet was accepted.
    ShipsPlaced,

    /// Both fleets are in; firing begins.
    BattleStart {
        /// Who fires first.
        current_turn: ConnectionId,
        /// Both players.
        players: Vec<PlayerSummary>,
    },

    /// A non-winning shot was resolved.
    AttackResult {
        /// Cell fired upon.
        target: Position,
        /// Struck a ship.
        is_hit: bool,
        /// Ship this shot sank.
        sunk: Option<ShipKind>,
        /// Who fires next.
        current_turn: ConnectionId,
        /// Who fired.
        attacker: ConnectionId,
    },

    /// The last ship went down.
    GameOver {
        /// Winning connection.
        winner: ConnectionId,
        /// Winner's display name.
        winner_name: String,
        /// Cell of the final shot.
        target: Position,
    },

    /// The opponent's connection went away.
    PlayerDisconnected {
        /// Departed connection.
        player: ConnectionId,
    },
}

impl GameEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::WaitingForOpponent => "waiting-for-opponent",
            GameEvent::RoomCreated { .. } => "room-created",
            GameEvent::RoomNotFound => "room-not-found",
            GameEvent::RoomFull => "room-full",
            GameEvent::GameStart { .. } => "game-start",
            GameEvent::ShipPlaced { .. } => "ship-placed",
            GameEvent::ShipsPlaced => "ships-placed",
            GameEvent::BattleStart { .. } => "battle-start",
            GameEvent::AttackResult { .. } => "attack-result",
            GameEvent::GameOver { .. } => "game-over",
            GameEvent::PlayerDisconnected { .. } => "player-disconnected",
        }
    }
}

/// An event and the connections that should receive it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    /// Target connections.
    pub recipients: Vec<ConnectionId>,
    /// Payload.
    pub event: GameEvent,
}

impl Outbound {
    /// Event for a single connection.
    pub fn to(connection: ConnectionId, event: GameEvent) -> Self {
        Self { recipients: vec![connection], event }
    }

    /// Event for several connections.
    pub fn to_all(recipients: Vec<ConnectionId>, event: GameEvent) -> Self {
        Self { recipients, event }
    }

    /// Is `connection` among the recipients?
    pub fn reaches(&self, connection: ConnectionId) -> bool {
        self.recipients.contains(&connection)
    }
}
