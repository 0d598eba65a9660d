//! Match State
//!
//! The per-match aggregate: two player slots, phase, turn pointer and winner.
//!
//! ```text
//!   Waiting ──2nd player──▶ Setup ──both fleets──▶ Battle ──fleet sunk──▶ Finished
//! ```
//!
//! Every mutating method either applies fully and returns the events to
//! deliver, or returns an error and leaves the match untouched.

use std::fmt;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Position, ShipPlacement};
use crate::game::error::GameError;
use crate::game::events::{GameEvent, Outbound, PlayerSummary};
use crate::game::fleet::{Fleet, ShipLayout};

/// Seats per match.
pub const MAX_PLAYERS: usize = 2;

/// Length of a private room code.
pub const ROOM_CODE_LEN: usize = 6;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifies one client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Fixed id, handy in tests.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Opaque match identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub Uuid);

impl MatchId {
    /// Build a v4 id from caller-supplied random bytes.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// =============================================================================
// PHASE
// =============================================================================

/// Match lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    /// Fewer than two players seated.
    Waiting,
    /// Both seated, fleets being placed.
    Setup,
    /// Turns alternate.
    Battle,
    /// Terminal; a winner is set.
    Finished,
}

// =============================================================================
// PLAYER SLOT
// =============================================================================

/// A player's seat: their board, fleet and readiness.
#[derive(Clone, Debug)]
pub struct PlayerSlot {
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// Name shown to the opponent.
    pub display_name: String,
    /// The player's own grid.
    pub board: Board,
    /// The player's ships.
    pub fleet: Fleet,
    /// Full fleet submitted.
    pub ready: bool,
    /// Connection still attached.
    pub connected: bool,
}

impl PlayerSlot {
    fn new(connection_id: ConnectionId, display_name: String) -> Self {
        Self {
            connection_id,
            display_name,
            board: Board::new(),
            fleet: Fleet::new(),
            ready: false,
            connected: true,
        }
    }

    /// Public view of this slot.
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.connection_id,
            name: self.display_name.clone(),
        }
    }
}

/// What a disconnect did to the match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Connection held no slot here.
    NotInMatch,
    /// Match survives; the remaining player was told.
    Notified(Vec<Outbound>),
    /// Match is over and must be dropped from the registry.
    TornDown,
}

// =============================================================================
// MATCH
// =============================================================================

/// One game between two players.
#[derive(Clone, Debug)]
pub struct Match {
    id: MatchId,
    room_code: Option<String>,
    phase: MatchPhase,
    slots: Vec<PlayerSlot>,
    turn: Option<ConnectionId>,
    winner: Option<ConnectionId>,
    rng: DeterministicRng,
    closed: bool,
}

impl Match {
    /// Create an empty match. `seed` drives the first-turn coin flip.
    pub fn new(id: MatchId, room_code: Option<String>, seed: u64) -> Self {
        Self {
            id,
            room_code,
            phase: MatchPhase::Waiting,
            slots: Vec::with_capacity(MAX_PLAYERS),
            turn: None,
            winner: None,
            rng: DeterministicRng::new(seed),
            closed: false,
        }
    }

    /// Match identifier.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Private room code, if created through the room flow.
    pub fn room_code(&self) -> Option<&str> {
        self.room_code.as_deref()
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Connection allowed to fire (battle only).
    pub fn turn(&self) -> Option<ConnectionId> {
        self.turn
    }

    /// Winner (finished only).
    pub fn winner(&self) -> Option<ConnectionId> {
        self.winner
    }

    /// Seated players, in join order.
    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    /// Slot owned by `connection`.
    pub fn slot(&self, connection: ConnectionId) -> Option<&PlayerSlot> {
        self.slots.iter().find(|s| s.connection_id == connection)
    }

    /// Number of seated players.
    pub fn player_count(&self) -> usize {
        self.slots.len()
    }

    /// True once the registry has dropped this match.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Can a quick-match caller be seated here?
    pub fn is_quick_match_candidate(&self) -> bool {
        !self.closed
            && self.phase == MatchPhase::Waiting
            && self.slots.len() == 1
            && self.room_code.is_none()
    }

    /// Seat a player.
    ///
    /// The second seat moves the match to `Setup` and broadcasts `game-start`.
    pub fn add_player(
        &mut self,
        connection: ConnectionId,
        name: impl Into<String>,
    ) -> Result<Vec<Outbound>, GameError> {
        if self.slots.len() >= MAX_PLAYERS {
            return Err(GameError::MatchFull);
        }
        if self.closed || self.phase != MatchPhase::Waiting {
            return Err(GameError::WrongPhase);
        }
        if self.slot(connection).is_some() {
            return Err(GameError::AlreadyInMatch);
        }

        self.slots.push(PlayerSlot::new(connection, name.into()));

        if self.slots.len() < MAX_PLAYERS {
            // Room creators hear about their code from the registry instead
            return Ok(match self.room_code {
                Some(_) => Vec::new(),
                None => vec![Outbound::to(connection, GameEvent::WaitingForOpponent)],
            });
        }

        self.phase = MatchPhase::Setup;
        Ok(vec![self.broadcast(GameEvent::GameStart {
            match_id: self.id,
            players: self.summaries(),
            phase: self.phase,
            room_code: self.room_code.clone(),
        })])
    }

    /// Stage one ship on the caller's board during setup.
    ///
    /// Re-placing a ship moves it. A ready player who moves a ship is no
    /// longer ready.
    pub fn place_ship(
        &mut self,
        connection: ConnectionId,
        placement: &ShipPlacement,
    ) -> Result<Vec<Outbound>, GameError> {
        self.require_phase(MatchPhase::Setup)?;
        let slot = self.slot_mut(connection)?;

        let ship = slot.board.place_ship(placement)?;
        let cells = ship.cells().to_vec();
        slot.fleet.insert(ship);
        slot.ready = false;

        Ok(vec![Outbound::to(connection, GameEvent::ShipPlaced {
            ship: placement.kind,
            cells,
        })])
    }

    /// Accept the caller's complete fleet.
    ///
    /// When both players are ready the match enters `Battle` and the first
    /// turn goes to a coin flip.
    pub fn submit_fleet(
        &mut self,
        connection: ConnectionId,
        layouts: &[ShipLayout],
    ) -> Result<Vec<Outbound>, GameError> {
        self.require_phase(MatchPhase::Setup)?;
        let (board, fleet) = Board::from_layouts(layouts)?;

        let slot = self.slot_mut(connection)?;
        slot.board = board;
        slot.fleet = fleet;
        slot.ready = true;

        let mut outbound = vec![Outbound::to(connection, GameEvent::ShipsPlaced)];

        if self.slots.len() == MAX_PLAYERS && self.slots.iter().all(|s| s.ready) {
            let first = if self.rng.coin_flip() { 0 } else { 1 };
            let current_turn = self.slots[first].connection_id;

            self.phase = MatchPhase::Battle;
            self.turn = Some(current_turn);

            outbound.push(self.broadcast(GameEvent::BattleStart {
                current_turn,
                players: self.summaries(),
            }));
        }

        Ok(outbound)
    }

    /// Fire at the opponent's board.
    ///
    /// Only the turn holder may fire, and only during battle. A winning shot
    /// finishes the match; any other shot passes the turn.
    pub fn submit_attack(
        &mut self,
        connection: ConnectionId,
        target: Position,
    ) -> Result<Vec<Outbound>, GameError> {
        self.require_phase(MatchPhase::Battle)?;
        if self.turn != Some(connection) {
            return Err(GameError::NotYourTurn);
        }

        let attacker = self.slot_index(connection).ok_or(GameError::NotInMatch)?;
        let defender = 1 - attacker;

        let outcome = {
            let slot = &mut self.slots[defender];
            slot.board.resolve_attack(&mut slot.fleet, target)?
        };

        if self.slots[defender].fleet.all_sunk() {
            self.phase = MatchPhase::Finished;
            self.turn = None;
            self.winner = Some(connection);

            let winner_name = self.slots[attacker].display_name.clone();
            return Ok(vec![self.broadcast(GameEvent::GameOver {
                winner: connection,
                winner_name,
                target,
            })]);
        }

        let current_turn = self.slots[defender].connection_id;
        self.turn = Some(current_turn);

        Ok(vec![self.broadcast(GameEvent::AttackResult {
            target,
            is_hit: outcome.is_hit(),
            sunk: outcome.sunk_ship(),
            current_turn,
            attacker: connection,
        })])
    }

    /// Handle a player's connection going away.
    ///
    /// A match that never started is torn down. Otherwise the match freezes
    /// in its current phase and the remaining player is told; once nobody is
    /// left connected it is torn down as well.
    pub fn disconnect_player(&mut self, connection: ConnectionId) -> DisconnectOutcome {
        let Some(idx) = self.slot_index(connection) else {
            return DisconnectOutcome::NotInMatch;
        };

        if self.phase == MatchPhase::Waiting || self.slots.len() == 1 {
            self.closed = true;
            return DisconnectOutcome::TornDown;
        }

        self.slots[idx].connected = false;

        if self.slots.iter().all(|s| !s.connected) {
            self.closed = true;
            return DisconnectOutcome::TornDown;
        }

        DisconnectOutcome::Notified(vec![self.broadcast(GameEvent::PlayerDisconnected {
            player: connection,
        })])
    }

    /// Connections still attached to this match.
    pub fn connected_ids(&self) -> Vec<ConnectionId> {
        self.slots
            .iter()
            .filter(|s| s.connected)
            .map(|s| s.connection_id)
            .collect()
    }

    fn broadcast(&self, event: GameEvent) -> Outbound {
        Outbound::to_all(self.connected_ids(), event)
    }

    fn summaries(&self) -> Vec<PlayerSummary> {
        self.slots.iter().map(PlayerSlot::summary).collect()
    }

    fn require_phase(&self, phase: MatchPhase) -> Result<(), GameError> {
        if self.closed || self.phase != phase {
            Err(GameError::WrongPhase)
        } else {
            Ok(())
        }
    }

    fn slot_index(&self, connection: ConnectionId) -> Option<usize> {
        self.slots.iter().position(|s| s.connection_id == connection)
    }

    fn slot_mut(&mut self, connection: ConnectionId) -> Result<&mut PlayerSlot, GameError> {
        self.slots
            .iter_mut()
            .find(|s| s.connection_id == connection)
            .ok_or(GameError::NotInMatch)
    }
}
