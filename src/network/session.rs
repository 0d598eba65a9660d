//! Session Registry
//!
//! Owns every live match and the indexes that route a connection to its
//! match: quick-match queue, private room codes and connection bindings.
//!
//! Lock order is always index → match. Commands that only touch one match
//! (`place_ship`, `submit_fleet`, `attack`) clone the handle out of the
//! index and release it before locking the match.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::core::rng::{derive_match_seed, DeterministicRng};
use crate::game::board::{Position, ShipPlacement};
use crate::game::error::GameError;
use crate::game::events::{GameEvent, Outbound};
use crate::game::fleet::ShipLayout;
use crate::game::state::{ConnectionId, DisconnectOutcome, Match, MatchId, MAX_PLAYERS, ROOM_CODE_LEN};

/// Shared handle to one match.
pub type MatchHandle = Arc<Mutex<Match>>;

/// Result of seating a connection in a match.
#[derive(Debug, Clone)]
pub struct Joined {
    /// Match the connection now belongs to.
    pub match_id: MatchId,
    /// Room code, for private rooms.
    pub room_code: Option<String>,
    /// Events to deliver.
    pub outbound: Vec<Outbound>,
}

#[derive(Debug)]
struct RegistryIndex {
    matches: BTreeMap<MatchId, MatchHandle>,
    connections: BTreeMap<ConnectionId, MatchId>,
    rooms: BTreeMap<String, MatchId>,
    waiting: VecDeque<MatchId>,
    rng: DeterministicRng,
}

impl RegistryIndex {
    fn next_match_id(&mut self) -> MatchId {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.rng.next_u64().to_le_bytes());
        bytes[8..].copy_from_slice(&self.rng.next_u64().to_le_bytes());
        MatchId::from_random_bytes(bytes)
    }

    fn next_room_code(&mut self) -> String {
        loop {
            let code = self.rng.room_code(ROOM_CODE_LEN);
            if !self.rooms.contains_key(&code) {
                return code;
            }
            debug!(code = %code, "Room code collision, regenerating");
        }
    }

    fn ensure_unbound(&self, connection: ConnectionId) -> Result<(), GameError> {
        if self.connections.contains_key(&connection) {
            Err(GameError::AlreadyInMatch)
        } else {
            Ok(())
        }
    }

    fn remove_match(&mut self, match_id: MatchId) {
        self.matches.remove(&match_id);
        self.rooms.retain(|_, id| *id != match_id);
        self.waiting.retain(|id| *id != match_id);
        self.connections.retain(|_, id| *id != match_id);
    }
}

/// Registry of all live matches.
#[derive(Debug)]
pub struct SessionRegistry {
    index: Mutex<RegistryIndex>,
    seed: u64,
}

impl SessionRegistry {
    /// Create a registry seeded from fresh entropy.
    pub fn new() -> Self {
        Self::with_seed(DeterministicRng::from_entropy().next_u64())
    }

    /// Create a registry with a fixed seed.
    ///
    /// Match ids, room codes and first turns are reproducible for a given seed
    /// and command sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            index: Mutex::new(RegistryIndex {
                matches: BTreeMap::new(),
                connections: BTreeMap::new(),
                rooms: BTreeMap::new(),
                waiting: VecDeque::new(),
                rng: DeterministicRng::new(seed),
            }),
            seed,
        }
    }

    /// Registry seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn new_match(&self, index: &mut RegistryIndex, room_code: Option<String>) -> (MatchId, MatchHandle) {
        let id = index.next_match_id();
        let seed = derive_match_seed(self.seed, id.as_bytes());
        let handle = Arc::new(Mutex::new(Match::new(id, room_code, seed)));
        index.matches.insert(id, Arc::clone(&handle));
        (id, handle)
    }

    /// Pair with a waiting stranger, or open a new waiting match.
    #[instrument(skip(self), level = "debug")]
    pub async fn quick_match(&self, connection: ConnectionId, name: &str) -> Result<Joined, GameError> {
        let mut index = self.index.lock().await;
        index.ensure_unbound(connection)?;

        while let Some(match_id) = index.waiting.pop_front() {
            let Some(handle) = index.matches.get(&match_id).cloned() else {
                continue;
            };
            let mut m = handle.lock().await;
            if !m.is_quick_match_candidate() {
                continue;
            }

            let outbound = m.add_player(connection, name)?;
            index.connections.insert(connection, match_id);
            info!(match_id = %match_id, %connection, "Quick match paired");
            return Ok(Joined { match_id, room_code: None, outbound });
        }

        let (match_id, handle) = self.new_match(&mut index, None);
        let outbound = handle.lock().await.add_player(connection, name)?;
        index.waiting.push_back(match_id);
        index.connections.insert(connection, match_id);
        info!(match_id = %match_id, %connection, "Quick match waiting");

        Ok(Joined { match_id, room_code: None, outbound })
    }

    /// Open a private room and seat the caller as its first player.
    #[instrument(skip(self), level = "debug")]
    pub async fn create_room(&self, connection: ConnectionId, name: &str) -> Result<Joined, GameError> {
        let mut index = self.index.lock().await;
        index.ensure_unbound(connection)?;

        let code = index.next_room_code();
        let (match_id, handle) = self.new_match(&mut index, Some(code.clone()));
        let mut outbound = handle.lock().await.add_player(connection, name)?;
        outbound.push(Outbound::to(connection, GameEvent::RoomCreated {
            room_code: code.clone(),
            match_id,
        }));

        index.rooms.insert(code.clone(), match_id);
        index.connections.insert(connection, match_id);
        info!(match_id = %match_id, room_code = %code, "Room created");

        Ok(Joined { match_id, room_code: Some(code), outbound })
    }

    /// Join a private room by code. Codes are case-insensitive.
    #[instrument(skip(self), level = "debug")]
    pub async fn join_room(
        &self,
        connection: ConnectionId,
        name: &str,
        code: &str,
    ) -> Result<Joined, GameError> {
        let code = code.trim().to_ascii_uppercase();
        let mut index = self.index.lock().await;
        index.ensure_unbound(connection)?;

        let match_id = *index.rooms.get(&code).ok_or(GameError::RoomNotFound)?;
        let handle = index.matches.get(&match_id).cloned().ok_or(GameError::RoomNotFound)?;

        let mut m = handle.lock().await;
        if m.player_count() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }
        let outbound = m.add_player(connection, name)?;
        index.connections.insert(connection, match_id);
        info!(match_id = %match_id, room_code = %code, "Room joined");

        Ok(Joined { match_id, room_code: Some(code), outbound })
    }

    async fn handle_for(&self, connection: ConnectionId) -> Result<MatchHandle, GameError> {
        let index = self.index.lock().await;
        index
            .connections
            .get(&connection)
            .and_then(|id| index.matches.get(id))
            .cloned()
            .ok_or(GameError::NotInMatch)
    }

    /// Stage one ship on the caller's board.
    pub async fn place_ship(
        &self,
        connection: ConnectionId,
        placement: &ShipPlacement,
    ) -> Result<Vec<Outbound>, GameError> {
        let handle = self.handle_for(connection).await?;
        let mut m = handle.lock().await;
        m.place_ship(connection, placement)
    }

    /// Submit the caller's complete fleet.
    pub async fn submit_fleet(
        &self,
        connection: ConnectionId,
        layouts: &[ShipLayout],
    ) -> Result<Vec<Outbound>, GameError> {
        let handle = self.handle_for(connection).await?;
        let mut m = handle.lock().await;
        m.submit_fleet(connection, layouts)
    }

    /// Fire at the opponent. Raw coordinates are bounds-checked here.
    pub async fn attack(&self, connection: ConnectionId, row: i32, col: i32) -> Result<Vec<Outbound>, GameError> {
        let target = Position::new(row, col).ok_or(GameError::TargetOutOfBounds { row, col })?;
        let handle = self.handle_for(connection).await?;
        let mut m = handle.lock().await;
        m.submit_attack(connection, target)
    }

    /// Detach a connection from its match.
    ///
    /// Returns the events owed to the remaining player. A match that is torn
    /// down is removed from every index.
    #[instrument(skip(self), level = "debug")]
    pub async fn disconnect(&self, connection: ConnectionId) -> Vec<Outbound> {
        let mut index = self.index.lock().await;
        let Some(match_id) = index.connections.remove(&connection) else {
            return Vec::new();
        };
        let Some(handle) = index.matches.get(&match_id).cloned() else {
            return Vec::new();
        };

        let outcome = handle.lock().await.disconnect_player(connection);
        match outcome {
            DisconnectOutcome::NotInMatch => Vec::new(),
            DisconnectOutcome::Notified(outbound) => {
                info!(match_id = %match_id, %connection, "Player disconnected, match frozen");
                outbound
            }
            DisconnectOutcome::TornDown => {
                index.remove_match(match_id);
                info!(match_id = %match_id, "Match torn down");
                Vec::new()
            }
        }
    }

    /// Leave the current match without closing the connection.
    pub async fn leave(&self, connection: ConnectionId) -> Vec<Outbound> {
        self.disconnect(connection).await
    }

    /// Match the connection is bound to.
    pub async fn connection_match(&self, connection: ConnectionId) -> Option<MatchId> {
        self.index.lock().await.connections.get(&connection).copied()
    }

    /// Copy of a match's current state.
    pub async fn snapshot(&self, match_id: MatchId) -> Option<Match> {
        let handle = self.index.lock().await.matches.get(&match_id).cloned()?;
        let m = handle.lock().await;
        Some(m.clone())
    }

    /// Number of live matches.
    pub async fn match_count(&self) -> usize {
        self.index.lock().await.matches.len()
    }

    /// Number of matches in the quick-match queue.
    pub async fn waiting_count(&self) -> usize {
        self.index.lock().await.waiting.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
