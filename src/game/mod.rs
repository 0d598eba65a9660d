//! Game Logic Module
//!
//! Transport-agnostic Battleship rules. Nothing here knows about sockets.
//!
//! ## Module Structure
//!
//! - `board`: 10x10 grid, placement validation, shot resolution
//! - `fleet`: Ship kinds, hit tracking, client fleet layouts
//! - `state`: Per-match state machine
//! - `events`: Events returned by match operations
//! - `error`: Rejection reasons

pub mod board;
pub mod error;
pub mod events;
pub mod fleet;
pub mod state;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export key types
pub use board::{Board, CellState, Orientation, Position, ShipPlacement, ShotOutcome, BOARD_SIZE};
pub use error::{GameError, PlacementError};
pub use events::{GameEvent, Outbound, PlayerSummary};
pub use fleet::{Fleet, Ship, ShipKind, ShipLayout};
pub use state::{ConnectionId, Match, MatchId, MatchPhase};
