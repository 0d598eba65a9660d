//! Game Errors
//!
//! Every error here is locally recoverable: the offending command is rejected
//! and shared state is left untouched.

use thiserror::Error;

use crate::game::board::Position;
use crate::game::fleet::ShipKind;

/// Reason a ship (or a whole fleet) could not be placed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// Some cell of the ship falls outside the 10x10 grid.
    #[error("ship extends outside the board")]
    OutOfBounds,

    /// A target cell already holds a different ship.
    #[error("ship overlaps the {0}")]
    Overlap(ShipKind),

    /// Declared size or number of cells does not match the ship type.
    #[error("{ship} must occupy exactly {expected} cells")]
    WrongSize {
        /// Ship being placed.
        ship: ShipKind,
        /// Size the ship type requires.
        expected: usize,
    },

    /// Cells do not form a straight, gap-free line.
    #[error("{0} cells are not a straight contiguous line")]
    NotContiguous(ShipKind),

    /// Fleet submission is missing a ship.
    #[error("fleet is missing the {0}")]
    MissingShip(ShipKind),

    /// Fleet submission lists a ship more than once.
    #[error("fleet lists the {0} more than once")]
    DuplicateShip(ShipKind),
}

/// Errors produced by match and registry operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    /// No live match carries the requested room code.
    #[error("Room not found")]
    RoomNotFound,

    /// The room already has two players.
    #[error("Room is full")]
    RoomFull,

    /// The match already has two players.
    #[error("Match is full")]
    MatchFull,

    /// Ship placement rejected by the board.
    #[error("Invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    /// The target cell was fired upon before.
    #[error("Cell {0} was already targeted")]
    CellAlreadyTargeted(Position),

    /// Attack coordinates outside the grid.
    #[error("Target ({row}, {col}) is off the board")]
    TargetOutOfBounds {
        /// Requested row.
        row: i32,
        /// Requested column.
        col: i32,
    },

    /// Caller does not hold the turn.
    #[error("Not your turn")]
    NotYourTurn,

    /// Command is not valid in the match's current phase.
    #[error("Command not allowed in the current phase")]
    WrongPhase,

    /// Connection is already seated in a match.
    #[error("Already in a match")]
    AlreadyInMatch,

    /// Connection is not seated in any match.
    #[error("Not in a match")]
    NotInMatch,
}
