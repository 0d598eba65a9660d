//! Board Model
//!
//! A 10x10 grid owned by one player. Cells are derived from ship placement
//! and from shots fired at the grid.
//!
//! ```text
//!   Empty ──place──▶ ShipPresent ──fire──▶ Hit
//!     │
//!     └─────────────fire─────────────────▶ Miss
//! ```
//!
//! Fired-upon cells never change again. During setup a ship can be
//! re-placed, which returns its old cells to `Empty`.

use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::error::{GameError, PlacementError};
use crate::game::fleet::{Fleet, Ship, ShipKind, ShipLayout};

/// Grid edge length.
pub const BOARD_SIZE: usize = 10;

// =============================================================================
// POSITION
// =============================================================================

/// A cell on the grid. Always in bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    /// Build a position, or `None` if either coordinate is off the grid.
    pub fn new(row: i32, col: i32) -> Option<Self> {
        let in_range = |v: i32| (0..BOARD_SIZE as i32).contains(&v);
        if in_range(row) && in_range(col) {
            Some(Self { row: row as u8, col: col as u8 })
        } else {
            None
        }
    }

    /// Row index.
    #[inline]
    pub fn row(self) -> usize {
        self.row as usize
    }

    /// Column index.
    #[inline]
    pub fn col(self) -> usize {
        self.col as usize
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Direction a ship extends from its origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Column increases.
    Horizontal,
    /// Row increases.
    Vertical,
}

impl Orientation {
    #[inline]
    fn step(self) -> (i32, i32) {
        match self {
            Orientation::Horizontal => (0, 1),
            Orientation::Vertical => (1, 0),
        }
    }
}

/// Request to put one ship at an origin with an orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShipPlacement {
    /// Ship to place.
    pub kind: ShipKind,
    /// Origin row (may be off the board; validation rejects it).
    pub row: i32,
    /// Origin column.
    pub col: i32,
    /// Direction from the origin.
    pub orientation: Orientation,
}

impl ShipPlacement {
    /// Unchecked cells covered by this placement.
    ///
    /// Coordinates saturate at the `i32` limits, which are always off the board.
    pub(crate) fn raw_cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let (dr, dc) = self.orientation.step();
        let (row, col) = (self.row, self.col);
        (0..self.kind.size() as i32).map(move |i| (row.saturating_add(dr * i), col.saturating_add(dc * i)))
    }
}

// =============================================================================
// CELLS
// =============================================================================

/// State of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CellState {
    /// Open water, not fired upon.
    #[default]
    Empty,
    /// Ship present, not fired upon.
    ShipPresent(ShipKind),
    /// Ship present, fired upon.
    Hit(ShipKind),
    /// Open water, fired upon.
    Miss,
}

impl CellState {
    /// Ship occupying this cell, hit or not.
    pub fn ship(self) -> Option<ShipKind> {
        match self {
            CellState::ShipPresent(kind) | CellState::Hit(kind) => Some(kind),
            CellState::Empty | CellState::Miss => None,
        }
    }

    /// Has this cell been fired upon?
    pub fn is_targeted(self) -> bool {
        match self {
            CellState::Hit(_) | CellState::Miss => true,
            CellState::Empty | CellState::ShipPresent(_) => false,
        }
    }
}

/// Result of a shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Open water.
    Miss,
    /// A ship was struck.
    Hit {
        /// Ship that was struck.
        ship: ShipKind,
        /// Whether that hit sank it.
        sunk: bool,
    },
}

impl ShotOutcome {
    /// Did the shot strike a ship?
    pub fn is_hit(self) -> bool {
        matches!(self, ShotOutcome::Hit { .. })
    }

    /// Ship sunk by this shot, if any.
    pub fn sunk_ship(self) -> Option<ShipKind> {
        match self {
            ShotOutcome::Hit { ship, sunk: true } => Some(ship),
            ShotOutcome::Hit { .. } | ShotOutcome::Miss => None,
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// One player's grid.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[CellState; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// All-empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// State of one cell.
    #[inline]
    pub fn cell(&self, pos: Position) -> CellState {
        self.cells[pos.row()][pos.col()]
    }

    #[inline]
    fn cell_mut(&mut self, pos: Position) -> &mut CellState {
        &mut self.cells[pos.row()][pos.col()]
    }

    /// Iterate every position with its state, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, CellState)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().map(move |(c, state)| {
                (Position { row: r as u8, col: c as u8 }, *state)
            })
        })
    }

    /// Positions currently holding an unhit ship.
    pub fn ship_cells(&self) -> BTreeSet<Position> {
        self.iter()
            .filter(|(_, state)| matches!(state, CellState::ShipPresent(_)))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Check a placement against bounds and other ships.
    ///
    /// Cells already held by the same ship kind are allowed, so a ship can
    /// be dragged onto a spot that overlaps its own old position.
    pub fn validate_placement(&self, placement: &ShipPlacement) -> Result<Vec<Position>, PlacementError> {
        placement
            .raw_cells()
            .map(|(row, col)| {
                let pos = Position::new(row, col).ok_or(PlacementError::OutOfBounds)?;
                match self.cell(pos).ship() {
                    Some(other) if other != placement.kind => Err(PlacementError::Overlap(other)),
                    Some(_) | None => Ok(pos),
                }
            })
            .collect()
    }

    /// Validate and apply a placement, returning the placed ship.
    ///
    /// Any previous cells of the same ship kind are cleared first.
    /// On error the board is unchanged.
    pub fn place_ship(&mut self, placement: &ShipPlacement) -> Result<Ship, PlacementError> {
        let cells = self.validate_placement(placement)?;

        self.clear_ship(placement.kind);
        for pos in &cells {
            *self.cell_mut(*pos) = CellState::ShipPresent(placement.kind);
        }

        Ok(Ship::new(placement.kind, cells))
    }

    /// Return every unhit cell of `kind` to `Empty`.
    pub fn clear_ship(&mut self, kind: ShipKind) {
        for cell in self.cells.iter_mut().flatten() {
            if *cell == CellState::ShipPresent(kind) {
                *cell = CellState::Empty;
            }
        }
    }

    /// Fire at `target`.
    ///
    /// A cell that was already fired upon is rejected and nothing changes.
    /// Otherwise the cell becomes `Hit` (flipping the ship's hit mask) or `Miss`.
    pub fn resolve_attack(&mut self, fleet: &mut Fleet, target: Position) -> Result<ShotOutcome, GameError> {
        match self.cell(target) {
            CellState::Hit(_) | CellState::Miss => Err(GameError::CellAlreadyTargeted(target)),
            CellState::ShipPresent(kind) => {
                *self.cell_mut(target) = CellState::Hit(kind);
                let sunk = fleet
                    .register_hit(target)
                    .map(|(_, sunk)| sunk)
                    .unwrap_or(false);
                Ok(ShotOutcome::Hit { ship: kind, sunk })
            }
            CellState::Empty => {
                *self.cell_mut(target) = CellState::Miss;
                Ok(ShotOutcome::Miss)
            }
        }
    }

    /// Build a fresh board and fleet from a complete fleet submission.
    ///
    /// Requires each of the five ships exactly once, each a straight line of
    /// the right size, in bounds, and not overlapping another ship.
    pub fn from_layouts(layouts: &[ShipLayout]) -> Result<(Board, Fleet), PlacementError> {
        let mut board = Board::new();
        let mut fleet = Fleet::new();

        for layout in layouts {
            if fleet.get(layout.kind).is_some() {
                return Err(PlacementError::DuplicateShip(layout.kind));
            }
            let placement = layout.to_placement()?;
            let ship = board.place_ship(&placement)?;
            fleet.insert(ship);
        }

        if let Some(missing) = fleet.missing().next() {
            return Err(PlacementError::MissingShip(missing));
        }

        Ok((board, fleet))
    }
}
