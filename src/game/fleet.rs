//! Ships and Fleets
//!
//! The fixed five-ship fleet, per-ship hit tracking, and validation of
//! client-submitted fleet layouts.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::board::{Orientation, Position, ShipPlacement};
use crate::game::error::PlacementError;

// =============================================================================
// SHIP KIND
// =============================================================================

/// One of the five fleet members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipKind {
    /// Aircraft carrier: 5 cells.
    Carrier,
    /// Battleship: 4 cells.
    Battleship,
    /// Cruiser: 4 cells.
    Cruiser,
    /// Submarine: 3 cells.
    Submarine,
    /// Destroyer: 2 cells.
    Destroyer,
}

impl ShipKind {
    /// Every fleet member, largest first.
    pub const ALL: [ShipKind; 5] = [
        ShipKind::Carrier,
        ShipKind::Battleship,
        ShipKind::Cruiser,
        ShipKind::Submarine,
        ShipKind::Destroyer,
    ];

    /// Number of cells this ship occupies.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            ShipKind::Carrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Cruiser => 4,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 2,
        }
    }

    /// Wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ShipKind::Carrier => "carrier",
            ShipKind::Battleship => "battleship",
            ShipKind::Cruiser => "cruiser",
            ShipKind::Submarine => "submarine",
            ShipKind::Destroyer => "destroyer",
        }
    }
}

impl fmt::Display for ShipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SHIP
// =============================================================================

/// A placed ship. Shape is fixed; only the hit mask changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ship {
    kind: ShipKind,
    cells: Vec<Position>,
    hit_mask: Vec<bool>,
}

impl Ship {
    /// Create an unhit ship over `cells`.
    pub(crate) fn new(kind: ShipKind, cells: Vec<Position>) -> Self {
        debug_assert_eq!(cells.len(), kind.size());
        let hit_mask = vec![false; cells.len()];
        Self { kind, cells, hit_mask }
    }

    /// Ship type.
    pub fn kind(&self) -> ShipKind {
        self.kind
    }

    /// Occupied cells, in placement order.
    pub fn cells(&self) -> &[Position] {
        &self.cells
    }

    /// Hit flags aligned with [`Ship::cells`].
    pub fn hit_mask(&self) -> &[bool] {
        &self.hit_mask
    }

    /// Sunk iff every cell has been hit.
    pub fn is_sunk(&self) -> bool {
        self.hit_mask.iter().all(|hit| *hit)
    }

    /// Flip the hit flag for `pos`. Returns false if the ship does not cover it.
    fn register_hit(&mut self, pos: Position) -> bool {
        match self.cells.iter().position(|c| *c == pos) {
            Some(idx) => {
                self.hit_mask[idx] = true;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// FLEET
// =============================================================================

/// The ships owned by one player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fleet {
    ships: BTreeMap<ShipKind, Ship>,
}

impl Fleet {
    /// Empty fleet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a ship of the same kind.
    pub fn insert(&mut self, ship: Ship) -> Option<Ship> {
        self.ships.insert(ship.kind, ship)
    }

    /// Look up a ship by kind.
    pub fn get(&self, kind: ShipKind) -> Option<&Ship> {
        self.ships.get(&kind)
    }

    /// Iterate ships in kind order.
    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    /// True if no ships are placed.
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Fleet members not yet placed, largest first.
    pub fn missing(&self) -> impl Iterator<Item = ShipKind> + '_ {
        ShipKind::ALL.iter().copied().filter(|kind| !self.ships.contains_key(kind))
    }

    /// Win check: every ship's hit mask is all-true.
    pub fn all_sunk(&self) -> bool {
        self.ships.values().all(Ship::is_sunk)
    }

    /// Record a hit on whichever ship covers `pos`.
    ///
    /// Returns the ship hit and whether it is now sunk.
    pub(crate) fn register_hit(&mut self, pos: Position) -> Option<(ShipKind, bool)> {
        self.ships
            .values_mut()
            .find_map(|ship| ship.register_hit(pos).then(|| (ship.kind, ship.is_sunk())))
    }
}

// =============================================================================
// SHIP LAYOUT (client submission)
// =============================================================================

/// A ship exactly as a client submitted it: declared size and raw cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShipLayout {
    /// Ship type.
    pub kind: ShipKind,
    /// Size the client claims.
    pub size: usize,
    /// Raw `(row, col)` cells; may be out of bounds.
    pub cells: Vec<(i32, i32)>,
}

impl ShipLayout {
    /// Recover the origin + orientation this layout was drawn from.
    ///
    /// Cells may arrive in any order but must lie on the board and form a
    /// straight gap-free line of exactly the ship's size.
    pub fn to_placement(&self) -> Result<ShipPlacement, PlacementError> {
        let expected = self.kind.size();
        if self.size != expected || self.cells.len() != expected {
            return Err(PlacementError::WrongSize { ship: self.kind, expected });
        }
        if self.cells.iter().any(|&(r, c)| Position::new(r, c).is_none()) {
            return Err(PlacementError::OutOfBounds);
        }

        let mut cells = self.cells.clone();
        cells.sort_unstable();
        let (row, col) = cells[0];

        let orientation = if cells.iter().all(|&(r, _)| r == row) {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };

        let placement = ShipPlacement { kind: self.kind, row, col, orientation };
        if !placement.raw_cells().eq(cells.iter().copied()) {
            return Err(PlacementError::NotContiguous(self.kind));
        }

        Ok(placement)
    }
}
