//! Shared test fixtures.

use crate::game::board::Position;
use crate::game::fleet::{ShipKind, ShipLayout};

/// Each ship on its own row, starting at column 0.
pub(crate) fn standard_layouts() -> Vec<ShipLayout> {
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

/// Every cell covered by [`standard_layouts`], carrier first.
pub(crate) fn standard_targets() -> Vec<Position> {
    standard_layouts()
        .iter()
        .flat_map(|l| l.cells.iter().filter_map(|&(r, c)| Position::new(r, c)).collect::<Vec<_>>())
        .collect()
}
