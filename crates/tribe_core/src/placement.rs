//! Facility placement validation.
//!
//! A square footprint can be placed when it lies inside the field and
//! none of its cells is covered by a unit or by another facility. Units
//! are tested by the cells their footprint covers, so a unit standing
//! just outside the edge does not block, and a footprint may sit flush
//! against the right or bottom border.

use serde::{Deserialize, Serialize};

use crate::grid::{GridCoord, SpatialGrid};
use crate::production::Facility;

/// Result of placement validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PlacementResult {
    /// Placement is valid.
    Valid,
    /// Part of the footprint lies outside the field.
    OutOfBounds,
    /// One or more cells are taken.
    Blocked {
        /// Blocked cells, in scan order.
        cells: Vec<GridCoord>,
    },
}

impl PlacementResult {
    /// Check if placement is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, PlacementResult::Valid)
    }
}

/// Check whether a `size × size` facility fits at `anchor`.
#[must_use]
pub fn can_place_facility<'a>(
    grid: &SpatialGrid,
    facilities: impl IntoIterator<Item = &'a Facility>,
    anchor: GridCoord,
    size: i32,
) -> PlacementResult {
    if anchor.x < 0
        || anchor.y < 0
        || anchor.x > grid.width() - size
        || anchor.y > grid.height() - size
    {
        return PlacementResult::OutOfBounds;
    }

    let others: Vec<&Facility> = facilities
        .into_iter()
        .filter(|facility| facility.overlaps(anchor, size))
        .collect();

    let mut blocked = Vec::new();
    for dy in 0..size {
        for dx in 0..size {
            let cell = anchor.offset(dx, dy);
            let taken_by_unit = !grid.units_at(cell).is_empty();
            let taken_by_facility = others.iter().any(|facility| facility.covers(cell));
            if taken_by_unit || taken_by_facility {
                blocked.push(cell);
            }
        }
    }

    if blocked.is_empty() {
        PlacementResult::Valid
    } else {
        PlacementResult::Blocked { cells: blocked }
    }
}

/// Ghost footprint shown while choosing where to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPreview {
    /// Top-left cell.
    pub anchor: GridCoord,
    /// Side length in cells.
    pub size: i32,
    /// Whether committing here would succeed (ignoring funds).
    pub is_valid: bool,
    /// Cells that are blocked (if any).
    pub blocked_cells: Vec<GridCoord>,
}

impl PlacementPreview {
    /// Validate a footprint and capture the outcome.
    #[must_use]
    pub fn new<'a>(
        grid: &SpatialGrid,
        facilities: impl IntoIterator<Item = &'a Facility>,
        anchor: GridCoord,
        size: i32,
    ) -> Self {
        let (is_valid, blocked_cells) = match can_place_facility(grid, facilities, anchor, size) {
            PlacementResult::Valid => (true, Vec::new()),
            PlacementResult::Blocked { cells } => (false, cells),
            PlacementResult::OutOfBounds => (false, Vec::new()),
        };

        Self {
            anchor,
            size,
            is_valid,
            blocked_cells,
        }
    }
}
