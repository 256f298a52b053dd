//! Player selection and group formations.

use serde::{Deserialize, Serialize};

use crate::grid::GridCoord;
use crate::production::FacilityId;
use crate::units::UnitId;

/// Spacing between formation slots, in cells.
pub const FORMATION_SPACING: i32 = 4;

/// Currently selected units and facility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    units: Vec<UnitId>,
    facility: Option<FacilityId>,
}

impl Selection {
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected units in selection order.
    #[must_use]
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    /// Selected facility.
    #[must_use]
    pub const fn facility(&self) -> Option<FacilityId> {
        self.facility
    }

    /// First selected unit. Its faction decides who a group order moves.
    #[must_use]
    pub fn first(&self) -> Option<UnitId> {
        self.units.first().copied()
    }

    /// Add a unit. Already-selected units keep their place.
    pub fn select(&mut self, id: UnitId) {
        if !self.units.contains(&id) {
            self.units.push(id);
        }
    }

    /// Select a facility, replacing the previous one.
    pub fn select_facility(&mut self, id: Option<FacilityId>) {
        self.facility = id;
    }

    /// Is this unit selected?
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains(&id)
    }

    /// Number of selected units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True when no unit is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Drop every unit and the facility.
    pub fn clear(&mut self) {
        self.units.clear();
        self.facility = None;
    }

    /// Keep only the units for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(UnitId) -> bool) {
        self.units.retain(|id| keep(*id));
    }
}

/// Unclamped formation targets for `count` units around `center`.
///
/// Units fill a `side × side` square row by row, where `side` is the
/// smallest integer with `side² >= count`. Slots are [`FORMATION_SPACING`]
/// cells apart and the square is centred on `center`.
#[must_use]
pub fn formation_slots(center: GridCoord, count: usize) -> Vec<GridCoord> {
    if count == 0 {
        return Vec::new();
    }

    let mut side = 1usize;
    while side * side < count {
        side += 1;
    }

    (0..count)
        .map(|index| {
            let (row, col) = (index / side, index % side);
            center.offset(slot_offset(col, side), slot_offset(row, side))
        })
        .collect()
}

/// `round((i - (side - 1) / 2) * spacing)`, rounding halves up.
fn slot_offset(index: usize, side: usize) -> i32 {
    let index = i32::try_from(index).unwrap_or(i32::MAX);
    let side = i32::try_from(side).unwrap_or(i32::MAX);
    ((2 * index - (side - 1)) * FORMATION_SPACING + 1).div_euclid(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_idempotent() {
        let mut selection = Selection::new();
        selection.select(UnitId(3));
        selection.select(UnitId(1));
        selection.select(UnitId(3));
        assert_eq!(selection.units(), &[UnitId(3), UnitId(1)]);
        assert_eq!(selection.first(), Some(UnitId(3)));
    }

    #[test]
    fn test_retain_and_clear() {
        let mut selection = Selection::new();
        for id in 1..=4 {
            selection.select(UnitId(id));
        }
        selection.select_facility(Some(FacilityId(9)));
        selection.retain(|id| id.0 % 2 == 0);
        assert_eq!(selection.units(), &[UnitId(2), UnitId(4)]);

        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(selection.facility(), None);
    }

    #[test]
    fn test_single_slot_is_center() {
        let center = GridCoord::new(50, 50);
        assert_eq!(formation_slots(center, 1), vec![center]);
    }

    #[test]
    fn test_two_units_use_two_by_two_square() {
        let slots = formation_slots(GridCoord::new(50, 50), 2);
        assert_eq!(slots, vec![GridCoord::new(48, 48), GridCoord::new(52, 48)]);
    }

    #[test]
    fn test_nine_units_form_centred_square() {
        let slots = formation_slots(GridCoord::new(100, 80), 9);
        assert_eq!(slots.len(), 9);
        assert_eq!(slots[0], GridCoord::new(96, 76));
        assert_eq!(slots[4], GridCoord::new(100, 80));
        assert_eq!(slots[8], GridCoord::new(104, 84));
    }

    #[test]
    fn test_five_units_start_third_row_partially() {
        let slots = formation_slots(GridCoord::new(20, 20), 5);
        assert_eq!(slots[3], GridCoord::new(16, 20));
        assert_eq!(slots[4], GridCoord::new(20, 20));
    }
}
