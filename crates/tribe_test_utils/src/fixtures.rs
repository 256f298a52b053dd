//! Test fixtures and helpers.
//!
//! Pre-built simulations and unit layouts for consistent testing.

use fixed::types::I32F32;
use tribe_core::config::GameConfig;
use tribe_core::factions::FactionId;
use tribe_core::grid::GridCoord;
use tribe_core::production::{FacilityId, FacilityKind};
use tribe_core::simulation::Simulation;
use tribe_core::units::{UnitId, UnitKind};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Ids of everything placed by [`skirmish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skirmish {
    /// Red cavemen.
    pub red: Vec<UnitId>,
    /// Blue cavemen.
    pub blue: Vec<UnitId>,
    /// Red builder.
    pub red_builder: UnitId,
    /// Blue builder.
    pub blue_builder: UnitId,
    /// Red training facility.
    pub red_facility: FacilityId,
    /// Blue training facility.
    pub blue_facility: FacilityId,
}

/// The stock two-faction opening on a default field.
///
/// Three cavemen and a builder per side, each next to a finished
/// training facility.
#[must_use]
pub fn skirmish() -> (Simulation, Skirmish) {
    skirmish_with(GameConfig::default())
}

/// [`skirmish`] with a custom configuration.
#[must_use]
pub fn skirmish_with(config: GameConfig) -> (Simulation, Skirmish) {
    let mut sim = Simulation::new(config);

    let red = [(30, 40), (35, 43), (40, 46)]
        .into_iter()
        .map(|(x, y)| sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(x, y)))
        .collect();
    let blue = [(150, 60), (155, 63), (160, 66)]
        .into_iter()
        .map(|(x, y)| sim.spawn_unit(UnitKind::Caveman, FactionId::Blue, GridCoord::new(x, y)))
        .collect();
    let red_builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(25, 35));
    let blue_builder = sim.spawn_unit(UnitKind::Builder, FactionId::Blue, GridCoord::new(175, 55));
    let red_facility = sim.insert_facility(
        FacilityKind::TrainingFacility,
        FactionId::Red,
        GridCoord::new(20, 30),
        true,
    );
    let blue_facility = sim.insert_facility(
        FacilityKind::TrainingFacility,
        FactionId::Blue,
        GridCoord::new(170, 50),
        true,
    );

    (
        sim,
        Skirmish {
            red,
            blue,
            red_builder,
            blue_builder,
            red_facility,
            blue_facility,
        },
    )
}

/// Two opposing lines that close on each other and fight.
///
/// `per_side` units are stacked vertically four rows apart; both lines are
/// ordered to the middle of the field.
#[must_use]
pub fn battle(per_side: i32) -> Simulation {
    let mut sim = Simulation::default();

    for row in 0..per_side {
        let y = 20 + row * 4;
        sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(60, y));
        sim.spawn_unit(UnitKind::Hunter, FactionId::Blue, GridCoord::new(140, y));
    }

    for faction in FactionId::ALL {
        let ids: Vec<UnitId> = sim
            .units()
            .filter(|unit| unit.faction == faction)
            .map(|unit| unit.id)
            .collect();
        for (index, id) in ids.iter().enumerate() {
            sim.select_unit(*id, index > 0);
        }
        let center = sim.grid().grid_to_pixel(GridCoord::new(100, 20 + per_side * 2));
        sim.move_selected(center);
    }
    sim.deselect_all();

    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skirmish_layout() {
        let (sim, ids) = skirmish();
        assert_eq!(sim.unit_count(), 8);
        assert_eq!(ids.red.len(), 3);
        assert_eq!(ids.blue.len(), 3);
        assert!(sim.facility(ids.red_facility).is_some_and(|f| f.is_complete()));
        assert_eq!(sim.gems(), 45);
    }

    #[test]
    fn test_battle_orders_both_sides() {
        let sim = battle(3);
        assert_eq!(sim.unit_count(), 6);
        assert!(sim.units().all(|unit| unit.target != unit.anchor));
        assert!(sim.selection().is_empty());
    }
}
