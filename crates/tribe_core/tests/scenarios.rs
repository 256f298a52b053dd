//! End-to-end scenarios on a default field.

use std::collections::BTreeMap;

use tribe_core::combat::Projectile;
use tribe_core::config::{GameConfig, ProjectileStats, UnitRoster};
use tribe_core::prelude::*;
use tribe_test_utils::fixtures::{fixed, skirmish, skirmish_with};

#[test]
fn builder_next_to_site_builds_every_tick() {
    let mut sim = Simulation::default();
    let site = sim.insert_facility(
        FacilityKind::TrainingFacility,
        FactionId::Red,
        GridCoord::new(20, 30),
        false,
    );
    let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(25, 35));
    assert!(sim.assign_builder(builder, site));

    let mut last = Fixed::ZERO;
    for tick in 1..=100u64 {
        sim.tick();
        let facility = sim.facility(site).unwrap();
        let progress = facility.construction_progress();
        assert!(progress > last, "no progress on tick {tick}");
        assert_eq!(facility.construction_remaining(), 900 - tick);
        last = progress;
    }
}

#[test]
fn construction_finishes_after_fifteen_seconds() {
    let mut sim = Simulation::default();
    let site = sim.insert_facility(
        FacilityKind::HuntersLodge,
        FactionId::Blue,
        GridCoord::new(100, 100),
        false,
    );
    let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Blue, GridCoord::new(105, 105));
    sim.assign_builder(builder, site);

    for _ in 0..899 {
        sim.tick();
    }
    assert!(!sim.facility(site).unwrap().is_complete());

    sim.tick();
    let lodge = sim.facility(site).unwrap();
    assert!(lodge.is_complete());
    assert_eq!(lodge.construction_progress(), Fixed::ONE);
    assert!(!sim.train_unit(site, UnitKind::Caveman));
    assert!(sim.train_unit(site, UnitKind::Hunter));
}

#[test]
fn factions_out_of_range_never_fire() {
    let (mut sim, _) = skirmish();
    for _ in 0..1200 {
        let events = sim.tick();
        assert!(events.shots.is_empty());
        assert!(events.hits.is_empty());
    }
    assert_eq!(sim.unit_count(), 8);
}

#[test]
fn projectile_crosses_field_and_stops_on_first_enemy() {
    let config = GameConfig::default();
    let mut grid = SpatialGrid::new(
        config.grid_width,
        config.grid_height,
        config.cell_width(),
        config.cell_height(),
    );
    let roster = UnitRoster::default();
    let stats = ProjectileStats::default();

    let from = Vec2Fixed::from_ints(100, 100);
    let to = Vec2Fixed::from_ints(200, 100);

    let empty = BTreeMap::new();
    let mut shot = Projectile::launch(UnitId(1), FactionId::Red, from, to, &stats, &grid);
    let mut ticks = 0;
    while shot.position.x < fixed(200) {
        assert_eq!(shot.update(&grid, &empty), None);
        ticks += 1;
        assert!(ticks <= 25, "projectile too slow");
    }
    assert_eq!(ticks, 25);
    assert!(shot.active);

    let mut units = BTreeMap::new();
    for (id, faction, anchor) in [
        (2, FactionId::Red, GridCoord::new(37, 26)),
        (3, FactionId::Blue, GridCoord::new(50, 26)),
        (4, FactionId::Blue, GridCoord::new(60, 26)),
    ] {
        let id = UnitId(id);
        let unit = Unit::new(
            id,
            UnitKind::Caveman,
            faction,
            anchor,
            grid.grid_to_pixel(anchor),
            roster.get(UnitKind::Caveman),
        );
        grid.add(id, anchor);
        units.insert(id, unit);
    }

    let mut shot = Projectile::launch(UnitId(1), FactionId::Red, from, to, &stats, &grid);
    let mut hit = None;
    for _ in 0..40 {
        if let Some(target) = shot.update(&grid, &units) {
            hit = Some(target);
            break;
        }
    }
    assert_eq!(hit, Some(UnitId(3)));
    assert!(!shot.active);
    assert_eq!(shot.update(&grid, &units), None);
}

#[test]
fn projectile_leaving_field_deactivates() {
    let config = GameConfig::default();
    let grid = SpatialGrid::new(
        config.grid_width,
        config.grid_height,
        config.cell_width(),
        config.cell_height(),
    );
    let mut shot = Projectile::launch(
        UnitId(1),
        FactionId::Red,
        Vec2Fixed::from_ints(790, 300),
        Vec2Fixed::from_ints(900, 300),
        &ProjectileStats::default(),
        &grid,
    );
    let empty = BTreeMap::new();
    for _ in 0..5 {
        shot.update(&grid, &empty);
    }
    assert!(!shot.active);
}

#[test]
fn training_charges_exactly_once_per_unit() {
    let mut config = GameConfig::default();
    config.facilities.training_facility.training_seconds = 1;
    let (mut sim, ids) = skirmish_with(config);

    for kind in [UnitKind::Caveman, UnitKind::Miner, UnitKind::Hunter] {
        assert!(sim.train_unit(ids.red_facility, kind));
    }
    assert_eq!(sim.gems(), 45);

    let mut spawned = Vec::new();
    let mut charged = Vec::new();
    for _ in 0..200 {
        let before = sim.gems();
        let events = sim.tick();
        if sim.gems() != before {
            charged.push(before - sim.gems());
        }
        spawned.extend(events.spawned);
    }

    assert_eq!(charged, vec![2, 3, 4]);
    assert_eq!(sim.gems(), 36);
    assert_eq!(spawned.len(), 3);
    let kinds: Vec<UnitKind> = spawned
        .iter()
        .map(|id| sim.unit(*id).unwrap().kind)
        .collect();
    assert_eq!(kinds, vec![UnitKind::Caveman, UnitKind::Miner, UnitKind::Hunter]);
}

#[test]
fn blocked_spawn_point_uses_nearby_cell() {
    let mut config = GameConfig::default();
    config.facilities.training_facility.training_seconds = 1;
    let mut sim = Simulation::new(config);
    let site = sim.insert_facility(
        FacilityKind::TrainingFacility,
        FactionId::Red,
        GridCoord::new(20, 30),
        true,
    );
    let squatter = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(25, 40));
    sim.train_unit(site, UnitKind::Worker);

    let mut spawned = Vec::new();
    for _ in 0..61 {
        spawned.extend(sim.tick().spawned);
    }

    assert_eq!(spawned.len(), 1);
    let worker = sim.unit(spawned[0]).unwrap();
    assert_ne!(worker.anchor, sim.unit(squatter).unwrap().anchor);
    assert!(worker.anchor.distance(GridCoord::new(25, 40)) <= fixed(8));
}

#[test]
fn placed_facility_gets_built_by_selected_builder() {
    let mut config = GameConfig::default();
    config.facilities.training_facility.construction_seconds = 2;
    let (mut sim, ids) = skirmish_with(config);

    sim.select_unit(ids.red_builder, false);
    assert!(sim.begin_placement(FacilityKind::TrainingFacility));

    // Overlaps the finished red facility.
    assert_eq!(sim.commit_placement(GridCoord::new(25, 35), FactionId::Red), None);
    assert_eq!(sim.gems(), 45);

    let site = sim
        .commit_placement(GridCoord::new(20, 45), FactionId::Red)
        .expect("open ground");
    assert_eq!(sim.gems(), 35);
    assert_eq!(sim.unit(ids.red_builder).unwrap().build_site(), Some(site));

    // The builder walks south and stops once the centre is within reach.
    for _ in 0..60 {
        sim.tick();
    }
    let facility = sim.facility(site).unwrap();
    let builder = sim.unit(ids.red_builder).unwrap();
    assert!(builder.anchor.distance(facility.center()) <= fixed(2));
    assert!(facility.construction_progress() > Fixed::ZERO);

    for _ in 0..120 {
        sim.tick();
    }
    assert!(sim.facility(site).unwrap().is_complete());
    assert_eq!(sim.unit(ids.red_builder).unwrap().build_site(), None);
}

#[test]
fn stop_keeps_units_in_place() {
    let (mut sim, ids) = skirmish();
    sim.select_unit(ids.red[0], false);
    sim.move_selected(sim.grid().grid_to_pixel(GridCoord::new(100, 100)));
    for _ in 0..10 {
        sim.tick();
    }
    sim.stop_selected();
    let anchor = sim.unit(ids.red[0]).unwrap().anchor;
    for _ in 0..30 {
        sim.tick();
    }
    let unit = sim.unit(ids.red[0]).unwrap();
    assert!(unit.anchor.distance(anchor) <= fixed(1));
}
