//! Core simulation loop.
//!
//! [`Simulation`] owns every unit, facility and projectile, the shared gem
//! ledger, the player's selection and the spatial grid. It advances the
//! world one tick at a time in a fixed phase order and exposes the command
//! API a front-end uses between ticks.
//!
//! # Determinism
//!
//! - Simulation math is fixed-point ([`Fixed`](crate::math::Fixed)).
//! - Units and facilities live in `BTreeMap`s and are processed in id order.
//! - Nothing reads a wall clock; time is `tick × tick duration`.
//!
//! # Example
//!
//! ```
//! use tribe_core::config::GameConfig;
//! use tribe_core::factions::FactionId;
//! use tribe_core::grid::GridCoord;
//! use tribe_core::simulation::Simulation;
//! use tribe_core::units::UnitKind;
//!
//! let mut sim = Simulation::new(GameConfig::default());
//! let id = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
//!
//! sim.select_unit(id, false);
//! let destination = sim.grid().grid_to_pixel(GridCoord::new(20, 10));
//! sim.move_selected(destination);
//! sim.tick();
//!
//! assert_eq!(sim.current_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::clock::FpsCounter;
use crate::combat::{apply_damage, engage, Projectile, ProjectileHit, ShotFired};
use crate::config::GameConfig;
use crate::economy::Ledger;
use crate::factions::FactionId;
use crate::grid::{GridCoord, SpatialGrid};
use crate::math::Vec2Fixed;
use crate::movement::{approach_site, move_to_grid, step};
use crate::placement::{can_place_facility, PlacementPreview};
use crate::production::{
    BuilderLookup, BuilderPresence, Facility, FacilityContext, FacilityId, FacilityKind,
    FacilityState, ProductionEvent,
};
use crate::selection::{formation_slots, Selection};
use crate::terrain::TerrainMap;
use crate::units::{Unit, UnitId, UnitKind};

/// Events generated during a tick.
///
/// Front-ends use these for effects and logs; the simulation itself never
/// reads them back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Shots fired this tick.
    pub shots: Vec<ShotFired>,
    /// Projectiles that connected.
    pub hits: Vec<ProjectileHit>,
    /// Units removed at end of tick.
    pub deaths: Vec<UnitId>,
    /// Units created by facilities.
    pub spawned: Vec<UnitId>,
    /// Construction and training transitions.
    pub production: Vec<ProductionEvent>,
}

/// The core game simulation.
///
/// # Phase Order
///
/// Each tick runs, in order:
/// 1. **Facilities** - construction, training, spawning
/// 2. **Builders** - site approach, movement
/// 3. **Fighters** - cooldown, targeting, firing, movement
/// 4. **Projectiles** - flight, hits, removal of spent shots
/// 5. **Cleanup** - dead units leave the grid, their sites and the world
/// 6. **Selection** - dead units are dropped from the selection
#[derive(Debug, Clone)]
pub struct Simulation {
    config: GameConfig,
    tick: u64,
    next_unit_id: u32,
    next_facility_id: u32,
    grid: SpatialGrid,
    terrain: Option<TerrainMap>,
    units: BTreeMap<UnitId, Unit>,
    facilities: BTreeMap<FacilityId, Facility>,
    projectiles: Vec<Projectile>,
    ledger: Ledger,
    selection: Selection,
    placement: Option<FacilityKind>,
    fps: FpsCounter,
}

impl Simulation {
    /// Create an empty field from a configuration.
    ///
    /// Terrain is generated here when the configuration carries a seed.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let grid = SpatialGrid::new(
            config.grid_width,
            config.grid_height,
            config.cell_width(),
            config.cell_height(),
        );
        let terrain = config
            .terrain_seed
            .map(|seed| TerrainMap::generate(grid.width(), grid.height(), seed));

        Self {
            tick: 0,
            next_unit_id: 1,
            next_facility_id: 1,
            grid,
            terrain,
            units: BTreeMap::new(),
            facilities: BTreeMap::new(),
            projectiles: Vec::new(),
            ledger: Ledger::new(config.starting_gems),
            selection: Selection::new(),
            placement: None,
            fps: FpsCounter::new(config.fps_update_interval_ms),
            config,
        }
    }

    /// Replace the terrain. `None` makes the field flat.
    pub fn set_terrain(&mut self, terrain: Option<TerrainMap>) {
        self.terrain = terrain;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current tick number.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated milliseconds since the start.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.config.ticks_to_ms(self.tick)
    }

    /// Match configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Spatial index.
    #[must_use]
    pub const fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Terrain, if any.
    #[must_use]
    pub const fn terrain(&self) -> Option<&TerrainMap> {
        self.terrain.as_ref()
    }

    /// Living units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|unit| unit.is_alive())
    }

    /// A living unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id).filter(|unit| unit.is_alive())
    }

    /// Number of living units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units().count()
    }

    /// Every facility in id order.
    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.values()
    }

    /// A facility by id.
    #[must_use]
    pub fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.get(&id)
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Gems in the shared ledger.
    #[must_use]
    pub const fn gems(&self) -> u32 {
        self.ledger.balance()
    }

    /// The shared ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Facility kind being placed, if placement mode is active.
    #[must_use]
    pub const fn placement_kind(&self) -> Option<FacilityKind> {
        self.placement
    }

    /// Last published frame rate.
    #[must_use]
    pub const fn fps(&self) -> u32 {
        self.fps.fps()
    }

    /// Vertical hop offset for drawing a unit, in pixels.
    #[must_use]
    pub fn hop_offset(&self, id: UnitId) -> f32 {
        let Some(unit) = self.unit(id) else {
            return 0.0;
        };
        let ticks = self.tick.saturating_sub(unit.spawn_tick);
        #[allow(clippy::cast_precision_loss)]
        let elapsed_ms = self.config.ticks_to_ms(ticks) as f32;
        unit.hop_offset(elapsed_ms)
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Add a unit standing on `anchor` (clamped into the field).
    pub fn spawn_unit(&mut self, kind: UnitKind, faction: FactionId, anchor: GridCoord) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;

        let anchor = self.grid.clamp_anchor(anchor);
        let position = self.grid.grid_to_pixel(anchor);
        let mut unit = Unit::new(id, kind, faction, anchor, position, self.config.units.get(kind));
        unit.spawn_tick = self.tick;

        self.grid.add(id, anchor);
        self.units.insert(id, unit);

        tracing::debug!(unit = %id, %kind, %faction, x = anchor.x, y = anchor.y, "Unit spawned");
        id
    }

    /// Add a facility without validation or charge.
    ///
    /// Used to lay out scenarios. `complete` skips construction.
    pub fn insert_facility(
        &mut self,
        kind: FacilityKind,
        faction: FactionId,
        anchor: GridCoord,
        complete: bool,
    ) -> FacilityId {
        let state = if complete {
            FacilityState::Complete
        } else {
            FacilityState::Constructing
        };
        self.insert_facility_with_state(kind, faction, anchor, state)
    }

    /// Add a facility in an explicit lifecycle state.
    pub fn insert_facility_with_state(
        &mut self,
        kind: FacilityKind,
        faction: FactionId,
        anchor: GridCoord,
        state: FacilityState,
    ) -> FacilityId {
        let id = FacilityId(self.next_facility_id);
        self.next_facility_id += 1;

        let profile = self.config.facilities.get(kind);
        let facility = Facility::new(
            id,
            kind,
            faction,
            anchor,
            profile,
            self.config.seconds_to_ticks(profile.construction_seconds),
            self.config.seconds_to_ticks(profile.training_seconds),
        )
        .with_state(state);
        self.facilities.insert(id, facility);
        id
    }

    /// Assign a builder to a constructing facility.
    ///
    /// Any previous assignment is released on both sides. Returns false
    /// for non-builders, dead units and finished or missing facilities.
    pub fn assign_builder(&mut self, builder: UnitId, site: FacilityId) -> bool {
        let eligible = self.unit(builder).is_some_and(Unit::is_builder)
            && self.facilities.get(&site).is_some_and(|facility| !facility.is_complete());
        if !eligible {
            return false;
        }

        self.release_builder(builder);
        if let Some(unit) = self.units.get_mut(&builder) {
            unit.set_build_site(Some(site));
        }
        if let Some(facility) = self.facilities.get_mut(&site) {
            facility.assign_builder(builder);
        }
        true
    }

    /// Clear a builder's assignment on both sides.
    fn release_builder(&mut self, builder: UnitId) {
        let Some(unit) = self.units.get_mut(&builder) else {
            return;
        };
        if let Some(site) = unit.build_site() {
            unit.set_build_site(None);
            if let Some(facility) = self.facilities.get_mut(&site) {
                facility.release_builder(builder);
            }
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();

        self.run_facility_phase(&mut events);

        let mut builders = Vec::new();
        let mut fighters = Vec::new();
        for unit in self.units.values().filter(|unit| unit.is_alive()) {
            if unit.is_builder() {
                builders.push(unit.id);
            } else {
                fighters.push(unit.id);
            }
        }

        for id in builders {
            self.update_unit(id, true, &mut events);
        }
        for id in fighters {
            self.update_unit(id, false, &mut events);
        }

        self.run_projectile_phase(&mut events);
        self.run_cleanup_phase(&mut events);

        let units = &self.units;
        self.selection
            .retain(|id| units.get(&id).is_some_and(Unit::is_alive));

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.validate();

        events
    }

    fn run_facility_phase(&mut self, events: &mut TickEvents) {
        let builders: Vec<(UnitId, BuilderPresence)> = self
            .units
            .values()
            .filter_map(|unit| {
                unit.build.map(|build| {
                    (
                        unit.id,
                        BuilderPresence {
                            cell: self.grid.pixel_to_grid(unit.position),
                            range: build.range,
                            alive: unit.is_alive(),
                        },
                    )
                })
            })
            .collect();

        let ids: Vec<FacilityId> = self.facilities.keys().copied().collect();
        for id in ids {
            let produced = {
                let Some(facility) = self.facilities.get_mut(&id) else {
                    continue;
                };
                let mut ctx = FacilityContext {
                    tick: self.tick,
                    builders: BuilderLookup::new(&builders),
                    grid: &self.grid,
                    ledger: &mut self.ledger,
                    roster: &self.config.units,
                };
                facility.update(&mut ctx)
            };

            // Spawns go in immediately so the next facility sees them.
            for event in &produced {
                match event {
                    ProductionEvent::UnitReady {
                        kind,
                        faction,
                        anchor,
                        ..
                    } => {
                        let unit = self.spawn_unit(*kind, *faction, *anchor);
                        events.spawned.push(unit);
                    }
                    ProductionEvent::ConstructionComplete { released, .. } => {
                        for builder in released {
                            if let Some(unit) = self.units.get_mut(builder) {
                                unit.set_build_site(None);
                            }
                        }
                    }
                    ProductionEvent::TrainingStarted { .. } | ProductionEvent::SpawnBlocked { .. } => {}
                }
            }
            events.production.extend(produced);
        }
    }

    /// Run one unit's turn. The unit is taken out of the map while it acts
    /// so targeting sees everyone else.
    fn update_unit(&mut self, id: UnitId, builder_phase: bool, events: &mut TickEvents) {
        let Some(mut unit) = self.units.remove(&id) else {
            return;
        };

        if builder_phase {
            if let Some(site) = unit.build_site() {
                match self.facilities.get(&site) {
                    Some(facility) if !facility.is_complete() => {
                        approach_site(&mut unit, facility.center(), facility.approach_point(), &self.grid);
                    }
                    _ => unit.set_build_site(None),
                }
            }
        }

        if let Some((projectile, shot)) =
            engage(&mut unit, &self.units, &self.grid, &self.config.projectile)
        {
            self.projectiles.push(projectile);
            events.shots.push(shot);
        }

        step(&mut unit, &mut self.grid, self.terrain.as_ref());
        self.units.insert(id, unit);
    }

    fn run_projectile_phase(&mut self, events: &mut TickEvents) {
        let mut projectiles = std::mem::take(&mut self.projectiles);

        for projectile in &mut projectiles {
            let Some(target) = projectile.update(&self.grid, &self.units) else {
                continue;
            };
            let Some(unit) = self.units.get_mut(&target) else {
                continue;
            };
            let killed = apply_damage(unit, projectile.damage, &mut self.grid);
            tracing::trace!(
                source = %projectile.source,
                target = %target,
                damage = projectile.damage,
                killed,
                "Projectile hit"
            );
            events.hits.push(ProjectileHit {
                source: projectile.source,
                target,
                damage: projectile.damage,
                killed,
            });
        }

        projectiles.retain(|projectile| projectile.active);
        self.projectiles = projectiles;
    }

    fn run_cleanup_phase(&mut self, events: &mut TickEvents) {
        let dead: Vec<UnitId> = self
            .units
            .values()
            .filter(|unit| !unit.is_alive())
            .map(|unit| unit.id)
            .collect();

        for id in dead {
            self.release_builder(id);
            self.grid.remove(id);
            self.units.remove(&id);
            tracing::debug!(unit = %id, tick = self.tick, "Unit removed");
            events.deaths.push(id);
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        debug_assert!(self.grid.is_consistent(), "grid index out of sync");
        for unit in self.units.values() {
            debug_assert_eq!(
                self.grid.anchor_of(unit.id),
                Some(unit.anchor),
                "unit {} anchor out of sync",
                unit.id
            );
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Select a unit, replacing the selection unless `additive`.
    pub fn select_unit(&mut self, id: UnitId, additive: bool) -> bool {
        if self.unit(id).is_none() {
            return false;
        }
        if !additive {
            self.deselect_all();
        }
        if let Some(unit) = self.units.get_mut(&id) {
            unit.selected = true;
        }
        self.selection.select(id);
        true
    }

    /// Select every living unit whose pixel position lies in the box.
    ///
    /// Corners may be given in any order; edges are inclusive. Returns the
    /// number of units now selected.
    pub fn select_in_box(&mut self, corner_a: Vec2Fixed, corner_b: Vec2Fixed, additive: bool) -> usize {
        if !additive {
            self.deselect_all();
        }

        let min = Vec2Fixed::new(corner_a.x.min(corner_b.x), corner_a.y.min(corner_b.y));
        let max = Vec2Fixed::new(corner_a.x.max(corner_b.x), corner_a.y.max(corner_b.y));

        for unit in self.units.values_mut() {
            let p = unit.position;
            if unit.is_alive() && p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y {
                unit.selected = true;
                self.selection.select(unit.id);
            }
        }
        self.selection.len()
    }

    /// Clear the unit selection.
    pub fn deselect_all(&mut self) {
        for unit in self.units.values_mut() {
            unit.selected = false;
        }
        let facility = self.selection.facility();
        self.selection.clear();
        self.selection.select_facility(facility);
    }

    /// Select a facility, or clear the facility selection with `None`.
    pub fn select_facility(&mut self, id: Option<FacilityId>) -> bool {
        let id = id.filter(|id| self.facilities.contains_key(id));
        for facility in self.facilities.values_mut() {
            facility.selected = Some(facility.id) == id;
        }
        self.selection.select_facility(id);
        id.is_some()
    }

    /// Order the selection to a pixel destination.
    ///
    /// Only units of the first selected unit's faction move. Several units
    /// spread into a square formation; builders among them drop their site.
    /// Returns the number of units ordered.
    pub fn move_selected(&mut self, destination: Vec2Fixed) -> usize {
        let Some(faction) = self
            .selection
            .units()
            .iter()
            .find_map(|id| self.unit(*id))
            .map(|unit| unit.faction)
        else {
            return 0;
        };

        let movers: Vec<UnitId> = self
            .selection
            .units()
            .iter()
            .copied()
            .filter(|id| self.unit(*id).is_some_and(|unit| unit.faction == faction))
            .collect();

        let center = self.grid.pixel_to_grid(destination);
        let slots = if movers.len() == 1 {
            vec![center]
        } else {
            formation_slots(center, movers.len())
                .into_iter()
                .map(|slot| self.grid.clamp_anchor(slot))
                .collect()
        };

        for (id, slot) in movers.iter().zip(slots) {
            self.release_builder(*id);
            if let Some(unit) = self.units.get_mut(id) {
                move_to_grid(unit, slot, &self.grid);
            }
        }

        tracing::debug!(count = movers.len(), x = center.x, y = center.y, "Move ordered");
        movers.len()
    }

    /// Halt the selection where it stands and leave placement mode.
    pub fn stop_selected(&mut self) {
        for id in self.selection.units() {
            if let Some(unit) = self.units.get_mut(id) {
                unit.target = unit.anchor;
            }
        }
        self.placement = None;
    }

    /// Enter placement mode for `kind` if its cost is covered.
    pub fn begin_placement(&mut self, kind: FacilityKind) -> bool {
        if !self.ledger.can_afford(self.config.facilities.get(kind).cost) {
            return false;
        }
        self.placement = Some(kind);
        true
    }

    /// Leave placement mode.
    pub fn cancel_placement(&mut self) {
        self.placement = None;
    }

    /// Ghost footprint for the pending placement at `anchor`.
    #[must_use]
    pub fn preview_placement(&self, anchor: GridCoord) -> Option<PlacementPreview> {
        let kind = self.placement?;
        let size = self.config.facilities.get(kind).size;
        Some(PlacementPreview::new(
            &self.grid,
            self.facilities.values(),
            anchor,
            size,
        ))
    }

    /// Place the pending facility for `faction` at `anchor`.
    ///
    /// Requires placement mode, a free footprint and enough gems. On success
    /// the cost is withdrawn, selected living builders of `faction` are
    /// assigned and placement mode ends.
    pub fn commit_placement(&mut self, anchor: GridCoord, faction: FactionId) -> Option<FacilityId> {
        let kind = self.placement?;
        let profile = self.config.facilities.get(kind);

        if !can_place_facility(&self.grid, self.facilities.values(), anchor, profile.size).is_valid() {
            return None;
        }
        if !self.ledger.withdraw(profile.cost) {
            return None;
        }

        let id = self.insert_facility(kind, faction, anchor, false);

        let builders: Vec<UnitId> = self
            .selection
            .units()
            .iter()
            .copied()
            .filter(|id| {
                self.unit(*id)
                    .is_some_and(|unit| unit.is_builder() && unit.faction == faction)
            })
            .collect();
        for builder in &builders {
            self.assign_builder(*builder, id);
        }

        self.placement = None;
        tracing::debug!(
            facility = %id,
            %kind,
            %faction,
            x = anchor.x,
            y = anchor.y,
            builders = builders.len(),
            "Facility placed"
        );
        Some(id)
    }

    /// Queue a unit on a facility if it is allowed there and affordable.
    pub fn train_unit(&mut self, facility: FacilityId, kind: UnitKind) -> bool {
        let cost = self.config.units.get(kind).cost;
        let balance = self.ledger.balance();
        let Some(facility) = self.facilities.get_mut(&facility) else {
            return false;
        };
        facility.queue_training(kind, cost, balance)
    }

    /// Feed the frame counter a real timestamp.
    pub fn record_frame(&mut self, now_ms: u64) -> Option<u32> {
        self.fps.record_frame(now_ms)
    }

    // ------------------------------------------------------------------
    // Hashing
    // ------------------------------------------------------------------

    /// Hash of everything that influences future ticks.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.ledger.hash(&mut hasher);
        self.placement.hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in self.units.values() {
            unit.id.hash(&mut hasher);
            unit.kind.hash(&mut hasher);
            unit.faction.hash(&mut hasher);
            unit.anchor.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.target.hash(&mut hasher);
            unit.health.hash(&mut hasher);
            unit.combat.hash(&mut hasher);
            unit.build.hash(&mut hasher);
            unit.is_moving.hash(&mut hasher);
        }

        self.facilities.len().hash(&mut hasher);
        for facility in self.facilities.values() {
            facility.id.hash(&mut hasher);
            facility.kind.hash(&mut hasher);
            facility.faction.hash(&mut hasher);
            facility.anchor.hash(&mut hasher);
            facility.state().hash(&mut hasher);
            facility.construction_progress().to_bits().hash(&mut hasher);
            facility.current_job().hash(&mut hasher);
            facility.queue().hash(&mut hasher);
            facility.builders().hash(&mut hasher);
        }

        self.projectiles.hash(&mut hasher);
        self.selection.units().hash(&mut hasher);

        hasher.finish()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulation {
        Simulation::new(GameConfig::default())
    }

    fn quick_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.facilities.training_facility.construction_seconds = 1;
        config.facilities.training_facility.training_seconds = 1;
        config
    }

    #[test]
    fn test_new_simulation() {
        let sim = sim();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.gems(), 45);
        assert_eq!(sim.unit_count(), 0);
        assert!(sim.terrain().is_none());
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut sim = sim();
        for _ in 0..3 {
            sim.tick();
        }
        assert_eq!(sim.current_tick(), 3);
        assert_eq!(sim.elapsed_ms(), 50);
        for _ in 3..60 {
            sim.tick();
        }
        assert_eq!(sim.elapsed_ms(), 1000);
    }

    #[test]
    fn test_spawn_registers_footprint() {
        let mut sim = sim();
        let id = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(30, 40));
        assert_eq!(sim.grid().anchor_of(id), Some(GridCoord::new(30, 40)));
        assert!(sim.grid().is_occupied(GridCoord::new(31, 41), None));

        let clamped = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(500, -3));
        assert_eq!(sim.unit(clamped).map(|unit| unit.anchor), Some(GridCoord::new(198, 0)));
    }

    #[test]
    fn test_builder_in_range_advances_construction() {
        let mut sim = sim();
        let site = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            false,
        );
        let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(25, 35));
        assert!(sim.assign_builder(builder, site));

        for _ in 0..10 {
            sim.tick();
        }

        let facility = sim.facility(site).unwrap();
        assert_eq!(facility.construction_remaining(), 890);
        assert_eq!(sim.unit(builder).unwrap().anchor, GridCoord::new(25, 35));
    }

    #[test]
    fn test_construction_without_builder_stalls() {
        let mut sim = sim();
        let site = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            false,
        );
        for _ in 0..20 {
            sim.tick();
        }
        assert_eq!(sim.facility(site).unwrap().construction_remaining(), 900);
    }

    #[test]
    fn test_idle_site_starts_when_builder_assigned() {
        let mut sim = sim();
        let site = sim.insert_facility_with_state(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            FacilityState::Idle,
        );
        let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(25, 35));
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.facility(site).unwrap().construction_remaining(), 900);
        assert_eq!(sim.facility(site).unwrap().state(), FacilityState::Idle);

        assert!(sim.assign_builder(builder, site));
        for _ in 0..10 {
            sim.tick();
        }
        let facility = sim.facility(site).unwrap();
        assert_eq!(facility.state(), FacilityState::Constructing);
        assert_eq!(facility.construction_remaining(), 890);
    }

    #[test]
    fn test_construction_completes_and_releases_builders() {
        let mut sim = Simulation::new(quick_config());
        let site = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            false,
        );
        let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(25, 35));
        sim.assign_builder(builder, site);

        let mut completed = 0;
        for _ in 0..60 {
            let events = sim.tick();
            completed += events
                .production
                .iter()
                .filter(|event| matches!(event, ProductionEvent::ConstructionComplete { .. }))
                .count();
        }

        let facility = sim.facility(site).unwrap();
        assert_eq!(completed, 1);
        assert_eq!(facility.state(), FacilityState::Complete);
        assert!(facility.builders().is_empty());
        assert_eq!(sim.unit(builder).unwrap().build_site(), None);
        assert!(!sim.assign_builder(builder, site));
    }

    #[test]
    fn test_training_charges_when_job_starts() {
        let mut sim = Simulation::new(quick_config());
        let site = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            true,
        );

        assert!(sim.train_unit(site, UnitKind::Caveman));
        assert_eq!(sim.gems(), 45);

        sim.tick();
        assert_eq!(sim.gems(), 43);

        let mut spawned = Vec::new();
        for _ in 1..60 {
            spawned.extend(sim.tick().spawned);
        }
        assert!(spawned.is_empty());

        spawned.extend(sim.tick().spawned);
        assert_eq!(spawned.len(), 1);
        let unit = sim.unit(spawned[0]).unwrap();
        assert_eq!(unit.kind, UnitKind::Caveman);
        assert_eq!(unit.anchor, GridCoord::new(25, 40));
        assert_eq!(unit.spawn_tick, 60);
        assert_eq!(sim.gems(), 43);
    }

    #[test]
    fn test_training_waits_for_funds() {
        let mut config = quick_config();
        config.starting_gems = 4;
        let mut sim = Simulation::new(config);
        let site = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            true,
        );

        assert!(sim.train_unit(site, UnitKind::Hunter));
        assert!(sim.train_unit(site, UnitKind::Hunter));
        sim.tick();
        assert_eq!(sim.gems(), 0);

        for _ in 0..200 {
            sim.tick();
        }
        let facility = sim.facility(site).unwrap();
        assert_eq!(facility.queue_len(), 1);
        assert!(facility.current_job().is_none());
        assert_eq!(sim.unit_count(), 1);
    }

    #[test]
    fn test_train_respects_roster_and_balance() {
        let mut config = GameConfig::default();
        config.starting_gems = 3;
        let mut sim = Simulation::new(config);
        let lodge = sim.insert_facility(
            FacilityKind::HuntersLodge,
            FactionId::Red,
            GridCoord::new(20, 30),
            true,
        );
        let hall = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(60, 30),
            true,
        );

        assert!(!sim.train_unit(lodge, UnitKind::Caveman));
        assert!(!sim.train_unit(lodge, UnitKind::Hunter));
        assert!(sim.train_unit(hall, UnitKind::Miner));
        assert!(!sim.train_unit(FacilityId(99), UnitKind::Caveman));
    }

    #[test]
    fn test_placement_requires_mode_and_funds() {
        let mut config = GameConfig::default();
        config.starting_gems = 9;
        let mut sim = Simulation::new(config);

        assert_eq!(sim.commit_placement(GridCoord::new(50, 50), FactionId::Red), None);
        assert!(!sim.begin_placement(FacilityKind::TrainingFacility));
        assert_eq!(sim.placement_kind(), None);
        assert!(sim.preview_placement(GridCoord::new(50, 50)).is_none());
    }

    #[test]
    fn test_commit_placement_charges_and_assigns_builders() {
        let mut sim = sim();
        let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(60, 60));
        let enemy = sim.spawn_unit(UnitKind::Builder, FactionId::Blue, GridCoord::new(70, 70));
        sim.select_unit(builder, false);
        sim.select_unit(enemy, true);

        assert!(sim.begin_placement(FacilityKind::TrainingFacility));
        let preview = sim.preview_placement(GridCoord::new(40, 40)).unwrap();
        assert!(preview.is_valid);

        let site = sim
            .commit_placement(GridCoord::new(40, 40), FactionId::Red)
            .unwrap();
        let facility = sim.facility(site).unwrap();

        assert_eq!(sim.gems(), 35);
        assert_eq!(facility.state(), FacilityState::Constructing);
        assert_eq!(facility.builders(), &[builder]);
        assert_eq!(sim.unit(builder).unwrap().build_site(), Some(site));
        assert_eq!(sim.unit(enemy).unwrap().build_site(), None);
        assert_eq!(sim.placement_kind(), None);
    }

    #[test]
    fn test_blocked_placement_is_rejected_without_charge() {
        let mut sim = sim();
        sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(45, 45));
        sim.begin_placement(FacilityKind::TrainingFacility);

        assert_eq!(sim.commit_placement(GridCoord::new(40, 40), FactionId::Red), None);
        assert_eq!(sim.commit_placement(GridCoord::new(195, 40), FactionId::Red), None);
        assert_eq!(sim.gems(), 45);
        assert_eq!(sim.placement_kind(), Some(FacilityKind::TrainingFacility));

        sim.cancel_placement();
        assert_eq!(sim.placement_kind(), None);
    }

    #[test]
    fn test_stop_halts_and_cancels_placement() {
        let mut sim = sim();
        let id = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
        sim.select_unit(id, false);
        sim.move_selected(sim.grid().grid_to_pixel(GridCoord::new(80, 10)));
        sim.begin_placement(FacilityKind::TrainingFacility);
        sim.tick();

        sim.stop_selected();
        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.target, unit.anchor);
        assert_eq!(sim.placement_kind(), None);
    }

    #[test]
    fn test_move_only_orders_first_faction() {
        let mut sim = sim();
        let red_a = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
        let blue = sim.spawn_unit(UnitKind::Caveman, FactionId::Blue, GridCoord::new(20, 10));
        let red_b = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(30, 10));
        sim.select_unit(red_a, false);
        sim.select_unit(blue, true);
        sim.select_unit(red_b, true);

        let moved = sim.move_selected(sim.grid().grid_to_pixel(GridCoord::new(100, 100)));

        assert_eq!(moved, 2);
        assert_eq!(sim.unit(red_a).unwrap().target, GridCoord::new(98, 98));
        assert_eq!(sim.unit(red_b).unwrap().target, GridCoord::new(102, 98));
        assert_eq!(sim.unit(blue).unwrap().target, GridCoord::new(20, 10));
    }

    #[test]
    fn test_single_mover_goes_to_destination() {
        let mut sim = sim();
        let id = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
        sim.select_unit(id, false);
        sim.move_selected(Vec2Fixed::from_ints(401, 301));
        assert_eq!(sim.unit(id).unwrap().target, GridCoord::new(100, 80));
    }

    #[test]
    fn test_formation_is_clamped_at_edges() {
        let mut sim = sim();
        let a = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(50, 50));
        let b = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(60, 50));
        sim.select_unit(a, false);
        sim.select_unit(b, true);

        sim.move_selected(Vec2Fixed::ZERO);

        assert_eq!(sim.unit(a).unwrap().target, GridCoord::new(0, 0));
        assert_eq!(sim.unit(b).unwrap().target, GridCoord::new(2, 0));
    }

    #[test]
    fn test_moving_builder_releases_site() {
        let mut sim = sim();
        let site = sim.insert_facility(
            FacilityKind::TrainingFacility,
            FactionId::Red,
            GridCoord::new(20, 30),
            false,
        );
        let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(25, 35));
        sim.assign_builder(builder, site);
        sim.select_unit(builder, false);

        sim.move_selected(sim.grid().grid_to_pixel(GridCoord::new(100, 100)));

        assert_eq!(sim.unit(builder).unwrap().build_site(), None);
        assert!(sim.facility(site).unwrap().builders().is_empty());
    }

    #[test]
    fn test_selection_by_box() {
        let mut sim = sim();
        let inside = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
        let builder = sim.spawn_unit(UnitKind::Builder, FactionId::Red, GridCoord::new(12, 12));
        let outside = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(50, 50));

        let count = sim.select_in_box(Vec2Fixed::from_ints(60, 60), Vec2Fixed::from_ints(30, 30), false);

        assert_eq!(count, 2);
        assert!(sim.unit(inside).unwrap().selected);
        assert!(sim.unit(builder).unwrap().selected);
        assert!(!sim.unit(outside).unwrap().selected);

        sim.deselect_all();
        assert!(sim.selection().is_empty());
        assert!(sim.units().all(|unit| !unit.selected));
    }

    #[test]
    fn test_select_facility() {
        let mut sim = sim();
        let a = sim.insert_facility(FacilityKind::TrainingFacility, FactionId::Red, GridCoord::new(20, 30), true);
        let b = sim.insert_facility(FacilityKind::HuntersLodge, FactionId::Red, GridCoord::new(60, 30), true);

        assert!(sim.select_facility(Some(a)));
        assert!(sim.select_facility(Some(b)));
        assert!(!sim.facility(a).unwrap().selected);
        assert!(sim.facility(b).unwrap().selected);
        assert_eq!(sim.selection().facility(), Some(b));

        assert!(!sim.select_facility(None));
        assert_eq!(sim.selection().facility(), None);
    }

    #[test]
    fn test_dead_units_leave_world_and_selection() {
        let mut config = GameConfig::default();
        config.units.caveman.health = 1;
        let mut sim = Simulation::new(config);
        let red = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(50, 50));
        let blue = sim.spawn_unit(UnitKind::Caveman, FactionId::Blue, GridCoord::new(60, 50));
        sim.select_unit(red, false);

        let first = sim.tick();
        assert_eq!(first.shots.len(), 2);

        let mut deaths = Vec::new();
        for _ in 0..30 {
            deaths.extend(sim.tick().deaths);
        }

        deaths.sort();
        assert_eq!(deaths, vec![red, blue]);
        assert_eq!(sim.unit_count(), 0);
        assert!(sim.grid().is_empty());
        assert!(sim.selection().is_empty());
        assert!(sim.projectiles().is_empty());
    }

    #[test]
    fn test_distant_factions_hold_fire() {
        let mut sim = sim();
        sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
        sim.spawn_unit(UnitKind::Caveman, FactionId::Blue, GridCoord::new(150, 100));

        for _ in 0..200 {
            assert!(sim.tick().shots.is_empty());
        }
        assert!(sim.projectiles().is_empty());
    }

    #[test]
    fn test_state_hash_is_reproducible() {
        let build = || {
            let mut sim = sim();
            sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(50, 50));
            sim.spawn_unit(UnitKind::Hunter, FactionId::Blue, GridCoord::new(80, 50));
            sim
        };
        let mut a = build();
        let mut b = build();
        assert_eq!(a.state_hash(), b.state_hash());

        let before = a.state_hash();
        for _ in 0..50 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.state_hash(), b.state_hash());
        assert_ne!(a.state_hash(), before);
    }

    #[test]
    fn test_hop_offset_is_zero_for_idle_units() {
        let mut sim = sim();
        let id = sim.spawn_unit(UnitKind::Caveman, FactionId::Red, GridCoord::new(10, 10));
        sim.tick();
        assert!(sim.hop_offset(id).abs() < f32::EPSILON);
        assert!(sim.hop_offset(UnitId(404)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_record_frame_updates_fps() {
        let mut sim = sim();
        assert_eq!(sim.record_frame(0), None);
        assert_eq!(sim.record_frame(500), None);
        assert_eq!(sim.record_frame(1000), Some(3));
        assert_eq!(sim.fps(), 3);
    }

    #[test]
    fn test_generated_terrain_from_seed() {
        let mut config = GameConfig::default();
        config.terrain_seed = Some(7);
        let sim = Simulation::new(config);
        let terrain = sim.terrain().unwrap();
        assert_eq!(terrain.width(), 200);
        assert_eq!(terrain.height(), 160);
    }
}
