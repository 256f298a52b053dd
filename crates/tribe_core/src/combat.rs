//! Targeting, projectiles and damage.
//!
//! Combat-capable units pick the closest enemy within range, fire a
//! projectile at it and wait out their cooldown. Projectiles fly in a
//! straight line with the velocity fixed at launch and damage the first
//! living enemy whose footprint they enter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ProjectileStats;
use crate::factions::FactionId;
use crate::grid::{GridCoord, SpatialGrid, UNIT_FOOTPRINT};
use crate::math::{Fixed, Vec2Fixed};
use crate::units::{Unit, UnitId};

/// A shot fired this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotFired {
    /// Shooter.
    pub attacker: UnitId,
    /// Unit aimed at.
    pub target: UnitId,
}

/// A projectile that connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileHit {
    /// Shooter.
    pub source: UnitId,
    /// Unit hit.
    pub target: UnitId,
    /// Health removed.
    pub damage: u32,
    /// True when the hit brought the target to zero.
    pub killed: bool,
}

/// A thrown stone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Shooter.
    pub source: UnitId,
    /// Shooter's side; never damages its own side.
    pub faction: FactionId,
    /// Pixel position.
    pub position: Vec2Fixed,
    /// Pixels per tick, fixed at launch.
    pub velocity: Vec2Fixed,
    /// Health removed on hit.
    pub damage: u32,
    /// False once it has hit something or left the field.
    pub active: bool,
}

impl Projectile {
    /// Launch from `from` toward `to`.
    ///
    /// Speed is in cells per tick, so the pixel velocity is scaled by the
    /// cell size on each axis. A zero-length shot never moves.
    #[must_use]
    pub fn launch(
        source: UnitId,
        faction: FactionId,
        from: Vec2Fixed,
        to: Vec2Fixed,
        stats: &ProjectileStats,
        grid: &SpatialGrid,
    ) -> Self {
        let heading = (to - from).normalize();
        let velocity = Vec2Fixed::new(
            heading.x * stats.speed * grid.cell_width(),
            heading.y * stats.speed * grid.cell_height(),
        );
        Self {
            source,
            faction,
            position: from,
            velocity,
            damage: stats.damage,
            active: true,
        }
    }

    /// Move one tick and look for a hit.
    ///
    /// Returns the unit hit, if any. The caller applies the damage.
    pub fn update(&mut self, grid: &SpatialGrid, units: &BTreeMap<UnitId, Unit>) -> Option<UnitId> {
        if !self.active {
            return None;
        }

        self.position += self.velocity;

        let extent = grid.pixel_extent();
        if self.position.x < Fixed::ZERO
            || self.position.x > extent.x
            || self.position.y < Fixed::ZERO
            || self.position.y > extent.y
        {
            self.active = false;
            return None;
        }

        let cell = grid.pixel_to_grid(self.position);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let near = cell.offset(dx, dy);
                for id in grid.units_at(near) {
                    let Some(unit) = units.get(id) else {
                        continue;
                    };
                    if unit.faction != self.faction
                        && unit.is_alive()
                        && covers_pixel(grid, unit.anchor, self.position)
                    {
                        self.active = false;
                        return Some(*id);
                    }
                }
            }
        }

        None
    }
}

/// True when `pixel` lies in the 2×2 footprint anchored at `anchor`.
#[must_use]
pub fn covers_pixel(grid: &SpatialGrid, anchor: GridCoord, pixel: Vec2Fixed) -> bool {
    let left = Fixed::from_num(anchor.x) * grid.cell_width();
    let top = Fixed::from_num(anchor.y) * grid.cell_height();
    let width = grid.cell_width() * Fixed::from_num(UNIT_FOOTPRINT);
    let height = grid.cell_height() * Fixed::from_num(UNIT_FOOTPRINT);

    pixel.x >= left && pixel.x < left + width && pixel.y >= top && pixel.y < top + height
}

/// Closest living enemy of `attacker` within its attack range.
///
/// Ties go to the first candidate in grid scan order.
#[must_use]
pub fn closest_enemy(
    attacker: &Unit,
    range: i32,
    units: &BTreeMap<UnitId, Unit>,
    grid: &SpatialGrid,
) -> Option<UnitId> {
    let range_sq = i64::from(range) * i64::from(range);
    let mut best: Option<(i64, UnitId)> = None;

    for id in grid.nearby_units(attacker.anchor, range, Some(attacker.id)) {
        let Some(other) = units.get(&id) else {
            continue;
        };
        if !attacker.faction.is_hostile_to(other.faction) || !other.is_alive() {
            continue;
        }
        let dx = i64::from(other.anchor.x - attacker.anchor.x);
        let dy = i64::from(other.anchor.y - attacker.anchor.y);
        let dist_sq = dx * dx + dy * dy;
        if dist_sq <= range_sq && best.map_or(true, |(closest, _)| dist_sq < closest) {
            best = Some((dist_sq, id));
        }
    }

    best.map(|(_, id)| id)
}

/// Count down the cooldown and fire at the closest enemy when ready.
///
/// `attacker` must not be in `units`. Units without a combat capability
/// never fire.
pub fn engage(
    attacker: &mut Unit,
    units: &BTreeMap<UnitId, Unit>,
    grid: &SpatialGrid,
    stats: &ProjectileStats,
) -> Option<(Projectile, ShotFired)> {
    let mut combat = attacker.combat?;
    combat.tick_cooldown();
    attacker.combat = Some(combat);

    if !combat.is_ready() {
        return None;
    }

    let target_id = closest_enemy(attacker, combat.range, units, grid)?;
    let target = units.get(&target_id)?;
    let aim = grid.grid_to_pixel(target.anchor);

    let projectile = Projectile::launch(attacker.id, attacker.faction, attacker.position, aim, stats, grid);
    combat.reset();
    attacker.combat = Some(combat);

    Some((
        projectile,
        ShotFired {
            attacker: attacker.id,
            target: target_id,
        },
    ))
}

/// Damage a unit, dropping it from the grid the moment it dies.
///
/// Returns true if this hit killed it.
pub fn apply_damage(unit: &mut Unit, amount: u32, grid: &mut SpatialGrid) -> bool {
    let killed = unit.health.apply_damage(amount);
    if unit.health.is_dead() {
        grid.remove(unit.id);
    }
    killed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitRoster;
    use crate::units::UnitKind;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(200, 160, Fixed::from_num(4), Fixed::from_num(3.75))
    }

    fn place(
        grid: &mut SpatialGrid,
        units: &mut BTreeMap<UnitId, Unit>,
        id: u32,
        faction: FactionId,
        x: i32,
        y: i32,
    ) -> UnitId {
        let anchor = GridCoord::new(x, y);
        let unit = Unit::new(
            UnitId(id),
            UnitKind::Caveman,
            faction,
            anchor,
            grid.grid_to_pixel(anchor),
            UnitRoster::default().get(UnitKind::Caveman),
        );
        grid.add(unit.id, anchor);
        units.insert(unit.id, unit);
        UnitId(id)
    }

    #[test]
    fn test_launch_velocity_scales_by_cell() {
        let grid = grid();
        let stats = ProjectileStats::default();
        let shot = Projectile::launch(
            UnitId(1),
            FactionId::Red,
            Vec2Fixed::from_ints(100, 100),
            Vec2Fixed::from_ints(200, 100),
            &stats,
            &grid,
        );
        assert_eq!(shot.velocity, Vec2Fixed::from_ints(4, 0));

        let down = Projectile::launch(
            UnitId(1),
            FactionId::Red,
            Vec2Fixed::from_ints(100, 100),
            Vec2Fixed::from_ints(100, 300),
            &stats,
            &grid,
        );
        assert_eq!(down.velocity, Vec2Fixed::new(Fixed::ZERO, Fixed::from_num(3.75)));
    }

    #[test]
    fn test_zero_length_shot_stays_put() {
        let grid = grid();
        let here = Vec2Fixed::from_ints(50, 50);
        let shot = Projectile::launch(UnitId(1), FactionId::Red, here, here, &ProjectileStats::default(), &grid);
        assert_eq!(shot.velocity, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_projectile_leaves_field() {
        let grid = grid();
        let units = BTreeMap::new();
        let mut shot = Projectile::launch(
            UnitId(1),
            FactionId::Red,
            Vec2Fixed::from_ints(2, 50),
            Vec2Fixed::from_ints(-100, 50),
            &ProjectileStats::default(),
            &grid,
        );
        assert_eq!(shot.update(&grid, &units), None);
        assert!(!shot.active);
        assert_eq!(shot.update(&grid, &units), None);
    }

    #[test]
    fn test_projectile_hits_enemy_not_friend() {
        let mut grid = grid();
        let mut units = BTreeMap::new();
        let friend = place(&mut grid, &mut units, 1, FactionId::Red, 30, 26);
        let enemy = place(&mut grid, &mut units, 2, FactionId::Blue, 50, 26);

        let from = grid.grid_to_pixel(GridCoord::new(20, 26));
        let to = grid.grid_to_pixel(GridCoord::new(50, 26));
        let mut shot = Projectile::launch(UnitId(9), FactionId::Red, from, to, &ProjectileStats::default(), &grid);

        let mut hit = None;
        for _ in 0..40 {
            if let Some(id) = shot.update(&grid, &units) {
                hit = Some(id);
                break;
            }
        }
        assert_eq!(hit, Some(enemy));
        assert_ne!(hit, Some(friend));
        assert!(!shot.active);
    }

    #[test]
    fn test_closest_enemy_in_range() {
        let mut grid = grid();
        let mut units = BTreeMap::new();
        let me = place(&mut grid, &mut units, 1, FactionId::Red, 50, 50);
        place(&mut grid, &mut units, 2, FactionId::Blue, 60, 50);
        let near = place(&mut grid, &mut units, 3, FactionId::Blue, 55, 50);
        place(&mut grid, &mut units, 4, FactionId::Red, 52, 50);

        let attacker = units.remove(&me).unwrap();
        assert_eq!(closest_enemy(&attacker, 20, &units, &grid), Some(near));
        assert_eq!(closest_enemy(&attacker, 4, &units, &grid), None);
    }

    #[test]
    fn test_box_corner_outside_circle_is_ignored() {
        let mut grid = grid();
        let mut units = BTreeMap::new();
        let me = place(&mut grid, &mut units, 1, FactionId::Red, 50, 50);
        place(&mut grid, &mut units, 2, FactionId::Blue, 54, 54);

        let attacker = units.remove(&me).unwrap();
        // Inside the radius-4 box but sqrt(32) > 4.
        assert_eq!(closest_enemy(&attacker, 4, &units, &grid), None);
    }

    #[test]
    fn test_engage_respects_cooldown() {
        let mut grid = grid();
        let mut units = BTreeMap::new();
        let me = place(&mut grid, &mut units, 1, FactionId::Red, 50, 50);
        place(&mut grid, &mut units, 2, FactionId::Blue, 60, 50);
        let mut attacker = units.remove(&me).unwrap();
        let stats = ProjectileStats::default();

        let (_, shot) = engage(&mut attacker, &units, &grid, &stats).unwrap();
        assert_eq!(shot.target, UnitId(2));
        assert_eq!(attacker.combat.unwrap().cooldown, 60);

        let mut fired = 0;
        for _ in 0..60 {
            if engage(&mut attacker, &units, &grid, &stats).is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_engage_without_enemies_keeps_ready() {
        let mut grid = grid();
        let mut units = BTreeMap::new();
        let me = place(&mut grid, &mut units, 1, FactionId::Red, 50, 50);
        let mut attacker = units.remove(&me).unwrap();
        assert!(engage(&mut attacker, &units, &grid, &ProjectileStats::default()).is_none());
        assert!(attacker.combat.unwrap().is_ready());
    }

    #[test]
    fn test_lethal_damage_removes_from_grid() {
        let mut grid = grid();
        let mut units = BTreeMap::new();
        let id = place(&mut grid, &mut units, 1, FactionId::Blue, 10, 10);
        let unit = units.get_mut(&id).unwrap();

        assert!(!apply_damage(unit, 9, &mut grid));
        assert!(grid.contains(id));
        assert!(apply_damage(unit, 5, &mut grid));
        assert_eq!(unit.health.current, 0);
        assert!(!grid.contains(id));
        assert!(grid.cells_containing(id).is_empty());
    }
}
