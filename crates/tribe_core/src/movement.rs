//! Per-unit movement.
//!
//! Units walk in straight lines from their pixel position toward the
//! pixel centre of their target anchor. There is no global pathfinding;
//! units avoid each other by pushing away from close neighbours, retarget
//! when their goal fills up, and sidestep when the next cell is blocked.
//!
//! One tick of [`step`]:
//!
//! 1. Derive the current cell from the pixel position.
//! 2. If the target is taken by someone else and we are within two cell
//!    widths, retarget to the nearest free anchor (radius 3).
//! 3. Sum a push away from every neighbour closer than 4 cells.
//! 4. Blend the normalized push into the desired delta, half a cell strong.
//! 5. Scale speed by the terrain multiplier of the current cell.
//! 6. Step, or sidestep toward a free cell when the step would enter an
//!    occupied one.
//! 7. Snap onto the target centre once within half a pixel.
//! 8. Re-register with the grid.

use crate::grid::{GridCoord, SpatialGrid};
use crate::math::{Fixed, Vec2Fixed, HALF};
use crate::production::within;
use crate::terrain::TerrainMap;
use crate::units::{Unit, UnitId};

/// Search radius when the target anchor is taken.
pub const RETARGET_RADIUS: i32 = 3;

/// Neighbourhood radius for avoidance.
pub const AVOIDANCE_RADIUS: i32 = 3;

/// Neighbours at or beyond this distance (cells) exert no push.
pub const AVOIDANCE_FALLOFF: i32 = 4;

/// Search radius for a sidestep when the next cell is blocked.
pub const DETOUR_RADIUS: i32 = 2;

/// Pushes smaller than this on both axes are ignored (about 0.01).
const AVOIDANCE_EPSILON: Fixed = Fixed::from_bits(42_949_673);

/// Set a unit's target, clamped into the field.
///
/// An occupied destination is swapped for the nearest free anchor within
/// [`RETARGET_RADIUS`] when one exists; otherwise the clamped cell is kept
/// and the unit gets as close as it can.
pub fn move_to_grid(unit: &mut Unit, target: GridCoord, grid: &SpatialGrid) {
    let target = grid.clamp_anchor(target);
    let me = Some(unit.id);

    unit.target = if grid.is_occupied(target, me) {
        grid.find_nearest_free(target, me, RETARGET_RADIUS)
            .unwrap_or(target)
    } else {
        target
    };
}

/// Set a unit's target from a pixel destination.
pub fn move_to_pixel(unit: &mut Unit, destination: Vec2Fixed, grid: &SpatialGrid) {
    let cell = grid.pixel_to_grid(destination);
    move_to_grid(unit, cell, grid);
}

/// Builder pre-step: hold position inside build range, walk otherwise.
///
/// `center` is the site's centre cell and `approach` the cell to walk to.
/// Units without a build capability are left alone.
pub fn approach_site(unit: &mut Unit, center: GridCoord, approach: GridCoord, grid: &SpatialGrid) {
    let Some(build) = unit.build else {
        return;
    };

    let cell = grid.pixel_to_grid(unit.position);
    if within(cell, center, build.range) {
        unit.target = cell;
    } else {
        move_to_grid(unit, approach, grid);
    }
}

/// Advance one unit by one tick.
pub fn step(unit: &mut Unit, grid: &mut SpatialGrid, terrain: Option<&TerrainMap>) {
    let cell_width = grid.cell_width();
    let cell_height = grid.cell_height();
    let me = Some(unit.id);
    let current = grid.pixel_to_grid(unit.position);

    if current != unit.target && grid.is_occupied(unit.target, me) {
        let target_pixel = grid.grid_to_pixel(unit.target);
        if unit.position.distance(target_pixel) < cell_width * Fixed::from_num(2) {
            if let Some(free) = grid.find_nearest_free(unit.target, me, RETARGET_RADIUS) {
                unit.target = free;
            }
        }
    }

    let push = avoidance(unit.id, unit.anchor, grid);

    let target_pixel = grid.grid_to_pixel(unit.target);
    let mut delta = target_pixel - unit.position;
    let distance = delta.length();
    unit.is_moving = distance > HALF;

    if push.x.abs() > AVOIDANCE_EPSILON || push.y.abs() > AVOIDANCE_EPSILON {
        let away = push.normalize();
        delta.x += away.x * cell_width * HALF;
        delta.y += away.y * cell_height * HALF;
    }

    let multiplier = terrain.map_or(Fixed::ONE, |map| map.speed_multiplier(current));

    if distance > HALF {
        let heading = delta.normalize();
        if heading != Vec2Fixed::ZERO {
            let speed = unit.speed * multiplier;
            let proposed = Vec2Fixed::new(
                unit.position.x + heading.x * speed * cell_width,
                unit.position.y + heading.y * speed * cell_height,
            );
            let next = grid.pixel_to_grid(proposed);

            if next == unit.anchor || !grid.is_occupied(next, me) {
                unit.position = proposed;
            } else if let Some(free) = grid.find_nearest_free(next, me, DETOUR_RADIUS) {
                if free != unit.anchor {
                    let toward = (grid.grid_to_pixel(free) - unit.position).normalize();
                    unit.position.x += toward.x * speed * cell_width * HALF;
                    unit.position.y += toward.y * speed * cell_height * HALF;
                }
            }
        }
    } else {
        unit.is_moving = false;
        if unit.target == unit.anchor || !grid.is_occupied(unit.target, me) {
            unit.position = target_pixel;
        }
    }

    unit.anchor = grid.update(unit.id, unit.position);
}

/// Sum of pushes away from every neighbour within the falloff distance.
///
/// A neighbour at distance `d` contributes the unit vector away from it
/// scaled by `(4 - d) / 4`.
#[must_use]
pub fn avoidance(id: UnitId, anchor: GridCoord, grid: &SpatialGrid) -> Vec2Fixed {
    let falloff = Fixed::from_num(AVOIDANCE_FALLOFF);
    let mut push = Vec2Fixed::ZERO;

    for other in grid.nearby_units(anchor, AVOIDANCE_RADIUS, Some(id)) {
        let Some(other_anchor) = grid.anchor_of(other) else {
            continue;
        };
        let away = anchor.as_vec() - other_anchor.as_vec();
        let distance = away.length();
        if distance > Fixed::ZERO && distance < falloff {
            let strength = (falloff - distance) / falloff;
            push.x += away.x / distance * strength;
            push.y += away.y / distance * strength;
        }
    }

    push
}
