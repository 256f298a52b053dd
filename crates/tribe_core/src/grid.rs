//! Uniform-cell spatial index.
//!
//! Every unit covers a 2×2 block of cells anchored at its top-left
//! [`GridCoord`]. The grid stores unit ids only; the units themselves are
//! owned by [`crate::simulation::Simulation`]. The grid also records each
//! unit's current anchor so neighbour queries never need the unit
//! collection.
//!
//! Scan order is fixed everywhere: rows top to bottom, columns left to
//! right, and within a cell the order units were inserted. Queries that
//! return "the first" match follow that order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed, HALF};
use crate::units::UnitId;

/// Side length, in cells, of a unit footprint.
pub const UNIT_FOOTPRINT: i32 = 2;

/// Integer cell index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct GridCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridCoord {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by a delta.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance between two cells.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        self.as_vec().distance(other.as_vec())
    }

    /// The coordinate as a fixed-point vector in cell units.
    #[must_use]
    pub fn as_vec(self) -> Vec2Fixed {
        Vec2Fixed::from_ints(self.x, self.y)
    }
}

/// Spatial index over a `width × height` cell field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialGrid {
    width: i32,
    height: i32,
    #[serde(with = "crate::math::fixed_serde")]
    cell_width: Fixed,
    #[serde(with = "crate::math::fixed_serde")]
    cell_height: Fixed,
    cells: Vec<Vec<UnitId>>,
    anchors: BTreeMap<UnitId, GridCoord>,
}

impl SpatialGrid {
    /// Create an empty grid.
    ///
    /// Dimensions are clamped to at least one footprint so that
    /// [`SpatialGrid::clamp_anchor`] always has a valid range.
    #[must_use]
    pub fn new(width: i32, height: i32, cell_width: Fixed, cell_height: Fixed) -> Self {
        let width = width.max(UNIT_FOOTPRINT);
        let height = height.max(UNIT_FOOTPRINT);
        #[allow(clippy::cast_sign_loss)]
        let len = (width * height) as usize;
        Self {
            width,
            height,
            cell_width,
            cell_height,
            cells: vec![Vec::new(); len],
            anchors: BTreeMap::new(),
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Pixel width of one cell.
    #[must_use]
    pub const fn cell_width(&self) -> Fixed {
        self.cell_width
    }

    /// Pixel height of one cell.
    #[must_use]
    pub const fn cell_height(&self) -> Fixed {
        self.cell_height
    }

    /// Pixel extent of the whole field.
    #[must_use]
    pub fn pixel_extent(&self) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(self.width) * self.cell_width,
            Fixed::from_num(self.height) * self.cell_height,
        )
    }

    /// True when the cell lies inside the field.
    #[must_use]
    pub const fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    /// Clamp an anchor so the whole footprint stays in the field.
    #[must_use]
    pub fn clamp_anchor(&self, coord: GridCoord) -> GridCoord {
        GridCoord::new(
            coord.x.clamp(0, self.width - UNIT_FOOTPRINT),
            coord.y.clamp(0, self.height - UNIT_FOOTPRINT),
        )
    }

    /// Convert a pixel position to the cell containing it, clamped to the field.
    #[must_use]
    pub fn pixel_to_grid(&self, pixel: Vec2Fixed) -> GridCoord {
        let gx: i32 = (pixel.x / self.cell_width).floor().to_num();
        let gy: i32 = (pixel.y / self.cell_height).floor().to_num();
        GridCoord::new(gx.clamp(0, self.width - 1), gy.clamp(0, self.height - 1))
    }

    /// Pixel centre of a cell.
    #[must_use]
    pub fn grid_to_pixel(&self, coord: GridCoord) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(coord.x) * self.cell_width + self.cell_width * HALF,
            Fixed::from_num(coord.y) * self.cell_height + self.cell_height * HALF,
        )
    }

    /// Register `id` at `anchor`, covering every in-bounds footprint cell.
    ///
    /// A unit that is already registered is moved.
    pub fn add(&mut self, id: UnitId, anchor: GridCoord) {
        self.remove(id);
        for cell in footprint(anchor) {
            if let Some(index) = self.index(cell) {
                let slot = &mut self.cells[index];
                if !slot.contains(&id) {
                    slot.push(id);
                }
            }
        }
        self.anchors.insert(id, anchor);
    }

    /// Drop `id` from its recorded footprint. No-op for unknown ids.
    pub fn remove(&mut self, id: UnitId) {
        let Some(anchor) = self.anchors.remove(&id) else {
            return;
        };
        for cell in footprint(anchor) {
            if let Some(index) = self.index(cell) {
                self.cells[index].retain(|other| *other != id);
            }
        }
    }

    /// Re-register `id` from its pixel position, returning the new anchor.
    ///
    /// Cells are only touched when the anchor changed.
    pub fn update(&mut self, id: UnitId, pixel: Vec2Fixed) -> GridCoord {
        let anchor = self.pixel_to_grid(pixel);
        if self.anchors.get(&id) != Some(&anchor) {
            self.add(id, anchor);
        }
        anchor
    }

    /// Recorded anchor of a registered unit.
    #[must_use]
    pub fn anchor_of(&self, id: UnitId) -> Option<GridCoord> {
        self.anchors.get(&id).copied()
    }

    /// True when a unit is registered.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.anchors.contains_key(&id)
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// True when no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Remove every unit.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.anchors.clear();
    }

    /// Units whose footprint covers a cell. Empty outside the field.
    #[must_use]
    pub fn units_at(&self, coord: GridCoord) -> &[UnitId] {
        match self.index(coord) {
            Some(index) => self.cells[index].as_slice(),
            None => &[],
        }
    }

    /// Would a footprint anchored at `anchor` collide with anything?
    ///
    /// Footprints that leave the field count as occupied. `exclude` is
    /// ignored when found, so a unit never blocks itself.
    #[must_use]
    pub fn is_occupied(&self, anchor: GridCoord, exclude: Option<UnitId>) -> bool {
        footprint(anchor).any(|cell| match self.index(cell) {
            None => true,
            Some(index) => self.cells[index].iter().any(|id| Some(*id) != exclude),
        })
    }

    /// Units intersecting the box `[x - r, x + r + 1] × [y - r, y + r + 1]`.
    ///
    /// Each unit is returned once, in scan order.
    #[must_use]
    pub fn nearby_units(
        &self,
        center: GridCoord,
        radius: i32,
        exclude: Option<UnitId>,
    ) -> Vec<UnitId> {
        let min_x = (center.x - radius).max(0);
        let max_x = (center.x + radius + 1).min(self.width - 1);
        let min_y = (center.y - radius).max(0);
        let max_y = (center.y + radius + 1).min(self.height - 1);

        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                for id in self.units_at(GridCoord::new(x, y)) {
                    if Some(*id) != exclude && seen.insert(*id) {
                        found.push(*id);
                    }
                }
            }
        }
        found
    }

    /// The closest free anchor to `target`, searching rings out to `max_radius`.
    ///
    /// Returns `target` itself when free. Ring cells are scanned row by
    /// row (`dy` ascending, then `dx` ascending) and only anchors whose
    /// full footprint fits in the field are considered.
    #[must_use]
    pub fn find_nearest_free(
        &self,
        target: GridCoord,
        exclude: Option<UnitId>,
        max_radius: i32,
    ) -> Option<GridCoord> {
        if !self.is_occupied(target, exclude) {
            return Some(target);
        }

        for radius in 1..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = target.offset(dx, dy);
                    if candidate.x < 0
                        || candidate.y < 0
                        || candidate.x > self.width - UNIT_FOOTPRINT
                        || candidate.y > self.height - UNIT_FOOTPRINT
                    {
                        continue;
                    }
                    if !self.is_occupied(candidate, exclude) {
                        return Some(candidate);
                    }
                }
            }
        }

        None
    }

    /// Every cell holding `id`, found by a full scan.
    ///
    /// Used to check that cell contents agree with recorded anchors.
    #[must_use]
    pub fn cells_containing(&self, id: UnitId) -> Vec<GridCoord> {
        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let coord = GridCoord::new(x, y);
                if self.units_at(coord).contains(&id) {
                    cells.push(coord);
                }
            }
        }
        cells
    }

    /// True when every registered unit occupies exactly its in-bounds
    /// footprint and no cell holds an unregistered id.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut expected: BTreeMap<usize, Vec<UnitId>> = BTreeMap::new();
        for (id, anchor) in &self.anchors {
            for cell in footprint(*anchor) {
                if let Some(index) = self.index(cell) {
                    expected.entry(index).or_default().push(*id);
                }
            }
        }

        self.cells.iter().enumerate().all(|(index, cell)| {
            let mut actual = cell.clone();
            actual.sort_unstable();
            let mut wanted = expected.remove(&index).unwrap_or_default();
            wanted.sort_unstable();
            actual == wanted
        })
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        Some((coord.y * self.width + coord.x) as usize)
    }
}

/// The cells covered by a footprint anchored at `anchor`.
fn footprint(anchor: GridCoord) -> impl Iterator<Item = GridCoord> {
    (0..UNIT_FOOTPRINT)
        .flat_map(move |dy| (0..UNIT_FOOTPRINT).map(move |dx| anchor.offset(dx, dy)))
}
