//! Height field terrain.
//!
//! Heights are integers in `0..=10`, generated once from seeded Perlin
//! noise. Generation uses floating point, but it runs a single time at
//! construction and its output is quantised to integers, so the tick
//! loop only ever reads integer heights and fixed-point multipliers.

use serde::{Deserialize, Serialize};

use crate::grid::GridCoord;
use crate::math::{Fixed, HALF};

/// Tallest terrain height.
pub const MAX_HEIGHT: u8 = 10;

/// Per-cell height field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainMap {
    width: i32,
    height: i32,
    heights: Vec<u8>,
}

impl TerrainMap {
    /// Terrain with every cell at height zero.
    #[must_use]
    pub fn flat(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        #[allow(clippy::cast_sign_loss)]
        let len = (width * height) as usize;
        Self {
            width,
            height,
            heights: vec![0; len],
        }
    }

    /// Build terrain from explicit row-major heights.
    ///
    /// Missing cells are zero and values above [`MAX_HEIGHT`] are clamped.
    #[must_use]
    pub fn from_heights(width: i32, height: i32, heights: &[u8]) -> Self {
        let mut map = Self::flat(width, height);
        for (slot, value) in map.heights.iter_mut().zip(heights) {
            *slot = (*value).min(MAX_HEIGHT);
        }
        map
    }

    /// Generate mountain ranges from seeded noise.
    ///
    /// Low-frequency octave noise lays out one or two ranges, a finer
    /// layer adds texture, and a shaping curve separates flat valleys from
    /// steep peaks.
    #[must_use]
    pub fn generate(width: i32, height: i32, seed: u32) -> Self {
        const RANGE_SCALE: f64 = 0.015;
        const DETAIL_SCALE: f64 = 0.1;

        let noise = PerlinNoise::new(seed);
        let mut map = Self::flat(width, height);

        for y in 0..map.height {
            for x in 0..map.width {
                let (fx, fy) = (f64::from(x), f64::from(y));
                let range = noise.octave(fx, fy, 3, 0.65, RANGE_SCALE);
                let detail = noise.octave(fx + 1000.0, fy + 1000.0, 2, 0.3, DETAIL_SCALE) * 0.25;
                let level = shape(range + detail);

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let value = (level * 10.0).round().clamp(0.0, 10.0) as u8;
                if let Some(index) = map.index(GridCoord::new(x, y)) {
                    map.heights[index] = value;
                }
            }
        }

        map
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

    /// Height of a cell. Coordinates outside the map read the nearest edge.
    #[must_use]
    pub fn height_at(&self, coord: GridCoord) -> u8 {
        let clamped = GridCoord::new(
            coord.x.clamp(0, self.width - 1),
            coord.y.clamp(0, self.height - 1),
        );
        self.index(clamped).map_or(0, |index| self.heights[index])
    }

    /// Movement speed multiplier for a cell: `max(0.5, 1 - height / 20)`.
    #[must_use]
    pub fn speed_multiplier(&self, coord: GridCoord) -> Fixed {
        speed_multiplier_for(self.height_at(coord))
    }

    /// Row-major heights.
    #[must_use]
    pub fn heights(&self) -> &[u8] {
        &self.heights
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.width || coord.y >= self.height {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        Some((coord.y * self.width + coord.x) as usize)
    }
}

/// Speed multiplier for a raw height value.
#[must_use]
pub fn speed_multiplier_for(height: u8) -> Fixed {
    let penalty = Fixed::from_num(height) / Fixed::from_num(MAX_HEIGHT) * HALF;
    (Fixed::ONE - penalty).max(HALF)
}

/// Map combined noise in `[-1, 1]` to a terrain level in `[0, 1]`.
fn shape(noise: f64) -> f64 {
    let exaggerated = noise.signum() * noise.abs().powf(0.35);
    let normalized = (exaggerated + 1.0) / 2.0;

    if normalized < 0.4 {
        normalized * 0.3
    } else if normalized > 0.6 {
        let stretched = 0.12 + (normalized - 0.4) * 2.2;
        0.4 + (stretched - 0.12) * 1.36
    } else {
        0.12 + (normalized - 0.4) * 0.15
    }
}

/// Seeded 2-D gradient noise.
#[derive(Debug, Clone)]
struct PerlinNoise {
    perm: [u8; 512],
}

impl PerlinNoise {
    fn new(seed: u32) -> Self {
        let mut rng = NoiseRng::new(seed);
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *slot = i as u8;
            }
        }
        for i in (1..256).rev() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let j = (rng.next_f64() * (i + 1) as f64) as usize;
            table.swap(i, j.min(i));
        }

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i % 256];
        }
        Self { perm }
    }

    fn p(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }

    fn noise(&self, x: f64, y: f64) -> f64 {
        let (fx, fy) = (x.floor(), y.floor());
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (cx, cy) = ((fx as i64 & 255) as usize, (fy as i64 & 255) as usize);
        let (x, y) = (x - fx, y - fy);
        let (u, v) = (fade(x), fade(y));

        let a = self.p(cx) + cy;
        let aa = self.p(a);
        let ab = self.p(a + 1);
        let b = self.p(cx + 1) + cy;
        let ba = self.p(b);
        let bb = self.p(b + 1);

        lerp(
            lerp(
                grad(self.p(aa), x, y),
                grad(self.p(ba), x - 1.0, y),
                u,
            ),
            lerp(
                grad(self.p(ab), x, y - 1.0),
                grad(self.p(bb), x - 1.0, y - 1.0),
                u,
            ),
            v,
        )
    }

    fn octave(&self, x: f64, y: f64, octaves: u32, persistence: f64, scale: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = scale;
        let mut total = 0.0;

        for _ in 0..octaves {
            value += self.noise(x * frequency, y * frequency) * amplitude;
            total += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        value / total
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

fn grad(hash: usize, x: f64, y: f64) -> f64 {
    let h = hash & 3;
    let u = if h < 2 { x } else { y };
    let v = match h {
        0 => y,
        1 | 2 => x,
        _ => 0.0,
    };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}

/// Multiply-with-carry generator used to shuffle the permutation table.
#[derive(Debug, Clone)]
struct NoiseRng {
    w: u32,
    z: u32,
}

impl NoiseRng {
    fn new(seed: u32) -> Self {
        Self {
            w: 123_456_789u32.wrapping_add(seed),
            z: 987_654_321u32.wrapping_sub(seed),
        }
    }

    fn next_f64(&mut self) -> f64 {
        self.z = 36969u32
            .wrapping_mul(self.z & 0xffff)
            .wrapping_add(self.z >> 16);
        self.w = 18000u32
            .wrapping_mul(self.w & 0xffff)
            .wrapping_add(self.w >> 16);
        let bits = (self.z << 16).wrapping_add(self.w & 0xffff);
        f64::from(bits) / 4_294_967_296.0
    }
}
