//! ASCII rendering of the field for terminals and logs.

use std::collections::BTreeMap;

use tribe_core::factions::FactionId;
use tribe_core::grid::{GridCoord, UNIT_FOOTPRINT};
use tribe_core::simulation::Simulation;
use tribe_core::units::UnitKind;

/// Configuration for ASCII rendering.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Width of the field in characters.
    pub width: usize,
    /// Height of the field in characters.
    pub height: usize,
    /// Print the legend and per-faction counts.
    pub show_legend: bool,
    /// Use ANSI colors.
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            show_legend: true,
            use_color: false,
        }
    }
}

/// Character for a unit. Red is lowercase, blue uppercase.
pub fn unit_char(kind: UnitKind, faction: FactionId) -> char {
    let ch = match kind {
        UnitKind::Caveman => 'c',
        UnitKind::Builder => 'b',
        UnitKind::Worker => 'w',
        UnitKind::Miner => 'm',
        UnitKind::Hunter => 'h',
    };
    match faction {
        FactionId::Red => ch,
        FactionId::Blue => ch.to_ascii_uppercase(),
    }
}

mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
    pub const YELLOW: &str = "\x1b[33m";
}

fn faction_color(faction: FactionId) -> &'static str {
    match faction {
        FactionId::Red => colors::RED,
        FactionId::Blue => colors::BLUE,
    }
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    ch: char,
    color: Option<&'static str>,
}

/// Per-faction tallies for the legend.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    units: usize,
    damaged: usize,
    facilities: usize,
}

/// Render the field as ASCII art.
///
/// Facilities are drawn first (`#` complete, `+` under construction),
/// then units, then projectiles (`*`).
pub fn render_ascii(sim: &Simulation, config: &AsciiConfig) -> String {
    let width = config.width.max(1);
    let height = config.height.max(1);
    let blank = Glyph {
        ch: '.',
        color: None,
    };
    let mut canvas = vec![vec![blank; width]; height];

    let grid = sim.grid();
    let to_col = |x: i32| scale(x, grid.width(), width);
    let to_row = |y: i32| scale(y, grid.height(), height);

    let mut tallies: BTreeMap<FactionId, Tally> = BTreeMap::new();

    for facility in sim.facilities() {
        let ch = if facility.is_complete() { '#' } else { '+' };
        let glyph = Glyph {
            ch,
            color: Some(faction_color(facility.faction)),
        };
        let end = facility.anchor.offset(facility.size - 1, facility.size - 1);
        for row in to_row(facility.anchor.y)..=to_row(end.y) {
            for col in to_col(facility.anchor.x)..=to_col(end.x) {
                canvas[row][col] = glyph;
            }
        }
        tallies.entry(facility.faction).or_default().facilities += 1;
    }

    for unit in sim.units() {
        let center = unit.anchor.offset(UNIT_FOOTPRINT / 2, UNIT_FOOTPRINT / 2);
        let color = if unit.health.current < unit.health.max {
            colors::YELLOW
        } else {
            faction_color(unit.faction)
        };
        canvas[to_row(center.y)][to_col(center.x)] = Glyph {
            ch: unit_char(unit.kind, unit.faction),
            color: Some(color),
        };

        let tally = tallies.entry(unit.faction).or_default();
        tally.units += 1;
        if unit.health.current < unit.health.max {
            tally.damaged += 1;
        }
    }

    for projectile in sim.projectiles() {
        let cell: GridCoord = grid.pixel_to_grid(projectile.position);
        canvas[to_row(cell.y)][to_col(cell.x)] = Glyph {
            ch: '*',
            color: Some(colors::BOLD),
        };
    }

    let mut output = String::new();
    let bold = if config.use_color { colors::BOLD } else { "" };
    let reset = if config.use_color { colors::RESET } else { "" };

    output.push_str(&format!(
        "{bold}+== Tick: {} | Gems: {} | Hash: {:016x} =={reset}\n",
        sim.current_tick(),
        sim.gems(),
        sim.state_hash()
    ));

    let border: String = std::iter::repeat('-').take(width).collect();
    output.push_str(&format!("+{border}+\n"));
    for row in &canvas {
        output.push('|');
        for glyph in row {
            match glyph.color {
                Some(color) if config.use_color => {
                    output.push_str(color);
                    output.push(glyph.ch);
                    output.push_str(colors::RESET);
                }
                _ => output.push(glyph.ch),
            }
        }
        output.push_str("|\n");
    }
    output.push_str(&format!("+{border}+\n"));

    if config.show_legend {
        output.push_str(
            "c=Caveman b=Builder w=Worker m=Miner h=Hunter #=Facility +=Site *=Stone (lower=red UPPER=blue)\n",
        );
        for (faction, tally) in &tallies {
            let color = if config.use_color { faction_color(*faction) } else { "" };
            output.push_str(&format!(
                "{color}{faction}{reset}: {} units ({} damaged), {} facilities\n",
                tally.units, tally.damaged, tally.facilities
            ));
        }
    }

    output
}

/// Map a cell index onto `0..chars`.
fn scale(value: i32, cells: i32, chars: usize) -> usize {
    let value = usize::try_from(value.max(0)).unwrap_or(0);
    let cells = usize::try_from(cells.max(1)).unwrap_or(1);
    (value * chars / cells).min(chars - 1)
}
