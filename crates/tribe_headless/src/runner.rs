//! Headless game runner implementation.
//!
//! Reads JSON-lines commands, applies them to a [`Simulation`] and writes
//! one response line per command. The loop is blocking and single
//! threaded; the simulation only advances on `tick`.

use std::io::{self, BufRead, Write};

use tribe_core::factions::FactionId;
use tribe_core::grid::GridCoord;
use tribe_core::math::{Fixed, Vec2Fixed};
use tribe_core::production::{FacilityId, FacilityKind};
use tribe_core::simulation::Simulation;
use tribe_core::units::{UnitId, UnitKind};

use crate::protocol::{Command, GameState, ProjectileState, Response};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Answer `tick` with a full state (vs an ack).
    pub auto_state_output: bool,
}

/// Outcome of handling one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Handled {
    /// Line to send back.
    pub response: Response,
    /// True once the controller asked to quit.
    pub quit: bool,
}

/// Headless runner for externally controlled gameplay.
#[derive(Debug)]
pub struct HeadlessRunner {
    sim: Simulation,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a runner around a prepared simulation.
    pub fn new(sim: Simulation) -> Self {
        Self::with_config(sim, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(sim: Simulation, config: HeadlessConfig) -> Self {
        Self { sim, config }
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Apply one command.
    pub fn handle(&mut self, cmd: &Command) -> Handled {
        let name = cmd.name();
        let response = match cmd {
            Command::Tick { count } => {
                for _ in 0..*count {
                    self.sim.tick();
                }
                if self.config.auto_state_output {
                    self.state()
                } else {
                    Response::ack(name)
                }
            }
            Command::Query => self.state(),
            Command::Select { unit_id, additive } => {
                if self.sim.select_unit(UnitId(*unit_id), *additive) {
                    Response::ack(name)
                } else {
                    Response::rejected(name, format!("no living unit {unit_id}"))
                }
            }
            Command::SelectBox {
                x1,
                y1,
                x2,
                y2,
                additive,
            } => match (pixel(*x1, *y1), pixel(*x2, *y2)) {
                (Some(from), Some(to)) => {
                    self.sim.select_in_box(from, to, *additive);
                    Response::ack(name)
                }
                _ => Response::error(OUT_OF_RANGE, Some(name)),
            },
            Command::Deselect => {
                self.sim.deselect_all();
                Response::ack(name)
            }
            Command::SelectFacility { facility_id } => {
                let id = facility_id.map(FacilityId);
                if self.sim.select_facility(id) || id.is_none() {
                    Response::ack(name)
                } else {
                    Response::rejected(name, "no such facility")
                }
            }
            Command::Move { x, y } => match pixel(*x, *y) {
                Some(to) if self.sim.move_selected(to) > 0 => Response::ack(name),
                Some(_) => Response::rejected(name, "nothing selected"),
                None => Response::error(OUT_OF_RANGE, Some(name)),
            },
            Command::Stop => {
                self.sim.stop_selected();
                Response::ack(name)
            }
            Command::BeginPlacement { kind } => match FacilityKind::parse(kind) {
                Ok(kind) if self.sim.begin_placement(kind) => Response::ack(name),
                Ok(kind) => Response::rejected(name, format!("cannot afford {kind}")),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::Preview { grid_x, grid_y } => {
                match self.sim.preview_placement(GridCoord::new(*grid_x, *grid_y)) {
                    Some(preview) => Response::Preview {
                        grid_x: preview.anchor.x,
                        grid_y: preview.anchor.y,
                        size: preview.size,
                        valid: preview.is_valid,
                        blocked: preview
                            .blocked_cells
                            .iter()
                            .map(|cell| [cell.x, cell.y])
                            .collect(),
                    },
                    None => Response::rejected(name, "not placing"),
                }
            }
            Command::Place {
                grid_x,
                grid_y,
                faction,
            } => {
                let faction = faction
                    .as_deref()
                    .map_or(FactionId::default(), FactionId::parse_or_default);
                match self
                    .sim
                    .commit_placement(GridCoord::new(*grid_x, *grid_y), faction)
                {
                    Some(_) => Response::ack(name),
                    None => Response::rejected(name, "not placing, blocked or unaffordable"),
                }
            }
            Command::CancelPlacement => {
                self.sim.cancel_placement();
                Response::ack(name)
            }
            Command::Train { facility_id, kind } => match UnitKind::parse(kind) {
                Ok(kind) if self.sim.train_unit(FacilityId(*facility_id), kind) => {
                    Response::ack(name)
                }
                Ok(kind) => Response::rejected(
                    name,
                    format!("{kind} cannot be trained there or is unaffordable"),
                ),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::Hash => Response::StateHash {
                tick: self.sim.current_tick(),
                hash: self.sim.state_hash(),
            },
            Command::Quit => Response::Bye,
        };

        Handled {
            response,
            quit: matches!(cmd, Command::Quit),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Response {
        Response::State(Box::new(GameState {
            tick: self.sim.current_tick(),
            gems: self.sim.gems(),
            fps: self.sim.fps(),
            placement: self.sim.placement_kind().map(|kind| kind.name().to_string()),
            units: self.sim.units().map(Into::into).collect(),
            facilities: self.sim.facilities().map(Into::into).collect(),
            projectiles: self
                .sim
                .projectiles()
                .iter()
                .map(ProjectileState::from)
                .collect(),
            hash: self.sim.state_hash(),
        }))
    }

    /// Run the protocol loop until `quit` or end of input.
    ///
    /// Lines that do not parse are answered with an error and skipped.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_line(&mut output, &Response::ready(self.sim.current_tick()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let handled = match Command::from_json(line) {
                Ok(cmd) => {
                    tracing::debug!(cmd = cmd.name(), tick = self.sim.current_tick(), "Command");
                    self.handle(&cmd)
                }
                Err(e) => Handled {
                    response: Response::error(format!("Parse error: {e}"), None),
                    quit: false,
                },
            };

            write_line(&mut output, &handled.response)?;
            if handled.quit {
                tracing::info!(tick = self.sim.current_tick(), "Quit requested");
                break;
            }
        }
        Ok(())
    }

    /// Run against the process's stdin and stdout.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }
}

fn write_line<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

const OUT_OF_RANGE: &str = "coordinate out of range";

/// Pixel position from protocol input; `None` if either value is not a
/// finite number that fits [`Fixed`].
fn pixel(x: f64, y: f64) -> Option<Vec2Fixed> {
    let convert = |v: f64| v.is_finite().then(|| Fixed::checked_from_num(v)).flatten();
    Some(Vec2Fixed::new(convert(x)?, convert(y)?))
}
