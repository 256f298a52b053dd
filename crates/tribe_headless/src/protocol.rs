//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Game state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with exactly one response line
//! 4. `quit` is answered with `{"type":"bye"}` and the runner exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"select_box","x1":0,"y1":0,"x2":400,"y2":300}
//! <- {"type":"ack","cmd":"select_box"}
//! -> {"cmd":"move","x":300,"y":200}
//! <- {"type":"ack","cmd":"move"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"ack","cmd":"tick"}
//! -> {"cmd":"train","facility_id":1,"kind":"hunter"}
//! <- {"type":"rejected","cmd":"train","reason":"hunter cannot be trained there or is unaffordable"}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":60,"hash":1234567890}
//! ```

use serde::{Deserialize, Serialize};

use tribe_core::combat::Projectile;
use tribe_core::production::Facility;
use tribe_core::units::Unit;

/// Version string sent in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current game state without advancing time.
    Query,

    /// Select one unit.
    Select {
        unit_id: u32,
        #[serde(default)]
        additive: bool,
    },

    /// Select every unit inside a pixel box.
    SelectBox {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        #[serde(default)]
        additive: bool,
    },

    /// Clear the unit selection.
    Deselect,

    /// Select a facility, or clear the facility selection.
    SelectFacility {
        #[serde(default)]
        facility_id: Option<u32>,
    },

    /// Order the selection to a pixel destination.
    Move { x: f64, y: f64 },

    /// Halt the selection and leave placement mode.
    Stop,

    /// Enter placement mode.
    BeginPlacement {
        #[serde(default = "default_facility_kind")]
        kind: String,
    },

    /// Validate a footprint for the pending placement.
    Preview { grid_x: i32, grid_y: i32 },

    /// Commit the pending placement.
    Place {
        grid_x: i32,
        grid_y: i32,
        #[serde(default)]
        faction: Option<String>,
    },

    /// Leave placement mode.
    CancelPlacement,

    /// Queue a unit on a facility.
    Train { facility_id: u32, kind: String },

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

fn default_facility_kind() -> String {
    "training_facility".to_string()
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Command was applied.
    Ack { cmd: String },

    /// Command was valid but the simulation refused it.
    Rejected { cmd: String, reason: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Current game state.
    State(Box<GameState>),

    /// Footprint check for the pending placement.
    Preview {
        grid_x: i32,
        grid_y: i32,
        size: i32,
        valid: bool,
        blocked: Vec<[i32; 2]>,
    },

    /// State hash at a tick.
    StateHash { tick: u64, hash: u64 },

    /// Runner is shutting down.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Snapshot of the whole simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub tick: u64,
    pub gems: u32,
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    pub units: Vec<UnitState>,
    pub facilities: Vec<FacilityState>,
    pub projectiles: Vec<ProjectileState>,
    pub hash: u64,
}

/// State of a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u32,
    pub kind: String,
    pub faction: String,
    pub x: f64,
    pub y: f64,
    pub grid_x: i32,
    pub grid_y: i32,
    pub health: HealthState,
    pub selected: bool,
    pub moving: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_site: Option<u32>,
}

/// Health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub current: u32,
    pub max: u32,
}

/// State of a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityState {
    pub id: u32,
    pub kind: String,
    pub faction: String,
    pub grid_x: i32,
    pub grid_y: i32,
    pub size: i32,
    pub complete: bool,
    pub construction_progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<String>,
    pub training_progress: f64,
    pub queue_len: usize,
    pub builders: Vec<u32>,
    pub selected: bool,
}

/// State of a projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub source: u32,
    pub faction: String,
    pub x: f64,
    pub y: f64,
}

impl From<&Unit> for UnitState {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id.0,
            kind: unit.kind.name().to_string(),
            faction: unit.faction.name().to_string(),
            x: unit.position.x.to_num(),
            y: unit.position.y.to_num(),
            grid_x: unit.anchor.x,
            grid_y: unit.anchor.y,
            health: HealthState {
                current: unit.health.current,
                max: unit.health.max,
            },
            selected: unit.selected,
            moving: unit.is_moving,
            build_site: unit.build_site().map(|site| site.0),
        }
    }
}

impl From<&Facility> for FacilityState {
    fn from(facility: &Facility) -> Self {
        Self {
            id: facility.id.0,
            kind: facility.kind.name().to_string(),
            faction: facility.faction.name().to_string(),
            grid_x: facility.anchor.x,
            grid_y: facility.anchor.y,
            size: facility.size,
            complete: facility.is_complete(),
            construction_progress: facility.construction_progress().to_num(),
            training: facility.current_job().map(|job| job.kind.name().to_string()),
            training_progress: facility.training_progress().to_num(),
            queue_len: facility.queue_len(),
            builders: facility.builders().iter().map(|id| id.0).collect(),
            selected: facility.selected,
        }
    }
}

impl From<&Projectile> for ProjectileState {
    fn from(projectile: &Projectile) -> Self {
        Self {
            source: projectile.source.0,
            faction: projectile.faction.name().to_string(),
            x: projectile.position.x.to_num(),
            y: projectile.position.y.to_num(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create a rejection.
    pub fn rejected(cmd: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            cmd: cmd.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Select { .. } => "select",
            Self::SelectBox { .. } => "select_box",
            Self::Deselect => "deselect",
            Self::SelectFacility { .. } => "select_facility",
            Self::Move { .. } => "move",
            Self::Stop => "stop",
            Self::BeginPlacement { .. } => "begin_placement",
            Self::Preview { .. } => "preview",
            Self::Place { .. } => "place",
            Self::CancelPlacement => "cancel_placement",
            Self::Train { .. } => "train",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
