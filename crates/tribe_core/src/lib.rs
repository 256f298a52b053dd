//! # Tribe Core
//!
//! Deterministic per-tick simulation core for the Tribe RTS.
//!
//! Two factions of cavemen share a grid field. Units walk toward goals while
//! keeping clear of each other, throw stones at enemies in range, and
//! builders raise facilities that train more units from a shared gem
//! ledger.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO outside of config loading
//! - No wall clock (time is counted in ticks)
//! - Fixed-point math throughout the tick loop
//!
//! ## Crate Structure
//!
//! - [`grid`] - Spatial index over unit footprints
//! - [`terrain`] - Optional height field and speed multipliers
//! - [`movement`] - Per-unit motion and local avoidance
//! - [`combat`] - Targeting, projectiles and damage
//! - [`production`] - Facility construction and training
//! - [`placement`] - Facility footprint validation
//! - [`simulation`] - Tick loop and command API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod combat;
pub mod config;
pub mod economy;
pub mod error;
pub mod factions;
pub mod grid;
pub mod math;
pub mod movement;
pub mod placement;
pub mod production;
pub mod selection;
pub mod simulation;
pub mod terrain;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{Projectile, ProjectileHit, ShotFired};
    pub use crate::config::{FacilityProfile, GameConfig, Roster, UnitStats};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::FactionId;
    pub use crate::grid::{GridCoord, SpatialGrid};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::placement::{PlacementPreview, PlacementResult};
    pub use crate::production::{Facility, FacilityId, FacilityKind, FacilityState, ProductionEvent};
    pub use crate::simulation::{Simulation, TickEvents};
    pub use crate::terrain::TerrainMap;
    pub use crate::units::{Unit, UnitId, UnitKind};
}
