//! Headless runner for the Tribe RTS simulation.
//!
//! This crate drives [`tribe_core`] without graphics:
//!
//! - **Scenarios**: opening layouts loaded from RON or JSON
//! - **Protocol**: JSON commands on stdin, state and responses on stdout
//! - **Verification**: repeat a scenario and compare state hashes
//! - **Rendering**: an ASCII picture of the field
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, select, move, place, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively on the default map
//! echo '{"cmd":"tick","count":60}' | cargo run -p tribe_headless -- run
//!
//! # Verify determinism of a scenario file
//! cargo run -p tribe_headless -- verify --scenario scenarios/default.ron --runs 8
//! ```

pub mod ascii;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod verify;

pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError};
