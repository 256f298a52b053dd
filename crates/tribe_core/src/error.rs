//! Error types for the game simulation.
//!
//! Gameplay rejections (unaffordable training, blocked placement) are
//! reported through booleans and `Option`s. This type only covers the
//! fallible edges: loading configuration and parsing names.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the simulation crate.
#[derive(Debug, Error)]
pub enum GameError {
    /// Failed to read a configuration file.
    #[error("Failed to read config: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Configuration text was not valid RON.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Configuration parsed but describes an impossible field.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Unit kind name not recognised.
    #[error("Unknown unit kind: {0}")]
    UnknownUnitKind(String),

    /// Facility kind name not recognised.
    #[error("Unknown facility kind: {0}")]
    UnknownFacilityKind(String),
}
