//! Scenario loading and configuration.
//!
//! Scenarios define the opening layout of a match: starting gems, the
//! units and builders on the field, and facilities that are already placed.
//! They are read from RON (the native format) or JSON. Every field is
//! optional; unknown kind or faction names fall back to caveman and red.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tribe_core::config::GameConfig;
use tribe_core::error::GameError;
use tribe_core::factions::FactionId;
use tribe_core::grid::GridCoord;
use tribe_core::production::{FacilityKind, FacilityState};
use tribe_core::simulation::Simulation;
use tribe_core::units::UnitKind;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to parse JSON.
    #[error("Failed to parse scenario JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    /// The embedded game config cannot run.
    #[error("Invalid scenario config: {0}")]
    InvalidConfig(#[from] GameError),
}

/// Starting resources for one faction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSetup {
    /// Gems in the ledger. `None` or zero keeps the configured starting gems.
    pub gems: Option<u32>,
}

/// A unit on the opening field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitPlacement {
    /// Unit kind name (default: caveman).
    #[serde(alias = "type")]
    pub kind: Option<String>,
    /// Anchor column.
    #[serde(alias = "gridX")]
    pub grid_x: i32,
    /// Anchor row.
    #[serde(alias = "gridY")]
    pub grid_y: i32,
    /// Faction name (default: red).
    pub faction: Option<String>,
}

impl UnitPlacement {
    /// Create a placement.
    #[must_use]
    pub fn new(kind: UnitKind, faction: FactionId, grid_x: i32, grid_y: i32) -> Self {
        Self {
            kind: Some(kind.name().to_string()),
            grid_x,
            grid_y,
            faction: Some(faction.name().to_string()),
        }
    }
}

/// A facility on the opening field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingPlacement {
    /// Facility kind name (default: training_facility).
    #[serde(alias = "type")]
    pub kind: Option<String>,
    /// Anchor column.
    #[serde(alias = "gridX")]
    pub grid_x: i32,
    /// Anchor row.
    #[serde(alias = "gridY")]
    pub grid_y: i32,
    /// Faction name (default: red).
    pub faction: Option<String>,
    /// Skip construction.
    #[serde(alias = "isComplete")]
    pub is_complete: bool,
    /// Whether an unfinished facility is already under construction.
    /// `Some(false)` leaves it idle until a builder is assigned; unset
    /// means constructing.
    #[serde(alias = "isConstructing", skip_serializing_if = "Option::is_none")]
    pub is_constructing: Option<bool>,
}

impl BuildingPlacement {
    /// Lifecycle state the facility starts in.
    #[must_use]
    pub fn state(&self) -> FacilityState {
        match (self.is_complete, self.is_constructing) {
            (true, _) => FacilityState::Complete,
            (false, Some(false)) => FacilityState::Idle,
            (false, _) => FacilityState::Constructing,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Game rules.
    pub config: GameConfig,
    /// Starting resources by faction name.
    pub resources: BTreeMap<String, ResourceSetup>,
    /// Fighters and other units.
    pub units: Vec<UnitPlacement>,
    /// Builders. Always spawned as the builder kind.
    pub builders: Vec<UnitPlacement>,
    /// Pre-placed facilities.
    pub buildings: Vec<BuildingPlacement>,
}

impl Scenario {
    /// Load a scenario file. `.json` files are read as JSON, anything else
    /// as RON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_ron_str(&contents)
        }
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Load from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        Ok(scenario)
    }

    /// Resolve `"default"` to the built-in map, anything else to a file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        if name_or_path == "default" {
            Ok(Self::default_map())
        } else {
            Self::load(name_or_path)
        }
    }

    /// The stock opening: three cavemen, a builder and a finished
    /// training facility per side.
    #[must_use]
    pub fn default_map() -> Self {
        let mut units = Vec::new();
        for (x, y) in [(30, 40), (35, 43), (40, 46)] {
            units.push(UnitPlacement::new(UnitKind::Caveman, FactionId::Red, x, y));
        }
        for (x, y) in [(150, 60), (155, 63), (160, 66)] {
            units.push(UnitPlacement::new(UnitKind::Caveman, FactionId::Blue, x, y));
        }

        let builders = vec![
            UnitPlacement::new(UnitKind::Builder, FactionId::Red, 25, 35),
            UnitPlacement::new(UnitKind::Builder, FactionId::Blue, 175, 55),
        ];

        let buildings = [(FactionId::Red, 20, 30), (FactionId::Blue, 170, 50)]
            .into_iter()
            .map(|(faction, grid_x, grid_y)| BuildingPlacement {
                kind: Some(FacilityKind::TrainingFacility.name().to_string()),
                grid_x,
                grid_y,
                faction: Some(faction.name().to_string()),
                is_complete: true,
                is_constructing: None,
            })
            .collect();

        let mut resources = BTreeMap::new();
        resources.insert(
            FactionId::Red.name().to_string(),
            ResourceSetup { gems: Some(45) },
        );

        Self {
            name: "Default".to_string(),
            description: "Two tribes facing each other across an open field".to_string(),
            config: GameConfig::default(),
            resources,
            units,
            builders,
            buildings,
        }
    }

    /// Gems the shared ledger starts with.
    ///
    /// The red entry wins, then any other faction in name order, then the
    /// configured starting gems. Zero counts as unset.
    #[must_use]
    pub fn starting_gems(&self) -> u32 {
        let gems = |setup: &ResourceSetup| setup.gems.filter(|&gems| gems > 0);
        self.resources
            .get(FactionId::Red.name())
            .and_then(gems)
            .or_else(|| self.resources.values().find_map(gems))
            .unwrap_or(self.config.starting_gems)
    }

    /// Build a simulation from this scenario.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let mut config = self.config.clone();
        config.starting_gems = self.starting_gems();
        config.validate()?;

        let mut sim = Simulation::new(config);

        for placement in &self.units {
            let kind = placement.kind.as_deref().map_or(UnitKind::default(), parse_unit_kind);
            let faction = resolve_faction(placement.faction.as_deref());
            sim.spawn_unit(kind, faction, GridCoord::new(placement.grid_x, placement.grid_y));
        }

        for placement in &self.builders {
            let faction = resolve_faction(placement.faction.as_deref());
            sim.spawn_unit(
                UnitKind::Builder,
                faction,
                GridCoord::new(placement.grid_x, placement.grid_y),
            );
        }

        for placement in &self.buildings {
            let kind = match placement.kind.as_deref() {
                Some(name) => FacilityKind::parse(name).unwrap_or_else(|_| {
                    tracing::warn!(kind = name, "Unknown facility kind, using training_facility");
                    FacilityKind::default()
                }),
                None => FacilityKind::default(),
            };
            let faction = resolve_faction(placement.faction.as_deref());
            sim.insert_facility_with_state(
                kind,
                faction,
                GridCoord::new(placement.grid_x, placement.grid_y),
                placement.state(),
            );
        }

        tracing::info!(
            scenario = %self.name,
            units = sim.unit_count(),
            facilities = sim.facilities().count(),
            gems = sim.gems(),
            "Scenario built"
        );
        Ok(sim)
    }
}

fn parse_unit_kind(name: &str) -> UnitKind {
    UnitKind::parse(name).unwrap_or_else(|_| {
        tracing::warn!(kind = name, "Unknown unit kind, using caveman");
        UnitKind::default()
    })
}

fn resolve_faction(name: Option<&str>) -> FactionId {
    let Some(name) = name else {
        return FactionId::default();
    };
    FactionId::parse(name).unwrap_or_else(|| {
        tracing::warn!(faction = name, "Unknown faction, using red");
        FactionId::default()
    })
}
