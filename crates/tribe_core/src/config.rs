//! Game configuration.
//!
//! Every tunable constant of a match lives in [`GameConfig`]. Defaults
//! reproduce the standard ruleset; a RON file can override any subset of
//! fields, since every struct here is `#[serde(default)]`.
//!
//! ```
//! use tribe_core::config::GameConfig;
//!
//! let config = GameConfig::from_ron_str("(starting_gems: 100)").unwrap();
//! assert_eq!(config.starting_gems, 100);
//! assert_eq!(config.grid_width, 200);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, HALF};
use crate::production::FacilityKind;
use crate::units::UnitKind;

/// Stats shared by every unit of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    /// Gems charged when training starts.
    pub cost: u32,
    /// Starting and maximum health.
    pub health: u32,
    /// Whether the unit fires projectiles.
    pub can_attack: bool,
    /// Attack range in cells.
    pub attack_range: i32,
    /// Ticks between shots.
    pub attack_period: u32,
    /// Movement speed in cells per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Distance in cells from a construction site centre at which this
    /// unit can build. `None` for units that cannot build.
    pub build_range: Option<i32>,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            cost: 2,
            health: 10,
            can_attack: true,
            attack_range: 20,
            attack_period: 60,
            speed: HALF,
            build_range: None,
        }
    }
}

/// Stats for every unit kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitRoster {
    /// Basic melee-range thrower.
    pub caveman: UnitStats,
    /// Constructs facilities, never attacks.
    pub builder: UnitStats,
    /// General labourer.
    pub worker: UnitStats,
    /// Sturdier labourer.
    pub miner: UnitStats,
    /// Long-range thrower trained at a hunter's lodge.
    pub hunter: UnitStats,
}

impl UnitRoster {
    /// Stats for a kind.
    #[must_use]
    pub const fn get(&self, kind: UnitKind) -> &UnitStats {
        match kind {
            UnitKind::Caveman => &self.caveman,
            UnitKind::Builder => &self.builder,
            UnitKind::Worker => &self.worker,
            UnitKind::Miner => &self.miner,
            UnitKind::Hunter => &self.hunter,
        }
    }
}

impl Default for UnitRoster {
    fn default() -> Self {
        let base = UnitStats::default();
        Self {
            caveman: base.clone(),
            builder: UnitStats {
                cost: 3,
                can_attack: false,
                attack_range: 0,
                attack_period: 0,
                build_range: Some(2),
                ..base.clone()
            },
            worker: base.clone(),
            miner: UnitStats {
                cost: 3,
                ..base.clone()
            },
            hunter: UnitStats {
                cost: 4,
                attack_range: 40,
                ..base
            },
        }
    }
}

/// Which unit kinds a facility may train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Roster {
    /// Every kind.
    All,
    /// Only the listed kinds.
    Only(Vec<UnitKind>),
}

impl Roster {
    /// True when `kind` may be trained.
    #[must_use]
    pub fn allows(&self, kind: UnitKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// Parameters of one facility kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityProfile {
    /// Gems charged when placement is committed.
    pub cost: u32,
    /// Side length of the square footprint, in cells.
    pub size: i32,
    /// Seconds of builder presence needed to finish construction.
    pub construction_seconds: u32,
    /// Seconds to train one unit.
    pub training_seconds: u32,
    /// Trainable kinds.
    pub roster: Roster,
}

impl Default for FacilityProfile {
    fn default() -> Self {
        Self {
            cost: 10,
            size: 10,
            construction_seconds: 15,
            training_seconds: 10,
            roster: Roster::All,
        }
    }
}

/// Profiles for every facility kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityProfiles {
    /// General training building.
    pub training_facility: FacilityProfile,
    /// Hunter-only training building.
    pub hunters_lodge: FacilityProfile,
}

impl FacilityProfiles {
    /// Profile for a kind.
    #[must_use]
    pub const fn get(&self, kind: FacilityKind) -> &FacilityProfile {
        match kind {
            FacilityKind::TrainingFacility => &self.training_facility,
            FacilityKind::HuntersLodge => &self.hunters_lodge,
        }
    }
}

impl Default for FacilityProfiles {
    fn default() -> Self {
        Self {
            training_facility: FacilityProfile::default(),
            hunters_lodge: FacilityProfile {
                roster: Roster::Only(vec![UnitKind::Hunter]),
                ..FacilityProfile::default()
            },
        }
    }
}

/// Projectile behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileStats {
    /// Speed in cells per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Health removed on hit.
    pub damage: u32,
}

impl Default for ProjectileStats {
    fn default() -> Self {
        Self {
            speed: Fixed::ONE,
            damage: 1,
        }
    }
}

/// Complete match configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Field width in pixels.
    pub canvas_width: u32,
    /// Field height in pixels.
    pub canvas_height: u32,
    /// Number of grid columns.
    pub grid_width: i32,
    /// Number of grid rows.
    pub grid_height: i32,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Gems in the ledger at the start of a match.
    pub starting_gems: u32,
    /// How often the frame counter publishes a new reading.
    pub fps_update_interval_ms: u64,
    /// Seed for generated terrain. `None` keeps the field flat.
    pub terrain_seed: Option<u32>,
    /// Per-kind unit stats.
    pub units: UnitRoster,
    /// Per-kind facility profiles.
    pub facilities: FacilityProfiles,
    /// Projectile stats.
    pub projectile: ProjectileStats,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            grid_width: 200,
            grid_height: 160,
            tick_rate: 60,
            starting_gems: 45,
            fps_update_interval_ms: 1000,
            terrain_seed: None,
            units: UnitRoster::default(),
            facilities: FacilityProfiles::default(),
            projectile: ProjectileStats::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Reject configurations the simulation cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.grid_width < 2 || self.grid_height < 2 {
            return Err(GameError::InvalidConfig(format!(
                "grid must be at least 2x2, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(GameError::InvalidConfig(
                "canvas dimensions must be positive".to_string(),
            ));
        }
        if self.tick_rate == 0 {
            return Err(GameError::InvalidConfig(
                "tick rate must be positive".to_string(),
            ));
        }
        for kind in FacilityKind::ALL {
            let profile = self.facilities.get(kind);
            if profile.size < 1 {
                return Err(GameError::InvalidConfig(format!(
                    "{} size must be positive",
                    kind.name()
                )));
            }
        }
        Ok(())
    }

    /// Pixel width of one cell.
    #[must_use]
    pub fn cell_width(&self) -> Fixed {
        Fixed::from_num(self.canvas_width) / Fixed::from_num(self.grid_width.max(1))
    }

    /// Pixel height of one cell.
    #[must_use]
    pub fn cell_height(&self) -> Fixed {
        Fixed::from_num(self.canvas_height) / Fixed::from_num(self.grid_height.max(1))
    }

    /// Simulated milliseconds covered by `ticks`, rounded down.
    #[must_use]
    pub fn ticks_to_ms(&self, ticks: u64) -> u64 {
        ticks.saturating_mul(1000) / u64::from(self.tick_rate.max(1))
    }

    /// Convert whole seconds into a tick count, never less than one.
    #[must_use]
    pub fn seconds_to_ticks(&self, seconds: u32) -> u64 {
        (u64::from(seconds) * u64::from(self.tick_rate)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cell_size_is_exact() {
        let config = GameConfig::default();
        assert_eq!(config.cell_width(), Fixed::from_num(4));
        assert_eq!(config.cell_height(), Fixed::from_num(3.75));
    }

    #[test]
    fn test_default_roster() {
        let roster = UnitRoster::default();
        assert_eq!(roster.get(UnitKind::Caveman).cost, 2);
        assert_eq!(roster.get(UnitKind::Builder).cost, 3);
        assert!(!roster.get(UnitKind::Builder).can_attack);
        assert_eq!(roster.get(UnitKind::Builder).build_range, Some(2));
        assert_eq!(roster.get(UnitKind::Miner).cost, 3);
        assert_eq!(roster.get(UnitKind::Hunter).cost, 4);
        assert_eq!(roster.get(UnitKind::Hunter).attack_range, 40);
        assert_eq!(roster.get(UnitKind::Worker).speed, HALF);
    }

    #[test]
    fn test_lodge_trains_hunters_only() {
        let profiles = FacilityProfiles::default();
        let lodge = profiles.get(FacilityKind::HuntersLodge);
        assert!(lodge.roster.allows(UnitKind::Hunter));
        assert!(!lodge.roster.allows(UnitKind::Caveman));
        assert!(profiles
            .get(FacilityKind::TrainingFacility)
            .roster
            .allows(UnitKind::Builder));
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = GameConfig::from_ron_str(
            "(tick_rate: 30, facilities: (hunters_lodge: (cost: 12)))",
        )
        .unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.facilities.hunters_lodge.cost, 12);
        assert_eq!(config.facilities.hunters_lodge.size, 10);
        assert_eq!(config.starting_gems, 45);
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let err = GameConfig::from_ron_str("(grid_width: 1)").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_ron_rejected() {
        let err = GameConfig::from_ron_str("(tick_rate: \"fast\")").unwrap_err();
        assert!(matches!(err, GameError::ConfigParse(_)));
    }

    #[test]
    fn test_seconds_to_ticks() {
        let config = GameConfig::default();
        assert_eq!(config.seconds_to_ticks(15), 900);
        assert_eq!(config.seconds_to_ticks(10), 600);
        assert_eq!(config.seconds_to_ticks(0), 1);
    }

    #[test]
    fn test_ticks_to_ms_does_not_drift() {
        let config = GameConfig::default();
        assert_eq!(config.ticks_to_ms(3), 50);
        assert_eq!(config.ticks_to_ms(60), 1000);
        assert_eq!(config.ticks_to_ms(3600), 60_000);

        let slow = GameConfig {
            tick_rate: 0,
            ..GameConfig::default()
        };
        assert_eq!(slow.ticks_to_ms(2), 2000);
    }

    #[test]
    fn test_round_trip_through_ron() {
        let config = GameConfig::default();
        let text = ron::to_string(&config).unwrap();
        assert_eq!(GameConfig::from_ron_str(&text).unwrap(), config);
    }
}
