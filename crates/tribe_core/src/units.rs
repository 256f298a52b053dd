//! Unit definitions.
//!
//! There is a single [`Unit`] type. Kinds differ only in their stats and in
//! two capabilities: [`Unit::combat`] is present for units that attack and
//! [`Unit::build`] for units that construct facilities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::UnitStats;
use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::grid::GridCoord;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::production::FacilityId;

/// Hop animation cycle length in milliseconds.
pub const HOP_PERIOD_MS: f32 = 420.0;

/// Hop animation height in pixels.
pub const HOP_AMPLITUDE_PX: f32 = 3.0;

/// Stable unit identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of unit in the roster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Basic fighter.
    #[default]
    Caveman,
    /// Constructs facilities.
    Builder,
    /// General labourer.
    Worker,
    /// Sturdier labourer.
    Miner,
    /// Long-range fighter.
    Hunter,
}

impl UnitKind {
    /// Every kind, in roster order.
    pub const ALL: [Self; 5] = [
        Self::Caveman,
        Self::Builder,
        Self::Worker,
        Self::Miner,
        Self::Hunter,
    ];

    /// Lowercase name as used in scenarios and commands.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Caveman => "caveman",
            Self::Builder => "builder",
            Self::Worker => "worker",
            Self::Miner => "miner",
            Self::Hunter => "hunter",
        }
    }

    /// Parse a kind name, ignoring ASCII case.
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| GameError::UnknownUnitKind(name.to_string()))
    }

    /// Parse a kind name, falling back to [`UnitKind::Caveman`].
    #[must_use]
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Remove health, saturating at zero. Returns true if this hit killed.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        let was_alive = self.current > 0;
        self.current = self.current.saturating_sub(amount);
        was_alive && self.current == 0
    }

    /// True at zero health.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Remaining fraction in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max == 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(self.current) / Fixed::from_num(self.max)
    }
}

/// Attack capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatStats {
    /// Range in cells.
    pub range: i32,
    /// Ticks between shots.
    pub period: u32,
    /// Ticks until the next shot is allowed.
    pub cooldown: u32,
}

impl CombatStats {
    /// Ready-to-fire stats.
    #[must_use]
    pub const fn new(range: i32, period: u32) -> Self {
        Self {
            range,
            period,
            cooldown: 0,
        }
    }

    /// Count the cooldown down by one tick.
    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    /// True when a shot may be fired this tick.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Start the cooldown after firing.
    pub fn reset(&mut self) {
        self.cooldown = self.period;
    }
}

/// Build capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildCapability {
    /// Distance in cells from the site centre at which work happens.
    pub range: i32,
    /// The facility currently assigned, if any.
    pub site: Option<FacilityId>,
}

/// A unit on the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Kind.
    pub kind: UnitKind,
    /// Owning side.
    pub faction: FactionId,
    /// Top-left cell of the 2×2 footprint.
    pub anchor: GridCoord,
    /// Pixel position. Authoritative for grid membership.
    pub position: Vec2Fixed,
    /// Anchor being walked to. Equal to `anchor` when idle.
    pub target: GridCoord,
    /// Health.
    pub health: Health,
    /// Cells per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Present for units that attack.
    pub combat: Option<CombatStats>,
    /// Present for units that build.
    pub build: Option<BuildCapability>,
    /// Player selection flag.
    pub selected: bool,
    /// True while more than half a pixel from the target centre.
    pub is_moving: bool,
    /// Tick the unit appeared on.
    pub spawn_tick: u64,
}

impl Unit {
    /// Create a unit standing at the centre of `anchor`.
    #[must_use]
    pub fn new(
        id: UnitId,
        kind: UnitKind,
        faction: FactionId,
        anchor: GridCoord,
        position: Vec2Fixed,
        stats: &UnitStats,
    ) -> Self {
        let combat = stats
            .can_attack
            .then(|| CombatStats::new(stats.attack_range, stats.attack_period));
        let build = stats
            .build_range
            .map(|range| BuildCapability { range, site: None });

        Self {
            id,
            kind,
            faction,
            anchor,
            position,
            target: anchor,
            health: Health::new(stats.health),
            speed: stats.speed,
            combat,
            build,
            selected: false,
            is_moving: false,
            spawn_tick: 0,
        }
    }

    /// True while health is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// True when the unit has reached its target anchor.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.anchor == self.target
    }

    /// True for units with a build capability.
    #[must_use]
    pub const fn is_builder(&self) -> bool {
        self.build.is_some()
    }

    /// Facility this unit is assigned to build.
    #[must_use]
    pub fn build_site(&self) -> Option<FacilityId> {
        self.build.and_then(|build| build.site)
    }

    /// Assign or clear a construction site. Ignored for non-builders.
    pub fn set_build_site(&mut self, site: Option<FacilityId>) {
        if let Some(build) = self.build.as_mut() {
            build.site = site;
        }
    }

    /// Animation phase in `[0, 1)`, stable for a given id.
    #[must_use]
    pub fn hop_phase(&self) -> f32 {
        hop_phase(self.id)
    }

    /// Vertical hop offset in pixels (negative is up).
    ///
    /// `elapsed_ms` is the time since the unit appeared. Idle units do not hop.
    #[must_use]
    pub fn hop_offset(&self, elapsed_ms: f32) -> f32 {
        if !self.is_moving {
            return 0.0;
        }
        let t = (elapsed_ms + self.hop_phase() * HOP_PERIOD_MS) / HOP_PERIOD_MS;
        let wave = (t * std::f32::consts::TAU).sin();
        -HOP_AMPLITUDE_PX * wave.max(0.0).powf(1.6)
    }
}

/// FNV-1a hash of the decimal id, mapped to `[0, 1)`.
#[must_use]
pub fn hop_phase(id: UnitId) -> f32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in id.0.to_string().bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16_777_619);
    }
    #[allow(clippy::cast_precision_loss)]
    let phase = (hash % 1_000_000) as f32 / 1_000_000.0;
    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitRoster;

    fn unit(kind: UnitKind) -> Unit {
        let roster = UnitRoster::default();
        Unit::new(
            UnitId(7),
            kind,
            FactionId::Red,
            GridCoord::new(3, 4),
            Vec2Fixed::from_ints(14, 17),
            roster.get(kind),
        )
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(UnitKind::parse("Hunter").unwrap(), UnitKind::Hunter);
        assert!(matches!(
            UnitKind::parse("dragon"),
            Err(GameError::UnknownUnitKind(_))
        ));
        assert_eq!(UnitKind::parse_or_default("dragon"), UnitKind::Caveman);
    }

    #[test]
    fn test_health_saturates() {
        let mut health = Health::new(3);
        assert!(!health.apply_damage(2));
        assert!(health.apply_damage(5));
        assert_eq!(health.current, 0);
        assert!(!health.apply_damage(1));
        assert!(health.is_dead());
        assert_eq!(health.fraction(), Fixed::ZERO);
    }

    #[test]
    fn test_cooldown_cycle() {
        let mut combat = CombatStats::new(20, 3);
        assert!(combat.is_ready());
        combat.reset();
        assert!(!combat.is_ready());
        for _ in 0..3 {
            combat.tick_cooldown();
        }
        assert!(combat.is_ready());
        combat.tick_cooldown();
        assert_eq!(combat.cooldown, 0);
    }

    #[test]
    fn test_capabilities_follow_kind() {
        let builder = unit(UnitKind::Builder);
        assert!(builder.is_builder());
        assert!(builder.combat.is_none());

        let hunter = unit(UnitKind::Hunter);
        assert!(!hunter.is_builder());
        assert_eq!(hunter.combat.map(|c| c.range), Some(40));
    }

    #[test]
    fn test_new_unit_is_idle() {
        let caveman = unit(UnitKind::Caveman);
        assert!(caveman.is_idle());
        assert!(caveman.is_alive());
        assert_eq!(caveman.health.current, 10);
    }

    #[test]
    fn test_build_site_ignored_for_fighters() {
        let mut caveman = unit(UnitKind::Caveman);
        caveman.set_build_site(Some(FacilityId(1)));
        assert_eq!(caveman.build_site(), None);

        let mut builder = unit(UnitKind::Builder);
        builder.set_build_site(Some(FacilityId(1)));
        assert_eq!(builder.build_site(), Some(FacilityId(1)));
    }

    #[test]
    fn test_hop_phase_stable_and_in_range() {
        let phase = hop_phase(UnitId(42));
        assert_eq!(phase, hop_phase(UnitId(42)));
        assert!((0.0..1.0).contains(&phase));
        assert_ne!(hop_phase(UnitId(1)), hop_phase(UnitId(2)));
    }

    #[test]
    fn test_hop_offset_only_when_moving() {
        let mut caveman = unit(UnitKind::Caveman);
        assert_eq!(caveman.hop_offset(100.0), 0.0);

        caveman.is_moving = true;
        let lowest = (0..42)
            .map(|step| caveman.hop_offset(step as f32 * 10.0))
            .fold(0.0f32, f32::min);
        assert!(lowest < 0.0);
        assert!(lowest >= -HOP_AMPLITUDE_PX);
    }
}
