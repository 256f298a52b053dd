//! Faction identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two sides of a match.
///
/// Ordering is `Red < Blue`, which is the order factions are listed in
/// queries and hashed in [`crate::simulation::Simulation::state_hash`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FactionId {
    /// The player's tribe.
    #[default]
    Red,
    /// The opposing tribe.
    Blue,
}

impl FactionId {
    /// Every faction, in canonical order.
    pub const ALL: [Self; 2] = [Self::Red, Self::Blue];

    /// Lowercase name as used in scenario files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }

    /// Parse a faction name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|faction| faction.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Parse a faction name, falling back to [`FactionId::Red`].
    #[must_use]
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// True when `other` is a different side.
    #[must_use]
    pub fn is_hostile_to(self, other: Self) -> bool {
        self != other
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(FactionId::parse("red"), Some(FactionId::Red));
        assert_eq!(FactionId::parse(" Blue "), Some(FactionId::Blue));
        assert_eq!(FactionId::parse("green"), None);
    }

    #[test]
    fn test_unknown_falls_back_to_red() {
        assert_eq!(FactionId::parse_or_default("purple"), FactionId::Red);
        assert_eq!(FactionId::parse_or_default(""), FactionId::Red);
    }

    #[test]
    fn test_hostility() {
        assert!(FactionId::Red.is_hostile_to(FactionId::Blue));
        assert!(!FactionId::Blue.is_hostile_to(FactionId::Blue));
    }
}
