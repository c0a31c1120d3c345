//! Hero roster and bonus aggregation.
//!
//! A hero assigned to a raid is unavailable until returned, and only
//! available heroes contribute to bonuses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_map_serde, Fixed};

/// Bonus categories a hero can grant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    /// Multiplies raider strength.
    RaidDamage,
    /// Multiplies raider strength again at resolution.
    RaidSuccess,
    /// Raises the chance of finding caravans while scouting.
    Scouting,
    /// Reduces water consumption.
    WaterSaving,
}

/// A named hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hero {
    /// Display name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Bonus magnitudes (fractions, e.g. 0.2 = +20%).
    #[serde(with = "fixed_map_serde")]
    pub bonuses: BTreeMap<BonusKind, Fixed>,
    /// Hero level.
    pub level: u32,
    /// Free to join a raid.
    pub available: bool,
}

impl Default for Hero {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            bonuses: BTreeMap::new(),
            level: 1,
            available: true,
        }
    }
}

impl Hero {
    /// Create an available level-1 hero.
    #[must_use]
    pub fn new(name: &str, description: &str, bonuses: &[(BonusKind, Fixed)]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            bonuses: bonuses.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Magnitude of one bonus (zero if absent).
    #[must_use]
    pub fn bonus(&self, kind: BonusKind) -> Fixed {
        self.bonuses.get(&kind).copied().unwrap_or(Fixed::ZERO)
    }
}

/// All heroes of the player, addressed by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroRoster {
    heroes: Vec<Hero>,
}

impl Default for HeroRoster {
    fn default() -> Self {
        Self {
            heroes: vec![
                Hero::new(
                    "Tariq the Swift",
                    "A veteran raider who never misses an opening",
                    &[(BonusKind::RaidSuccess, Fixed::from_num(0.2))],
                ),
                Hero::new(
                    "Zahra Sandblade",
                    "Her warband hits harder than any in the dunes",
                    &[(BonusKind::RaidDamage, Fixed::from_num(0.25))],
                ),
                Hero::new(
                    "Old Idris",
                    "Reads the wind and the tracks of every caravan",
                    &[
                        (BonusKind::Scouting, Fixed::from_num(0.15)),
                        (BonusKind::WaterSaving, Fixed::from_num(0.1)),
                    ],
                ),
            ],
        }
    }
}

impl HeroRoster {
    /// Roster with the given heroes.
    #[must_use]
    pub fn new(heroes: Vec<Hero>) -> Self {
        Self { heroes }
    }

    /// All heroes.
    #[must_use]
    pub fn heroes(&self) -> &[Hero] {
        &self.heroes
    }

    /// Hero at an index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Hero> {
        self.heroes.get(index)
    }

    /// Sum of `kind` over available heroes only.
    #[must_use]
    pub fn get_bonus(&self, kind: BonusKind) -> Fixed {
        self.heroes
            .iter()
            .filter(|h| h.available)
            .fold(Fixed::ZERO, |acc, h| acc.saturating_add(h.bonus(kind)))
    }

    /// Sum of `kind` over the given heroes, regardless of availability.
    #[must_use]
    pub fn bonus_of(&self, indices: &[usize], kind: BonusKind) -> Fixed {
        indices
            .iter()
            .filter_map(|i| self.heroes.get(*i))
            .fold(Fixed::ZERO, |acc, h| acc.saturating_add(h.bonus(kind)))
    }

    /// Reserve heroes for a raid.
    ///
    /// Each valid, available index is marked unavailable and returned; invalid,
    /// unavailable or repeated indices are skipped.
    pub fn assign(&mut self, indices: &[usize]) -> Vec<usize> {
        let mut assigned = Vec::new();
        for &index in indices {
            if let Some(hero) = self.heroes.get_mut(index) {
                if hero.available {
                    hero.available = false;
                    assigned.push(index);
                }
            }
        }
        assigned
    }

    /// Make every hero available again.
    pub fn return_all(&mut self) {
        for hero in &mut self.heroes {
            hero.available = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonus_counts_available_only() {
        let mut roster = HeroRoster::default();
        assert_eq!(roster.get_bonus(BonusKind::RaidDamage), Fixed::from_num(0.25));

        roster.assign(&[1]);
        assert_eq!(roster.get_bonus(BonusKind::RaidDamage), Fixed::ZERO);
        assert_eq!(roster.bonus_of(&[1], BonusKind::RaidDamage), Fixed::from_num(0.25));
    }

    #[test]
    fn test_assign_skips_invalid_and_taken() {
        let mut roster = HeroRoster::default();
        assert_eq!(roster.assign(&[0, 7, 0, 2]), vec![0, 2]);
        assert!(!roster.get(0).unwrap().available);
        assert!(roster.get(1).unwrap().available);

        // Already assigned heroes cannot join a second raid.
        assert_eq!(roster.assign(&[0, 1]), vec![1]);
    }

    #[test]
    fn test_return_all_resets() {
        let mut roster = HeroRoster::default();
        roster.assign(&[0, 1, 2]);
        roster.return_all();
        assert!(roster.heroes().iter().all(|h| h.available));
    }

    #[test]
    fn test_sum_across_heroes() {
        let mut roster = HeroRoster::new(vec![
            Hero::new("a", "", &[(BonusKind::Scouting, Fixed::from_num(0.5))]),
            Hero::new("b", "", &[(BonusKind::Scouting, Fixed::from_num(0.25))]),
        ]);
        assert_eq!(roster.get_bonus(BonusKind::Scouting), Fixed::from_num(0.75));
        roster.assign(&[0]);
        assert_eq!(roster.get_bonus(BonusKind::Scouting), Fixed::from_num(0.25));
    }
}
