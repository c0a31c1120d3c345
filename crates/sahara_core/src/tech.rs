//! Tiered tech tree.
//!
//! Three branches with tiers 1..=3. Tier `t` is researchable once tier `t-1`
//! is unlocked; only the highest unlocked tier per branch is stored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::resources::{Cost, ResourceKind, Stockpile};

/// Highest tier in every branch.
pub const MAX_TIER: u8 = 3;

/// Research branch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TechBranch {
    /// Offensive techniques.
    Raiding,
    /// Desert survival.
    Survival,
    /// Trade and markets.
    Commerce,
}

/// Static definition of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechTier {
    /// Display name.
    pub name: &'static str,
    /// Effect description shown to the player.
    pub description: &'static str,
    cost: &'static [(ResourceKind, u32)],
}

impl TechTier {
    /// Research cost.
    #[must_use]
    pub fn cost(&self) -> Cost {
        self.cost.iter().copied().collect()
    }
}

static RAIDING: [TechTier; 3] = [
    TechTier {
        name: "Desert Tactics",
        description: "Raiders strike from the dunes with better coordination",
        cost: &[(ResourceKind::Gold, 50), (ResourceKind::Salt, 25)],
    },
    TechTier {
        name: "Camel Cavalry",
        description: "Mounted raiders run down fleeing caravans",
        cost: &[(ResourceKind::Gold, 150), (ResourceKind::Spices, 20)],
    },
    TechTier {
        name: "Sandstorm Ambush",
        description: "Raids launched under cover of blowing sand",
        cost: &[(ResourceKind::Gold, 400), (ResourceKind::Spices, 80)],
    },
];

static SURVIVAL: [TechTier; 3] = [
    TechTier {
        name: "Water Discipline",
        description: "The camp wastes less water",
        cost: &[(ResourceKind::Water, 50), (ResourceKind::Salt, 30)],
    },
    TechTier {
        name: "Deep Wells",
        description: "Wells reach hidden aquifers",
        cost: &[(ResourceKind::Gold, 120), (ResourceKind::Salt, 60)],
    },
    TechTier {
        name: "Storm Shelters",
        description: "Buildings weather sandstorms better",
        cost: &[(ResourceKind::Gold, 300), (ResourceKind::Spices, 50)],
    },
];

static COMMERCE: [TechTier; 3] = [
    TechTier {
        name: "Salt Roads",
        description: "Know where the salt traders travel",
        cost: &[(ResourceKind::Salt, 80)],
    },
    TechTier {
        name: "Black Market",
        description: "Fence stolen goods for a better price",
        cost: &[(ResourceKind::Gold, 100), (ResourceKind::Salt, 100)],
    },
    TechTier {
        name: "Spice Monopoly",
        description: "Control the spice trade across the dunes",
        cost: &[(ResourceKind::Gold, 350), (ResourceKind::Spices, 120)],
    },
];

impl TechBranch {
    /// Every branch.
    pub const ALL: [Self; 3] = [Self::Raiding, Self::Survival, Self::Commerce];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raiding => "raiding",
            Self::Survival => "survival",
            Self::Commerce => "commerce",
        }
    }

    /// All tiers of the branch, tier 1 first.
    #[must_use]
    pub fn tiers(self) -> &'static [TechTier; 3] {
        match self {
            Self::Raiding => &RAIDING,
            Self::Survival => &SURVIVAL,
            Self::Commerce => &COMMERCE,
        }
    }

    /// Definition of tier `tier` (1-based).
    #[must_use]
    pub fn tier(self, tier: u8) -> Option<&'static TechTier> {
        let index = usize::from(tier).checked_sub(1)?;
        self.tiers().get(index)
    }
}

impl fmt::Display for TechBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unlocked tier per branch (absent = 0).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechTree {
    unlocked: BTreeMap<TechBranch, u8>,
}

impl TechTree {
    /// Nothing researched.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest unlocked tier of a branch.
    #[must_use]
    pub fn unlocked_tier(&self, branch: TechBranch) -> u8 {
        self.unlocked.get(&branch).copied().unwrap_or(0).min(MAX_TIER)
    }

    /// Check prerequisites for researching `tier` in `branch`.
    pub fn check(&self, branch: TechBranch, tier: u8) -> Result<&'static TechTier> {
        let def = branch.tier(tier).ok_or_else(|| GameError::UnknownTech {
            branch: branch.to_string(),
            tier,
        })?;
        let current = self.unlocked_tier(branch);
        if current >= tier {
            return Err(GameError::TechAlreadyResearched {
                branch: branch.to_string(),
                tier,
            });
        }
        if current < tier - 1 {
            return Err(GameError::TechLocked {
                branch: branch.to_string(),
                tier,
            });
        }
        Ok(def)
    }

    /// Tier `tier` is researchable right now (ignoring cost).
    #[must_use]
    pub fn can_research(&self, branch: TechBranch, tier: u8) -> bool {
        self.check(branch, tier).is_ok()
    }

    /// Spend the tier's cost and unlock it. Nothing changes on error.
    pub fn research(&mut self, branch: TechBranch, tier: u8, stock: &mut Stockpile) -> Result<()> {
        let def = self.check(branch, tier)?;
        stock.spend(&def.cost())?;
        self.unlocked.insert(branch, tier);
        Ok(())
    }

    /// Sum of unlocked tiers over all branches.
    #[must_use]
    pub fn total_tiers(&self) -> u32 {
        TechBranch::ALL
            .iter()
            .map(|b| u32::from(self.unlocked_tier(*b)))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_stock() -> Stockpile {
        let stocks = ResourceKind::ALL.iter().map(|k| (*k, 10_000)).collect();
        Stockpile::new(&stocks, &BTreeMap::new())
    }

    #[test]
    fn test_tier_gating() {
        let mut tree = TechTree::new();
        let mut stock = rich_stock();

        assert!(!tree.can_research(TechBranch::Raiding, 2));
        assert!(tree.can_research(TechBranch::Raiding, 1));

        tree.research(TechBranch::Raiding, 1, &mut stock).unwrap();
        assert!(tree.can_research(TechBranch::Raiding, 2));
        assert!(!tree.can_research(TechBranch::Raiding, 1));
        assert!(!tree.can_research(TechBranch::Raiding, 3));
        assert_eq!(tree.unlocked_tier(TechBranch::Survival), 0);
    }

    #[test]
    fn test_error_kinds() {
        let tree = TechTree::new();
        assert_eq!(
            tree.check(TechBranch::Commerce, 2),
            Err(GameError::TechLocked {
                branch: "commerce".into(),
                tier: 2
            })
        );
        assert!(matches!(
            tree.check(TechBranch::Commerce, 0),
            Err(GameError::UnknownTech { .. })
        ));
        assert!(matches!(
            tree.check(TechBranch::Commerce, 4),
            Err(GameError::UnknownTech { .. })
        ));
    }

    #[test]
    fn test_research_spends_cost() {
        let mut tree = TechTree::new();
        let mut stock = rich_stock();
        tree.research(TechBranch::Survival, 1, &mut stock).unwrap();
        assert_eq!(stock.whole(ResourceKind::Water), 10_000 - 50);
        assert_eq!(stock.whole(ResourceKind::Salt), 10_000 - 30);
        assert_eq!(
            tree.research(TechBranch::Survival, 1, &mut stock),
            Err(GameError::TechAlreadyResearched {
                branch: "survival".into(),
                tier: 1
            })
        );
    }

    #[test]
    fn test_unaffordable_research_keeps_tier() {
        let mut tree = TechTree::new();
        let mut broke = Stockpile::default();
        assert!(matches!(
            tree.research(TechBranch::Raiding, 1, &mut broke),
            Err(GameError::InsufficientResources { .. })
        ));
        assert_eq!(tree.unlocked_tier(TechBranch::Raiding), 0);
    }

    #[test]
    fn test_total_tiers() {
        let mut tree = TechTree::new();
        let mut stock = rich_stock();
        for tier in 1..=MAX_TIER {
            tree.research(TechBranch::Commerce, tier, &mut stock).unwrap();
        }
        tree.research(TechBranch::Raiding, 1, &mut stock).unwrap();
        assert_eq!(tree.total_tiers(), 4);
    }
}
