//! Camp buildings on the 8x8 grid.
//!
//! Placement only validates the cell and creates state; charging the base
//! cost is the caller's job. Upgrades charge the building's current upgrade
//! cost. Aggregate effects are the sum of `per-level effect * level` over all
//! buildings and are recomputed after every placement, upgrade and damage.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::resources::{Cost, ResourceKind, Stockpile};

/// Side length of the camp grid.
pub const GRID_SIZE: i32 = 8;

/// A cell of the camp grid. Serializes as `"x,y"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CellPos {
    /// Column, `0..8`.
    pub x: i32,
    /// Row, `0..8`.
    pub y: i32,
}

impl CellPos {
    /// Create a cell position (not bounds-checked).
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Inside the 8x8 grid.
    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.x >= 0 && self.x < GRID_SIZE && self.y >= 0 && self.y < GRID_SIZE
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Malformed `"x,y"` key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell key '{0}', expected \"x,y\"")]
pub struct ParseCellError(pub String);

impl FromStr for CellPos {
    type Err = ParseCellError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (x, y) = s.split_once(',').ok_or_else(|| ParseCellError(s.into()))?;
        let x = x.trim().parse().map_err(|_| ParseCellError(s.into()))?;
        let y = y.trim().parse().map_err(|_| ParseCellError(s.into()))?;
        Ok(Self::new(x, y))
    }
}

impl TryFrom<String> for CellPos {
    type Error = ParseCellError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellPos> for String {
    fn from(pos: CellPos) -> Self {
        pos.to_string()
    }
}

/// Aggregate effect keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Extra raider capacity.
    MaxRaiders,
    /// Extra water accumulator units per second.
    WaterGeneration,
    /// Fractional bonus on recruitment.
    RecruitmentBonus,
    /// Reduces sandstorm damage chance 1:1.
    DefenseBonus,
    /// Extra salt accumulator units per second.
    AutoProduction,
}

/// Building type. Each kind carries its balance table as data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Housing for raiders.
    Tent,
    /// Water source.
    Well,
    /// Camels; speeds up recruitment.
    Stable,
    /// Early warning against sandstorms.
    Watchtower,
    /// Captive labour producing salt.
    SlavePen,
}

impl BuildingKind {
    /// Every building type.
    pub const ALL: [Self; 5] = [
        Self::Tent,
        Self::Well,
        Self::Stable,
        Self::Watchtower,
        Self::SlavePen,
    ];

    /// Highest reachable level.
    #[must_use]
    pub const fn max_level(self) -> u32 {
        match self {
            Self::Tent | Self::Well => 10,
            Self::Stable | Self::Watchtower | Self::SlavePen => 5,
        }
    }

    /// Placement cost, also the level-1 upgrade cost.
    #[must_use]
    pub const fn base_cost_table(self) -> &'static [(ResourceKind, u32)] {
        match self {
            Self::Tent => &[(ResourceKind::Gold, 20)],
            Self::Well => &[(ResourceKind::Gold, 30), (ResourceKind::Salt, 10)],
            Self::Stable => &[(ResourceKind::Gold, 50), (ResourceKind::Salt, 20)],
            Self::Watchtower => &[(ResourceKind::Gold, 40), (ResourceKind::Salt, 30)],
            Self::SlavePen => &[(ResourceKind::Gold, 60), (ResourceKind::Spices, 10)],
        }
    }

    /// Placement cost as a [`Cost`].
    #[must_use]
    pub fn base_cost(self) -> Cost {
        self.base_cost_table().iter().copied().collect()
    }

    /// The effect this building grants per level.
    #[must_use]
    pub fn effect_per_level(self) -> (EffectKind, Fixed) {
        match self {
            Self::Tent => (EffectKind::MaxRaiders, Fixed::from_num(5)),
            Self::Well => (EffectKind::WaterGeneration, Fixed::from_num(0.5)),
            Self::Stable => (EffectKind::RecruitmentBonus, Fixed::from_num(0.1)),
            Self::Watchtower => (EffectKind::DefenseBonus, Fixed::from_num(0.05)),
            Self::SlavePen => (EffectKind::AutoProduction, Fixed::from_num(0.2)),
        }
    }

    /// Cost to upgrade from `level` to `level + 1`:
    /// `floor(base * 1.5^(level-1))` per resource, in exact integer math.
    #[must_use]
    pub fn upgrade_cost_at(self, level: u32) -> Cost {
        let exp = level.saturating_sub(1).min(40);
        let num = 3u128.pow(exp);
        let den = 2u128.pow(exp);
        self.base_cost_table()
            .iter()
            .map(|&(kind, base)| {
                let amount = u128::from(base) * num / den;
                (kind, u32::try_from(amount).unwrap_or(u32::MAX))
            })
            .collect()
    }
}

/// One placed building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Building type.
    pub kind: BuildingKind,
    /// Current level, `1..=max_level`.
    pub level: u32,
    /// Derived from kind and level; rebuilt on load.
    #[serde(skip)]
    upgrade_cost: Cost,
}

impl Building {
    /// A new level-1 building.
    #[must_use]
    pub fn new(kind: BuildingKind) -> Self {
        Self::with_level(kind, 1)
    }

    /// A building at the given level, clamped into `1..=max_level`.
    #[must_use]
    pub fn with_level(kind: BuildingKind, level: u32) -> Self {
        let level = level.clamp(1, kind.max_level());
        Self {
            kind,
            level,
            upgrade_cost: kind.upgrade_cost_at(level),
        }
    }

    /// Cost of the next upgrade.
    #[must_use]
    pub fn upgrade_cost(&self) -> &Cost {
        &self.upgrade_cost
    }

    /// At the type's maximum level.
    #[must_use]
    pub fn is_max_level(&self) -> bool {
        self.level >= self.kind.max_level()
    }

    fn set_level(&mut self, level: u32) {
        self.level = level.clamp(1, self.kind.max_level());
        self.upgrade_cost = self.kind.upgrade_cost_at(self.level);
    }
}

/// The camp: buildings keyed by cell plus their aggregate effects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampGrid {
    buildings: BTreeMap<CellPos, Building>,
    #[serde(skip)]
    effects: BTreeMap<EffectKind, Fixed>,
}

impl CampGrid {
    /// An empty camp.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Building at a cell.
    #[must_use]
    pub fn get(&self, pos: CellPos) -> Option<&Building> {
        self.buildings.get(&pos)
    }

    /// All buildings in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellPos, &Building)> {
        self.buildings.iter()
    }

    /// Number of placed buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// No buildings placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Sum of all building levels.
    #[must_use]
    pub fn total_levels(&self) -> u32 {
        self.buildings.values().map(|b| b.level).sum()
    }

    /// Validate that a building could be placed at `pos`.
    pub fn check_placement(&self, pos: CellPos) -> Result<()> {
        if !pos.in_bounds() {
            return Err(GameError::OutOfBounds { x: pos.x, y: pos.y });
        }
        if self.buildings.contains_key(&pos) {
            return Err(GameError::CellOccupied { x: pos.x, y: pos.y });
        }
        Ok(())
    }

    /// Place a level-1 building. Does not charge any cost.
    pub fn place(&mut self, pos: CellPos, kind: BuildingKind) -> Result<()> {
        self.check_placement(pos)?;
        self.buildings.insert(pos, Building::new(kind));
        self.recompute_effects();
        Ok(())
    }

    /// Upgrade the building at `pos`, paying its upgrade cost from `stock`.
    ///
    /// Returns the new level. Nothing changes on error.
    pub fn upgrade(&mut self, pos: CellPos, stock: &mut Stockpile) -> Result<u32> {
        let building = self
            .buildings
            .get_mut(&pos)
            .ok_or(GameError::NoBuilding { x: pos.x, y: pos.y })?;
        if building.is_max_level() {
            return Err(GameError::MaxLevel(building.kind.max_level()));
        }
        stock.spend(&building.upgrade_cost)?;
        building.set_level(building.level + 1);
        let level = building.level;
        self.recompute_effects();
        Ok(level)
    }

    /// Knock one level off the building at `pos`, never below 1.
    ///
    /// Returns `true` if a level was lost. Callers recompute effects once
    /// after a batch of damage via [`recompute_effects`](Self::recompute_effects).
    pub fn damage(&mut self, pos: CellPos) -> bool {
        match self.buildings.get_mut(&pos) {
            Some(building) if building.level > 1 => {
                building.set_level(building.level - 1);
                true
            }
            _ => false,
        }
    }

    /// Rebuild derived state: upgrade costs and aggregate effects.
    pub fn recompute_effects(&mut self) {
        let mut effects = BTreeMap::new();
        for building in self.buildings.values_mut() {
            building.set_level(building.level);
            let (kind, per_level) = building.kind.effect_per_level();
            let entry = effects.entry(kind).or_insert(Fixed::ZERO);
            *entry = entry.saturating_add(per_level.saturating_mul(Fixed::from_num(building.level)));
        }
        self.effects = effects;
    }

    /// Aggregate value of one effect.
    #[must_use]
    pub fn effect(&self, kind: EffectKind) -> Fixed {
        self.effects.get(&kind).copied().unwrap_or(Fixed::ZERO)
    }

    /// Extra raider capacity from tents.
    #[must_use]
    pub fn max_raiders_bonus(&self) -> u32 {
        self.effect(EffectKind::MaxRaiders).to_num::<u32>()
    }

    /// Per-resource generation bonuses (wells add water, pens add salt).
    #[must_use]
    pub fn generation_bonuses(&self) -> BTreeMap<ResourceKind, Fixed> {
        let mut bonuses = BTreeMap::new();
        let water = self.effect(EffectKind::WaterGeneration);
        if water > Fixed::ZERO {
            bonuses.insert(ResourceKind::Water, water);
        }
        let salt = self.effect(EffectKind::AutoProduction);
        if salt > Fixed::ZERO {
            bonuses.insert(ResourceKind::Salt, salt);
        }
        bonuses
    }
}
