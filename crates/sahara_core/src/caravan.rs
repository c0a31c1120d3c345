//! Caravans: mobile loot targets and the world-boss variant.
//!
//! Escorts and loot value are rolled once at creation from per-kind ranges
//! and never change afterwards (a save may override them on load).

use std::collections::{BTreeMap, VecDeque};
use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::hex::HexCoord;
use crate::procgen::generate_movement_path;
use crate::resources::ResourceKind;

/// Identifier of a caravan in the world's visible set.
pub type CaravanId = u64;

/// Default health pool of a Sandworm world boss.
pub const SANDWORM_HEALTH: i64 = 10_000;

/// Caravan type. Each kind carries its balance table as data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CaravanKind {
    /// Small salt traders.
    #[default]
    Salt,
    /// Gold convoy.
    Gold,
    /// Large spice train.
    Spices,
    /// Heavily guarded imperial convoy.
    Imperial,
    /// Legendary sandworm; world-boss material.
    Sandworm,
}

impl CaravanKind {
    /// Every kind, in spawn-table order.
    pub const ALL: [Self; 5] = [
        Self::Salt,
        Self::Gold,
        Self::Spices,
        Self::Imperial,
        Self::Sandworm,
    ];

    /// Relative spawn weight for random generation.
    #[must_use]
    pub const fn spawn_weight(self) -> f64 {
        match self {
            Self::Salt => 0.40,
            Self::Gold => 0.35,
            Self::Spices => 0.20,
            Self::Imperial => 0.049,
            Self::Sandworm => 0.001,
        }
    }

    /// Escort count range.
    #[must_use]
    pub const fn escort_range(self) -> RangeInclusive<u32> {
        match self {
            Self::Salt => 3..=8,
            Self::Gold => 8..=15,
            Self::Spices => 15..=25,
            Self::Imperial => 25..=40,
            Self::Sandworm => 100..=150,
        }
    }

    /// Loot value range.
    #[must_use]
    pub const fn loot_range(self) -> RangeInclusive<u32> {
        match self {
            Self::Salt => 50..=150,
            Self::Gold => 200..=500,
            Self::Spices => 500..=1000,
            Self::Imperial => 1000..=2000,
            Self::Sandworm => 5000..=10_000,
        }
    }

    /// Combat strength added on top of the escorts.
    #[must_use]
    pub const fn type_bonus(self) -> u32 {
        match self {
            Self::Salt => 1,
            Self::Gold => 3,
            Self::Spices => 5,
            Self::Imperial => 8,
            Self::Sandworm => 0,
        }
    }

    /// Display size class.
    #[must_use]
    pub const fn size_class(self) -> SizeClass {
        match self {
            Self::Salt => SizeClass::Small,
            Self::Gold => SizeClass::Medium,
            Self::Spices => SizeClass::Large,
            Self::Imperial => SizeClass::Huge,
            Self::Sandworm => SizeClass::Colossal,
        }
    }

    /// Seconds between two waypoint moves.
    #[must_use]
    pub const fn move_interval(self) -> f64 {
        match self {
            Self::Salt => 10.0,
            Self::Gold => 15.0,
            Self::Spices => 20.0,
            Self::Imperial => 30.0,
            Self::Sandworm => 60.0,
        }
    }

    /// Loot composition as integer weights. Weights are normalized by their
    /// sum, so they need not add up to 100.
    #[must_use]
    pub const fn loot_table(self) -> &'static [(ResourceKind, u32)] {
        match self {
            Self::Salt => &[
                (ResourceKind::Salt, 70),
                (ResourceKind::Gold, 20),
                (ResourceKind::Water, 10),
            ],
            Self::Gold => &[
                (ResourceKind::Gold, 70),
                (ResourceKind::Salt, 20),
                (ResourceKind::Spices, 10),
            ],
            Self::Spices => &[
                (ResourceKind::Spices, 60),
                (ResourceKind::Gold, 30),
                (ResourceKind::Salt, 10),
            ],
            Self::Imperial => &[
                (ResourceKind::Gold, 50),
                (ResourceKind::Spices, 30),
                (ResourceKind::Salt, 20),
            ],
            Self::Sandworm => &[
                (ResourceKind::Gold, 40),
                (ResourceKind::Spices, 40),
                (ResourceKind::Water, 20),
            ],
        }
    }

    /// The kind with the largest loot weight; ties go to the earlier
    /// [`ResourceKind`].
    #[must_use]
    pub fn dominant_loot(self) -> ResourceKind {
        let mut best = (ResourceKind::Gold, 0);
        for &(kind, weight) in self.loot_table() {
            if weight > best.1 || (weight == best.1 && kind < best.0) {
                best = (kind, weight);
            }
        }
        best.0
    }

    /// Draw a kind using the spawn weights.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let total: f64 = Self::ALL.iter().map(|k| k.spawn_weight()).sum();
        let mut roll = rng.random::<f64>() * total;
        for kind in Self::ALL {
            roll -= kind.spawn_weight();
            if roll < 0.0 {
                return kind;
            }
        }
        Self::Salt
    }

    /// Human readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Salt => "Salt caravan",
            Self::Gold => "Gold caravan",
            Self::Spices => "Spice caravan",
            Self::Imperial => "Imperial convoy",
            Self::Sandworm => "Sandworm",
        }
    }
}

/// Visual size of a caravan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    /// Salt.
    #[default]
    Small,
    /// Gold.
    Medium,
    /// Spices.
    Large,
    /// Imperial.
    Huge,
    /// Sandworm.
    Colossal,
}

/// Difficulty bucket derived from combat strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Strength below 15.
    Easy,
    /// Strength below 30.
    Medium,
    /// Strength below 50.
    Hard,
    /// Strength 50 and above.
    Legendary,
}

impl Difficulty {
    /// Bucket a combat strength.
    #[must_use]
    pub const fn from_strength(strength: u32) -> Self {
        match strength {
            0..=14 => Self::Easy,
            15..=29 => Self::Medium,
            30..=49 => Self::Hard,
            _ => Self::Legendary,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Legendary => "legendary",
        }
    }
}

/// What the player knows about a caravan's cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootReport {
    /// Unscouted: only the aggregate value.
    Estimate(u32),
    /// Scouted: exact split per resource.
    Breakdown(BTreeMap<ResourceKind, u32>),
}

/// Health pool and damage ledger of a world boss.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BossState {
    /// Starting health.
    pub max_health: i64,
    /// Remaining health; may dip below zero before the defeat check.
    pub health: i64,
    /// Cumulative damage per contributor id.
    pub damage: BTreeMap<String, u64>,
}

impl BossState {
    /// Total damage dealt by all contributors.
    #[must_use]
    pub fn total_damage(&self) -> u64 {
        self.damage.values().fold(0u64, |acc, d| acc.saturating_add(*d))
    }

    /// Remaining health as a percentage of the pool.
    #[must_use]
    pub fn health_percentage(&self) -> f64 {
        if self.max_health <= 0 {
            return 0.0;
        }
        (self.health.max(0) as f64 / self.max_health as f64) * 100.0
    }
}

/// A raidable caravan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caravan {
    /// Identifier, unique within a world.
    pub id: CaravanId,
    /// Current hex.
    pub position: HexCoord,
    /// Caravan kind.
    pub kind: CaravanKind,
    /// Escort count.
    pub escorts: u32,
    /// Total loot carried.
    pub loot_value: u32,
    /// Display size.
    pub size: SizeClass,
    /// Seconds between moves.
    pub move_interval: f64,
    /// Waypoints still to visit.
    pub path: VecDeque<HexCoord>,
    /// World time of the last move.
    pub last_move: f64,
    /// Whether the cargo breakdown has been revealed.
    pub scouted: bool,
    /// Present only on world bosses.
    pub boss: Option<BossState>,
}

impl Default for Caravan {
    fn default() -> Self {
        let kind = CaravanKind::Salt;
        Self {
            id: 0,
            position: HexCoord::ORIGIN,
            kind,
            escorts: 5,
            loot_value: 100,
            size: kind.size_class(),
            move_interval: kind.move_interval(),
            path: VecDeque::new(),
            last_move: 0.0,
            scouted: false,
            boss: None,
        }
    }
}

impl Caravan {
    /// Roll a new caravan at `position`. A `None` kind is drawn from the
    /// spawn weights.
    pub fn generate<R: Rng + ?Sized>(
        id: CaravanId,
        position: HexCoord,
        kind: Option<CaravanKind>,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let kind = kind.unwrap_or_else(|| CaravanKind::choose(rng));
        let escorts = rng.random_range(kind.escort_range());
        let loot_value = rng.random_range(kind.loot_range());
        let path = generate_movement_path(rng, position);
        Self {
            id,
            position,
            kind,
            escorts,
            loot_value,
            size: kind.size_class(),
            move_interval: kind.move_interval(),
            path,
            last_move: now,
            scouted: false,
            boss: None,
        }
    }

    /// Roll a Sandworm world boss with the given health pool.
    pub fn world_boss<R: Rng + ?Sized>(
        id: CaravanId,
        position: HexCoord,
        health: i64,
        now: f64,
        rng: &mut R,
    ) -> Self {
        let mut boss = Self::generate(id, position, Some(CaravanKind::Sandworm), now, rng);
        let health = health.max(1);
        boss.boss = Some(BossState {
            max_health: health,
            health,
            damage: BTreeMap::new(),
        });
        boss
    }

    /// Whether this caravan is a world boss.
    #[must_use]
    pub const fn is_boss(&self) -> bool {
        self.boss.is_some()
    }

    /// `escorts * 2 + type bonus`.
    #[must_use]
    pub fn combat_strength(&self) -> u32 {
        self.escorts
            .saturating_mul(2)
            .saturating_add(self.kind.type_bonus())
    }

    /// Difficulty bucket of [`combat_strength`](Self::combat_strength).
    #[must_use]
    pub fn raid_difficulty(&self) -> Difficulty {
        Difficulty::from_strength(self.combat_strength())
    }

    /// One-line description for the UI.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "{} with {} escorts (worth {} loot)",
            self.kind.label(),
            self.escorts,
            self.loot_value
        )
    }

    /// Mark the caravan scouted. Idempotent.
    pub fn scout(&mut self) {
        self.scouted = true;
    }

    /// What the player may see of the cargo.
    #[must_use]
    pub fn loot_distribution(&self) -> LootReport {
        if self.scouted {
            LootReport::Breakdown(self.loot_breakdown())
        } else {
            LootReport::Estimate(self.loot_value)
        }
    }

    /// Exact cargo split, regardless of scouting.
    ///
    /// Each share is floored and the remainder goes to the dominant kind, so
    /// the values always sum to `loot_value`.
    #[must_use]
    pub fn loot_breakdown(&self) -> BTreeMap<ResourceKind, u32> {
        let table = self.kind.loot_table();
        let total_weight: u64 = table.iter().map(|(_, w)| u64::from(*w)).sum();
        let value = u64::from(self.loot_value);

        let mut split = BTreeMap::new();
        if total_weight == 0 {
            split.insert(self.kind.dominant_loot(), self.loot_value);
            return split;
        }

        let mut allocated = 0u64;
        for &(kind, weight) in table {
            let share = value * u64::from(weight) / total_weight;
            allocated += share;
            *split.entry(kind).or_insert(0) += share as u32;
        }
        let remainder = (value - allocated) as u32;
        *split.entry(self.kind.dominant_loot()).or_insert(0) += remainder;
        split
    }

    /// Step to the next waypoint once the move interval has elapsed.
    ///
    /// Moves at most one waypoint per call and regenerates the path when it
    /// runs out. Returns `true` if the caravan moved.
    pub fn advance_movement<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> bool {
        if now - self.last_move < self.move_interval {
            return false;
        }
        if self.path.is_empty() {
            self.path = generate_movement_path(rng, self.position);
        }
        let Some(next) = self.path.pop_front() else {
            return false;
        };
        self.position = next;
        self.last_move = now;
        if self.path.is_empty() {
            self.path = generate_movement_path(rng, self.position);
        }
        true
    }

    /// Record boss damage from a contributor.
    pub fn apply_damage(&mut self, contributor: &str, amount: u64) -> Result<()> {
        let boss = self.boss.as_mut().ok_or(GameError::NotABoss(self.id))?;
        boss.health = boss
            .health
            .saturating_sub(i64::try_from(amount).unwrap_or(i64::MAX));
        let entry = boss.damage.entry(contributor.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    /// Boss health at or below zero.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.boss.as_ref().is_some_and(|b| b.health <= 0)
    }
}
