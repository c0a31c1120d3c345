//! Balance configuration.
//!
//! Every tunable constant of the simulation lives here. Configs are plain
//! data deserialized from RON; every field has a default, so partial files
//! are valid. This module does no IO: callers read the file and hand the text
//! to [`GameConfig::from_ron_str`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::caravan::SANDWORM_HEALTH;
use crate::math::{fixed_from_f64, Fixed};
use crate::resources::ResourceKind;

/// One day of world time in seconds.
pub const DAY: f64 = 86_400.0;

/// Error type for configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed but failed validation.
    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// A value per resource, written as a RON struct.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTable<T> {
    /// Water.
    pub water: T,
    /// Salt.
    pub salt: T,
    /// Gold.
    pub gold: T,
    /// Spices.
    pub spices: T,
    /// Slaves.
    pub slaves: T,
}

impl<T: Copy> ResourceTable<T> {
    /// Value for one resource.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> T {
        match kind {
            ResourceKind::Water => self.water,
            ResourceKind::Salt => self.salt,
            ResourceKind::Gold => self.gold,
            ResourceKind::Spices => self.spices,
            ResourceKind::Slaves => self.slaves,
        }
    }

    /// All values keyed by resource.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<ResourceKind, T> {
        ResourceKind::ALL.iter().map(|k| (*k, self.get(*k))).collect()
    }
}

/// Sandstorm timing and damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandstormConfig {
    /// Shortest gap between two weather checks (seconds).
    pub check_interval_min: f64,
    /// Longest gap between two weather checks (seconds).
    pub check_interval_max: f64,
    /// Chance that a check starts a storm.
    pub start_chance: f64,
    /// Shortest storm (seconds).
    pub duration_min: f64,
    /// Longest storm (seconds).
    pub duration_max: f64,
    /// Per-building chance to lose a level, before defense.
    pub base_damage_chance: f64,
    /// Floor on the damage chance after defense.
    pub min_damage_chance: f64,
}

impl Default for SandstormConfig {
    fn default() -> Self {
        Self {
            check_interval_min: 300.0,
            check_interval_max: 900.0,
            start_chance: 0.2,
            duration_min: 30.0,
            duration_max: 120.0,
            base_damage_chance: 0.3,
            min_damage_chance: 0.1,
        }
    }
}

/// Daily, weekly and world-boss events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// World seconds between daily event rolls.
    pub daily_interval: f64,
    /// How long a daily event lasts.
    pub daily_duration: f64,
    /// How long the weekly event lasts.
    pub weekly_duration: f64,
    /// Imperial caravans spawned when the weekly event starts.
    pub weekly_caravans: u32,
    /// Spawn radius around camp for event caravans.
    pub event_spawn_radius: u32,
    /// World boss health pool.
    pub boss_health: i64,
    /// How long a world boss stays.
    pub boss_duration: f64,
    /// Reward pool split between boss contributors.
    pub boss_reward_pool: ResourceTable<u32>,
    /// Boss damage per point of effective raider strength.
    pub damage_per_strength: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            daily_interval: DAY,
            daily_duration: DAY,
            weekly_duration: 7.0 * DAY,
            weekly_caravans: 3,
            event_spawn_radius: 3,
            boss_health: SANDWORM_HEALTH,
            boss_duration: 2.0 * DAY,
            boss_reward_pool: ResourceTable {
                water: 1000,
                salt: 0,
                gold: 5000,
                spices: 2000,
                slaves: 0,
            },
            damage_per_strength: 1.0,
        }
    }
}

/// Complete balance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// World seed.
    pub seed: u64,
    /// Name pushed to the remote mirror.
    pub player_name: String,
    /// Radius of the generated world (hexes).
    pub world_radius: u32,
    /// Caravans placed at world creation.
    pub starting_caravans: u32,
    /// Initial stocks.
    pub starting_resources: ResourceTable<u32>,
    /// Base generation rates (accumulator units per second).
    pub base_rates: ResourceTable<f64>,
    /// Water drunk per person per second.
    pub water_consumption_rate: f64,
    /// Raiders at world creation.
    pub start_raiders: u32,
    /// Raider capacity before tents.
    pub base_max_raiders: u32,
    /// Chance that scouting an empty hex finds a caravan.
    pub scout_discovery_chance: f64,
    /// Desert-dune advantage of the raiders.
    pub terrain_bonus: f64,
    /// Slaves converted per recruitment.
    pub recruit_batch: u32,
    /// Seconds between rewarded ads.
    pub ad_cooldown: f64,
    /// Gems at world creation.
    pub starting_gems: u64,
    /// Upper bound on one tick's `dt`.
    pub max_lump_seconds: f64,
    /// Weather.
    pub sandstorm: SandstormConfig,
    /// Time-boxed events.
    pub events: EventConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            player_name: "Raider".to_string(),
            world_radius: 10,
            starting_caravans: 5,
            starting_resources: ResourceTable {
                water: 100,
                salt: 50,
                gold: 25,
                spices: 0,
                slaves: 0,
            },
            base_rates: ResourceTable {
                water: 1.0,
                salt: 0.5,
                gold: 0.1,
                spices: 0.05,
                slaves: 0.0,
            },
            water_consumption_rate: 0.001,
            start_raiders: 10,
            base_max_raiders: 50,
            scout_discovery_chance: 0.4,
            terrain_bonus: 0.1,
            recruit_batch: 5,
            ad_cooldown: 300.0,
            starting_gems: 0,
            max_lump_seconds: 30.0 * DAY,
            sandstorm: SandstormConfig::default(),
            events: EventConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse from a RON string and validate.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(ron)?;
        let problems = config.validate();
        if problems.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Same config with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Base rates converted to fixed point.
    #[must_use]
    pub fn base_rates_fixed(&self) -> BTreeMap<ResourceKind, Fixed> {
        ResourceKind::ALL
            .iter()
            .map(|k| (*k, fixed_from_f64(self.base_rates.get(*k))))
            .collect()
    }

    /// Human-readable list of problems; empty when the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut probability = |name: &str, value: f64| {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be within 0..=1, got {value}"));
            }
        };
        probability("scout_discovery_chance", self.scout_discovery_chance);
        probability("sandstorm.start_chance", self.sandstorm.start_chance);
        probability("sandstorm.base_damage_chance", self.sandstorm.base_damage_chance);
        probability("sandstorm.min_damage_chance", self.sandstorm.min_damage_chance);

        let mut non_negative = |name: &str, value: f64| {
            if !value.is_finite() || value < 0.0 {
                problems.push(format!("{name} must be a finite non-negative number, got {value}"));
            }
        };
        non_negative("water_consumption_rate", self.water_consumption_rate);
        non_negative("terrain_bonus", self.terrain_bonus);
        non_negative("ad_cooldown", self.ad_cooldown);
        non_negative("events.damage_per_strength", self.events.damage_per_strength);
        for kind in ResourceKind::ALL {
            non_negative(&format!("base_rates.{kind}"), self.base_rates.get(kind));
        }

        let mut positive = |name: &str, value: f64| {
            if !value.is_finite() || value <= 0.0 {
                problems.push(format!("{name} must be positive, got {value}"));
            }
        };
        positive("max_lump_seconds", self.max_lump_seconds);
        positive("events.daily_interval", self.events.daily_interval);
        positive("events.daily_duration", self.events.daily_duration);
        positive("events.weekly_duration", self.events.weekly_duration);
        positive("events.boss_duration", self.events.boss_duration);
        positive("sandstorm.check_interval_min", self.sandstorm.check_interval_min);
        positive("sandstorm.duration_min", self.sandstorm.duration_min);

        let s = &self.sandstorm;
        if s.check_interval_min > s.check_interval_max {
            problems.push("sandstorm.check_interval_min exceeds check_interval_max".to_string());
        }
        if s.duration_min > s.duration_max {
            problems.push("sandstorm.duration_min exceeds duration_max".to_string());
        }
        if self.start_raiders > self.base_max_raiders {
            problems.push(format!(
                "start_raiders ({}) exceeds base_max_raiders ({})",
                self.start_raiders, self.base_max_raiders
            ));
        }
        if self.events.boss_health <= 0 {
            problems.push("events.boss_health must be positive".to_string());
        }
        if self.world_radius == 0 {
            problems.push("world_radius must be at least 1".to_string());
        }
        problems
    }
}
