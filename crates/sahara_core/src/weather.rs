//! Sandstorm weather.
//!
//! The weather is checked on a randomized interval. A check may start a storm
//! when none is active; the storm then counts down and ends on its own.
//! Starting a storm may knock buildings down a level.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::buildings::{CampGrid, CellPos, EffectKind};
use crate::config::SandstormConfig;
use crate::procgen::{random_between, roll_chance};

/// What a weather update changed.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherChange {
    /// A storm began and damaged these cells.
    Started {
        /// Storm length in seconds.
        duration: f64,
        /// Buildings that lost a level.
        damaged: Vec<CellPos>,
    },
    /// The active storm blew over.
    Ended,
}

/// Persisted sandstorm state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandstormState {
    /// A storm is raging.
    pub active: bool,
    /// Seconds left of the active storm.
    pub remaining: f64,
    /// World time of the next weather check.
    pub next_check: f64,
}

impl SandstormState {
    /// Clear skies with the first check scheduled after `now`.
    pub fn new<R: Rng + ?Sized>(now: f64, config: &SandstormConfig, rng: &mut R) -> Self {
        Self {
            active: false,
            remaining: 0.0,
            next_check: now + next_interval(config, rng),
        }
    }

    /// Advance the weather to world time `now` after `dt` seconds.
    ///
    /// An ending storm is reported before any new one so both can happen in
    /// one call. Damaged buildings have their effects recomputed.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        now: f64,
        dt: f64,
        config: &SandstormConfig,
        camp: &mut CampGrid,
        rng: &mut R,
    ) -> Vec<WeatherChange> {
        let mut changes = Vec::new();

        if self.active {
            self.remaining -= dt;
            if self.remaining <= 0.0 {
                self.active = false;
                self.remaining = 0.0;
                info!("Sandstorm ended");
                changes.push(WeatherChange::Ended);
            }
        }

        if now >= self.next_check {
            self.next_check = now + next_interval(config, rng);
            if !self.active && roll_chance(rng, config.start_chance) {
                changes.push(self.start(config, camp, rng));
            }
        }
        changes
    }

    fn start<R: Rng + ?Sized>(
        &mut self,
        config: &SandstormConfig,
        camp: &mut CampGrid,
        rng: &mut R,
    ) -> WeatherChange {
        let duration = random_between(rng, config.duration_min, config.duration_max);
        self.active = true;
        self.remaining = duration;

        let chance = damage_chance(config, camp.effect(EffectKind::DefenseBonus).to_num());
        let cells: Vec<CellPos> = camp.iter().map(|(pos, _)| *pos).collect();
        let mut damaged = Vec::new();
        for pos in cells {
            if roll_chance(rng, chance) && camp.damage(pos) {
                damaged.push(pos);
            }
        }
        if !damaged.is_empty() {
            camp.recompute_effects();
        }

        info!(duration, damaged = damaged.len(), "Sandstorm started");
        WeatherChange::Started { duration, damaged }
    }
}

/// Per-building damage chance: base minus defense, floored at the minimum.
#[must_use]
pub fn damage_chance(config: &SandstormConfig, defense_bonus: f64) -> f64 {
    let defense = if defense_bonus.is_finite() {
        defense_bonus
    } else {
        0.0
    };
    (config.base_damage_chance - defense).max(config.min_damage_chance)
}

fn next_interval<R: Rng + ?Sized>(config: &SandstormConfig, rng: &mut R) -> f64 {
    random_between(rng, config.check_interval_min, config.check_interval_max)
}
