//! Raid preparation and auto-resolved combat.
//!
//! [`RaidPlanner`] tracks the `Idle -> Prepared -> Resolved` lifecycle of one
//! raid. The battle itself is [`resolve_battle`]: a single weighted draw
//! between raider and caravan strength, executed once and never retried.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::caravan::{Caravan, CaravanId, CaravanKind};
use crate::error::{GameError, Result};
use crate::heroes::{BonusKind, HeroRoster};
use crate::resources::ResourceKind;

/// Strength contributed by each raider.
pub const STRENGTH_PER_RAIDER: f64 = 3.0;

/// Cap on the advisory win chance.
pub const MAX_WIN_CHANCE: f64 = 0.95;

/// Heroes allowed per raid.
pub const MAX_RAID_HEROES: usize = 3;

/// Chance that a successful raid also captures slaves.
pub const SLAVE_CAPTURE_CHANCE: f64 = 0.3;

/// Advisory win chance shown before committing:
/// `min(0.95, squad*3 / max(strength, 1) * (1 + terrain))`.
#[must_use]
pub fn win_chance(squad: u32, caravan_strength: u32, terrain_bonus: f64) -> f64 {
    let raider_strength = f64::from(squad) * STRENGTH_PER_RAIDER;
    let ratio = raider_strength / f64::from(caravan_strength.max(1));
    (ratio * (1.0 + terrain_bonus)).clamp(0.0, MAX_WIN_CHANCE)
}

/// Multipliers applied to the raider side at resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RaidModifiers {
    /// Hero `RaidDamage` aggregate.
    pub damage_bonus: f64,
    /// Hero `RaidSuccess` aggregate.
    pub success_bonus: f64,
    /// Fixed desert-dune advantage.
    pub terrain_bonus: f64,
}

impl RaidModifiers {
    /// Modifiers from the heroes committed to a raid.
    #[must_use]
    pub fn from_heroes(roster: &HeroRoster, heroes: &[usize], terrain_bonus: f64) -> Self {
        Self {
            damage_bonus: roster.bonus_of(heroes, BonusKind::RaidDamage).to_num(),
            success_bonus: roster.bonus_of(heroes, BonusKind::RaidSuccess).to_num(),
            terrain_bonus,
        }
    }

    /// `squad*3 * (1+damage) * (1+terrain) * (1+success)`.
    #[must_use]
    pub fn effective_strength(&self, squad: u32) -> f64 {
        let strength = f64::from(squad)
            * STRENGTH_PER_RAIDER
            * (1.0 + self.damage_bonus)
            * (1.0 + self.terrain_bonus)
            * (1.0 + self.success_bonus);
        if strength.is_finite() {
            strength.max(0.0)
        } else {
            0.0
        }
    }
}

/// Result of one battle draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Battle {
    /// Raiders won.
    pub success: bool,
    /// Raiders killed.
    pub raiders_lost: u32,
    /// Slaves taken (success only).
    pub slaves_captured: u32,
}

/// Losses after a won fight: uniform in `[0, max(1, squad/3)]`, at most the squad.
pub fn success_losses<R: Rng + ?Sized>(rng: &mut R, squad: u32) -> u32 {
    let upper = (squad / 3).max(1);
    rng.random_range(0..=upper).min(squad)
}

/// Draw the outcome of a raid.
///
/// The draw is uniform in `[0, effective + caravan_strength)` and the raiders
/// win iff it lands at or below their effective strength. A squad of zero has
/// no strength and always loses.
pub fn resolve_battle<R: Rng + ?Sized>(
    rng: &mut R,
    squad: u32,
    caravan_strength: u32,
    modifiers: &RaidModifiers,
) -> Battle {
    let effective = modifiers.effective_strength(squad);
    let total = effective + f64::from(caravan_strength);

    let success = if effective > 0.0 && total > 0.0 {
        let draw = rng.random_range(0.0..total);
        draw <= effective
    } else {
        false
    };

    if success {
        let raiders_lost = success_losses(rng, squad);
        let slaves_captured = if rng.random_bool(SLAVE_CAPTURE_CHANCE) {
            rng.random_range(1..=3)
        } else {
            0
        };
        Battle {
            success,
            raiders_lost,
            slaves_captured,
        }
    } else {
        let raiders_lost = if squad == 0 {
            0
        } else {
            rng.random_range(1..=squad)
        };
        Battle {
            success,
            raiders_lost,
            slaves_captured: 0,
        }
    }
}

/// Everything the UI needs to report a finished raid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaidOutcome {
    /// Target caravan (already removed from the world).
    pub caravan_id: CaravanId,
    /// Target kind.
    pub caravan_kind: CaravanKind,
    /// Raiders won.
    pub success: bool,
    /// Resources gained, after the loot multiplier.
    pub loot: BTreeMap<ResourceKind, u32>,
    /// Loot multiplier that was applied.
    pub loot_multiplier: u32,
    /// Raiders killed.
    pub raiders_lost: u32,
    /// Slaves taken.
    pub slaves_captured: u32,
    /// Heroes that rode along.
    pub heroes: Vec<usize>,
}

impl RaidOutcome {
    /// Sum of all loot gained.
    #[must_use]
    pub fn total_loot(&self) -> u64 {
        self.loot.values().map(|v| u64::from(*v)).sum()
    }
}

/// A prepared, not yet executed raid.
#[derive(Debug, Clone, PartialEq)]
pub struct RaidPlan {
    /// Target caravan.
    pub target: CaravanId,
    /// Target combat strength at preparation time.
    pub caravan_strength: u32,
    /// Committed squad, clamped to the raiders available.
    pub squad: u32,
    /// Selected heroes (valid, available, at most three).
    pub heroes: Vec<usize>,
    /// Advisory win chance for the current selection.
    pub win_chance: f64,
}

/// Lifecycle phase of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaidPhase {
    /// No target selected.
    Idle,
    /// Target and squad chosen.
    Prepared,
    /// Outcome computed and applied.
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum PlannerState {
    #[default]
    Idle,
    Prepared(RaidPlan),
    Resolved(RaidOutcome),
}

/// Raid state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RaidPlanner {
    state: PlannerState,
    terrain_bonus: f64,
}

impl RaidPlanner {
    /// Idle planner using the given terrain bonus for estimates.
    #[must_use]
    pub fn new(terrain_bonus: f64) -> Self {
        Self {
            state: PlannerState::Idle,
            terrain_bonus,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RaidPhase {
        match self.state {
            PlannerState::Idle => RaidPhase::Idle,
            PlannerState::Prepared(_) => RaidPhase::Prepared,
            PlannerState::Resolved(_) => RaidPhase::Resolved,
        }
    }

    /// The prepared plan, if any.
    #[must_use]
    pub fn plan(&self) -> Option<&RaidPlan> {
        match &self.state {
            PlannerState::Prepared(plan) => Some(plan),
            _ => None,
        }
    }

    /// The last outcome, until acknowledged.
    #[must_use]
    pub fn outcome(&self) -> Option<&RaidOutcome> {
        match &self.state {
            PlannerState::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Select a target and squad. Replaces any earlier plan or outcome.
    ///
    /// Negative squads count as zero; squads above `raiders_available` are
    /// clamped. Returns the advisory win chance.
    pub fn prepare(
        &mut self,
        target: &Caravan,
        squad: i64,
        raiders_available: u32,
        heroes: &[usize],
        roster: &HeroRoster,
    ) -> Result<f64> {
        if target.is_boss() {
            return Err(GameError::BossTarget(target.id));
        }
        let mut plan = RaidPlan {
            target: target.id,
            caravan_strength: target.combat_strength(),
            squad: 0,
            heroes: Vec::new(),
            win_chance: 0.0,
        };
        plan.squad = clamp_squad(squad, raiders_available);
        plan.heroes = select_heroes(roster, heroes);
        plan.win_chance = win_chance(plan.squad, plan.caravan_strength, self.terrain_bonus);
        let chance = plan.win_chance;
        self.state = PlannerState::Prepared(plan);
        Ok(chance)
    }

    /// Change the squad of the prepared raid. Returns the new win chance.
    pub fn set_squad(&mut self, squad: i64, raiders_available: u32) -> Result<f64> {
        let terrain = self.terrain_bonus;
        let plan = self.plan_mut()?;
        plan.squad = clamp_squad(squad, raiders_available);
        plan.win_chance = win_chance(plan.squad, plan.caravan_strength, terrain);
        Ok(plan.win_chance)
    }

    /// Change the heroes of the prepared raid. Returns the new win chance.
    pub fn set_heroes(&mut self, heroes: &[usize], roster: &HeroRoster) -> Result<f64> {
        let terrain = self.terrain_bonus;
        let plan = self.plan_mut()?;
        plan.heroes = select_heroes(roster, heroes);
        plan.win_chance = win_chance(plan.squad, plan.caravan_strength, terrain);
        Ok(plan.win_chance)
    }

    /// Take the prepared plan for execution.
    pub fn take_plan(&mut self) -> Result<RaidPlan> {
        match std::mem::take(&mut self.state) {
            PlannerState::Prepared(plan) => Ok(plan),
            PlannerState::Resolved(outcome) => {
                self.state = PlannerState::Resolved(outcome);
                Err(GameError::RaidAlreadyResolved)
            }
            PlannerState::Idle => Err(GameError::NoRaidTarget),
        }
    }

    /// Record the outcome of an executed plan.
    pub fn finish(&mut self, outcome: RaidOutcome) {
        self.state = PlannerState::Resolved(outcome);
    }

    /// Drop a prepared plan without side effects, or acknowledge an outcome.
    pub fn reset(&mut self) {
        self.state = PlannerState::Idle;
    }

    fn plan_mut(&mut self) -> Result<&mut RaidPlan> {
        match &mut self.state {
            PlannerState::Prepared(plan) => Ok(plan),
            PlannerState::Resolved(_) => Err(GameError::RaidAlreadyResolved),
            PlannerState::Idle => Err(GameError::NoRaidTarget),
        }
    }
}

fn clamp_squad(squad: i64, raiders_available: u32) -> u32 {
    squad.clamp(0, i64::from(raiders_available)) as u32
}

fn select_heroes(roster: &HeroRoster, requested: &[usize]) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::new();
    for &index in requested {
        if selected.len() == MAX_RAID_HEROES {
            break;
        }
        let usable = roster.get(index).is_some_and(|h| h.available);
        if usable && !selected.contains(&index) {
            selected.push(index);
        }
    }
    selected
}
