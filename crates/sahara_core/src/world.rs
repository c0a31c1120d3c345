//! The world orchestrator.
//!
//! [`GameData`] owns every piece of persisted state ([`WorldState`]) together
//! with the balance config, the seeded generator, the raid planner and the
//! sync sink. UI collaborators call its entry points and read its state; they
//! never apply game rules themselves.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buildings::{BuildingKind, CampGrid, CellPos, EffectKind};
use crate::caravan::{Caravan, CaravanId, CaravanKind, LootReport};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::events::{split_rewards, BossEvent, DailyEventKind, EventState, WorldEvent};
use crate::heroes::{BonusKind, HeroRoster};
use crate::hex::HexCoord;
use crate::math::{fixed_from_f64, Fixed};
use crate::procgen::{
    generate_desert_features, generate_starting_caravans, random_hex, roll_chance, FeatureKind,
};
use crate::raid::{resolve_battle, success_losses, RaidModifiers, RaidOutcome, RaidPlanner};
use crate::resources::{ResourceKind, Stockpile};
use crate::sync::{power_level, OfflineSink, PlayerSnapshot, SyncSink};
use crate::tech::{TechBranch, TechTree};
use crate::wallet::{AdReward, Wallet};
use crate::weather::{SandstormState, WeatherChange};

/// Contributor id of the local player in boss damage ledgers.
pub const LOCAL_CONTRIBUTOR: &str = "player";

/// Everything that is saved. Derived state is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldState {
    /// World seed.
    pub seed: u64,
    /// Seconds since world creation.
    pub clock: f64,
    /// Stable id pushed to the mirror.
    pub player_id: String,
    /// Display name.
    pub player_name: String,
    /// Stocks, rates and accumulators.
    pub resources: Stockpile,
    /// Raiders in camp.
    pub raiders: u32,
    /// Camp buildings.
    pub camp: CampGrid,
    /// Research progress.
    pub tech: TechTree,
    /// Hero roster.
    pub heroes: HeroRoster,
    /// Visible caravans by id.
    pub caravans: BTreeMap<CaravanId, Caravan>,
    /// Next caravan id to hand out.
    pub next_caravan_id: CaravanId,
    /// Hexes the player has scouted.
    pub explored: BTreeSet<HexCoord>,
    /// Static map features.
    pub features: BTreeMap<HexCoord, FeatureKind>,
    /// Weather.
    pub sandstorm: SandstormState,
    /// Daily, weekly and boss events.
    pub events: EventState,
    /// Premium counters.
    pub wallet: Wallet,
    /// Raiders lost in the most recent raid, for revival.
    pub last_raid_losses: u32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            seed: 0,
            clock: 0.0,
            player_id: String::new(),
            player_name: String::new(),
            resources: Stockpile::default(),
            raiders: 0,
            camp: CampGrid::default(),
            tech: TechTree::default(),
            heroes: HeroRoster::default(),
            caravans: BTreeMap::new(),
            next_caravan_id: 1,
            explored: BTreeSet::new(),
            features: BTreeMap::new(),
            sandstorm: SandstormState::default(),
            events: EventState::default(),
            wallet: Wallet::default(),
            last_raid_losses: 0,
        }
    }
}

/// Result of scouting a hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScoutReport {
    /// A visible caravan was there and is now scouted.
    Scouted {
        /// The caravan.
        caravan_id: CaravanId,
        /// Its revealed cargo.
        loot: LootReport,
    },
    /// A new caravan was found.
    Discovered {
        /// The caravan.
        caravan_id: CaravanId,
        /// Its kind.
        kind: CaravanKind,
    },
    /// Nothing there.
    Empty,
}

/// Current world-boss standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossStatus {
    /// Boss caravan.
    pub caravan_id: CaravanId,
    /// Remaining health.
    pub health: i64,
    /// Starting health.
    pub max_health: i64,
    /// Remaining health in percent.
    pub health_percentage: f64,
    /// Seconds until the boss leaves.
    pub time_remaining: f64,
    /// Damage dealt by the local player.
    pub player_damage: u64,
}

/// What one attack on the world boss did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossAttack {
    /// Damage dealt.
    pub damage: u64,
    /// Raiders killed.
    pub raiders_lost: u32,
    /// Set when the attack finished the boss.
    pub ended: Option<WorldEvent>,
}

/// Aggregate numbers for the stats screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    /// Sum of all stocks.
    pub total_resources: i64,
    /// Visible caravans.
    pub active_caravans: usize,
    /// Scouted hexes.
    pub explored_area: usize,
    /// `raiders * 3`.
    pub military_strength: u64,
    /// Sum of effective generation rates.
    pub resource_generation_rate: f64,
    /// Leaderboard power.
    pub power_level: u64,
}

/// The world orchestrator.
#[derive(Debug)]
pub struct GameData {
    state: WorldState,
    config: GameConfig,
    rng: SmallRng,
    planner: RaidPlanner,
    sink: Box<dyn SyncSink>,
}

impl GameData {
    /// Generate a fresh world from `config`.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self::with_sink(config, Box::new(OfflineSink))
    }

    /// Generate a fresh world that mirrors snapshots to `sink`.
    #[must_use]
    pub fn with_sink(config: GameConfig, sink: Box<dyn SyncSink>) -> Self {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let mut state = WorldState {
            seed: config.seed,
            player_id: format!("player-{:016x}", config.seed),
            player_name: config.player_name.clone(),
            resources: Stockpile::new(
                &config.starting_resources.to_map(),
                &config.base_rates_fixed(),
            ),
            raiders: config.start_raiders,
            sandstorm: SandstormState::new(0.0, &config.sandstorm, &mut rng),
            events: EventState::new(0.0, &config.events),
            wallet: Wallet::new(config.starting_gems),
            ..WorldState::default()
        };
        state.features = generate_desert_features(&mut rng, config.world_radius);
        let spawns = generate_starting_caravans(&mut rng, config.world_radius, config.starting_caravans);
        for (position, kind) in spawns {
            let id = state.next_caravan_id;
            state.next_caravan_id += 1;
            state
                .caravans
                .insert(id, Caravan::generate(id, position, Some(kind), 0.0, &mut rng));
        }
        state.camp.recompute_effects();

        info!(
            seed = config.seed,
            caravans = state.caravans.len(),
            features = state.features.len(),
            "Generated new world"
        );
        Self {
            planner: RaidPlanner::new(config.terrain_bonus),
            state,
            config,
            rng,
            sink,
        }
    }

    /// Rebuild a world from saved state.
    ///
    /// Derived state (building effects and costs, missing stock entries) is
    /// recomputed and the generator is reseeded from the seed and clock.
    #[must_use]
    pub fn from_state(mut state: WorldState, config: GameConfig, sink: Box<dyn SyncSink>) -> Self {
        state.resources.normalize();
        state.camp.recompute_effects();
        if !state.clock.is_finite() || state.clock < 0.0 {
            warn!(clock = state.clock, "Saved clock invalid, resetting to zero");
            state.clock = 0.0;
        }
        if let Some(event) = state.events.boss {
            if !state
                .caravans
                .get(&event.caravan_id)
                .is_some_and(Caravan::is_boss)
            {
                warn!(caravan_id = event.caravan_id, "Saved boss event has no boss caravan, dropping it");
                state.events.boss = None;
            }
        }
        let floor_id = state.caravans.keys().next_back().map_or(1, |id| id + 1);
        state.next_caravan_id = state.next_caravan_id.max(floor_id);
        if state.player_id.is_empty() {
            state.player_id = format!("player-{:016x}", state.seed);
        }
        if state.player_name.is_empty() {
            state.player_name.clone_from(&config.player_name);
        }

        let rng = SmallRng::seed_from_u64(state.seed ^ state.clock.to_bits());
        Self {
            planner: RaidPlanner::new(config.terrain_bonus),
            state,
            config,
            rng,
            sink,
        }
    }

    /// Replace the world with a freshly generated one, keeping config and sink.
    pub fn reset(&mut self) {
        let sink = std::mem::replace(&mut self.sink, Box::new(OfflineSink));
        *self = Self::with_sink(self.config.clone(), sink);
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Persisted state.
    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Balance config.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Seconds since world creation.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.state.clock
    }

    /// Resource stockpile.
    #[must_use]
    pub fn resources(&self) -> &Stockpile {
        &self.state.resources
    }

    /// Raiders in camp.
    #[must_use]
    pub fn raiders(&self) -> u32 {
        self.state.raiders
    }

    /// Raider capacity: base plus tents.
    #[must_use]
    pub fn max_raiders(&self) -> u32 {
        self.config
            .base_max_raiders
            .saturating_add(self.state.camp.max_raiders_bonus())
    }

    /// Camp buildings.
    #[must_use]
    pub fn camp(&self) -> &CampGrid {
        &self.state.camp
    }

    /// Research progress.
    #[must_use]
    pub fn tech(&self) -> &TechTree {
        &self.state.tech
    }

    /// Hero roster.
    #[must_use]
    pub fn heroes(&self) -> &HeroRoster {
        &self.state.heroes
    }

    /// Visible caravans in id order.
    pub fn caravans(&self) -> impl Iterator<Item = &Caravan> {
        self.state.caravans.values()
    }

    /// One visible caravan.
    #[must_use]
    pub fn caravan(&self, id: CaravanId) -> Option<&Caravan> {
        self.state.caravans.get(&id)
    }

    /// Event state.
    #[must_use]
    pub fn events(&self) -> &EventState {
        &self.state.events
    }

    /// Weather state.
    #[must_use]
    pub fn sandstorm(&self) -> &SandstormState {
        &self.state.sandstorm
    }

    /// Premium counters.
    #[must_use]
    pub fn wallet(&self) -> &Wallet {
        &self.state.wallet
    }

    /// Raid state machine.
    #[must_use]
    pub fn raid_planner(&self) -> &RaidPlanner {
        &self.planner
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance the world by `dt` seconds.
    ///
    /// NaN and negative `dt` count as zero and oversized lumps are clamped
    /// to `max_lump_seconds`. All arithmetic is accumulation based, so one
    /// large lump after a long absence behaves like the sum of small ticks
    /// for generation and consumption.
    pub fn tick(&mut self, dt: f64) -> Vec<WorldEvent> {
        let dt = self.sanitize_dt(dt);
        let mut events = Vec::new();

        let start = self.state.clock;
        self.state.clock += dt;
        let now = self.state.clock;
        let dt_fixed = fixed_from_f64(dt);

        // 1. Resource generation, split where a boost ends inside the tick
        let bonuses = self.state.camp.generation_bonuses();
        let boosted = fixed_from_f64(self.state.events.boosted_seconds(start, dt)).min(dt_fixed);
        let boost = Fixed::from_num(self.state.events.resource_multiplier());
        let resources = &mut self.state.resources;
        resources.generate(boosted, &bonuses, boost);
        resources.generate(dt_fixed - boosted, &bonuses, Fixed::ONE);

        // 2. Water consumption and desertion
        let population = self
            .state
            .raiders
            .saturating_add(self.whole_stock(ResourceKind::Slaves));
        let rate = self.water_consumption_rate();
        let dry = self
            .state
            .resources
            .consume_water(population, rate, dt_fixed);
        if dry && dt > 0.0 && self.state.raiders > 1 {
            self.state.raiders -= 1;
            info!(raiders = self.state.raiders, "Raider deserted for lack of water");
            events.push(WorldEvent::Desertion {
                raiders: self.state.raiders,
            });
        }

        // 3. Caravan movement
        for caravan in self.state.caravans.values_mut() {
            caravan.advance_movement(now, &mut self.rng);
        }

        // 4. Weather
        let changes = self.state.sandstorm.update(
            now,
            dt,
            &self.config.sandstorm,
            &mut self.state.camp,
            &mut self.rng,
        );
        events.extend(changes.into_iter().map(|change| match change {
            WeatherChange::Started { duration, damaged } => {
                WorldEvent::SandstormStarted { duration, damaged }
            }
            WeatherChange::Ended => WorldEvent::SandstormEnded,
        }));

        // 5. Daily and weekly events
        events.extend(self.state.events.expire(now));
        if let Some(daily) = self
            .state
            .events
            .roll_daily(now, &self.config.events, &mut self.rng)
        {
            events.push(WorldEvent::DailyEventStarted {
                kind: daily.kind,
                ends_at: daily.ends_at,
            });
            if daily.kind == DailyEventKind::CaravanAlert {
                let caravan_id = self.spawn_near_camp(CaravanKind::Imperial);
                if let Some(caravan) = self.state.caravans.get(&caravan_id) {
                    events.push(WorldEvent::CaravanSpawned {
                        caravan_id,
                        position: caravan.position,
                    });
                }
            }
        }

        // 6. World boss expiry
        if let Some(boss) = self.state.events.boss {
            let defeated = self
                .state
                .caravans
                .get(&boss.caravan_id)
                .map_or(true, Caravan::is_defeated);
            if defeated || now >= boss.ends_at {
                events.push(self.end_world_boss(defeated));
            }
        }

        debug!(clock = now, dt, events = events.len(), "World tick");

        #[cfg(feature = "debug-validation")]
        {
            let hash = self.state_hash();
            debug!(clock = now, state_hash = hash, "World state hash");
            for problem in self.invariant_violations() {
                warn!(problem = %problem, "World invariant violated");
            }
        }

        events
    }

    fn sanitize_dt(&self, dt: f64) -> f64 {
        if dt.is_nan() || dt <= 0.0 {
            0.0
        } else {
            dt.min(self.config.max_lump_seconds)
        }
    }

    fn water_consumption_rate(&self) -> Fixed {
        let saving = self.state.heroes.get_bonus(BonusKind::WaterSaving);
        let factor = (Fixed::ONE - saving).max(Fixed::ZERO);
        fixed_from_f64(self.config.water_consumption_rate).saturating_mul(factor)
    }

    fn whole_stock(&self, kind: ResourceKind) -> u32 {
        u32::try_from(self.state.resources.whole(kind).max(0)).unwrap_or(u32::MAX)
    }

    // ------------------------------------------------------------------
    // Map
    // ------------------------------------------------------------------

    /// Scout a hex.
    ///
    /// A visible caravan on the hex becomes scouted; otherwise a discovery
    /// roll may reveal a new caravan. The hex is always marked explored.
    pub fn scout_hex(&mut self, hex: HexCoord) -> ScoutReport {
        self.state.explored.insert(hex);

        if let Some(caravan) = self
            .state
            .caravans
            .values_mut()
            .find(|c| c.position == hex)
        {
            caravan.scout();
            debug!(caravan = caravan.id, %hex, "Scouted caravan");
            return ScoutReport::Scouted {
                caravan_id: caravan.id,
                loot: caravan.loot_distribution(),
            };
        }

        let chance = (self.config.scout_discovery_chance
            + self.state.heroes.get_bonus(BonusKind::Scouting).to_num::<f64>())
        .min(1.0);
        if roll_chance(&mut self.rng, chance) {
            let caravan_id = self.spawn_caravan(hex, None);
            let kind = self
                .state
                .caravans
                .get(&caravan_id)
                .map_or(CaravanKind::Salt, |c| c.kind);
            info!(caravan = caravan_id, ?kind, %hex, "Discovered caravan");
            return ScoutReport::Discovered { caravan_id, kind };
        }
        ScoutReport::Empty
    }

    /// Explored hexes.
    #[must_use]
    pub fn explored(&self) -> &BTreeSet<HexCoord> {
        &self.state.explored
    }

    /// Static map features.
    #[must_use]
    pub fn features(&self) -> &BTreeMap<HexCoord, FeatureKind> {
        &self.state.features
    }

    fn spawn_caravan(&mut self, position: HexCoord, kind: Option<CaravanKind>) -> CaravanId {
        let id = self.state.next_caravan_id;
        self.state.next_caravan_id += 1;
        let caravan = Caravan::generate(id, position, kind, self.state.clock, &mut self.rng);
        self.state.caravans.insert(id, caravan);
        id
    }

    fn spawn_near_camp(&mut self, kind: CaravanKind) -> CaravanId {
        let position = random_hex(
            &mut self.rng,
            HexCoord::ORIGIN,
            self.config.events.event_spawn_radius,
        );
        self.spawn_caravan(position, Some(kind))
    }

    // ------------------------------------------------------------------
    // Camp and research
    // ------------------------------------------------------------------

    /// Place a level-1 building without charging for it.
    pub fn place_building(&mut self, pos: CellPos, kind: BuildingKind) -> Result<()> {
        self.state.camp.place(pos, kind)
    }

    /// Pay the base cost and place a building. Nothing changes on error.
    pub fn build(&mut self, pos: CellPos, kind: BuildingKind) -> Result<()> {
        self.state.camp.check_placement(pos)?;
        let cost = kind.base_cost();
        self.state.resources.check(&cost)?;
        self.state.camp.place(pos, kind)?;
        self.state.resources.spend(&cost)?;
        info!(%pos, ?kind, "Built");
        Ok(())
    }

    /// Upgrade the building at `pos`. Returns the new level.
    pub fn upgrade_building(&mut self, pos: CellPos) -> Result<u32> {
        let level = self
            .state
            .camp
            .upgrade(pos, &mut self.state.resources)?;
        info!(%pos, level, "Upgraded building");
        Ok(level)
    }

    /// Research a tech tier.
    pub fn research_tech(&mut self, branch: TechBranch, tier: u8) -> Result<()> {
        self.state
            .tech
            .research(branch, tier, &mut self.state.resources)?;
        info!(%branch, tier, "Researched tech");
        Ok(())
    }

    /// Turn up to `recruit_batch` slaves into raiders.
    ///
    /// Each slave used yields `1 + recruitment bonus` raiders (floored over
    /// the batch); no more slaves are used than there is free capacity.
    /// Returns the raiders gained.
    pub fn recruit(&mut self) -> Result<u32> {
        let slaves = self.whole_stock(ResourceKind::Slaves);
        if slaves == 0 {
            return Err(GameError::NoSlaves);
        }
        let max = self.max_raiders();
        let free = max.saturating_sub(self.state.raiders);
        if free == 0 {
            return Err(GameError::CampFull(max));
        }

        let used = slaves.min(self.config.recruit_batch).min(free);
        if used == 0 {
            return Err(GameError::NoSlaves);
        }
        let bonus = self.state.camp.effect(EffectKind::RecruitmentBonus);
        let gained = Fixed::from_num(used)
            .saturating_mul(Fixed::ONE.saturating_add(bonus))
            .to_num::<u32>()
            .min(free);
        self.state.resources.take(ResourceKind::Slaves, used);
        self.state.raiders += gained;
        info!(used, gained, raiders = self.state.raiders, "Recruited raiders");
        Ok(gained)
    }

    // ------------------------------------------------------------------
    // Raids
    // ------------------------------------------------------------------

    /// Select a raid target. Returns the advisory win chance.
    pub fn prepare_raid(&mut self, caravan_id: CaravanId, squad: i64, heroes: &[usize]) -> Result<f64> {
        let caravan = self
            .state
            .caravans
            .get(&caravan_id)
            .ok_or(GameError::UnknownCaravan(caravan_id))?;
        self.planner
            .prepare(caravan, squad, self.state.raiders, heroes, &self.state.heroes)
    }

    /// Change the prepared squad. Returns the new win chance.
    pub fn set_raid_squad(&mut self, squad: i64) -> Result<f64> {
        self.planner.set_squad(squad, self.state.raiders)
    }

    /// Change the prepared heroes. Returns the new win chance.
    pub fn set_raid_heroes(&mut self, heroes: &[usize]) -> Result<f64> {
        self.planner.set_heroes(heroes, &self.state.heroes)
    }

    /// Drop the prepared raid, or acknowledge a resolved one.
    pub fn cancel_raid(&mut self) {
        self.planner.reset();
    }

    /// Resolve the prepared raid. Runs once; a second call fails.
    pub fn execute_raid(&mut self) -> Result<RaidOutcome> {
        let plan = self.planner.take_plan()?;
        let caravan = self
            .state
            .caravans
            .remove(&plan.target)
            .ok_or(GameError::UnknownCaravan(plan.target))?;

        let squad = plan.squad.min(self.state.raiders);
        let assigned = self.state.heroes.assign(&plan.heroes);
        let modifiers =
            RaidModifiers::from_heroes(&self.state.heroes, &assigned, self.config.terrain_bonus);
        let battle = resolve_battle(&mut self.rng, squad, caravan.combat_strength(), &modifiers);

        let double_loot = self.state.wallet.take_double_loot();
        let mut loot_multiplier = self.state.events.loot_multiplier();
        if double_loot {
            loot_multiplier *= 2;
        }

        let mut loot = BTreeMap::new();
        if battle.success {
            for (kind, amount) in caravan.loot_breakdown() {
                let gained = amount.saturating_mul(loot_multiplier);
                if gained > 0 {
                    self.state.resources.add(kind, gained);
                    loot.insert(kind, gained);
                }
            }
            if battle.slaves_captured > 0 {
                self.state
                    .resources
                    .add(ResourceKind::Slaves, battle.slaves_captured);
            }
        }

        self.state.raiders = self.state.raiders.saturating_sub(battle.raiders_lost);
        self.state.last_raid_losses = battle.raiders_lost;
        self.state.heroes.return_all();

        let outcome = RaidOutcome {
            caravan_id: caravan.id,
            caravan_kind: caravan.kind,
            success: battle.success,
            loot,
            loot_multiplier,
            raiders_lost: battle.raiders_lost,
            slaves_captured: battle.slaves_captured,
            heroes: assigned,
        };
        info!(
            caravan = caravan.id,
            success = outcome.success,
            loot = outcome.total_loot(),
            lost = outcome.raiders_lost,
            "Raid resolved"
        );
        self.planner.finish(outcome.clone());
        Ok(outcome)
    }

    /// Prepare and resolve a raid in one call.
    pub fn start_raid(&mut self, caravan_id: CaravanId, squad: i64, heroes: &[usize]) -> Result<RaidOutcome> {
        self.prepare_raid(caravan_id, squad, heroes)?;
        self.execute_raid()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Start the weekly event. Returns `None` if it is already running.
    pub fn start_weekly_event(&mut self) -> Option<WorldEvent> {
        if self.state.events.weekly_active() {
            return None;
        }
        let ends_at = self.state.clock + self.config.events.weekly_duration;
        self.state.events.weekly_ends_at = Some(ends_at);
        let caravans = (0..self.config.events.weekly_caravans)
            .map(|_| self.spawn_near_camp(CaravanKind::Imperial))
            .collect::<Vec<_>>();
        info!(ends_at, caravans = caravans.len(), "Weekly event started");
        Some(WorldEvent::WeeklyEventStarted { ends_at, caravans })
    }

    /// Spawn a world boss, or return the one already active.
    pub fn spawn_world_boss(&mut self) -> WorldEvent {
        if let Some(boss) = self.state.events.boss {
            if self.state.caravans.contains_key(&boss.caravan_id) {
                return WorldEvent::WorldBossSpawned {
                    caravan_id: boss.caravan_id,
                    ends_at: boss.ends_at,
                };
            }
        }
        let position = random_hex(
            &mut self.rng,
            HexCoord::ORIGIN,
            self.config.events.event_spawn_radius,
        );
        let caravan_id = self.state.next_caravan_id;
        self.state.next_caravan_id += 1;
        let boss = Caravan::world_boss(
            caravan_id,
            position,
            self.config.events.boss_health,
            self.state.clock,
            &mut self.rng,
        );
        self.state.caravans.insert(caravan_id, boss);
        let ends_at = self.state.clock + self.config.events.boss_duration;
        self.state.events.boss = Some(BossEvent {
            caravan_id,
            ends_at,
        });
        info!(caravan = caravan_id, ends_at, "World boss spawned");
        WorldEvent::WorldBossSpawned {
            caravan_id,
            ends_at,
        }
    }

    /// Current world-boss standing.
    #[must_use]
    pub fn boss_status(&self) -> Option<BossStatus> {
        let event = self.state.events.boss?;
        let caravan = self.state.caravans.get(&event.caravan_id)?;
        let boss = caravan.boss.as_ref()?;
        Some(BossStatus {
            caravan_id: event.caravan_id,
            health: boss.health,
            max_health: boss.max_health,
            health_percentage: boss.health_percentage(),
            time_remaining: (event.ends_at - self.state.clock).max(0.0),
            player_damage: boss.damage.get(LOCAL_CONTRIBUTOR).copied().unwrap_or(0),
        })
    }

    /// Record boss damage from any contributor.
    ///
    /// Returns the end-of-event notification when this damage defeats it.
    pub fn damage_world_boss(&mut self, contributor: &str, amount: u64) -> Result<Option<WorldEvent>> {
        let event = self.state.events.boss.ok_or(GameError::NoWorldBoss)?;
        let caravan = self
            .state
            .caravans
            .get_mut(&event.caravan_id)
            .ok_or(GameError::NoWorldBoss)?;
        caravan.apply_damage(contributor, amount)?;
        if caravan.is_defeated() {
            return Ok(Some(self.end_world_boss(true)));
        }
        Ok(None)
    }

    /// Send a squad against the world boss.
    ///
    /// Damage is the squad's effective strength times `damage_per_strength`;
    /// losses follow the won-raid rule. Heroes ride along and come back.
    pub fn attack_world_boss(&mut self, squad: i64, heroes: &[usize]) -> Result<BossAttack> {
        let event = self.state.events.boss.ok_or(GameError::NoWorldBoss)?;
        if !self
            .state
            .caravans
            .get(&event.caravan_id)
            .is_some_and(Caravan::is_boss)
        {
            return Err(GameError::NoWorldBoss);
        }
        let squad = squad.clamp(0, i64::from(self.state.raiders)) as u32;
        let assigned = self.state.heroes.assign(heroes);
        let modifiers =
            RaidModifiers::from_heroes(&self.state.heroes, &assigned, self.config.terrain_bonus);
        let damage_f = modifiers.effective_strength(squad) * self.config.events.damage_per_strength;
        let damage = if damage_f.is_finite() && damage_f > 0.0 {
            damage_f.floor() as u64
        } else {
            0
        };
        let raiders_lost = if squad == 0 {
            0
        } else {
            success_losses(&mut self.rng, squad)
        };
        self.state.raiders = self.state.raiders.saturating_sub(raiders_lost);
        self.state.heroes.return_all();

        let ended = self.damage_world_boss(LOCAL_CONTRIBUTOR, damage)?;
        info!(damage, raiders_lost, "Attacked world boss");
        Ok(BossAttack {
            damage,
            raiders_lost,
            ended,
        })
    }

    fn end_world_boss(&mut self, defeated: bool) -> WorldEvent {
        let Some(event) = self.state.events.boss.take() else {
            return WorldEvent::WorldBossEnded {
                caravan_id: 0,
                defeated,
                rewards: BTreeMap::new(),
            };
        };
        let ledger = self
            .state
            .caravans
            .remove(&event.caravan_id)
            .and_then(|c| c.boss)
            .map(|b| b.damage)
            .unwrap_or_default();

        let pool = self.config.events.boss_reward_pool.to_map();
        let mut payouts = split_rewards(&pool, &ledger);
        let rewards = payouts.remove(LOCAL_CONTRIBUTOR).unwrap_or_default();
        for (&kind, &amount) in &rewards {
            self.state.resources.add(kind, amount);
        }
        info!(
            caravan = event.caravan_id,
            defeated,
            contributors = ledger.len(),
            "World boss event ended"
        );
        WorldEvent::WorldBossEnded {
            caravan_id: event.caravan_id,
            defeated,
            rewards,
        }
    }

    // ------------------------------------------------------------------
    // Premium counters
    // ------------------------------------------------------------------

    /// Credit gems.
    pub fn add_gems(&mut self, amount: u64) {
        self.state.wallet.add_gems(amount);
    }

    /// Debit gems.
    pub fn spend_gems(&mut self, amount: u64) -> Result<()> {
        self.state.wallet.spend_gems(amount)
    }

    /// Apply the reward of a watched ad, subject to the ad cooldown.
    pub fn claim_ad_reward(&mut self, reward: AdReward) -> Result<()> {
        self.state
            .wallet
            .record_ad(self.state.clock, self.config.ad_cooldown)?;
        match reward {
            AdReward::Gems(amount) => self.state.wallet.add_gems(amount),
            AdReward::DoubleLoot => self.state.wallet.arm_double_loot(),
            AdReward::ReviveRaiders => {
                let free = self.max_raiders().saturating_sub(self.state.raiders);
                let revived = (self.state.last_raid_losses / 2).min(free);
                self.state.raiders += revived;
                self.state.last_raid_losses = 0;
            }
            AdReward::SpeedBoost => self.state.wallet.activate_speed_boost(),
        }
        info!(?reward, "Ad reward applied");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Aggregate numbers for the stats screen.
    #[must_use]
    pub fn stats(&self) -> GameStats {
        let bonuses = self.state.camp.generation_bonuses();
        let resource_generation_rate = ResourceKind::ALL
            .iter()
            .map(|k| {
                let bonus = bonuses.get(k).copied().unwrap_or(Fixed::ZERO);
                self.state.resources.rate(*k).saturating_add(bonus).to_num::<f64>()
            })
            .sum();
        GameStats {
            total_resources: self.state.resources.total(),
            active_caravans: self.state.caravans.len(),
            explored_area: self.state.explored.len(),
            military_strength: u64::from(self.state.raiders) * 3,
            resource_generation_rate,
            power_level: self.power_level(),
        }
    }

    /// Leaderboard power.
    #[must_use]
    pub fn power_level(&self) -> u64 {
        power_level(
            self.state.raiders,
            self.state.camp.total_levels(),
            self.state.tech.total_tiers(),
        )
    }

    /// Snapshot for the remote mirror.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: self.state.player_id.clone(),
            display_name: self.state.player_name.clone(),
            power_level: self.power_level(),
            total_resources: self.state.resources.total(),
        }
    }

    /// Push a snapshot to the sync sink.
    pub fn push_snapshot(&self) {
        self.sink.push(&self.snapshot());
    }

    /// Hash of the persisted state; equal states give equal hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let bytes = bincode::serialize(&self.state).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    }

    /// Broken invariants, if any; empty for a consistent world.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for kind in ResourceKind::ALL {
            if self.state.resources.amount(kind) < Fixed::ZERO {
                problems.push(format!("{kind} stock is negative"));
            }
        }
        for (pos, building) in self.state.camp.iter() {
            if !pos.in_bounds() {
                problems.push(format!("building at {pos} is outside the grid"));
            }
            if building.level == 0 || building.level > building.kind.max_level() {
                problems.push(format!("building at {pos} has level {}", building.level));
            }
        }
        for (id, caravan) in &self.state.caravans {
            if *id != caravan.id {
                problems.push(format!("caravan {} stored under id {id}", caravan.id));
            }
            if *id >= self.state.next_caravan_id {
                problems.push(format!("caravan id {id} not below next id"));
            }
        }
        if let Some(boss) = self.state.events.boss {
            if !self
                .state
                .caravans
                .get(&boss.caravan_id)
                .is_some_and(Caravan::is_boss)
            {
                problems.push(format!("boss event points at missing boss {}", boss.caravan_id));
            }
        }
        problems
    }
}
