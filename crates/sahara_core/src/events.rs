//! Time-boxed events and the notifications a tick produces.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::buildings::CellPos;
use crate::caravan::CaravanId;
use crate::config::EventConfig;
use crate::hex::HexCoord;
use crate::resources::ResourceKind;

/// Something the UI should tell the player about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// A sandstorm began.
    SandstormStarted {
        /// Storm length in seconds.
        duration: f64,
        /// Buildings that lost a level.
        damaged: Vec<CellPos>,
    },
    /// The sandstorm ended.
    SandstormEnded,
    /// A raider deserted for lack of water.
    Desertion {
        /// Raiders left in camp.
        raiders: u32,
    },
    /// An event spawned a caravan.
    CaravanSpawned {
        /// New caravan.
        caravan_id: CaravanId,
        /// Where it appeared.
        position: HexCoord,
    },
    /// A daily event began.
    DailyEventStarted {
        /// Which event.
        kind: DailyEventKind,
        /// World time it ends.
        ends_at: f64,
    },
    /// The daily event ran out.
    DailyEventEnded {
        /// Which event.
        kind: DailyEventKind,
    },
    /// The weekly event began.
    WeeklyEventStarted {
        /// World time it ends.
        ends_at: f64,
        /// Mega-caravans spawned for it.
        caravans: Vec<CaravanId>,
    },
    /// The weekly event ran out.
    WeeklyEventEnded,
    /// A world boss appeared.
    WorldBossSpawned {
        /// Boss caravan.
        caravan_id: CaravanId,
        /// World time the event expires.
        ends_at: f64,
    },
    /// The world boss was defeated or escaped.
    WorldBossEnded {
        /// Boss caravan.
        caravan_id: CaravanId,
        /// Health reached zero before the deadline.
        defeated: bool,
        /// The local player's share of the reward pool.
        rewards: BTreeMap<ResourceKind, u32>,
    },
}

/// The three daily event flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyEventKind {
    /// An Imperial caravan shows up near camp.
    CaravanAlert,
    /// Resource generation doubled.
    ResourceBoost,
    /// Raid loot doubled.
    RaidBonus,
}

impl DailyEventKind {
    /// Every kind, in roll order.
    pub const ALL: [Self; 3] = [Self::CaravanAlert, Self::ResourceBoost, Self::RaidBonus];

    /// Uniform pick.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// A running daily event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyEvent {
    /// Which event.
    pub kind: DailyEventKind,
    /// World time it ends.
    pub ends_at: f64,
}

/// A running world-boss event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossEvent {
    /// The boss caravan.
    pub caravan_id: CaravanId,
    /// World time the boss leaves.
    pub ends_at: f64,
}

/// Persisted state of every time-boxed event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventState {
    /// Active daily event.
    pub daily: Option<DailyEvent>,
    /// World time of the next daily roll.
    pub next_daily: f64,
    /// End of the active weekly event.
    pub weekly_ends_at: Option<f64>,
    /// Active world boss.
    pub boss: Option<BossEvent>,
}

impl EventState {
    /// No events; the first daily roll is one interval after `now`.
    #[must_use]
    pub fn new(now: f64, config: &EventConfig) -> Self {
        Self {
            next_daily: now + config.daily_interval,
            ..Self::default()
        }
    }

    /// Daily event of `kind` is running.
    #[must_use]
    pub fn daily_active(&self, kind: DailyEventKind) -> bool {
        self.daily.is_some_and(|d| d.kind == kind)
    }

    /// The weekly event is running.
    #[must_use]
    pub fn weekly_active(&self) -> bool {
        self.weekly_ends_at.is_some()
    }

    /// Generation multiplier from events.
    #[must_use]
    pub fn resource_multiplier(&self) -> u32 {
        if self.daily_active(DailyEventKind::ResourceBoost) {
            2
        } else {
            1
        }
    }

    /// Seconds of the span `[start, start + dt)` covered by a running
    /// resource boost.
    #[must_use]
    pub fn boosted_seconds(&self, start: f64, dt: f64) -> f64 {
        match self.daily {
            Some(daily) if daily.kind == DailyEventKind::ResourceBoost => {
                (daily.ends_at - start).clamp(0.0, dt)
            }
            _ => 0.0,
        }
    }

    /// Loot multiplier from events (weekly and daily stack).
    #[must_use]
    pub fn loot_multiplier(&self) -> u32 {
        let mut multiplier = 1;
        if self.weekly_active() {
            multiplier *= 2;
        }
        if self.daily_active(DailyEventKind::RaidBonus) {
            multiplier *= 2;
        }
        multiplier
    }

    /// End daily and weekly events whose time is up.
    pub fn expire(&mut self, now: f64) -> Vec<WorldEvent> {
        let mut ended = Vec::new();
        if let Some(daily) = self.daily {
            if now >= daily.ends_at {
                self.daily = None;
                info!(kind = ?daily.kind, "Daily event ended");
                ended.push(WorldEvent::DailyEventEnded { kind: daily.kind });
            }
        }
        if let Some(ends_at) = self.weekly_ends_at {
            if now >= ends_at {
                self.weekly_ends_at = None;
                info!("Weekly event ended");
                ended.push(WorldEvent::WeeklyEventEnded);
            }
        }
        ended
    }

    /// Start a new daily event if the roll is due.
    ///
    /// A lump of several missed intervals yields one event; the schedule then
    /// resumes from `now`.
    pub fn roll_daily<R: Rng + ?Sized>(
        &mut self,
        now: f64,
        config: &EventConfig,
        rng: &mut R,
    ) -> Option<DailyEvent> {
        if now < self.next_daily {
            return None;
        }
        self.next_daily = if now - self.next_daily >= config.daily_interval {
            now + config.daily_interval
        } else {
            self.next_daily + config.daily_interval
        };
        let event = DailyEvent {
            kind: DailyEventKind::choose(rng),
            ends_at: now + config.daily_duration,
        };
        self.daily = Some(event);
        info!(kind = ?event.kind, "Daily event started");
        Some(event)
    }
}

/// Split a reward pool by damage share.
///
/// Every share is floored and each resource's remainder goes to the top
/// contributor (first by id among equals), so the pool is allocated exactly.
/// With no damage dealt nothing is paid out.
#[must_use]
pub fn split_rewards(
    pool: &BTreeMap<ResourceKind, u32>,
    damage: &BTreeMap<String, u64>,
) -> BTreeMap<String, BTreeMap<ResourceKind, u32>> {
    let total: u128 = damage.values().map(|d| u128::from(*d)).sum();
    let mut payouts: BTreeMap<String, BTreeMap<ResourceKind, u32>> = BTreeMap::new();
    if total == 0 {
        return payouts;
    }

    let mut top: Option<(&String, u64)> = None;
    for (id, dealt) in damage {
        if top.map_or(true, |(_, best)| *dealt > best) {
            top = Some((id, *dealt));
        }
    }
    let Some((top_id, _)) = top else {
        return payouts;
    };

    for (&kind, &amount) in pool {
        let mut allocated = 0u128;
        for (id, dealt) in damage {
            let share = u128::from(amount) * u128::from(*dealt) / total;
            allocated += share;
            if share > 0 {
                payouts.entry(id.clone()).or_default().insert(kind, share as u32);
            }
        }
        let remainder = (u128::from(amount) - allocated) as u32;
        if remainder > 0 {
            *payouts
                .entry(top_id.clone())
                .or_default()
                .entry(kind)
                .or_insert(0) += remainder;
        }
    }
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn damage(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries.iter().map(|(id, d)| ((*id).to_string(), *d)).collect()
    }

    #[test]
    fn test_split_proportional() {
        let pool: BTreeMap<_, _> = [(ResourceKind::Gold, 5000), (ResourceKind::Water, 1000)]
            .into_iter()
            .collect();
        let payouts = split_rewards(&pool, &damage(&[("player", 6000), ("clan", 4000)]));
        assert_eq!(payouts["player"][&ResourceKind::Gold], 3000);
        assert_eq!(payouts["clan"][&ResourceKind::Gold], 2000);
        assert_eq!(payouts["player"][&ResourceKind::Water], 600);
        assert_eq!(payouts["clan"][&ResourceKind::Water], 400);
    }

    #[test]
    fn test_split_remainder_to_top() {
        let pool: BTreeMap<_, _> = [(ResourceKind::Gold, 100)].into_iter().collect();
        let payouts = split_rewards(&pool, &damage(&[("a", 1), ("b", 1), ("c", 2)]));
        assert_eq!(payouts["a"][&ResourceKind::Gold], 25);
        assert_eq!(payouts["b"][&ResourceKind::Gold], 25);
        assert_eq!(payouts["c"][&ResourceKind::Gold], 50);

        let payouts = split_rewards(&pool, &damage(&[("a", 1), ("b", 1), ("c", 1)]));
        assert_eq!(payouts["a"][&ResourceKind::Gold], 34);
        assert_eq!(payouts["b"][&ResourceKind::Gold], 33);
        let paid: u32 = payouts.values().map(|p| p[&ResourceKind::Gold]).sum();
        assert_eq!(paid, 100);
    }

    #[test]
    fn test_split_no_damage() {
        let pool: BTreeMap<_, _> = [(ResourceKind::Gold, 100)].into_iter().collect();
        assert!(split_rewards(&pool, &BTreeMap::new()).is_empty());
        assert!(split_rewards(&pool, &damage(&[("a", 0)])).is_empty());
    }

    #[test]
    fn test_multipliers_stack() {
        let mut state = EventState::default();
        assert_eq!(state.loot_multiplier(), 1);
        state.weekly_ends_at = Some(10.0);
        assert_eq!(state.loot_multiplier(), 2);
        state.daily = Some(DailyEvent {
            kind: DailyEventKind::RaidBonus,
            ends_at: 10.0,
        });
        assert_eq!(state.loot_multiplier(), 4);
        assert_eq!(state.resource_multiplier(), 1);
    }

    #[test]
    fn test_boosted_seconds() {
        let mut state = EventState::default();
        assert_eq!(state.boosted_seconds(0.0, 50.0), 0.0);
        state.daily = Some(DailyEvent {
            kind: DailyEventKind::ResourceBoost,
            ends_at: 30.0,
        });
        assert_eq!(state.boosted_seconds(0.0, 10.0), 10.0);
        assert_eq!(state.boosted_seconds(20.0, 100.0), 10.0);
        assert_eq!(state.boosted_seconds(40.0, 10.0), 0.0);
        state.daily = Some(DailyEvent {
            kind: DailyEventKind::RaidBonus,
            ends_at: 30.0,
        });
        assert_eq!(state.boosted_seconds(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_daily_roll_and_expiry() {
        let config = EventConfig::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut state = EventState::new(0.0, &config);

        assert!(state.roll_daily(100.0, &config, &mut rng).is_none());
        let event = state.roll_daily(config.daily_interval, &config, &mut rng).unwrap();
        assert!((event.ends_at - 2.0 * config.daily_interval).abs() < 1e-9);
        assert!((state.next_daily - 2.0 * config.daily_interval).abs() < 1e-9);

        assert!(state.expire(config.daily_interval + 1.0).is_empty());
        let ended = state.expire(event.ends_at);
        assert_eq!(ended, vec![WorldEvent::DailyEventEnded { kind: event.kind }]);
        assert!(state.daily.is_none());
    }

    #[test]
    fn test_daily_lump_rolls_once() {
        let config = EventConfig::default();
        let mut rng = SmallRng::seed_from_u64(12);
        let mut state = EventState::new(0.0, &config);
        let now = 10.0 * config.daily_interval;
        assert!(state.roll_daily(now, &config, &mut rng).is_some());
        assert!(state.roll_daily(now, &config, &mut rng).is_none());
        assert!((state.next_daily - (now + config.daily_interval)).abs() < 1e-9);
    }

    #[test]
    fn test_world_event_json_tag() {
        let json = serde_json::to_string(&WorldEvent::Desertion { raiders: 4 }).unwrap();
        assert_eq!(json, r#"{"event":"desertion","raiders":4}"#);
    }
}
