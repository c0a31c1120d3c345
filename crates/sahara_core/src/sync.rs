//! Remote mirror contract.
//!
//! The core pushes an immutable [`PlayerSnapshot`] through a [`SyncSink`] and
//! never looks at the result. Sinks absorb their own failures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Power contributed by each raider.
pub const POWER_PER_RAIDER: u64 = 3;
/// Power contributed by each building level.
pub const POWER_PER_BUILDING_LEVEL: u64 = 5;
/// Power contributed by each unlocked tech tier.
pub const POWER_PER_TECH_TIER: u64 = 20;

/// What the mirror learns about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Stable player id.
    pub player_id: String,
    /// Display name.
    pub display_name: String,
    /// Leaderboard power.
    pub power_level: u64,
    /// Sum of all resource stocks.
    pub total_resources: i64,
}

/// `raiders*3 + building levels*5 + tech tiers*20`.
#[must_use]
pub fn power_level(raiders: u32, building_levels: u32, tech_tiers: u32) -> u64 {
    u64::from(raiders) * POWER_PER_RAIDER
        + u64::from(building_levels) * POWER_PER_BUILDING_LEVEL
        + u64::from(tech_tiers) * POWER_PER_TECH_TIER
}

/// Fire-and-forget receiver of player snapshots.
pub trait SyncSink: fmt::Debug {
    /// Push a snapshot. Must not block on or report connectivity.
    fn push(&self, snapshot: &PlayerSnapshot);
}

/// Sink that drops everything; the default when no mirror is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSink;

impl SyncSink for OfflineSink {
    fn push(&self, _snapshot: &PlayerSnapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_level() {
        assert_eq!(power_level(0, 0, 0), 0);
        assert_eq!(power_level(10, 4, 2), 30 + 20 + 40);
        assert_eq!(power_level(u32::MAX, u32::MAX, u32::MAX), u64::from(u32::MAX) * 28);
    }

    #[test]
    fn test_offline_sink_accepts_anything() {
        let sink = OfflineSink;
        sink.push(&PlayerSnapshot {
            player_id: "p".into(),
            display_name: "Raider".into(),
            power_level: 1,
            total_resources: -1,
        });
    }
}
