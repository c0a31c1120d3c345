//! Premium counters.
//!
//! The wallet is owned by [`GameData`](crate::world::GameData) and persisted
//! with it. It only keeps books: gem balance, rewarded-ad cooldown and the
//! one-shot boosts an ad can grant. Showing ads and processing purchases
//! happen outside the core.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Upgrade speed multiplier granted by [`AdReward::SpeedBoost`].
pub const SPEED_BOOST: f64 = 2.0;

/// What a watched ad pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reward", content = "amount", rename_all = "snake_case")]
pub enum AdReward {
    /// Premium currency.
    Gems(u64),
    /// Double the loot of the next raid.
    DoubleLoot,
    /// Bring back half of the last raid's fallen raiders.
    ReviveRaiders,
    /// Faster building upgrades.
    SpeedBoost,
}

/// Gem balance and ad bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wallet {
    gems: u64,
    last_ad: Option<f64>,
    double_loot: bool,
    speed_multiplier: f64,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            gems: 0,
            last_ad: None,
            double_loot: false,
            speed_multiplier: 1.0,
        }
    }
}

impl Wallet {
    /// Empty wallet holding `gems`.
    #[must_use]
    pub fn new(gems: u64) -> Self {
        Self {
            gems,
            ..Self::default()
        }
    }

    /// Current gem balance.
    #[must_use]
    pub fn gems(&self) -> u64 {
        self.gems
    }

    /// Credit gems.
    pub fn add_gems(&mut self, amount: u64) {
        self.gems = self.gems.saturating_add(amount);
    }

    /// Debit gems if the balance covers it.
    pub fn spend_gems(&mut self, amount: u64) -> Result<()> {
        if self.gems < amount {
            return Err(GameError::InsufficientGems {
                required: amount,
                available: self.gems,
            });
        }
        self.gems -= amount;
        Ok(())
    }

    /// Seconds until the next ad may be watched (zero when ready).
    #[must_use]
    pub fn ad_cooldown_remaining(&self, now: f64, cooldown: f64) -> f64 {
        match self.last_ad {
            Some(last) => (last + cooldown - now).max(0.0),
            None => 0.0,
        }
    }

    /// An ad may be watched at `now`.
    #[must_use]
    pub fn can_watch_ad(&self, now: f64, cooldown: f64) -> bool {
        self.ad_cooldown_remaining(now, cooldown) <= 0.0
    }

    /// Start the cooldown for an ad watched at `now`.
    pub fn record_ad(&mut self, now: f64, cooldown: f64) -> Result<()> {
        let remaining = self.ad_cooldown_remaining(now, cooldown);
        if remaining > 0.0 {
            return Err(GameError::AdOnCooldown { remaining });
        }
        self.last_ad = Some(now);
        Ok(())
    }

    /// Arm the next raid's loot doubling.
    pub fn arm_double_loot(&mut self) {
        self.double_loot = true;
    }

    /// Whether the next raid gets doubled loot.
    #[must_use]
    pub fn double_loot_armed(&self) -> bool {
        self.double_loot
    }

    /// Consume the loot doubling, returning whether it was armed.
    pub fn take_double_loot(&mut self) -> bool {
        std::mem::take(&mut self.double_loot)
    }

    /// Turn on the upgrade speed boost.
    pub fn activate_speed_boost(&mut self) {
        self.speed_multiplier = SPEED_BOOST;
    }

    /// Current upgrade speed multiplier.
    #[must_use]
    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gems() {
        let mut wallet = Wallet::default();
        wallet.add_gems(500);
        wallet.spend_gems(200).unwrap();
        assert_eq!(wallet.gems(), 300);
        assert_eq!(
            wallet.spend_gems(301),
            Err(GameError::InsufficientGems {
                required: 301,
                available: 300
            })
        );
        assert_eq!(wallet.gems(), 300);
    }

    #[test]
    fn test_ad_cooldown() {
        let mut wallet = Wallet::default();
        assert!(wallet.can_watch_ad(0.0, 300.0));
        wallet.record_ad(10.0, 300.0).unwrap();
        assert!(!wallet.can_watch_ad(200.0, 300.0));
        assert!((wallet.ad_cooldown_remaining(200.0, 300.0) - 110.0).abs() < 1e-9);
        assert!(matches!(
            wallet.record_ad(200.0, 300.0),
            Err(GameError::AdOnCooldown { .. })
        ));
        assert!(wallet.can_watch_ad(310.0, 300.0));
        wallet.record_ad(310.0, 300.0).unwrap();
    }

    #[test]
    fn test_double_loot_is_one_shot() {
        let mut wallet = Wallet::default();
        assert!(!wallet.take_double_loot());
        wallet.arm_double_loot();
        assert!(wallet.double_loot_armed());
        assert!(wallet.take_double_loot());
        assert!(!wallet.take_double_loot());
    }

    #[test]
    fn test_speed_boost() {
        let mut wallet = Wallet::default();
        assert!((wallet.speed_multiplier() - 1.0).abs() < f64::EPSILON);
        wallet.activate_speed_boost();
        assert!((wallet.speed_multiplier() - SPEED_BOOST).abs() < f64::EPSILON);
    }
}
