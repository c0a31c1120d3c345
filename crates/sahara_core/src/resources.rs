//! Resource stocks, generation and water consumption.
//!
//! Generation uses a lump accumulator: each tick adds `rate * dt` to a
//! per-resource accumulator and every full 100 units of accumulator converts
//! into one whole unit of stock. The threshold of 100 is part of the save
//! format and must not change.
//!
//! All amounts are fixed-point, so any sequence of ticks with the same total
//! time yields the same stock on every platform.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_map_serde, whole_units, Fixed};

/// Accumulator units that convert into one unit of stock.
pub const ACCUMULATOR_THRESHOLD: Fixed = Fixed::const_from_int(100);

/// The five tradeable resources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Drunk by the whole camp every tick.
    Water,
    /// Common trade good.
    Salt,
    /// Main building currency.
    Gold,
    /// Rare trade good.
    Spices,
    /// Captured in raids; recruitable into raiders.
    Slaves,
}

impl ResourceKind {
    /// Every resource, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Water,
        Self::Salt,
        Self::Gold,
        Self::Spices,
        Self::Slaves,
    ];

    /// Lowercase name used in logs and saves.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Salt => "salt",
            Self::Gold => "gold",
            Self::Spices => "spices",
            Self::Slaves => "slaves",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price in whole resource units.
pub type Cost = BTreeMap<ResourceKind, u32>;

/// Build a [`Cost`] from `(kind, amount)` pairs.
#[must_use]
pub fn cost(pairs: &[(ResourceKind, u32)]) -> Cost {
    pairs.iter().copied().collect()
}

/// Current stocks, base generation rates and fractional accumulators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stockpile {
    #[serde(with = "fixed_map_serde")]
    stocks: BTreeMap<ResourceKind, Fixed>,
    /// Accumulator units per second, before building bonuses and multipliers.
    #[serde(with = "fixed_map_serde")]
    rates: BTreeMap<ResourceKind, Fixed>,
    #[serde(with = "fixed_map_serde")]
    accumulators: BTreeMap<ResourceKind, Fixed>,
}

impl Default for Stockpile {
    fn default() -> Self {
        Self::new(&BTreeMap::new(), &BTreeMap::new())
    }
}

impl Stockpile {
    /// Create a stockpile with the given starting stocks and base rates.
    ///
    /// Every resource gets an entry; missing ones start at zero.
    #[must_use]
    pub fn new(stocks: &BTreeMap<ResourceKind, u32>, rates: &BTreeMap<ResourceKind, Fixed>) -> Self {
        let mut pile = Self {
            stocks: BTreeMap::new(),
            rates: BTreeMap::new(),
            accumulators: BTreeMap::new(),
        };
        for kind in ResourceKind::ALL {
            pile.stocks
                .insert(kind, Fixed::saturating_from_num(stocks.get(&kind).copied().unwrap_or(0)));
            pile.rates
                .insert(kind, rates.get(&kind).copied().unwrap_or(Fixed::ZERO));
            pile.accumulators.insert(kind, Fixed::ZERO);
        }
        pile
    }

    /// Fill in entries missing after loading an older save.
    pub fn normalize(&mut self) {
        for kind in ResourceKind::ALL {
            self.stocks.entry(kind).or_insert(Fixed::ZERO);
            self.rates.entry(kind).or_insert(Fixed::ZERO);
            self.accumulators.entry(kind).or_insert(Fixed::ZERO);
        }
    }

    /// Exact stock, including any fractional part left by water drain.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> Fixed {
        self.stocks.get(&kind).copied().unwrap_or(Fixed::ZERO)
    }

    /// Whole units in stock.
    #[must_use]
    pub fn whole(&self, kind: ResourceKind) -> i64 {
        whole_units(self.amount(kind))
    }

    /// Base generation rate.
    #[must_use]
    pub fn rate(&self, kind: ResourceKind) -> Fixed {
        self.rates.get(&kind).copied().unwrap_or(Fixed::ZERO)
    }

    /// Replace a base generation rate.
    pub fn set_rate(&mut self, kind: ResourceKind, rate: Fixed) {
        self.rates.insert(kind, rate);
    }

    /// Pending fractional accumulation.
    #[must_use]
    pub fn accumulator(&self, kind: ResourceKind) -> Fixed {
        self.accumulators.get(&kind).copied().unwrap_or(Fixed::ZERO)
    }

    /// All stocks in whole units.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<ResourceKind, i64> {
        ResourceKind::ALL.iter().map(|k| (*k, self.whole(*k))).collect()
    }

    /// Sum of all stocks in whole units.
    #[must_use]
    pub fn total(&self) -> i64 {
        ResourceKind::ALL.iter().map(|k| self.whole(*k)).sum()
    }

    /// Add whole units to a stock.
    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let stock = self.stocks.entry(kind).or_insert(Fixed::ZERO);
        *stock = stock.saturating_add(Fixed::saturating_from_num(amount));
    }

    /// Remove up to `amount` whole units, returning how many were removed.
    pub fn take(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let available = self.whole(kind).clamp(0, i64::from(u32::MAX)) as u32;
        let taken = amount.min(available);
        let stock = self.stocks.entry(kind).or_insert(Fixed::ZERO);
        *stock = stock.saturating_sub(Fixed::saturating_from_num(taken));
        taken
    }

    /// Check whether every component of `cost` is covered.
    #[must_use]
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.check(cost).is_ok()
    }

    /// Like [`can_afford`](Self::can_afford) but names the first shortfall.
    pub fn check(&self, cost: &Cost) -> Result<()> {
        for (&resource, &required) in cost {
            let available = self.amount(resource);
            if available < Fixed::saturating_from_num(required) {
                return Err(GameError::InsufficientResources {
                    resource,
                    required,
                    available: whole_units(available),
                });
            }
        }
        Ok(())
    }

    /// Deduct `cost` if affordable; otherwise leave stocks untouched.
    pub fn spend(&mut self, cost: &Cost) -> Result<()> {
        self.check(cost)?;
        for (&resource, &amount) in cost {
            let stock = self.stocks.entry(resource).or_insert(Fixed::ZERO);
            *stock = stock.saturating_sub(Fixed::saturating_from_num(amount));
        }
        Ok(())
    }

    /// Advance generation by `dt` seconds.
    ///
    /// The effective rate of each resource is `(base + bonus) * multiplier`.
    /// Returns the whole units gained per resource (zero gains omitted).
    pub fn generate(
        &mut self,
        dt: Fixed,
        bonuses: &BTreeMap<ResourceKind, Fixed>,
        multiplier: Fixed,
    ) -> BTreeMap<ResourceKind, u32> {
        let mut gains = BTreeMap::new();
        if dt <= Fixed::ZERO {
            return gains;
        }

        for kind in ResourceKind::ALL {
            let bonus = bonuses.get(&kind).copied().unwrap_or(Fixed::ZERO);
            let rate = self.rate(kind).saturating_add(bonus).saturating_mul(multiplier);
            if rate <= Fixed::ZERO {
                continue;
            }

            let acc = self.accumulators.entry(kind).or_insert(Fixed::ZERO);
            *acc = acc.saturating_add(rate.saturating_mul(dt));

            let units = (*acc / ACCUMULATOR_THRESHOLD).floor();
            if units > Fixed::ZERO {
                *acc -= units * ACCUMULATOR_THRESHOLD;
                let stock = self.stocks.entry(kind).or_insert(Fixed::ZERO);
                *stock = stock.saturating_add(units);
                gains.insert(kind, units.to_num::<u32>());
            }
        }
        gains
    }

    /// Drain `population * rate * dt` water, flooring the stock at zero.
    ///
    /// Returns `true` when the camp is out of water after the drain.
    pub fn consume_water(&mut self, population: u32, rate: Fixed, dt: Fixed) -> bool {
        let stock = self.stocks.entry(ResourceKind::Water).or_insert(Fixed::ZERO);
        if dt > Fixed::ZERO && rate > Fixed::ZERO {
            let drain = Fixed::saturating_from_num(population)
                .saturating_mul(rate)
                .saturating_mul(dt);
            *stock = stock.saturating_sub(drain).max(Fixed::ZERO);
        }
        *stock <= Fixed::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starting_pile() -> Stockpile {
        let stocks = [
            (ResourceKind::Water, 100),
            (ResourceKind::Salt, 50),
            (ResourceKind::Gold, 25),
        ]
        .into_iter()
        .collect();
        let rates = [
            (ResourceKind::Water, Fixed::ONE),
            (ResourceKind::Salt, Fixed::from_num(0.5)),
        ]
        .into_iter()
        .collect();
        Stockpile::new(&stocks, &rates)
    }

    #[test]
    fn test_spend_and_afford() {
        let mut pile = starting_pile();
        let price = cost(&[(ResourceKind::Gold, 20), (ResourceKind::Salt, 10)]);

        assert!(pile.can_afford(&price));
        pile.spend(&price).unwrap();
        assert_eq!(pile.whole(ResourceKind::Gold), 5);
        assert_eq!(pile.whole(ResourceKind::Salt), 40);

        let err = pile.spend(&price).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientResources {
                resource: ResourceKind::Gold,
                required: 20,
                available: 5,
            }
        );
        // Failed spend leaves stocks untouched.
        assert_eq!(pile.whole(ResourceKind::Salt), 40);
    }

    #[test]
    fn test_generation_threshold_is_100() {
        let mut pile = starting_pile();
        let none = BTreeMap::new();

        let gains = pile.generate(Fixed::from_num(99), &none, Fixed::ONE);
        assert!(gains.get(&ResourceKind::Water).is_none());
        assert_eq!(pile.whole(ResourceKind::Water), 100);

        let gains = pile.generate(Fixed::ONE, &none, Fixed::ONE);
        assert_eq!(gains.get(&ResourceKind::Water), Some(&1));
        assert_eq!(pile.whole(ResourceKind::Water), 101);
        assert_eq!(pile.accumulator(ResourceKind::Water), Fixed::ZERO);
    }

    #[test]
    fn test_lump_generation_is_exact() {
        let mut lump = starting_pile();
        let mut steps = starting_pile();
        let none = BTreeMap::new();

        lump.generate(Fixed::from_num(1000), &none, Fixed::ONE);
        for _ in 0..1000 {
            steps.generate(Fixed::ONE, &none, Fixed::ONE);
        }

        // 1000 s at 1/s = 10 water, at 0.5/s = 5 salt
        assert_eq!(lump.whole(ResourceKind::Water), 110);
        assert_eq!(lump.whole(ResourceKind::Salt), 55);
        assert_eq!(lump, steps);
    }

    #[test]
    fn test_generation_bonus_and_multiplier() {
        let mut pile = starting_pile();
        let bonuses = [(ResourceKind::Water, Fixed::ONE)].into_iter().collect();

        pile.generate(Fixed::from_num(100), &bonuses, Fixed::from_num(2));
        // (1 + 1) * 2 * 100 s = 400 accumulator = 4 water
        assert_eq!(pile.whole(ResourceKind::Water), 104);
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let mut pile = starting_pile();
        let before = pile.clone();
        pile.generate(Fixed::from_num(-50), &BTreeMap::new(), Fixed::ONE);
        pile.consume_water(10, Fixed::ONE, Fixed::from_num(-50));
        assert_eq!(pile, before);
    }

    #[test]
    fn test_water_drain_floors_at_zero() {
        let mut pile = starting_pile();
        let rate = Fixed::from_num(0.5);

        assert!(!pile.consume_water(10, rate, Fixed::from_num(10)));
        assert_eq!(pile.whole(ResourceKind::Water), 50);

        assert!(pile.consume_water(10, rate, Fixed::from_num(1000)));
        assert_eq!(pile.amount(ResourceKind::Water), Fixed::ZERO);
    }

    #[test]
    fn test_take_is_capped() {
        let mut pile = starting_pile();
        assert_eq!(pile.take(ResourceKind::Salt, 80), 50);
        assert_eq!(pile.whole(ResourceKind::Salt), 0);
        assert_eq!(pile.take(ResourceKind::Slaves, 3), 0);
    }

    #[test]
    fn test_serde_round_trip_is_lossless() {
        let mut pile = starting_pile();
        pile.generate(Fixed::from_num(33.3), &BTreeMap::new(), Fixed::ONE);
        let json = serde_json::to_string(&pile).unwrap();
        let back: Stockpile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pile);
    }
}
