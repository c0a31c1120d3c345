//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the world produces identical
//! results given identical seeds and inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the harness is meant to catch:
//!
//! - **Map iteration order**: world state only uses `BTreeMap`/`BTreeSet`,
//!   so encodings and processing order are stable.
//! - **System randomness**: every draw comes from the world's seeded
//!   generator; nothing may read the clock or OS entropy.
//! - **Lossy persistence**: saving and restoring must not change the state
//!   hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use sahara_core::config::GameConfig;
use sahara_core::save::SaveData;
use sahara_core::sync::OfflineSink;
use sahara_core::world::GameData;

use crate::fixtures::WorldAction;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the world was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "World is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Example
///
/// ```
/// use sahara_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
/// assert!(result.is_deterministic);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run the same config and action script twice and compare final hashes.
#[must_use]
pub fn verify_world_determinism(config: &GameConfig, actions: &[WorldAction]) -> DeterminismResult {
    let mut hashes = Vec::with_capacity(2);
    for _ in 0..2 {
        let mut world = GameData::new(config.clone());
        for action in actions {
            action.apply(&mut world);
        }
        hashes.push(world.state_hash());
    }
    DeterminismResult {
        is_deterministic: hashes[0] == hashes[1],
        hashes,
        steps: actions.len() as u64,
    }
}

/// Run `num_worlds` copies of a world on scoped threads, each ticking
/// `num_ticks` times by `dt`, and collect their final hashes.
///
/// A thread that panics contributes hash `0`, which shows up as divergence.
#[must_use]
pub fn run_parallel_worlds(
    config: &GameConfig,
    num_worlds: usize,
    num_ticks: u64,
    dt: f64,
) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_worlds)
            .map(|_| {
                s.spawn(|| {
                    let mut world = GameData::new(config.clone());
                    for _ in 0..num_ticks {
                        world.tick(dt);
                    }
                    world.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap_or(0)).collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: num_ticks,
    }
}

/// Replay an action script on two worlds in lockstep and return the index
/// of the first action after which they differ.
#[must_use]
pub fn find_first_divergence(config: &GameConfig, actions: &[WorldAction]) -> Option<usize> {
    let mut a = GameData::new(config.clone());
    let mut b = GameData::new(config.clone());
    if a.state_hash() != b.state_hash() {
        return Some(0);
    }
    for (index, action) in actions.iter().enumerate() {
        action.apply(&mut a);
        action.apply(&mut b);
        if a.state_hash() != b.state_hash() {
            tracing::debug!(index, ?action, "Worlds diverged");
            return Some(index + 1);
        }
    }
    None
}

/// Save a world to JSON, restore it, and check the hash survived.
#[must_use]
pub fn verify_save_round_trip(world: &GameData) -> bool {
    let Ok(json) = SaveData::capture(world, 0).to_json() else {
        return false;
    };
    let Ok(save) = SaveData::from_json(&json) else {
        return false;
    };
    let restored = save.restore(world.config().clone(), Box::new(OfflineSink));
    restored.state_hash() == world.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{config_with_seed, rich_config, rich_world, scripted_session};
    use crate::strategies;
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_nondeterminism() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_idle_world_is_deterministic() {
        let result = verify_determinism(
            2,
            500,
            || GameData::new(config_with_seed(9)),
            |w| {
                w.tick(37.5);
            },
            GameData::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_scripted_session_is_deterministic() {
        verify_world_determinism(&rich_config(5), &scripted_session()).assert_deterministic();
        assert_eq!(find_first_divergence(&rich_config(5), &scripted_session()), None);
    }

    #[test]
    fn test_parallel_worlds_match() {
        run_parallel_worlds(&config_with_seed(3), 4, 200, 10.0).assert_deterministic();
    }

    #[test]
    fn test_save_round_trip_after_session() {
        let mut world = rich_world(21);
        for action in scripted_session() {
            action.apply(&mut world);
        }
        assert!(verify_save_round_trip(&world));
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Random action scripts replay identically.
        #[test]
        fn prop_action_scripts_are_replayable(
            seed in any::<u64>(),
            actions in strategies::arb_action_sequence(20),
        ) {
            let result = verify_world_determinism(&rich_config(seed), &actions);
            prop_assert!(result.is_deterministic);
        }

        /// Saving after any script loses nothing.
        #[test]
        fn prop_save_round_trip(
            seed in any::<u64>(),
            actions in strategies::arb_action_sequence(12),
        ) {
            let mut world = rich_world(seed);
            for action in &actions {
                action.apply(&mut world);
            }
            prop_assert!(verify_save_round_trip(&world));
        }
    }
}
