//! Test fixtures and helpers.
//!
//! Pre-built configs and worlds, plus a scripted-action type so tests can
//! drive a [`GameData`] the way a UI would.

use fixed::types::I32F32;
use sahara_core::buildings::{BuildingKind, CellPos};
use sahara_core::config::GameConfig;
use sahara_core::hex::HexCoord;
use sahara_core::tech::TechBranch;
use sahara_core::world::GameData;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Default balance with a specific seed.
#[must_use]
pub fn config_with_seed(seed: u64) -> GameConfig {
    GameConfig::default().with_seed(seed)
}

/// Config with deep stocks so costs never block a scripted test.
#[must_use]
pub fn rich_config(seed: u64) -> GameConfig {
    let mut config = config_with_seed(seed);
    config.starting_resources.water = 100_000;
    config.starting_resources.salt = 100_000;
    config.starting_resources.gold = 100_000;
    config.starting_resources.spices = 100_000;
    config.starting_resources.slaves = 20;
    config
}

/// Fresh default world.
#[must_use]
pub fn world_with_seed(seed: u64) -> GameData {
    GameData::new(config_with_seed(seed))
}

/// Fresh world built from [`rich_config`].
#[must_use]
pub fn rich_world(seed: u64) -> GameData {
    GameData::new(rich_config(seed))
}

/// One player input.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldAction {
    /// Advance time.
    Tick(f64),
    /// Scout a hex.
    Scout(HexCoord),
    /// Raid the `n`-th visible caravan (modulo the count) with a squad.
    Raid {
        /// Index into the visible caravans.
        target: usize,
        /// Squad size, possibly negative.
        squad: i64,
        /// Hero indices.
        heroes: Vec<usize>,
    },
    /// Pay for and place a building.
    Build(CellPos, BuildingKind),
    /// Upgrade a building.
    Upgrade(CellPos),
    /// Research a tech tier.
    Research(TechBranch, u8),
    /// Convert slaves to raiders.
    Recruit,
}

impl WorldAction {
    /// Apply the action, ignoring rejected inputs.
    pub fn apply(&self, world: &mut GameData) {
        match self {
            Self::Tick(dt) => {
                world.tick(*dt);
            }
            Self::Scout(hex) => {
                world.scout_hex(*hex);
            }
            Self::Raid {
                target,
                squad,
                heroes,
            } => {
                let ids: Vec<_> = world
                    .caravans()
                    .filter(|c| !c.is_boss())
                    .map(|c| c.id)
                    .collect();
                if !ids.is_empty() {
                    let id = ids[target % ids.len()];
                    let _ = world.start_raid(id, *squad, heroes);
                    world.cancel_raid();
                }
            }
            Self::Build(pos, kind) => {
                let _ = world.build(*pos, *kind);
            }
            Self::Upgrade(pos) => {
                let _ = world.upgrade_building(*pos);
            }
            Self::Research(branch, tier) => {
                let _ = world.research_tech(*branch, *tier);
            }
            Self::Recruit => {
                let _ = world.recruit();
            }
        }
    }
}

/// A short session touching every entry point.
#[must_use]
pub fn scripted_session() -> Vec<WorldAction> {
    vec![
        WorldAction::Build(CellPos::new(0, 0), BuildingKind::Tent),
        WorldAction::Build(CellPos::new(1, 0), BuildingKind::Well),
        WorldAction::Tick(60.0),
        WorldAction::Scout(HexCoord::new(2, -1)),
        WorldAction::Scout(HexCoord::new(-3, 1)),
        WorldAction::Upgrade(CellPos::new(0, 0)),
        WorldAction::Research(TechBranch::Raiding, 1),
        WorldAction::Raid {
            target: 0,
            squad: 8,
            heroes: vec![0, 1],
        },
        WorldAction::Recruit,
        WorldAction::Tick(900.0),
        WorldAction::Raid {
            target: 1,
            squad: 5,
            heroes: vec![2],
        },
        WorldAction::Tick(86_400.0),
    ]
}
