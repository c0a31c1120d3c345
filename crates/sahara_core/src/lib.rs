//! # Sahara Core
//!
//! Deterministic world/economy simulation for Sahara Raiders.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness (every draw comes from an injected seeded RNG)
//! - Resource accumulation in fixed-point
//!
//! This separation enables:
//! - Headless drivers and automated play
//! - Reproducible world generation
//! - Determinism testing via state hashes
//! - Lossless save/load round-trips
//!
//! ## Crate Structure
//!
//! - [`hex`] - Axial hex coordinates
//! - [`pathfinding`] - A* over the hex grid
//! - [`procgen`] - World features, caravan spawns, wander paths
//! - [`caravan`] - Raidable caravans and world bosses
//! - [`resources`], [`buildings`], [`tech`], [`heroes`] - Economy model
//! - [`raid`] - Raid preparation and resolution
//! - [`weather`], [`events`] - Sandstorms and time-boxed events
//! - [`world`] - The [`GameData`](world::GameData) orchestrator
//! - [`save`] - Persisted layout and state hashing

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod buildings;
pub mod caravan;
pub mod config;
pub mod error;
pub mod events;
pub mod heroes;
pub mod hex;
pub mod math;
pub mod pathfinding;
pub mod procgen;
pub mod raid;
pub mod resources;
pub mod save;
pub mod sync;
pub mod tech;
pub mod wallet;
pub mod weather;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{BuildingKind, CampGrid, CellPos, EffectKind};
    pub use crate::caravan::{Caravan, CaravanId, CaravanKind, LootReport};
    pub use crate::config::GameConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::events::WorldEvent;
    pub use crate::heroes::{BonusKind, HeroRoster};
    pub use crate::hex::HexCoord;
    pub use crate::math::Fixed;
    pub use crate::raid::{RaidOutcome, RaidPlanner};
    pub use crate::resources::{Cost, ResourceKind};
    pub use crate::tech::TechBranch;
    pub use crate::world::{GameData, ScoutReport};
}
