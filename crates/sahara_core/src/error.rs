//! Error types for the game simulation.
//!
//! Every variant here is an expected validation outcome. Callers check the
//! returned `Result` and leave world state untouched on `Err`.

use thiserror::Error;

use crate::resources::ResourceKind;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all rejected player actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// Camp cell outside the 8x8 grid.
    #[error("Cell ({x}, {y}) is outside the camp grid")]
    OutOfBounds {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// Camp cell already holds a building.
    #[error("Cell ({x}, {y}) is already occupied")]
    CellOccupied {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// No building at the requested cell.
    #[error("No building at ({x}, {y})")]
    NoBuilding {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// Building already at its type's maximum level.
    #[error("Building is already at max level {0}")]
    MaxLevel(u32),

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource type.
        resource: ResourceKind,
        /// Amount required.
        required: u32,
        /// Amount available.
        available: i64,
    },

    /// Tech tier prerequisite not unlocked.
    #[error("Tech tier {tier} of {branch} requires the previous tier first")]
    TechLocked {
        /// Branch name.
        branch: String,
        /// Requested tier.
        tier: u8,
    },

    /// Tech tier already unlocked.
    #[error("Tech tier {tier} of {branch} is already researched")]
    TechAlreadyResearched {
        /// Branch name.
        branch: String,
        /// Requested tier.
        tier: u8,
    },

    /// Tier number outside 1..=3.
    #[error("Unknown tech tier {tier} in {branch}")]
    UnknownTech {
        /// Branch name.
        branch: String,
        /// Requested tier.
        tier: u8,
    },

    /// Caravan id not in the visible set.
    #[error("Caravan not found: {0}")]
    UnknownCaravan(u64),

    /// Boss-only operation on a regular caravan.
    #[error("Caravan {0} is not a world boss")]
    NotABoss(u64),

    /// Regular raid attempted against a world boss.
    #[error("Caravan {0} is a world boss and must be attacked through the boss event")]
    BossTarget(u64),

    /// No world boss event is running.
    #[error("No world boss is active")]
    NoWorldBoss,

    /// Raid operation outside the Prepared state.
    #[error("No raid target has been prepared")]
    NoRaidTarget,

    /// Second resolution of the same raid.
    #[error("Raid has already been resolved")]
    RaidAlreadyResolved,

    /// Not enough premium currency.
    #[error("Insufficient gems: need {required}, have {available}")]
    InsufficientGems {
        /// Gems required.
        required: u64,
        /// Gems available.
        available: u64,
    },

    /// Rewarded ad requested before the cooldown elapsed.
    #[error("Rewarded ad available again in {remaining:.0}s")]
    AdOnCooldown {
        /// Seconds until the next ad.
        remaining: f64,
    },

    /// Recruitment with no slaves in stock.
    #[error("No slaves available to recruit")]
    NoSlaves,

    /// Recruitment with no free raider capacity.
    #[error("Camp is at raider capacity ({0})")]
    CampFull(u32),
}
