//! JSON protocol for headless sessions.
//!
//! The runner talks JSON lines (one JSON object per line):
//!
//! **Input (stdin):** commands from the controller
//! **Output (stdout):** one response per command
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","clock":0.0}`
//! 2. Controller sends commands as JSON lines
//! 3. Every command gets exactly one response; rejected actions answer with
//!    `{"type":"error",...}` and leave the world untouched
//! 4. `quit` (or end of input) saves, if a store is attached, and answers `bye`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","clock":0.0}
//! -> {"cmd":"build","x":0,"y":0,"building":"tent"}
//! <- {"type":"ack","cmd":"build"}
//! -> {"cmd":"tick","dt":60.0}
//! <- {"type":"ticked","clock":60.0,"events":[]}
//! -> {"cmd":"scout","q":2,"r":-1}
//! <- {"type":"scouted","report":{"result":"empty"}}
//! ```

use std::collections::BTreeMap;

use sahara_core::buildings::{BuildingKind, CampGrid};
use sahara_core::caravan::{Caravan, CaravanId};
use sahara_core::events::{EventState, WorldEvent};
use sahara_core::raid::RaidOutcome;
use sahara_core::resources::ResourceKind;
use sahara_core::tech::TechBranch;
use sahara_core::wallet::AdReward;
use sahara_core::weather::SandstormState;
use sahara_core::world::{BossAttack, BossStatus, GameStats, ScoutReport};
use serde::{Deserialize, Serialize};

/// Protocol revision announced in [`Response::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Most ticks one `tick` command runs; larger counts are clamped.
pub const MAX_TICK_COUNT: u32 = 10_000;

/// Commands accepted by the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the world `count` times by `dt` seconds.
    Tick {
        #[serde(default = "default_dt")]
        dt: f64,
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Full world state without advancing time.
    Query,

    /// Stats screen numbers.
    Stats,

    /// Scout a hex.
    Scout { q: i32, r: i32 },

    /// Prepare and resolve a raid in one step.
    Raid {
        caravan_id: CaravanId,
        squad: i64,
        #[serde(default)]
        heroes: Vec<usize>,
    },

    /// Select a raid target without resolving.
    PrepareRaid {
        caravan_id: CaravanId,
        squad: i64,
        #[serde(default)]
        heroes: Vec<usize>,
    },

    /// Change the prepared squad.
    SetSquad { squad: i64 },

    /// Change the prepared heroes.
    SetHeroes { heroes: Vec<usize> },

    /// Resolve the prepared raid.
    ExecuteRaid,

    /// Discard the prepared raid.
    CancelRaid,

    /// Validate a cell and create a building without charging for it.
    Place { x: i32, y: i32, building: BuildingKind },

    /// Pay for and place a building.
    Build { x: i32, y: i32, building: BuildingKind },

    /// Upgrade the building at a cell.
    Upgrade { x: i32, y: i32 },

    /// Research a tech tier.
    Research { branch: TechBranch, tier: u8 },

    /// Convert slaves into raiders.
    Recruit,

    /// Start the weekly event.
    StartWeekly,

    /// Spawn the world boss.
    SpawnBoss,

    /// Current world-boss standing.
    BossStatus,

    /// Send a squad against the world boss.
    AttackBoss {
        squad: i64,
        #[serde(default)]
        heroes: Vec<usize>,
    },

    /// Record boss damage from another contributor.
    DamageBoss { contributor: String, amount: u64 },

    /// Credit gems.
    AddGems { amount: u64 },

    /// Debit gems.
    SpendGems { amount: u64 },

    /// Apply the reward of a watched ad.
    ClaimAd { reward: AdReward },

    /// Persist the world now.
    Save,

    /// Discard the world and its save, starting fresh.
    Reset,

    /// State hash for determinism checks.
    Hash,

    /// Save and end the session.
    Quit,
}

fn default_dt() -> f64 {
    1.0
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, clock: f64 },

    /// Command succeeded with nothing to report.
    Ack { cmd: String },

    /// Command rejected; the world is unchanged.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// World advanced.
    Ticked { clock: f64, events: Vec<WorldEvent> },

    /// Full world state.
    State(Box<StateView>),

    /// Stats screen numbers.
    Stats { stats: GameStats },

    /// Scouting result.
    Scouted { report: ScoutReport },

    /// Advisory win chance of the prepared raid.
    RaidPrepared { win_chance: f64 },

    /// Resolved raid.
    RaidResolved { outcome: RaidOutcome },

    /// New building level.
    Upgraded { level: u32 },

    /// Raiders gained by recruitment.
    Recruited { raiders: u32 },

    /// An event started or ended.
    Event { event: WorldEvent },

    /// World-boss standing, absent when no boss is active.
    Boss { status: Option<BossStatus> },

    /// Result of a boss attack.
    BossAttacked { attack: BossAttack },

    /// Current gem balance.
    Gems { gems: u64 },

    /// World written to the store.
    Saved { saved_at: u64 },

    /// State hash for determinism verification.
    StateHash { clock: f64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Everything a UI reads to draw the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub clock: f64,
    pub resources: BTreeMap<ResourceKind, i64>,
    pub raiders: u32,
    pub max_raiders: u32,
    pub gems: u64,
    pub caravans: Vec<CaravanView>,
    pub camp: CampGrid,
    pub events: EventState,
    pub sandstorm: SandstormState,
    pub hash: u64,
}

/// A caravan with its one-line description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaravanView {
    pub description: String,
    pub caravan: Caravan,
}

impl From<&Caravan> for CaravanView {
    fn from(caravan: &Caravan) -> Self {
        Self {
            description: caravan.description(),
            caravan: caravan.clone(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(clock: f64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            clock,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name for acknowledgments and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Stats => "stats",
            Self::Scout { .. } => "scout",
            Self::Raid { .. } => "raid",
            Self::PrepareRaid { .. } => "prepare_raid",
            Self::SetSquad { .. } => "set_squad",
            Self::SetHeroes { .. } => "set_heroes",
            Self::ExecuteRaid => "execute_raid",
            Self::CancelRaid => "cancel_raid",
            Self::Place { .. } => "place",
            Self::Build { .. } => "build",
            Self::Upgrade { .. } => "upgrade",
            Self::Research { .. } => "research",
            Self::Recruit => "recruit",
            Self::StartWeekly => "start_weekly",
            Self::SpawnBoss => "spawn_boss",
            Self::BossStatus => "boss_status",
            Self::AttackBoss { .. } => "attack_boss",
            Self::DamageBoss { .. } => "damage_boss",
            Self::AddGems { .. } => "add_gems",
            Self::SpendGems { .. } => "spend_gems",
            Self::ClaimAd { .. } => "claim_ad",
            Self::Save => "save",
            Self::Reset => "reset",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_command() {
        let cmd = Command::from_json(r#"{"cmd":"tick","dt":60.0,"count":3}"#).unwrap();
        assert_eq!(cmd, Command::Tick { dt: 60.0, count: 3 });
    }

    #[test]
    fn test_default_tick() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert_eq!(cmd, Command::Tick { dt: 1.0, count: 1 });
    }

    #[test]
    fn test_parse_build_command() {
        let cmd = Command::from_json(r#"{"cmd":"build","x":3,"y":4,"building":"slave_pen"}"#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::Build {
                x: 3,
                y: 4,
                building: BuildingKind::SlavePen
            }
        );
    }

    #[test]
    fn test_parse_raid_defaults_heroes() {
        let cmd = Command::from_json(r#"{"cmd":"raid","caravan_id":7,"squad":-3}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Raid {
                caravan_id: 7,
                squad: -3,
                heroes: vec![]
            }
        );
    }

    #[test]
    fn test_parse_ad_reward() {
        let cmd = Command::from_json(
            r#"{"cmd":"claim_ad","reward":{"reward":"gems","amount":5}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::ClaimAd {
                reward: AdReward::Gems(5)
            }
        );
        let cmd =
            Command::from_json(r#"{"cmd":"claim_ad","reward":{"reward":"double_loot"}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::ClaimAd {
                reward: AdReward::DoubleLoot
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::from_json(r#"{"cmd":"teleport"}"#).is_err());
    }

    #[test]
    fn test_serialize_responses() {
        let json = Response::ready(0.0).to_json_line();
        assert!(json.contains(r#""type":"ready""#));
        assert!(json.ends_with('\n'));

        let json = Response::Scouted {
            report: ScoutReport::Empty,
        }
        .to_json_line();
        assert!(json.contains(r#""report":{"result":"empty"}"#));

        let json = Response::error("nope", Some("build")).to_json_line();
        assert!(json.contains(r#""cmd":"build""#));
    }
}
