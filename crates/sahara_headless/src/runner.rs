//! Headless session runner.

use std::io::{self, BufRead, Write};

use sahara_core::buildings::CellPos;
use sahara_core::hex::HexCoord;
use sahara_core::world::GameData;
use tracing::{debug, info, warn};

use crate::protocol::{CaravanView, Command, Response, StateView, MAX_TICK_COUNT};
use crate::storage::{unix_now, SaveStore};

/// Drives one [`GameData`] from protocol commands.
#[derive(Debug)]
pub struct HeadlessRunner {
    game: GameData,
    store: Option<SaveStore>,
    clock: fn() -> u64,
    quit: bool,
}

impl HeadlessRunner {
    /// Runner without persistence.
    pub fn new(game: GameData) -> Self {
        Self {
            game,
            store: None,
            clock: unix_now,
            quit: false,
        }
    }

    /// Runner that saves to `store` on `save`, `quit` and end of input.
    pub fn with_store(game: GameData, store: SaveStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new(game)
        }
    }

    /// Replace the wall clock used to stamp saves.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// The driven world.
    pub fn game(&self) -> &GameData {
        &self.game
    }

    /// Whether a `quit` command was handled.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Read commands from `input` until `quit` or end of input, writing one
    /// response line per command to `output`.
    ///
    /// Malformed lines answer with an error and the session continues.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        info!(clock = self.game.clock(), "Starting headless session");
        output.write_all(Response::ready(self.game.clock()).to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match Command::from_json(line) {
                Ok(cmd) => self.handle(cmd),
                Err(e) => Response::error(format!("Parse error: {e}"), None),
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;

            if self.quit {
                return Ok(());
            }
        }

        // End of input counts as suspend.
        self.persist();
        Ok(())
    }

    /// Apply one command.
    pub fn handle(&mut self, cmd: Command) -> Response {
        let name = cmd.name();
        debug!(cmd = name, "Handling command");
        let game = &mut self.game;

        match cmd {
            Command::Tick { dt, count } => {
                if count > MAX_TICK_COUNT {
                    warn!(count, max = MAX_TICK_COUNT, "Tick count clamped");
                }
                let mut events = Vec::new();
                for _ in 0..count.min(MAX_TICK_COUNT) {
                    events.extend(game.tick(dt));
                }
                Response::Ticked {
                    clock: game.clock(),
                    events,
                }
            }
            Command::Query => Response::State(Box::new(state_view(game))),
            Command::Stats => Response::Stats {
                stats: game.stats(),
            },
            Command::Scout { q, r } => Response::Scouted {
                report: game.scout_hex(HexCoord::new(q, r)),
            },
            Command::Raid {
                caravan_id,
                squad,
                heroes,
            } => match game.start_raid(caravan_id, squad, &heroes) {
                Ok(outcome) => Response::RaidResolved { outcome },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::PrepareRaid {
                caravan_id,
                squad,
                heroes,
            } => match game.prepare_raid(caravan_id, squad, &heroes) {
                Ok(win_chance) => Response::RaidPrepared { win_chance },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::SetSquad { squad } => match game.set_raid_squad(squad) {
                Ok(win_chance) => Response::RaidPrepared { win_chance },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::SetHeroes { heroes } => match game.set_raid_heroes(&heroes) {
                Ok(win_chance) => Response::RaidPrepared { win_chance },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::ExecuteRaid => match game.execute_raid() {
                Ok(outcome) => Response::RaidResolved { outcome },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::CancelRaid => {
                game.cancel_raid();
                Response::ack(name)
            }
            Command::Place { x, y, building } => {
                ack_or_error(game.place_building(CellPos::new(x, y), building), name)
            }
            Command::Build { x, y, building } => {
                ack_or_error(game.build(CellPos::new(x, y), building), name)
            }
            Command::Upgrade { x, y } => match game.upgrade_building(CellPos::new(x, y)) {
                Ok(level) => Response::Upgraded { level },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::Research { branch, tier } => {
                ack_or_error(game.research_tech(branch, tier), name)
            }
            Command::Recruit => match game.recruit() {
                Ok(raiders) => Response::Recruited { raiders },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::StartWeekly => match game.start_weekly_event() {
                Some(event) => Response::Event { event },
                None => Response::error("Weekly event is already running", Some(name)),
            },
            Command::SpawnBoss => Response::Event {
                event: game.spawn_world_boss(),
            },
            Command::BossStatus => Response::Boss {
                status: game.boss_status(),
            },
            Command::AttackBoss { squad, heroes } => match game.attack_world_boss(squad, &heroes) {
                Ok(attack) => Response::BossAttacked { attack },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::DamageBoss {
                contributor,
                amount,
            } => match game.damage_world_boss(&contributor, amount) {
                Ok(Some(event)) => Response::Event { event },
                Ok(None) => Response::ack(name),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::AddGems { amount } => {
                game.add_gems(amount);
                Response::Gems {
                    gems: game.wallet().gems(),
                }
            }
            Command::SpendGems { amount } => match game.spend_gems(amount) {
                Ok(()) => Response::Gems {
                    gems: game.wallet().gems(),
                },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::ClaimAd { reward } => ack_or_error(game.claim_ad_reward(reward), name),
            Command::Save => self.save(),
            Command::Reset => self.reset(),
            Command::Hash => Response::StateHash {
                clock: game.clock(),
                hash: game.state_hash(),
            },
            Command::Quit => {
                self.quit = true;
                self.persist();
                Response::Bye
            }
        }
    }

    fn save(&mut self) -> Response {
        let Some(store) = &self.store else {
            return Response::error("No save store attached", Some("save"));
        };
        let saved_at = (self.clock)();
        match store.save(&self.game, saved_at) {
            Ok(()) => Response::Saved { saved_at },
            Err(e) => Response::error(e.to_string(), Some("save")),
        }
    }

    fn reset(&mut self) -> Response {
        self.game.reset();
        if let Some(store) = &self.store {
            if let Err(e) = store.delete() {
                return Response::error(e.to_string(), Some("reset"));
            }
        }
        info!("World reset");
        Response::ack("reset")
    }

    fn persist(&mut self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.game, (self.clock)()) {
                warn!(error = %e, path = %store.path().display(), "Failed to save world");
            }
        }
    }
}

fn ack_or_error(result: sahara_core::error::Result<()>, name: &str) -> Response {
    match result {
        Ok(()) => Response::ack(name),
        Err(e) => Response::error(e.to_string(), Some(name)),
    }
}

fn state_view(game: &GameData) -> StateView {
    StateView {
        clock: game.clock(),
        resources: game.resources().snapshot(),
        raiders: game.raiders(),
        max_raiders: game.max_raiders(),
        gems: game.wallet().gems(),
        caravans: game.caravans().map(CaravanView::from).collect(),
        camp: game.camp().clone(),
        events: game.events().clone(),
        sandstorm: game.sandstorm().clone(),
        hash: game.state_hash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sahara_core::config::GameConfig;

    fn runner() -> HeadlessRunner {
        HeadlessRunner::new(GameData::new(GameConfig::default()))
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut runner = runner();
        let response = runner.handle(Command::Tick { dt: 10.0, count: 3 });
        assert!(matches!(response, Response::Ticked { clock, .. } if clock == 30.0));
    }

    #[test]
    fn test_tick_count_is_clamped() {
        let mut runner = runner();
        let response = runner.handle(Command::Tick {
            dt: 1.0,
            count: u32::MAX,
        });
        assert!(matches!(
            response,
            Response::Ticked { clock, .. } if clock == f64::from(MAX_TICK_COUNT)
        ));
    }

    #[test]
    fn test_rejected_action_reports_error() {
        let mut runner = runner();
        let response = runner.handle(Command::Upgrade { x: 0, y: 0 });
        assert!(matches!(
            response,
            Response::Error { cmd: Some(ref c), .. } if c == "upgrade"
        ));
    }

    #[test]
    fn test_save_without_store() {
        let mut runner = runner();
        assert!(matches!(runner.handle(Command::Save), Response::Error { .. }));
    }

    #[test]
    fn test_quit_sets_flag() {
        let mut runner = runner();
        assert_eq!(runner.handle(Command::Quit), Response::Bye);
        assert!(runner.should_quit());
    }
}
