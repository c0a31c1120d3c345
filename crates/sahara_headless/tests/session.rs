//! Headless sessions end to end: protocol, save store and sync pushes.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use sahara_core::config::GameConfig;
use sahara_core::save::SaveData;
use sahara_core::sync::{OfflineSink, PlayerSnapshot, SyncSink};
use sahara_core::world::GameData;
use sahara_headless::protocol::Response;
use sahara_headless::runner::HeadlessRunner;
use sahara_headless::storage::SaveStore;
use sahara_test_utils::fixtures::rich_config;

fn fixed_clock() -> u64 {
    1_700_000_000
}

fn run_script(runner: &mut HeadlessRunner, script: &[&str]) -> Vec<Response> {
    let input = script.join("\n");
    let mut output = Vec::new();
    runner.run(Cursor::new(input), &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[derive(Debug, Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<PlayerSnapshot>>>);

impl SyncSink for RecordingSink {
    fn push(&self, snapshot: &PlayerSnapshot) {
        self.0.lock().unwrap().push(snapshot.clone());
    }
}

// ============================================================================
// Protocol
// ============================================================================

mod protocol {
    use super::*;

    #[test]
    fn one_response_per_command() {
        let mut runner = HeadlessRunner::new(GameData::new(rich_config(3)));
        let responses = run_script(
            &mut runner,
            &[
                r#"{"cmd":"build","x":0,"y":0,"building":"tent"}"#,
                r#"{"cmd":"build","x":0,"y":0,"building":"well"}"#,
                r#"{"cmd":"tick","dt":30.0,"count":2}"#,
                "",
                r#"{"cmd":"hash"}"#,
                r#"{"cmd":"quit"}"#,
                r#"{"cmd":"tick"}"#,
            ],
        );

        assert_eq!(responses.len(), 6);
        assert!(matches!(responses[0], Response::Ready { .. }));
        assert_eq!(responses[1], Response::ack("build"));
        assert!(matches!(
            &responses[2],
            Response::Error { cmd: Some(c), .. } if c == "build"
        ));
        assert!(matches!(responses[3], Response::Ticked { clock, .. } if clock == 60.0));
        assert!(matches!(
            responses[4],
            Response::StateHash { hash, .. } if hash == runner.game().state_hash()
        ));
        assert_eq!(responses[5], Response::Bye);
        assert_eq!(runner.game().clock(), 60.0);
    }

    #[test]
    fn malformed_line_does_not_end_session() {
        let mut runner = HeadlessRunner::new(GameData::new(GameConfig::default()));
        let responses = run_script(&mut runner, &["{not json", r#"{"cmd":"stats"}"#]);
        assert!(matches!(
            &responses[1],
            Response::Error { message, cmd: None } if message.starts_with("Parse error")
        ));
        assert!(matches!(responses[2], Response::Stats { .. }));
    }

    #[test]
    fn raid_flow_through_protocol() {
        let game = GameData::new(rich_config(11));
        let target = game.caravans().next().unwrap().id;
        let mut runner = HeadlessRunner::new(game);

        let prepare = format!(r#"{{"cmd":"prepare_raid","caravan_id":{target},"squad":5}}"#);
        let responses = run_script(
            &mut runner,
            &[
                &prepare,
                r#"{"cmd":"set_squad","squad":-4}"#,
                r#"{"cmd":"cancel_raid"}"#,
                r#"{"cmd":"execute_raid"}"#,
                &prepare,
                r#"{"cmd":"execute_raid"}"#,
            ],
        );

        assert!(matches!(responses[1], Response::RaidPrepared { .. }));
        assert!(matches!(
            responses[2],
            Response::RaidPrepared { win_chance } if win_chance == 0.0
        ));
        assert_eq!(responses[3], Response::ack("cancel_raid"));
        assert!(matches!(responses[4], Response::Error { .. }));
        assert!(matches!(
            &responses[6],
            Response::RaidResolved { outcome } if outcome.caravan_id == target
        ));
        assert!(runner.game().caravan(target).is_none());
    }

    #[test]
    fn boss_event_through_protocol() {
        let mut runner = HeadlessRunner::new(GameData::new(GameConfig::default()));
        let responses = run_script(
            &mut runner,
            &[
                r#"{"cmd":"boss_status"}"#,
                r#"{"cmd":"spawn_boss"}"#,
                r#"{"cmd":"damage_boss","contributor":"ally","amount":2500}"#,
                r#"{"cmd":"boss_status"}"#,
            ],
        );
        assert_eq!(responses[1], Response::Boss { status: None });
        assert!(matches!(responses[2], Response::Event { .. }));
        assert_eq!(responses[3], Response::ack("damage_boss"));
        let Response::Boss {
            status: Some(status),
        } = &responses[4]
        else {
            panic!("expected boss status, got {:?}", responses[4]);
        };
        assert_eq!(status.health, 7_500);
        assert_eq!(status.player_damage, 0);
    }

    #[test]
    fn query_reports_world() {
        let mut runner = HeadlessRunner::new(GameData::new(GameConfig::default()));
        let responses = run_script(&mut runner, &[r#"{"cmd":"query"}"#]);
        let Response::State(view) = &responses[1] else {
            panic!("expected state, got {:?}", responses[1]);
        };
        assert_eq!(view.raiders, 10);
        assert_eq!(view.max_raiders, 50);
        assert_eq!(view.caravans.len(), 5);
        for entry in &view.caravans {
            assert_eq!(entry.description, entry.caravan.description());
            assert!(entry.description.contains("escorts"));
        }
        assert_eq!(view.hash, runner.game().state_hash());
    }
}

// ============================================================================
// Save store
// ============================================================================

mod store {
    use super::*;

    #[test]
    fn quit_saves_and_next_start_applies_elapsed_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("world.json"));
        let config = GameConfig::default();

        let game = store.load_or_default(config.clone(), fixed_clock(), Box::new(OfflineSink));
        let mut runner = HeadlessRunner::with_store(game, store.clone()).with_clock(fixed_clock);
        run_script(
            &mut runner,
            &[r#"{"cmd":"tick","dt":120.0}"#, r#"{"cmd":"quit"}"#],
        );
        assert!(store.exists());

        let save = store.read().unwrap();
        assert_eq!(save.saved_at, fixed_clock());
        assert_eq!(save.world.clock, 120.0);

        let restored =
            store.load_or_default(config, fixed_clock() + 3_600, Box::new(OfflineSink));
        assert_eq!(restored.clock(), 120.0 + 3_600.0);
    }

    #[test]
    fn end_of_input_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("nested/dir/world.json"));
        let mut runner =
            HeadlessRunner::with_store(GameData::new(GameConfig::default()), store.clone())
                .with_clock(fixed_clock);
        run_script(&mut runner, &[r#"{"cmd":"tick","dt":5.0}"#]);
        assert_eq!(store.read().unwrap().world.clock, 5.0);
    }

    #[test]
    fn restored_world_matches_saved_world() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("world.json"));
        let mut game = GameData::new(rich_config(17));
        game.tick(500.0);
        store.save(&game, fixed_clock()).unwrap();

        let restored = store.load_or_default(rich_config(17), fixed_clock(), Box::new(OfflineSink));
        assert_eq!(restored.state_hash(), game.state_hash());
    }

    #[test]
    fn corrupt_save_falls_back_to_fresh_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, "{ this is not a save").unwrap();
        let store = SaveStore::new(&path);

        assert!(store.read().is_err());
        let game = store.load_or_default(GameConfig::default(), fixed_clock(), Box::new(OfflineSink));
        assert_eq!(game.state_hash(), GameData::new(GameConfig::default()).state_hash());
    }

    #[test]
    fn newer_save_version_falls_back_to_fresh_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let mut save = SaveData::capture(&GameData::new(GameConfig::default()), 0);
        save.version = 99;
        std::fs::write(&path, save.to_json().unwrap()).unwrap();

        let game =
            SaveStore::new(&path).load_or_default(GameConfig::default(), 0, Box::new(OfflineSink));
        assert_eq!(game.clock(), 0.0);
    }

    #[test]
    fn reset_deletes_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("world.json"));
        let mut runner = HeadlessRunner::with_store(GameData::new(rich_config(2)), store.clone())
            .with_clock(fixed_clock);

        let responses = run_script(
            &mut runner,
            &[
                r#"{"cmd":"build","x":1,"y":1,"building":"well"}"#,
                r#"{"cmd":"save"}"#,
                r#"{"cmd":"reset"}"#,
            ],
        );
        assert_eq!(
            responses[2],
            Response::Saved {
                saved_at: fixed_clock()
            }
        );
        assert_eq!(responses[3], Response::ack("reset"));
        assert!(runner.game().camp().is_empty());
        // End of input saved the fresh world again.
        assert_eq!(store.read().unwrap().world.clock, 0.0);
    }
}

// ============================================================================
// Sync
// ============================================================================

mod sync {
    use super::*;

    #[test]
    fn every_save_pushes_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("world.json"));
        let sink = RecordingSink::default();
        let pushed = Arc::clone(&sink.0);

        let mut config = GameConfig::default();
        config.player_name = "Tuareg".to_string();
        let game = GameData::with_sink(config, Box::new(sink));
        store.save(&game, 1).unwrap();
        store.save(&game, 2).unwrap();

        let pushed = pushed.lock().unwrap();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[0].display_name, "Tuareg");
        assert_eq!(pushed[0].power_level, 30);
        assert_eq!(pushed[0].total_resources, 175);
    }
}
