//! Sync sink that mirrors snapshots into the log.

use sahara_core::sync::{PlayerSnapshot, SyncSink};
use tracing::info;

/// Writes every pushed snapshot as an `info!` event.
///
/// Stands in for a leaderboard mirror when running headless; it cannot fail,
/// which matches the fire-and-forget contract of [`SyncSink`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SyncSink for LogSink {
    fn push(&self, snapshot: &PlayerSnapshot) {
        info!(
            player = %snapshot.player_id,
            name = %snapshot.display_name,
            power = snapshot.power_level,
            resources = snapshot.total_resources,
            "Sync snapshot"
        );
    }
}
