//! Headless driver for Sahara Raiders.
//!
//! This crate runs the simulation core without a GUI, controlled via JSON
//! commands on stdin, with responses on stdout. This enables:
//!
//! - **Automated play**: a script or agent can play through the protocol
//! - **CI verification**: determinism and save round-trips outside unit tests
//! - **Balance checks**: long simulations against a RON config
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, scout, raid, build, etc.)
//! - **stdout**: One response per command (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response reference.
//!
//! # Example
//!
//! ```bash
//! # Play interactively
//! echo '{"cmd":"tick","dt":60.0}' | cargo run -p sahara_headless -- run
//!
//! # Simulate a week and print stats
//! cargo run -p sahara_headless -- simulate --seconds 604800
//!
//! # Check a config file
//! cargo run -p sahara_headless -- validate assets/config/sahara.ron
//! ```

pub mod config_file;
pub mod protocol;
pub mod runner;
pub mod sink;
pub mod storage;

pub use config_file::{load_config, ConfigFileError};
pub use protocol::{Command, Response};
pub use runner::HeadlessRunner;
pub use sink::LogSink;
pub use storage::{SaveStore, StorageError};
