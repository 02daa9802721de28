//! # Satellite Link Simulator
//!
//! A satellite telemetry/command link simulator: a binary TCP protocol with
//! XOR-checksummed frames, a fixed-rate physics tick loop, and per-connection
//! sessions that interleave inbound command decoding with outbound telemetry.
//!
//! ## Architecture
//!
//! - [`protocol`] - wire framing, checksums, and stream deframers
//! - [`state`] - the physical state model and command application
//! - [`session`] - per-connection command/telemetry loop
//! - [`server`] - TCP listener and the tick task
//! - [`telemetry`] - JSON mirror of telemetry for dashboard consumers
//!
//! ## Quick Start
//!
//! ```no_run
//! use satlink::{server::Server, shared_state};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let state = shared_state();
//! let server = Server::bind(("127.0.0.1", 10000), state.clone()).await?;
//! satlink::server::spawn_tick_loop(state, satlink::server::TICK_PERIOD);
//! server.run().await
//! # }
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod protocol;
pub mod server;
pub mod session;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use protocol::{Command, CommandCode, ProtocolError, TelemetryFrame};
pub use server::Server;
pub use state::{SatelliteState, SystemStatus};

/// Guarded handle to the single satellite state shared by the tick task and
/// every session.
pub type SharedState = Arc<Mutex<SatelliteState>>;

pub fn shared_state() -> SharedState {
    Arc::new(Mutex::new(SatelliteState::new()))
}
