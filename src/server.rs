//! TCP listener and the fixed-rate tick task.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use crate::session::Session;
use crate::SharedState;

/// Default command/telemetry port.
pub const DEFAULT_PORT: u16 = 10000;

/// Reference tick period, 10 Hz.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Accepts ground-station connections and spawns one session task per
/// connection. The listener owns no per-connection state; the only resource
/// shared with sessions is the satellite state handle.
pub struct Server {
    listener: TcpListener,
    state: SharedState,
}

impl Server {
    /// Binds the listener. A failure here is fatal to the simulator process;
    /// everything after a successful bind is handled per session.
    pub async fn bind(addr: impl ToSocketAddrs, state: SharedState) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "listening for ground stations");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let session = Session::new(stream, peer, Arc::clone(&self.state));
                    tokio::spawn(async move {
                        if let Err(err) = session.run().await {
                            warn!(peer = %peer, error = %err, "session ended with I/O error");
                        }
                    });
                }
                Err(err) => {
                    // Transient accept failures do not take the listener down.
                    error!(error = %err, "failed to accept connection");
                }
            }
        }
    }
}

/// Spawns the periodic physics task. Each tick takes the state lock, so tick
/// advances serialize against command application and telemetry snapshots.
pub fn spawn_tick_loop(state: SharedState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            state.lock().await.tick();
        }
    })
}
