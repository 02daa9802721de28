//! Per-connection command/telemetry loop.
//!
//! Each accepted connection gets one session task. The loop interleaves a
//! short read poll for inbound command frames with a periodic telemetry push,
//! so a silent ground station still receives a frame at least once per
//! second. Malformed frames are logged and dropped without ending the
//! session; EOF or any I/O error disconnects this session only.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::protocol::CommandDeframer;
use crate::SharedState;

/// How long one read poll waits before yielding to the telemetry timer.
pub const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Unsolicited telemetry cadence.
pub const TELEMETRY_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connected,
    AwaitCommand,
    SendTelemetry,
    Disconnected,
}

pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    state: SharedState,
    deframer: CommandDeframer,
    phase: SessionPhase,
    telemetry_period: Duration,
}

impl Session {
    pub fn new(stream: TcpStream, peer: SocketAddr, state: SharedState) -> Self {
        Self {
            stream,
            peer,
            state,
            deframer: CommandDeframer::new(),
            phase: SessionPhase::Connected,
            telemetry_period: TELEMETRY_PERIOD,
        }
    }

    /// Runs the session until the peer disconnects or an I/O error occurs.
    pub async fn run(mut self) -> io::Result<()> {
        info!(peer = %self.peer, "ground station connected");

        let mut read_buf = [0u8; 256];
        let mut last_telemetry = Instant::now();

        loop {
            self.phase = SessionPhase::AwaitCommand;
            match time::timeout(READ_POLL_INTERVAL, self.stream.read(&mut read_buf)).await {
                Ok(Ok(0)) => break, // EOF
                Ok(Ok(n)) => {
                    self.deframer.extend(&read_buf[..n]);
                    while let Some(result) = self.deframer.next_frame() {
                        match result {
                            Ok(cmd) => {
                                debug!(peer = %self.peer, ?cmd, "command received");
                                {
                                    let mut state = self.state.lock().await;
                                    state.apply_command(&cmd);
                                }
                                // Every accepted command is answered with a
                                // fresh telemetry frame.
                                self.send_telemetry().await?;
                                last_telemetry = Instant::now();
                            }
                            Err(err) => {
                                warn!(peer = %self.peer, error = %err, "dropping malformed frame");
                            }
                        }
                    }
                }
                Ok(Err(err)) => {
                    warn!(peer = %self.peer, error = %err, "read failed");
                    break;
                }
                Err(_) => {} // poll timeout, nothing inbound
            }

            if last_telemetry.elapsed() >= self.telemetry_period {
                self.send_telemetry().await?;
                last_telemetry = Instant::now();
            }
        }

        self.phase = SessionPhase::Disconnected;
        info!(peer = %self.peer, phase = ?self.phase, "ground station disconnected");
        Ok(())
    }

    async fn send_telemetry(&mut self) -> io::Result<()> {
        self.phase = SessionPhase::SendTelemetry;
        let frame = {
            let mut state = self.state.lock().await;
            state.frames_sent = state.frames_sent.wrapping_add(1);
            state.snapshot()
        };
        self.stream.write_all(&frame.encode()).await
    }
}
