//! Physical state model of the simulated satellite.
//!
//! A single `SatelliteState` is owned by the simulator process and shared
//! between the tick task and every session task behind a mutex; both mutation
//! paths (`tick`, `apply_command`) and the snapshot read used to build a
//! telemetry frame run under that lock so no torn pre/post-tick mix is ever
//! observed.

use crate::protocol::{Command, CommandCode, TelemetryFrame};
use rand::Rng;
use tracing::{debug, info, warn};

/// Subsystem identifier carried in `param1` of RESET/SHUTDOWN commands.
pub const SUBSYSTEM_ADCS: u32 = 2;

/// Size of the SET_PARAM parameter table.
pub const PARAM_TABLE_LEN: usize = 8;

const POWER_DRAW_PER_TICK: f64 = 0.1;
const RECHARGE_INTERVAL_TICKS: u64 = 100;
const RECHARGE_AMOUNT: f64 = 30.0;
const POWER_WARNING_THRESHOLD: f64 = 20.0;

const TEMP_BASELINE_C: f64 = 20.0;
const TEMP_JITTER_C: f64 = 2.0;

/// Fraction of the remaining attitude error removed per tick.
const ADCS_GAIN: f64 = 0.1;
/// Remaining error below which an axis snaps exactly onto its target.
const ADCS_SNAP_DEG: f64 = 0.1;

const ORBIT_RADIUS_KM: f64 = 7000.0;
const ORBIT_Z_AMPLITUDE_KM: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemStatus {
    Error = 0,
    Nominal = 1,
    Warning = 2,
}

impl SystemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemStatus::Error => "error",
            SystemStatus::Nominal => "nominal",
            SystemStatus::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteState {
    /// Roll, pitch, yaw in degrees, each normalized into [0, 360).
    pub attitude: [f64; 3],
    pub target_attitude: [f64; 3],
    /// Orbital position in km.
    pub position: [f64; 3],
    pub temperature: f64,
    /// Percent, clamped to [0, 100].
    pub power_level: f64,
    pub status: SystemStatus,
    pub tick: u64,
    /// SET_PARAM parameter table.
    pub params: [f32; PARAM_TABLE_LEN],
    /// Cleared by SHUTDOWN of the ADCS subsystem, restored by RESET.
    pub adcs_enabled: bool,
    pub commands_received: u32,
    pub frames_sent: u32,
}

impl Default for SatelliteState {
    fn default() -> Self {
        Self::new()
    }
}

impl SatelliteState {
    pub fn new() -> Self {
        Self {
            attitude: [0.0; 3],
            target_attitude: [0.0; 3],
            position: [0.0; 3],
            temperature: TEMP_BASELINE_C,
            power_level: 100.0,
            status: SystemStatus::Nominal,
            tick: 0,
            params: [0.0; PARAM_TABLE_LEN],
            adcs_enabled: true,
            commands_received: 0,
            frames_sent: 0,
        }
    }

    /// Advances the simulation by one time-step.
    pub fn tick(&mut self) {
        self.tick += 1;

        // Power draw, with a periodic recharge window modelling sun exposure.
        self.power_level = (self.power_level - POWER_DRAW_PER_TICK).max(0.0);
        if self.tick % RECHARGE_INTERVAL_TICKS == 0 {
            self.power_level = (self.power_level + RECHARGE_AMOUNT).min(100.0);
        }

        self.temperature =
            TEMP_BASELINE_C + rand::thread_rng().gen_range(-TEMP_JITTER_C..=TEMP_JITTER_C);

        if self.adcs_enabled {
            self.converge_attitude();
        }

        // Circular orbit with a small out-of-plane perturbation.
        let t = self.tick as f64 / 10.0;
        self.position[0] = ORBIT_RADIUS_KM * (t * 0.01).cos();
        self.position[1] = ORBIT_RADIUS_KM * (t * 0.01).sin();
        self.position[2] = ORBIT_Z_AMPLITUDE_KM * (t * 0.05).sin();

        self.status = if self.power_level <= 0.0 {
            SystemStatus::Error
        } else if self.power_level < POWER_WARNING_THRESHOLD {
            SystemStatus::Warning
        } else {
            SystemStatus::Nominal
        };
    }

    fn converge_attitude(&mut self) {
        for axis in 0..3 {
            let diff = self.target_attitude[axis] - self.attitude[axis];
            if diff.abs() < ADCS_SNAP_DEG {
                self.attitude[axis] = self.target_attitude[axis];
            } else {
                self.attitude[axis] += diff * ADCS_GAIN;
            }
            self.attitude[axis] = self.attitude[axis].rem_euclid(360.0);
        }
    }

    /// Applies one decoded ground command.
    pub fn apply_command(&mut self, cmd: &Command) {
        self.commands_received = self.commands_received.wrapping_add(1);

        match cmd.code {
            CommandCode::Nop | CommandCode::GetTelemetry => {}
            CommandCode::Reset => {
                if cmd.param1 == SUBSYSTEM_ADCS {
                    info!("resetting ADCS subsystem");
                    self.target_attitude = [0.0; 3];
                    self.adcs_enabled = true;
                } else {
                    debug!(subsystem = cmd.param1, "reset of unmodeled subsystem ignored");
                }
            }
            CommandCode::AdcsSet => {
                let angle = f64::from(cmd.fparam);
                info!(angle, "setting ADCS target attitude");
                self.target_attitude = [angle, angle * 0.5, angle * 0.25];
            }
            CommandCode::SetParam => {
                let index = cmd.param1 as usize;
                if index < PARAM_TABLE_LEN {
                    debug!(index, value = f64::from(cmd.fparam), "parameter updated");
                    self.params[index] = cmd.fparam;
                } else {
                    warn!(index, "parameter index out of range, ignored");
                }
            }
            CommandCode::Shutdown => {
                if cmd.param1 == SUBSYSTEM_ADCS {
                    warn!("ADCS control loop shut down by ground command");
                    self.adcs_enabled = false;
                } else {
                    debug!(
                        subsystem = cmd.param1,
                        "shutdown of unmodeled subsystem acknowledged as no-op"
                    );
                }
            }
        }
    }

    /// Builds a wire telemetry frame from the current state. Callers must
    /// hold the state lock so the snapshot is consistent.
    pub fn snapshot(&self) -> TelemetryFrame {
        TelemetryFrame {
            timestamp: self.tick as u32,
            attitude: [
                self.attitude[0] as f32,
                self.attitude[1] as f32,
                self.attitude[2] as f32,
            ],
            position: [
                self.position[0] as f32,
                self.position[1] as f32,
                self.position[2] as f32,
            ],
            temperature: self.temperature.clamp(0.0, 100.0) as u32,
            power: self.power_level.clamp(0.0, 100.0) as u32,
            status: self.status as u8,
        }
    }
}
