//! JSON mirror of the telemetry stream for dashboard-style consumers.
//!
//! The wire protocol stays binary; this report is a per-subsystem view of
//! the same state snapshot, keyed by `{timestamp, adcs, power, thermal,
//! communication, system}`. It is deliberately not bit-exact with the wire
//! frames.

use serde::Serialize;

use crate::state::SatelliteState;

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryReport {
    pub timestamp: u32,
    pub adcs: AdcsReadings,
    pub power: PowerReadings,
    pub thermal: ThermalReadings,
    pub communication: CommunicationReadings,
    pub system: SystemReadings,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdcsReadings {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub target_roll: f64,
    pub target_pitch: f64,
    pub target_yaw: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerReadings {
    pub level: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThermalReadings {
    pub internal: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunicationReadings {
    pub commands_received: u32,
    pub frames_sent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemReadings {
    pub mode: &'static str,
    pub tick: u64,
    pub orbit_phase_deg: f64,
}

impl TelemetryReport {
    pub fn from_state(state: &SatelliteState) -> Self {
        let orbit_phase_deg = (state.tick as f64 / 10.0 * 0.01)
            .to_degrees()
            .rem_euclid(360.0);

        Self {
            timestamp: state.tick as u32,
            adcs: AdcsReadings {
                roll: state.attitude[0],
                pitch: state.attitude[1],
                yaw: state.attitude[2],
                target_roll: state.target_attitude[0],
                target_pitch: state.target_attitude[1],
                target_yaw: state.target_attitude[2],
                enabled: state.adcs_enabled,
            },
            power: PowerReadings {
                level: state.power_level,
            },
            thermal: ThermalReadings {
                internal: state.temperature,
            },
            communication: CommunicationReadings {
                commands_received: state.commands_received,
                frames_sent: state.frames_sent,
            },
            system: SystemReadings {
                mode: state.status.as_str(),
                tick: state.tick,
                orbit_phase_deg,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
