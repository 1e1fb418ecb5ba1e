// Status snapshots reported by the runtime

use serde::{Deserialize, Serialize};

use crate::plotter::{CoordinateMode, Position};

/// Where the controller sits in its lock / calibration lifecycle.
///
/// Starts at `LockedUncalibrated`; homing moves it straight to
/// `UnlockedCalibrated` and nothing moves it back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyState {
    LockedUncalibrated,
    LockedCalibrated,
    UnlockedCalibrated,
}

impl SafetyState {
    pub fn from_flags(locked: bool, calibrated: bool) -> Self {
        match (locked, calibrated) {
            (false, true) => SafetyState::UnlockedCalibrated,
            (true, true) => SafetyState::LockedCalibrated,
            // Unlocked-but-uncalibrated is unreachable; report it as the locked state
            (_, false) => SafetyState::LockedUncalibrated,
        }
    }
}

// Snapshot of controller state printed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MotionStatus {
    pub state: SafetyState,
    pub coordinate_mode: CoordinateMode,
    pub position: Position,
}
