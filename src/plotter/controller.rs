// Safety-gated motion controller for the plotter
//
// Owns the lock / calibration / coordinate-mode state and is the only thing
// allowed to decide whether a move reaches the firmware. Every check runs
// before anything is written, so a rejected request never produces motion.

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

use super::gcode::Command;
use super::link::{Transport, TransportError};
use crate::config::{PlotterConfig, Workspace};
use crate::messages::{MotionStatus, SafetyState};

/// How the firmware interprets move coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMode {
    Absolute,
    Relative,
}

/// Machine axis named in bound errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Absolute pen position in mm
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }
}

/// Reasons the controller refused to act
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(
        "Unlocking without homing is disabled: it can crash the machine. Use calibrate_and_unlock"
    )]
    OperationDisabled,

    #[error("The machine is locked. Calibrate it first")]
    MachineLocked,

    #[error("Only absolute mode is supported for moves (current mode: {mode:?})")]
    UnsupportedMode { mode: CoordinateMode },

    #[error("The machine is not calibrated. Calibrate it first")]
    NotCalibrated,

    #[error("{axis} must be between 0 and {limit}, got {value}")]
    OutOfBounds { axis: Axis, value: f64, limit: f64 },

    #[error("Speed must be more than 0 and at most {max}, got {speed}")]
    InvalidSpeed { speed: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, MotionError>;

/// Gatekeeper between callers and the plotter firmware
pub struct MotionController<P = Box<dyn SerialPort>> {
    transport: Transport<P>,
    workspace: Workspace,
    locked: bool,
    calibrated: bool,
    coordinate_mode: CoordinateMode,
    last_commanded_position: Position,
}

impl MotionController {
    /// Open the configured serial port and bring the controller up locked
    pub fn connect(config: &PlotterConfig) -> Result<Self> {
        let transport = Transport::open(&config.port, config.baud_rate, config.verbose)?;
        Self::new(transport, config.workspace)
    }
}

impl<P: Read + Write> MotionController<P> {
    /// Take ownership of the transport and put the firmware in mm / absolute mode.
    ///
    /// The controller starts locked and uncalibrated.
    pub fn new(transport: Transport<P>, workspace: Workspace) -> Result<Self> {
        let mut controller = Self {
            transport,
            workspace,
            locked: true,
            calibrated: false,
            coordinate_mode: CoordinateMode::Absolute,
            last_commanded_position: Position::origin(),
        };
        controller.set_unit_to_mm()?;
        controller.set_absolute_mode()?;
        Ok(controller)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn coordinate_mode(&self) -> CoordinateMode {
        self.coordinate_mode
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Target of the last move that was actually sent
    pub fn last_commanded_position(&self) -> Position {
        self.last_commanded_position
    }

    pub fn transport(&self) -> &Transport<P> {
        &self.transport
    }

    pub fn safety_state(&self) -> SafetyState {
        SafetyState::from_flags(self.locked, self.calibrated)
    }

    pub fn status(&self) -> MotionStatus {
        MotionStatus {
            state: self.safety_state(),
            coordinate_mode: self.coordinate_mode,
            position: self.last_commanded_position,
        }
    }

    /// Clear the lock without homing. Always refused.
    ///
    /// An un-homed machine does not know where its axes are, so the first
    /// move after a bare `$X` can drive the carriage into the frame. Callers
    /// must go through [`calibrate_and_unlock`](Self::calibrate_and_unlock).
    pub fn request_unlock(&mut self) -> Result<()> {
        warn!("Refusing to unlock without homing");
        Err(MotionError::OperationDisabled)
    }

    pub fn set_unit_to_mm(&mut self) -> Result<()> {
        self.transport.send(Command::Millimeters)?;
        Ok(())
    }

    pub fn set_absolute_mode(&mut self) -> Result<()> {
        self.transport.send(Command::AbsoluteMode)?;
        self.coordinate_mode = CoordinateMode::Absolute;
        Ok(())
    }

    /// Switch the firmware to relative coordinates. Moves are refused until
    /// absolute mode is restored.
    pub fn set_relative_mode(&mut self) -> Result<()> {
        self.transport.send(Command::RelativeMode)?;
        self.coordinate_mode = CoordinateMode::Relative;
        Ok(())
    }

    /// Home both axes, unlock, and park at the origin.
    ///
    /// This is the only way out of the locked state.
    pub fn calibrate_and_unlock(&mut self) -> Result<()> {
        info!("Homing plotter");
        self.set_unit_to_mm()?;
        self.set_absolute_mode()?;
        self.transport.send(Command::Home)?;

        self.calibrated = true;
        self.locked = false;
        info!("Plotter homed and unlocked");

        self.move_to(0.0, 0.0, None)
    }

    /// Move the pen to absolute `(x, y)` in mm.
    ///
    /// With a `speed` (mm/min) this is a coordinated feed move, otherwise a
    /// rapid. Checks run in a fixed order and the first failure is returned;
    /// nothing is written unless all of them pass.
    pub fn move_to(&mut self, x: f64, y: f64, speed: Option<f64>) -> Result<()> {
        let command = self.check_move(x, y, speed).inspect_err(|e| {
            warn!("Rejected move to ({}, {}): {}", x, y, e);
        })?;

        debug!("Moving to ({}, {}) speed={:?}", x, y, speed);
        self.transport.send(command)?;
        self.last_commanded_position = Position::new(x, y);
        Ok(())
    }

    /// Validate a move request and build the command for it
    fn check_move(&self, x: f64, y: f64, speed: Option<f64>) -> Result<Command> {
        if self.locked {
            return Err(MotionError::MachineLocked);
        }
        if self.coordinate_mode != CoordinateMode::Absolute {
            return Err(MotionError::UnsupportedMode {
                mode: self.coordinate_mode,
            });
        }
        if !self.calibrated {
            return Err(MotionError::NotCalibrated);
        }
        // NaN fails every range check below
        if !(0.0..=self.workspace.width).contains(&x) {
            return Err(MotionError::OutOfBounds {
                axis: Axis::X,
                value: x,
                limit: self.workspace.width,
            });
        }
        // Y range is opt-in, but NaN/inf would put malformed G-code on the wire
        let y_in_range = (0.0..=self.workspace.height).contains(&y);
        if !y.is_finite() || (self.workspace.enforce_y_bound && !y_in_range) {
            return Err(MotionError::OutOfBounds {
                axis: Axis::Y,
                value: y,
                limit: self.workspace.height,
            });
        }

        match speed {
            Some(speed) => {
                if !(speed > 0.0 && speed <= self.workspace.max_speed) {
                    return Err(MotionError::InvalidSpeed {
                        speed,
                        max: self.workspace.max_speed,
                    });
                }
                Ok(Command::Feed { speed, x, y })
            }
            None => Ok(Command::Rapid { x, y }),
        }
    }
}
