// Plotter control over a G-code serial link
//
// Provides:
// - The fixed G-code vocabulary the firmware is sent
// - Line-framed serial transport with startup drain
// - Safety-gated motion controller (lock, homing, bounds, speed)

pub mod controller;
pub mod gcode;
pub mod link;

#[cfg(test)]
pub(crate) mod mock;

pub use controller::{Axis, CoordinateMode, MotionController, MotionError, Position};
pub use gcode::Command;
pub use link::{Transport, TransportError};
